//! Out-of-core, parallel graph-sampling estimation of node importance

pub mod config;
pub mod counters;
pub mod graph;
pub mod rounds;
pub mod sampling;
pub mod storage;
pub mod topn;

pub use anyhow::{anyhow, Result};
