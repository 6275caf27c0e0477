//! Persistence: checkpoint arrays, checkpoint names, run summaries

pub mod array;
pub mod checkpoint;

pub use array::ArrayStore;
pub use checkpoint::{CheckpointName, CheckpointNameError, CHECKPOINT_PREFIX};

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use serde_json::{json, to_string_pretty};

use crate::sampling::RunnerStats;

/// Save the end-of-run summary to `<output_dir>/summary.json`.
pub fn save_summary(
    output_dir: &Path,
    top: &[(usize, u32)],
    node_count: u64,
    stats: RunnerStats,
    elapsed_ms: u128,
) -> Result<()> {
    log::info!("saving run summary to {}", output_dir.display());

    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("summary.json");
    let mut file = File::create(path)?;

    let summary = json!({
        "node_count": node_count,
        "elapsed_ms": elapsed_ms,
        "sampling": stats,
        "top_nodes": top.iter()
            .map(|&(id, count)| json!({ "node": id, "count": count }))
            .collect::<Vec<_>>(),
    });

    file.write_all(to_string_pretty(&summary)?.as_bytes())?;

    Ok(())
}
