//! Checkpoint file naming

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

pub const CHECKPOINT_PREFIX: &str = "page_rank";
const CHECKPOINT_SUFFIX: &str = ".int";

#[derive(Debug, Error)]
pub enum CheckpointNameError {
    #[error("checkpoint path {0:?} has no UTF-8 file name")]
    NoFileName(String),
    #[error("checkpoint file name {0:?} does not match <prefix>_<minNodeId>_<nodesPerRound>{CHECKPOINT_SUFFIX}")]
    Malformed(String),
    #[error("checkpoint file name {name:?}: {field} is not an integer")]
    BadField { name: String, field: &'static str },
}

/// The window of the *next* round to run, encoded in the checkpoint file
/// name as `<prefix>_<minNodeId>_<nodesPerRound>.int`. Resume cannot
/// proceed unless both integers parse back exactly, so a malformed name is
/// fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointName {
    pub min_node_id: u64,
    pub nodes_per_round: u64,
}

impl CheckpointName {
    pub fn new(min_node_id: u64, nodes_per_round: u64) -> Self {
        Self {
            min_node_id,
            nodes_per_round,
        }
    }

    pub fn parse(path: &Path) -> Result<Self, CheckpointNameError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CheckpointNameError::NoFileName(path.display().to_string()))?;
        name.parse()
    }

    /// The file name for this checkpoint, e.g. `page_rank_10_100.int`.
    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CheckpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{CHECKPOINT_PREFIX}_{}_{}{CHECKPOINT_SUFFIX}",
            self.min_node_id, self.nodes_per_round
        )
    }
}

impl FromStr for CheckpointName {
    type Err = CheckpointNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stem = s
            .strip_suffix(CHECKPOINT_SUFFIX)
            .ok_or_else(|| CheckpointNameError::Malformed(s.to_string()))?;
        // The prefix itself may contain underscores; the two integers are
        // always the last two fields.
        let mut fields = stem.rsplitn(3, '_');
        let count_field = fields
            .next()
            .ok_or_else(|| CheckpointNameError::Malformed(s.to_string()))?;
        let min_field = fields
            .next()
            .ok_or_else(|| CheckpointNameError::Malformed(s.to_string()))?;
        if fields.next().is_none() {
            return Err(CheckpointNameError::Malformed(s.to_string()));
        }
        let nodes_per_round = count_field
            .parse()
            .map_err(|_| CheckpointNameError::BadField {
                name: s.to_string(),
                field: "nodesPerRound",
            })?;
        let min_node_id = min_field
            .parse()
            .map_err(|_| CheckpointNameError::BadField {
                name: s.to_string(),
                field: "minNodeId",
            })?;
        Ok(Self {
            min_node_id,
            nodes_per_round,
        })
    }
}
