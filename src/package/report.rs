//! Outcome of an export run

use std::path::PathBuf;

use serde::Serialize;

use crate::resolver::{NodeFailure, NodeKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlobStats {
    pub fetched: usize,
    /// Templated nodes whose object does not exist
    pub missing: usize,
    /// Sentinel nodes, never fetched
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    /// Script file names in manifest order
    pub scripts: Vec<String>,
    pub roots: Vec<NodeKey>,
    pub emitted: Vec<NodeKey>,
    pub failures: Vec<NodeFailure>,
    pub blobs: BlobStats,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of emitted nodes per resource type, in first-emission order
    pub fn emitted_by_type(&self) -> Vec<(String, usize)> {
        let mut counts: indexmap::IndexMap<String, usize> = indexmap::IndexMap::new();
        for key in &self.emitted {
            *counts.entry(key.resource_type.to_string()).or_default() += 1;
        }
        counts.into_iter().collect()
    }
}
