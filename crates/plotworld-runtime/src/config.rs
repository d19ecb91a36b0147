use std::thread;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Mutation worker threads; 0 picks the available parallelism.
    #[serde(default)]
    pub workers: usize,
    /// Largest merge group a merge may produce.
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
}

fn default_max_group_size() -> usize {
    64
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            max_group_size: default_max_group_size(),
        }
    }
}

impl RuntimeConfig {
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}
