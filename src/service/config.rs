use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    config_file::LoadConfigFile, stats::bucket_count::BucketCount, utillib::home::home_dir,
};

/// File name below $HOME, without the suffix for the file format
pub const CONFIG_FILE_NAME: &str = ".latency-stats";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServiceConfig {
    /// How many requests can wait in the queue before `submit`
    /// blocks. Must be at least 1.
    pub queue_capacity: usize,

    /// Computations taking longer than this are logged as a warning
    pub slow_compute_seconds: f64,

    pub worker_thread_name: String,

    /// Used by callers that don't specify a histogram resolution
    pub default_bucket_count: BucketCount,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            slow_compute_seconds: 0.1,
            worker_thread_name: "stats-worker".into(),
            default_bucket_count: BucketCount::default(),
        }
    }
}

impl ServiceConfig {
    /// Negative or NaN values are treated as 0, i.e. warn about
    /// every computation.
    pub fn slow_compute_threshold(&self) -> Duration {
        Duration::try_from_secs_f64(self.slow_compute_seconds).unwrap_or(Duration::ZERO)
    }
}

impl LoadConfigFile for ServiceConfig {
    fn default_config_path_without_suffix() -> Result<Option<PathBuf>> {
        Ok(Some(home_dir()?.join(CONFIG_FILE_NAME)))
    }
}
