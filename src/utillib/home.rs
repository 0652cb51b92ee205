use std::path::PathBuf;

use anyhow::{anyhow, Result};

pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("can't get HOME environment variable"))
}
