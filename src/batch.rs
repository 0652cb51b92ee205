//! Computing stats for a set of sample files through one
//! `StatsService`, and writing the results.

use std::{
    io::Write,
    path::PathBuf,
    thread,
};

use anyhow::{anyhow, Result};

use crate::{
    ctx, info,
    samples::{read_samples_file, read_samples_stdin},
    service::StatsService,
    stats::{Stats, StatsField},
};

/// How `write_stats` renders one result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    /// The `Display` representation
    Text,
    /// One JSON object per line
    Json,
    /// Only the value of one field
    Field(StatsField),
}

/// Each path becomes one request; all of them are submitted at the
/// same time, from one thread per path. Results are returned in the
/// order of `paths`, named by their path. With no paths, stdin is
/// read as a single request named "-".
pub fn compute_paths(
    service: &StatsService,
    paths: &[PathBuf],
    bucket_count: Option<i64>,
) -> Result<Vec<(String, Stats)>> {
    let submit = |samples: Vec<f64>| match bucket_count {
        Some(b) => service.submit(samples, b),
        None => service.submit_default(samples),
    };

    if paths.is_empty() {
        let reply = submit(read_samples_stdin()?)?;
        return Ok(vec![("-".into(), reply.recv()?)]);
    }

    thread::scope(|scope| {
        let handles: Vec<_> = paths
            .iter()
            .map(|path| {
                scope.spawn(move || -> Result<(String, Stats)> {
                    let samples = read_samples_file(path)?;
                    info!("submitting {} samples from {path:?}", samples.len());
                    let stats = submit(samples)?
                        .recv()
                        .map_err(ctx!("computing stats for {path:?}"))?;
                    Ok((path.to_string_lossy().into_owned(), stats))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow!("submitting thread panicked"))?)
            .collect()
    })
}

/// `name`, if given, is written before the result, tab separated,
/// except in JSON format.
pub fn write_stats(
    out: &mut impl Write,
    name: Option<&str>,
    stats: &Stats,
    format: OutputFormat,
) -> Result<()> {
    if let (Some(name), false) = (name, format == OutputFormat::Json) {
        write!(out, "{name}\t")?;
    }
    match format {
        OutputFormat::Text => writeln!(out, "{stats}")?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, stats)?;
            writeln!(out)?;
        }
        OutputFormat::Field(field) => writeln!(out, "{}", stats.get(field))?,
    }
    Ok(())
}
