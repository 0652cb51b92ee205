//! Reading sample values from text: numbers separated by whitespace
//! or newlines, `#` starts a comment that runs to the end of the line.

use std::{
    io::{stdin, Read},
    num::ParseFloatError,
    path::Path,
};

use anyhow::{Context, Result};

use crate::ctx;

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("line {line}: invalid sample value {value:?}: {error}")]
pub struct SampleParseError {
    /// 1-based
    pub line: usize,
    pub value: String,
    pub error: ParseFloatError,
}

pub fn parse_samples(s: &str) -> Result<Vec<f64>, SampleParseError> {
    let mut samples = Vec::new();
    for (line0, line) in s.lines().enumerate() {
        let line_without_comment = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        };
        for word in line_without_comment.split_whitespace() {
            let v: f64 = word.parse().map_err(|error| SampleParseError {
                line: line0 + 1,
                value: word.into(),
                error,
            })?;
            samples.push(v);
        }
    }
    Ok(samples)
}

pub fn read_samples_file(path: &Path) -> Result<Vec<f64>> {
    let s = std::fs::read_to_string(path).map_err(ctx!("reading file {path:?}"))?;
    parse_samples(&s).map_err(ctx!("parsing samples from file {path:?}"))
}

pub fn read_samples_stdin() -> Result<Vec<f64>> {
    let mut s = String::new();
    stdin()
        .lock()
        .read_to_string(&mut s)
        .context("reading from stdin")?;
    parse_samples(&s).context("parsing samples from stdin")
}
