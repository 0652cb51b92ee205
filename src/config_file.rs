//! Generic config file loader

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};

use crate::ctx;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigBackend {
    Json5,
    Yaml,
}

impl ConfigBackend {
    pub fn parse_config_str<T: DeserializeOwned>(self, s: &str) -> Result<T> {
        match self {
            ConfigBackend::Json5 => json5::from_str(s).with_context(|| anyhow!("decoding JSON5")),
            ConfigBackend::Yaml => serde_yml::from_str(s).with_context(|| anyhow!("decoding YAML")),
        }
    }

    pub fn load_config_file<T: DeserializeOwned>(self, path: &Path) -> Result<T> {
        let s = std::fs::read_to_string(path).map_err(ctx!("loading config file from {path:?}"))?;
        self.parse_config_str(&s).map_err(ctx!("config file {path:?}"))
    }
}

pub const FILE_EXTENSIONS: &[(&str, ConfigBackend)] = &[
    ("json5", ConfigBackend::Json5),
    ("json", ConfigBackend::Json5),
    ("yml", ConfigBackend::Yaml),
    ("yaml", ConfigBackend::Yaml),
];

pub fn backend_from_path(path: &Path) -> Result<ConfigBackend> {
    let Some(ext) = path.extension() else {
        bail!(
            "given file path does not have an extension \
             for determining the file type: {path:?}"
        )
    };
    let Some(ext) = ext.to_str() else {
        bail!("given file path does have an extension that is not unicode: {path:?}")
    };
    FILE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, backend)| *backend)
        .ok_or_else(|| anyhow!("given file path does have an unknown extension {ext:?}: {path:?}"))
}

fn add_extension(path: &Path, extension: &str) -> Option<PathBuf> {
    let mut file_name: OsString = path.file_name()?.to_owned();
    file_name.push(".");
    file_name.push(extension);
    Some(path.with_file_name(file_name))
}

pub trait LoadConfigFile: DeserializeOwned + Default {
    /// One of the `FILE_EXTENSIONS` is appended to this path
    fn default_config_path_without_suffix() -> Result<Option<PathBuf>>;

    /// If `path` is given, the file must exist. Otherwise the default
    /// location is checked with each of the `FILE_EXTENSIONS`; if none
    /// exists, `Default` is used, if more than one exists, that's an
    /// error.
    fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        if let Some(path) = path {
            let path = path.as_ref();
            return backend_from_path(path)?.load_config_file(path);
        }
        let Some(base) = Self::default_config_path_without_suffix()? else {
            return Ok(Self::default());
        };
        let mut found = Vec::new();
        for (extension, backend) in FILE_EXTENSIONS {
            let path = add_extension(&base, extension)
                .ok_or_else(|| anyhow!("path is missing a file name: {base:?}"))?;
            if path.exists() {
                found.push((path, *backend));
            }
        }
        match found.as_slice() {
            [] => Ok(Self::default()),
            [(path, backend)] => backend.load_config_file(path),
            _ => {
                let paths: Vec<_> = found.iter().map(|(path, _)| path).collect();
                bail!("multiple config file paths found, leading to ambiguity: {paths:?}")
            }
        }
    }
}
