use crate::models::Algorithm;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024; // 1 MiB

/// What happens to the rest of a computation when one algorithm's backend fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the other algorithms running; the failed one reports a placeholder.
    #[default]
    Isolate,
    /// Stop everything and return the first failure.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Knobs the coordinator needs for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestOptions {
    pub chunk_size: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for DigestOptions {
    fn default() -> Self {
        DigestOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            failure_policy: FailurePolicy::Isolate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub algorithms: Vec<Algorithm>,
    pub chunk_size: usize,
    pub failure_policy: FailurePolicy,
    pub output: OutputFormat,
}

impl Default for DigestConfig {
    fn default() -> Self {
        DigestConfig {
            algorithms: Algorithm::default_request(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            failure_policy: FailurePolicy::default(),
            output: OutputFormat::default(),
        }
    }
}

impl DigestConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: DigestConfig = serde_json::from_str(s).context("parsing digest config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        if self.algorithms.is_empty() {
            bail!("at least one algorithm must be requested");
        }
        Ok(())
    }

    pub fn options(&self) -> DigestOptions {
        DigestOptions {
            chunk_size: self.chunk_size,
            failure_policy: self.failure_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = DigestConfig::from_json_str(r#"{"failure_policy":"abort"}"#).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.algorithms, Algorithm::default_request());
        assert_eq!(config.output, OutputFormat::Table);
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(DigestConfig::from_json_str(r#"{"chunk_size":0}"#).is_err());
    }

    #[test]
    fn rejects_empty_algorithm_list() {
        assert!(DigestConfig::from_json_str(r#"{"algorithms":[]}"#).is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filedigest.json");
        fs::write(&path, r#"{"algorithms":["Blake2b","Md5"],"output":"json"}"#).unwrap();
        let config = DigestConfig::load(&path).unwrap();
        assert_eq!(config.algorithms, vec![Algorithm::Blake2b, Algorithm::Md5]);
        assert_eq!(config.output, OutputFormat::Json);
    }
}
