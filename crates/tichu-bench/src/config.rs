use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_HAND_SIZE: usize = 14;
const DEFAULT_PARTITION_LIMIT: usize = 2_000;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchConfig {
    pub run_id: String,
    pub deals: DealConfig,
    #[serde(default)]
    pub partitions: PartitionConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DealConfig {
    pub seed: u64,
    pub hands: usize,
    #[serde(default = "default_hand_size")]
    pub hand_size: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PartitionConfig {
    pub limit: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PARTITION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub directory: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default)]
    pub level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            level: None,
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<Option<Level>, ValidationError> {
        match self.level.as_deref() {
            None => Ok(None),
            Some(raw) => raw
                .parse::<Level>()
                .map(Some)
                .map_err(|_| ValidationError::BadLevel(raw.to_string())),
        }
    }
}

/// Output locations with `{run_id}` templates substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub directory: PathBuf,
    pub rows_jsonl: PathBuf,
    pub summary_json: PathBuf,
}

fn default_hand_size() -> usize {
    DEFAULT_HAND_SIZE
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config at {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("run_id must not be empty")]
    EmptyRunId,
    #[error("run_id contains forbidden character {0:?}")]
    BadRunIdChar(char),
    #[error("deals.hands must be at least 1")]
    ZeroHands,
    #[error("deals.hand_size must be between 1 and 14, got {0}")]
    HandSizeOutOfRange(usize),
    #[error("partitions.limit must be at least 1")]
    ZeroPartitionLimit,
    #[error("unknown logging level {0:?}")]
    BadLevel(String),
}

impl BenchConfig {
    /// Load and validate configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let cfg: BenchConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.run_id.is_empty() {
            return Err(ValidationError::EmptyRunId);
        }
        if let Some(bad) = self
            .run_id
            .chars()
            .find(|c| !RUN_ID_ALLOWED.contains(*c))
        {
            return Err(ValidationError::BadRunIdChar(bad));
        }
        if self.deals.hands == 0 {
            return Err(ValidationError::ZeroHands);
        }
        if self.deals.hand_size == 0 || self.deals.hand_size > 14 {
            return Err(ValidationError::HandSizeOutOfRange(self.deals.hand_size));
        }
        if self.partitions.limit == 0 {
            return Err(ValidationError::ZeroPartitionLimit);
        }
        self.logging.level()?;
        Ok(())
    }

    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        let directory =
            PathBuf::from(self.outputs.directory.replace("{run_id}", &self.run_id));
        ResolvedOutputs {
            rows_jsonl: directory.join("hands.jsonl"),
            summary_json: directory.join("summary.json"),
            directory,
        }
    }
}
