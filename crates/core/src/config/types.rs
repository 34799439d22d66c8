use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Where launch configurations and job outputs live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for analysis output folders and launch files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// SQLite database used by the sqlite launch store.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Launch configuration backend.
    #[serde(default)]
    pub launch_store: LaunchStoreBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_path: default_database_path(),
            launch_store: LaunchStoreBackend::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("generated_files")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("phenorun.db")
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStoreBackend {
    #[default]
    Sqlite,
    /// One `{key}_launch_conf.json` file per job key under `data_dir`.
    Files,
}

/// Job runner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// How long a terminal job state stays queryable (seconds).
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
    /// How often the registry sweeps expired job states (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Capacity of each job's progress broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Abort marker backend.
    #[serde(default)]
    pub abort_backend: AbortBackend,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention(),
            sweep_interval_secs: default_sweep_interval(),
            event_buffer: default_event_buffer(),
            abort_backend: AbortBackend::default(),
        }
    }
}

fn default_retention() -> u64 {
    3600 // 1 hour
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_event_buffer() -> usize {
    256
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AbortBackend {
    #[default]
    Memory,
    /// Hidden `.{key}_abort` files under `data_dir`, visible to other processes.
    MarkerFile,
}

/// External per-group pipeline command.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Executable invoked once per group.
    pub command: String,
    /// Arguments placed before the group's item identifiers.
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-group timeout in seconds.
    #[serde(default = "default_pipeline_timeout")]
    pub timeout_secs: u64,
}

impl PipelineConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout_secs: default_pipeline_timeout(),
        }
    }
}

fn default_pipeline_timeout() -> u64 {
    1800 // 30 minutes
}

/// Sanitized config for API responses (pipeline arguments redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub jobs: JobsConfig,
    pub pipeline: SanitizedPipelineConfig,
}

/// Pipeline arguments can carry credentials, only their count is exposed.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPipelineConfig {
    pub command: String,
    pub arg_count: usize,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            jobs: config.jobs.clone(),
            pipeline: SanitizedPipelineConfig {
                command: config.pipeline.command.clone(),
                arg_count: config.pipeline.args.len(),
                timeout_secs: config.pipeline.timeout_secs,
            },
        }
    }
}
