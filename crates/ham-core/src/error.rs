use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("server '{0}' is already running")]
    AlreadyActive(String),

    #[error("environment '{environment}' still has active servers: {servers}")]
    StillActive {
        environment: String,
        servers: String,
    },

    #[error("blueprint created no servers for environment '{0}'")]
    EmptyEnvironment(String),

    #[error("{0}")]
    Lookup(String),

    #[error("project already exists: {}", .0.display())]
    ProjectExists(PathBuf),

    #[error("environment '{0}' already exists")]
    EnvironmentExists(String),

    #[error("server '{0}' already exists")]
    ServerExists(String),

    #[error("invalid name '{0}': names must be non-empty, not start with '.' and not contain '/'")]
    InvalidName(String),

    #[error("unknown server attribute '{0}' (boot parameters: image_id, flavor_id, disk_config)")]
    UnknownAttribute(String),

    #[error("unknown blueprint '{key}' (available: {available})")]
    UnknownBlueprint { key: String, available: String },

    #[error("invalid blueprint arguments: {0}")]
    BlueprintArgs(String),

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("timed out after {waited_secs}s waiting for: {pending}")]
    WaitTimeout { waited_secs: u64, pending: String },

    #[error(transparent)]
    Gateway(#[from] ham_cloud::GatewayError),

    #[error("config error: {0}")]
    Config(#[from] ham_config::ConfigError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
