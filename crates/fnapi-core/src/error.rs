use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("IAM API key not set: export APIKEY before running")]
    MissingApiKey,

    #[error("ibmcloud CLI not found on PATH (install it or pass --ibmcloud-bin)")]
    CliNotInstalled,

    #[error("failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from '{command}': {detail}")]
    UnexpectedOutput { command: String, detail: String },

    #[error("step '{step}' consumes {resource} before any step produces it")]
    PlanOrder { step: String, resource: String },

    #[error("invalid config {path}: {reason}")]
    InvalidConfig { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;
