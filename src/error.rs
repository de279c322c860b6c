pub type WavelayResult<T> = Result<T, WavelayError>;

#[derive(thiserror::Error, Debug)]
pub enum WavelayError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("host unavailable: {0}")]
    HostUnavailable(String),

    #[error("missing mount target: {0}")]
    MissingMountTarget(String),

    #[error("layer load failure for '{source_label}': {reason}")]
    LayerLoadFailure { source_label: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WavelayError {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn host_unavailable(msg: impl Into<String>) -> Self {
        Self::HostUnavailable(msg.into())
    }

    pub fn missing_mount_target(msg: impl Into<String>) -> Self {
        Self::MissingMountTarget(msg.into())
    }

    pub fn layer_load(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LayerLoadFailure {
            source_label: source.into(),
            reason: reason.into(),
        }
    }
}
