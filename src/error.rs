use thiserror::Error;

/// Rejections raised by the dashboard core. Every variant means the requested
/// action did not happen and no state was changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("Unknown tracked model: {0}")]
    UnknownModel(String),

    #[error("Unknown provider config: {0}")]
    UnknownProvider(String),

    #[error("Unknown monitoring prompt: {0}")]
    UnknownPrompt(String),

    #[error("Model '{model}' is not offered by provider {provider}")]
    ModelNotOffered { provider: String, model: String },

    #[error("No model selected")]
    NoModelSelected,

    #[error("A response is already streaming")]
    Busy,

    #[error("Response source failed: {0}")]
    ResponseFailed(String),

    #[error("Invalid value for {setting}: {value}")]
    InvalidSetting { setting: &'static str, value: String },
}

pub type DashboardResult<T> = Result<T, DashboardError>;
