//! Error types for extension discovery, resolution and integration.
//!
//! None of these errors are allowed to reach host startup. They exist so each
//! stage can report what went wrong before degrading into its fallback.

/// Result type for extension operations.
pub type Result<T> = std::result::Result<T, ExtensionError>;

/// Extension error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtensionError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Registry returned status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Builder failed: {0}")]
    Builder(String),

    #[error("Failed to load {url}: {message}")]
    ModuleLoad { url: String, message: String },

    #[error("Mount point not found: {0}")]
    MountPointMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtensionError {
    /// Build a module load error for `url`.
    pub fn module_load(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModuleLoad {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Message without the variant prefix, used inside diagnostic panels.
    pub fn detail(&self) -> String {
        match self {
            Self::Builder(msg) | Self::Transport(msg) | Self::Parse(msg) | Self::Config(msg) => {
                msg.clone()
            }
            Self::ModuleLoad { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ExtensionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ExtensionError::Parse(err.to_string())
        } else {
            ExtensionError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExtensionError {
    fn from(err: serde_json::Error) -> Self {
        ExtensionError::Parse(err.to_string())
    }
}
