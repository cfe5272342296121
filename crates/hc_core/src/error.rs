use thiserror::Error;

#[derive(Error, Debug)]
pub enum HcError {
    /// Bad selector rule, bad detector constants, duplicate histogram names...
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No input files, unreadable input, unknown container extension
    #[error("Input error: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("Unknown histogram: {name}")]
    UnknownHistogram { name: String },

    #[error("Histogram {name} is {found}, expected {expected}")]
    WrongHistogramKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl HcError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        HcError::Configuration(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        HcError::Input(msg.into())
    }

    /// Errors that abort the run before any event is processed.
    pub fn is_fatal(&self) -> bool {
        match self {
            HcError::Configuration(_) => true,
            HcError::Input(_) => true,
            HcError::Yaml(_) => true,
            HcError::UnknownHistogram { .. } => true,
            HcError::WrongHistogramKind { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, HcError>;
