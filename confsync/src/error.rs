use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid store root path '{path}': {reason}")]
    InvalidRootPath { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No configuration documents found under {0}")]
    NoDocuments(String),

    #[error("Configuration document is empty: {0}")]
    EmptyDocument(String),

    #[error("Configuration document is a bare scalar: {0}")]
    ScalarDocument(String),

    #[error("Failed to read {path}: {source}")]
    ReadDocument {
        path: String,
        #[source]
        source: std::io::Error
    },

    #[error("Failed to parse {path}: {source}")]
    ParseDocument {
        path: String,
        #[source]
        source: serde_yaml::Error
    },

    #[error("Caller identity lookup failed: {0}")]
    Identity(String),

    #[error("Parameter store read failed: {0}")]
    StoreRead(String),

    #[error("Parameter store write failed for '{name}': {reason}")]
    StoreWrite { name: String, reason: String },

    #[error("Parameter store delete failed: {0}")]
    StoreDelete(String),

    #[error("No deploy target configured for namespace '{0}'")]
    TargetNotConfigured(String)
}

impl SyncError {
    /// True for errors raised before any remote call was made.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidRootPath { .. }
                | Self::Config(_)
                | Self::NoDocuments(_)
                | Self::EmptyDocument(_)
                | Self::ScalarDocument(_)
                | Self::ReadDocument { .. }
                | Self::ParseDocument { .. }
        )
    }
}
