//! Error types for the item model

/// Errors raised while reading labels, statuses or wire documents
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Text does not follow `<FAMILY>[-]<N>_<NAME>`
    #[error("invalid label: '{0}'")]
    InvalidLabel(String),

    /// Unknown family prefix
    #[error("unknown family: '{0}'")]
    UnknownFamily(String),

    /// Unknown status token
    #[error("unknown status: '{0}'")]
    UnknownStatus(String),

    /// Unknown outer section key in a wire document
    #[error("unknown section: '{0}'")]
    UnknownSection(String),

    /// Item stored under a section its family does not belong to
    #[error("label {label} cannot live in section {section}")]
    SectionMismatch { label: String, section: String },

    /// Underlying JSON failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
