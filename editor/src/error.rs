//! Error types for gateway calls and editor operations

/// Failure of a remote content operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(String),

    /// 401/403 from the API. Surfaced to the user as a login failure.
    #[error("Not logged in: that domain/password didn't work")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("HTTP error: {status} ({message})")]
    Status { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),
}

/// Failure of an editor session operation.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("No page is selected")]
    NoSelection,

    #[error("No {0} dialog is open")]
    NoDialog(&'static str),

    #[error("Editor session is not mounted")]
    Unmounted,
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
