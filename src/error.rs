use crate::{auth::AuthStatus, persist::TraversalResult};
use thiserror::Error;

/// Broad class of an [`AcquireError`], used to decide how a run reacts to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Directories, browser launch/attach or session cookies could not be set up
    FatalSetup,
    /// The portal rejected the session or the subscription has expired
    Authentication,
    /// The document tree or alphabetical index could not be fetched or parsed
    PlanAcquisition,
    /// A single document failed to fetch, convert or save
    Node,
}

/// Errors that can occur while acquiring a manual
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("No authentication cookies found in the attached browser session")]
    NoSessionCookies,

    #[error("Authentication failed: {0}")]
    Authentication(AuthStatus),

    #[error("Failed to acquire document tree: {0}")]
    PlanAcquisition(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Page operation failed: {0}")]
    PageOperationFailed(String),

    #[error("Traversal aborted at node '{node_id}': {reason}")]
    TraversalAborted { node_id: String, reason: String, partial: TraversalResult },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AcquireError {
    /// Classify the error for run-level handling
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Setup(_)
            | Self::Config(_)
            | Self::LaunchFailed(_)
            | Self::ConnectionFailed(_)
            | Self::NoSessionCookies
            | Self::Io(_)
            | Self::Json(_) => ErrorClass::FatalSetup,
            Self::Authentication(_) => ErrorClass::Authentication,
            Self::PlanAcquisition(_) | Self::Http(_) => ErrorClass::PlanAcquisition,
            Self::NavigationFailed(_) | Self::PageOperationFailed(_) | Self::TraversalAborted { .. } => {
                ErrorClass::Node
            }
        }
    }

    /// Partial traversal result carried by an aborted traversal
    pub fn partial_result(&self) -> Option<&TraversalResult> {
        match self {
            Self::TraversalAborted { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AcquireError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Result type alias for acquisition operations
pub type Result<T> = std::result::Result<T, AcquireError>;
