//! # Landform Error Types
//!
//! All errors that can occur while building, loading or previewing landforms.
//!
//! The pure evaluation path never produces these: a missing input resolves to
//! the identity element of its grid type instead.

use thiserror::Error;

/// Errors that can occur in the landform engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LandformError {
    /// A node id does not refer to a live node in the graph.
    #[error("node not found: {0}")]
    NodeNotFound(u64),

    /// A node does not declare the requested port.
    #[error("node {node} has no {direction} port named '{port}'")]
    PortNotFound {
        /// The node that was queried.
        node: u64,
        /// The requested port name.
        port: String,
        /// "input" or "output".
        direction: &'static str,
    },

    /// An edge would connect ports that carry different grid types.
    #[error("cannot connect {from} output to {to} input")]
    PortTypeMismatch {
        /// Type carried by the output port.
        from: &'static str,
        /// Type expected by the input port.
        to: &'static str,
    },

    /// An edge would close a loop in the graph.
    #[error("connecting node {from} to node {to} would create a cycle")]
    CycleDetected {
        /// Upstream node of the rejected edge.
        from: u64,
        /// Downstream node of the rejected edge.
        to: u64,
    },

    /// No loaded landform has the given id.
    #[error("landform not found: {0}")]
    LandformNotFound(String),

    /// A landform definition could not be parsed or converted.
    #[error("invalid landform definition {source_name}: {reason}")]
    InvalidDefinition {
        /// File name or id the definition came from.
        source_name: String,
        /// What went wrong.
        reason: String,
    },

    /// Reading or writing definition files failed.
    #[error("i/o failure on {path}: {reason}")]
    Io {
        /// The path involved.
        path: String,
        /// The underlying error, stringified.
        reason: String,
    },

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A preview task reported a failure.
    #[error("preview task for node {node} failed: {reason}")]
    PreviewFailed {
        /// The node the task was computing.
        node: u64,
        /// Why it failed.
        reason: String,
    },

    /// A preview task observed its cancellation flag and gave up.
    #[error("preview task for node {0} was cancelled")]
    PreviewCancelled(u64),
}

impl LandformError {
    /// Wraps an I/O error together with the path it occurred on.
    #[must_use]
    pub fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type for landform operations.
pub type LandformResult<T> = Result<T, LandformError>;
