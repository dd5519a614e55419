//! Error types for jacket geometry construction

use thiserror::Error;

/// Main error type for jacket geometry operations.
///
/// Every variant is fatal for the build that raised it. Recoverable design
/// conflicts are not errors; they are reported through [`crate::jacket::Jacket::warnings`].
#[derive(Error, Debug)]
pub enum JacketError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Geometry inconsistency at {context}: solved x = {x} (expected 0)")]
    GeometryInconsistency {
        /// Which joints were being solved
        context: String,
        /// The offending x coordinate
        x: f64,
    },

    #[error("Cone on '{member}' needs {required:.1} mm but its longest segment is {available:.1} mm")]
    ConeTooLong {
        member: String,
        required: f64,
        available: f64,
    },

    #[error("Joint '{0}' not found in jacket")]
    JointNotFound(String),

    #[error("Member '{0}' not found in jacket")]
    MemberNotFound(String),

    #[error("Duplicate name '{0}' already exists")]
    DuplicateName(String),

    #[error("Joint '{0}' has no local geometry - run create_joint() first")]
    JointNotCreated(String),

    #[error("'{0}' is already mirrored")]
    AlreadyMirrored(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for jacket geometry operations
pub type JacketResult<T> = Result<T, JacketError>;
