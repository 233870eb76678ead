//! Error types for acceleration structure setup.

use thiserror::Error;

/// Errors raised while configuring or assembling scenes.
///
/// Building and querying acceleration structures never fails; these cover
/// the inputs handed to them.
#[derive(Error, Debug)]
pub enum AccelError {
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The configuration file is not valid TOML for [`AccelConfig`](crate::AccelConfig).
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Reading the configuration file failed.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// A triangle references a vertex that does not exist.
    #[error("vertex index {index} out of range ({vertex_count} vertices)")]
    VertexIndexOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of vertices in the geometry.
        vertex_count: usize,
    },

    /// No geometry with this id exists in the scene.
    #[error("unknown geometry id {0}")]
    UnknownGeometry(usize),

    /// No instance with this id exists in the scene.
    #[error("unknown instance id {0}")]
    UnknownInstance(usize),

    /// A node field does not fit the packed 8-byte layout.
    #[error("{field} {value} does not fit the packed node layout")]
    PackOverflow {
        /// Which field overflowed.
        field: &'static str,
        /// The value that did not fit.
        value: u32,
    },

    /// An instance transform cannot be inverted.
    #[error("instance transform is not invertible")]
    SingularTransform,
}

/// Result type for acceleration structure operations.
pub type Result<T> = std::result::Result<T, AccelError>;
