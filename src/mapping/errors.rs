use thiserror::Error;

use crate::node_maker::NodeMakerError;
use crate::relational::RelationalError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("Failed to read mapping file: {error}")]
    ReadError { error: String },

    #[error("Failed to parse mapping: {error}")]
    ParseError { error: String },

    #[error("Invalid mapping: {message}")]
    InvalidMapping { message: String },

    #[error("Bridge '{bridge}': {message}")]
    InvalidBridge { bridge: String, message: String },
}

impl MappingError {
    pub fn bridge(bridge: &str, message: impl Into<String>) -> Self {
        MappingError::InvalidBridge {
            bridge: bridge.to_string(),
            message: message.into(),
        }
    }

    pub fn from_relational(bridge: &str, err: RelationalError) -> Self {
        Self::bridge(bridge, err.to_string())
    }

    pub fn from_node_maker(bridge: &str, err: NodeMakerError) -> Self {
        Self::bridge(bridge, err.to_string())
    }
}
