use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug)]
pub enum ModelError {
    InvalidUser(String),
    InvalidRole(u8),
    InvalidUrl(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidUser(msg) => write!(f, "invalid user: {msg}"),
            ModelError::InvalidRole(raw) => write!(f, "invalid role id: {raw}"),
            ModelError::InvalidUrl(msg) => write!(f, "invalid url: {msg}"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
