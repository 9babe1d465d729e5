//! Recoverable input configuration errors
//!
//! None of these abort processing: callers log them and skip the offending
//! token, entry or slot.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// A `key:value` token of a controller description could not be read
    #[error("malformed binding token: {0}")]
    InvalidToken(String),

    /// A controller description key with no logical entry
    #[error("unrecognized controller key: {0}")]
    UnknownKey(String),

    /// A mapping document entry name that is not a logical entry
    #[error("unknown entry name: {0}")]
    UnknownEntry(String),

    #[error("unknown input kind: {0}")]
    UnknownKind(String),

    /// A numeric attribute that does not parse
    #[error("invalid value for attribute '{name}': {value}")]
    InvalidAttribute { name: &'static str, value: String },

    /// A required attribute is absent
    #[error("missing attribute '{0}'")]
    MissingAttribute(&'static str),

    /// A persisted `pad.<slot>` value that is not `<guid>:<name>`
    #[error("malformed slot binding: {0}")]
    InvalidBinding(String),
}
