// error.rs - error kinds shared by every core component
//
// Every core operation (dictionary load, AVP construction, message encode)
// surfaces one of these variants rather than swallowing failures internally.

use std::path::PathBuf;

use thiserror::Error;

/// Library-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the dictionary loader, wire-type codec, and message
/// assembler.
#[derive(Debug, Error)]
pub enum Error {
    /// A dictionary file could not be read.
    #[error("cannot read dictionary file {path}: {source}")]
    DictionaryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `VALUE` referenced an attribute name the dictionary never defines.
    #[error("dictionary VALUE references unknown attribute {0:?}")]
    UnknownDictionaryAttribute(String),

    /// `BEGIN-VENDOR` referenced a vendor name that was never registered.
    #[error("dictionary BEGIN-VENDOR references unknown vendor {0:?}")]
    UnknownVendor(String),

    /// AVP construction referenced a name absent from the catalog.
    #[error("unknown attribute {0:?}")]
    UnknownAttribute(String),

    /// The dictionary declares a wire type the codec does not implement.
    #[error("attribute {attr:?} declares unimplemented type {type_tag:?}")]
    UnknownType { attr: String, type_tag: String },

    /// The codec rejected a textual value.
    #[error("cannot parse {type_tag:?} value {literal:?}: {reason}")]
    ParseError {
        type_tag: &'static str,
        literal: String,
        reason: String,
    },

    /// An enumerated-value constraint was violated.
    #[error("{attr:?} - value {value:?} is not an allowed enumerated value")]
    DisallowedValue { attr: String, value: String },

    /// An AVP or message length would exceed its wire-encoded width.
    #[error("{what} length {len} exceeds the maximum of {max}")]
    LengthOverflow {
        what: &'static str,
        len: usize,
        max: usize,
    },

    /// UDP transmission failed.
    #[error("failed to send packet to {dest}: {source}")]
    SendError {
        dest: String,
        #[source]
        source: std::io::Error,
    },
}
