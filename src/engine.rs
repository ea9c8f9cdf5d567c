//! Contract of the external serialisation engine
//!
//! The engine owns the node storage and hands out opaque handles. Raw handles
//! carry no ownership information; `OwnedNode` and `NodeRef` add that on top.

use crate::config::GblnConfig;
use crate::types::*;
use std::fmt;
use std::num::NonZeroU64;
use std::path::Path;

/// Opaque, non-null engine handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonZeroU64);

impl RawHandle {
    /// A zero id is the null handle and yields `None`
    pub fn from_id(id: u64) -> Option<RawHandle> {
        NonZeroU64::new(id).map(RawHandle)
    }

    pub fn id(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result codes reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResultCode {
    Ok = 0,
    UnexpectedChar = 1,
    UnterminatedString = 2,
    UnexpectedToken = 3,
    UnexpectedEof = 4,
    InvalidSyntax = 5,
    IntOutOfRange = 6,
    StringTooLong = 7,
    TypeMismatch = 8,
    InvalidTypeHint = 9,
    DuplicateKey = 10,
    NullPointer = 11,
    Io = 12,
    Serialise = 13,
}

impl ResultCode {
    pub fn is_ok(self) -> bool {
        self == ResultCode::Ok
    }

    /// Codes produced while reading text
    pub fn is_parse_failure(self) -> bool {
        matches!(
            self,
            ResultCode::UnexpectedChar
                | ResultCode::UnterminatedString
                | ResultCode::UnexpectedToken
                | ResultCode::UnexpectedEof
                | ResultCode::InvalidSyntax
                | ResultCode::IntOutOfRange
                | ResultCode::StringTooLong
                | ResultCode::InvalidTypeHint
        )
    }
}

/// Native boundary of a GBLN engine.
///
/// Ownership rules every implementation follows:
/// - `parse`, `read_file`, `new_*` return a root the caller owns;
/// - `object_set` / `array_push` consume `child` only when they return
///   `ResultCode::Ok`; on any other code the caller still owns it;
/// - `object_get` / `array_get` return handles borrowed from the container;
/// - `free` is called exactly once per root and cascades to children.
pub trait Engine {
    fn parse(&self, text: &str) -> Result<RawHandle, ResultCode>;

    /// Serialise using `config`; `None` signals failure
    fn serialize(&self, node: RawHandle, config: &GblnConfig) -> Option<String>;

    /// Serialise with indentation regardless of `config.mini_mode()`
    fn serialize_pretty(&self, node: RawHandle, config: &GblnConfig) -> Option<String>;

    /// Raw type tag, see `ValueType::from_tag`
    fn value_type(&self, node: RawHandle) -> i32;

    /// Typed accessor; `None` when `node` is not of type `ty`
    fn read_scalar(&self, node: RawHandle, ty: ValueType) -> Option<ScalarValue>;

    fn object_get(&self, object: RawHandle, key: &str) -> Option<RawHandle>;
    fn object_set(&self, object: RawHandle, key: &str, child: RawHandle) -> ResultCode;
    fn object_len(&self, object: RawHandle) -> Option<usize>;
    /// Keys in insertion order
    fn object_keys(&self, object: RawHandle) -> Option<Vec<String>>;

    fn array_get(&self, array: RawHandle, index: usize) -> Option<RawHandle>;
    fn array_push(&self, array: RawHandle, child: RawHandle) -> ResultCode;
    fn array_len(&self, array: RawHandle) -> Option<usize>;

    fn new_scalar(&self, value: ScalarValue) -> Option<RawHandle>;
    fn new_object(&self) -> Option<RawHandle>;
    fn new_array(&self) -> Option<RawHandle>;

    /// Release a root and everything it owns
    fn free(&self, node: RawHandle);

    fn last_error_message(&self) -> Option<String>;

    fn read_file(&self, path: &Path) -> Result<RawHandle, ResultCode>;
    fn write_file(&self, node: RawHandle, path: &Path, config: &GblnConfig) -> ResultCode;
}
