//! Engine result translation
//!
//! Every fallible engine call goes through one of these functions so callers
//! never see raw result codes or null handles.

use crate::engine::*;
use crate::error::*;
use crate::types::*;
use log::debug;

/// Turn a non-`Ok` code into an error; `Ok` passes through
pub fn check<E: Engine + ?Sized>(engine: &E, code: ResultCode, operation: &str) -> Result<()> {
    if code.is_ok() {
        return Ok(());
    }
    Err(translate_code(engine, code, operation))
}

/// Like `check`, but names the key on `DuplicateKey`
pub fn check_insert<E: Engine + ?Sized>(engine: &E, code: ResultCode, key: &str) -> Result<()> {
    if code == ResultCode::DuplicateKey {
        debug!("object_set: duplicate key {key:?}");
        return Err(GblnError::DuplicateKey { key: key.to_string() });
    }
    check(engine, code, "object_set")
}

/// A null handle from a constructor or lookup
pub fn handle<E: Engine + ?Sized>(
    engine: &E,
    raw: Option<RawHandle>,
    operation: &str,
) -> Result<RawHandle> {
    raw.ok_or_else(|| {
        let err = GblnError::null_pointer(operation);
        debug!("{operation}: null handle ({})", last_message(engine, operation));
        err
    })
}

/// Outcome of `parse` / `read_file`
pub fn outcome<E: Engine + ?Sized>(
    engine: &E,
    result: std::result::Result<RawHandle, ResultCode>,
    operation: &str,
) -> Result<RawHandle> {
    result.map_err(|code| translate_code(engine, code, operation))
}

/// A typed accessor that reported failure
pub fn accessor<T, E: Engine + ?Sized>(
    engine: &E,
    value: Option<T>,
    expected: ValueType,
    node: RawHandle,
) -> Result<T> {
    value.ok_or_else(|| {
        let tag = engine.value_type(node);
        let got = ValueType::from_tag(tag)
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| format!("tag {tag}"));
        debug!("accessor for {expected} failed on {node}: node is {got}");
        GblnError::type_mismatch(expected.name(), got)
    })
}

/// Serialised text, `None` meaning failure
pub fn text<E: Engine + ?Sized>(engine: &E, text: Option<String>, operation: &str) -> Result<String> {
    text.ok_or_else(|| {
        let message = last_message(engine, operation);
        debug!("{operation}: {message}");
        GblnError::Serialisation { message }
    })
}

/// Decode a raw type tag
pub fn value_type<E: Engine + ?Sized>(engine: &E, node: RawHandle) -> Result<ValueType> {
    let tag = engine.value_type(node);
    ValueType::from_tag(tag).ok_or_else(|| {
        debug!("unrecognised type tag {tag} on {node}");
        GblnError::type_mismatch("known type tag", format!("tag {tag}"))
    })
}

fn last_message<E: Engine + ?Sized>(engine: &E, operation: &str) -> String {
    engine
        .last_error_message()
        .unwrap_or_else(|| format!("{operation} failed"))
}

fn translate_code<E: Engine + ?Sized>(engine: &E, code: ResultCode, operation: &str) -> GblnError {
    let message = last_message(engine, operation);
    debug!("{operation}: engine reported {code:?}: {message}");
    match code {
        c if c.is_parse_failure() => GblnError::Parse { message },
        ResultCode::TypeMismatch => GblnError::type_mismatch(format!("operand of {operation}"), message),
        ResultCode::DuplicateKey => GblnError::DuplicateKey { key: message },
        ResultCode::NullPointer => GblnError::null_pointer(operation),
        ResultCode::Io => GblnError::Io { message },
        ResultCode::Serialise => GblnError::Serialisation { message },
        _ => GblnError::Serialisation {
            message: format!("{operation}: unexpected result {code:?}"),
        },
    }
}
