//! In-process reference engine
//!
//! `MemoryEngine` implements the `Engine` contract over an arena of nodes
//! behind a mutex. Text is carried as JSON; exact widths that parsing would
//! not re-select travel as tagged wrappers, and parsed repeated keys follow
//! the engine's `KeyPolicy`.
//! It tracks every live node so leaks and double releases are observable.

use crate::carrier::*;
use crate::config::GblnConfig;
use crate::engine::*;
use crate::selector::*;
use crate::types::*;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What `object_set` does when the key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Report `DuplicateKey` and leave the child with the caller
    #[default]
    Reject,
    /// Release the earlier value and store the new one in its place
    Overwrite,
}

enum Slot {
    Scalar(ScalarValue),
    Object(IndexMap<String, u64>),
    Array(Vec<u64>),
}

struct Entry {
    slot: Slot,
    parent: Option<u64>,
}

#[derive(Default)]
struct Arena {
    nodes: HashMap<u64, Entry>,
    next_id: u64,
    last_error: Option<String>,
}

type Failure = (ResultCode, String);

impl Arena {
    fn alloc(&mut self, slot: Slot) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.nodes.insert(id, Entry { slot, parent: None });
        id
    }

    fn fail(&mut self, code: ResultCode, message: impl Into<String>) -> ResultCode {
        let message = message.into();
        debug!("engine failure {code:?}: {message}");
        self.last_error = Some(message);
        code
    }

    fn slot(&self, id: u64) -> Option<&Slot> {
        self.nodes.get(&id).map(|e| &e.slot)
    }

    fn free_tree(&mut self, root: u64) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.nodes.remove(&id) {
                match entry.slot {
                    Slot::Object(map) => stack.extend(map.values()),
                    Slot::Array(items) => stack.extend(items),
                    Slot::Scalar(_) => {}
                }
            }
        }
    }

    /// True if `ancestor` is `node` or contains it
    fn contains(&self, ancestor: u64, node: u64) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|e| e.parent);
        }
        false
    }

    fn attach_check(&mut self, container: u64, child: u64) -> Result<(), ResultCode> {
        let Some(entry) = self.nodes.get(&child) else {
            return Err(self.fail(ResultCode::NullPointer, format!("invalid child handle #{child}")));
        };
        if let Some(owner) = entry.parent {
            return Err(self.fail(
                ResultCode::NullPointer,
                format!("child #{child} is already owned by #{owner}"),
            ));
        }
        if !self.nodes.contains_key(&container) {
            return Err(self.fail(
                ResultCode::NullPointer,
                format!("invalid container handle #{container}"),
            ));
        }
        if self.contains(child, container) {
            return Err(self.fail(
                ResultCode::TypeMismatch,
                format!("attaching #{child} to #{container} would create a cycle"),
            ));
        }
        Ok(())
    }

    fn build(&mut self, doc: &Doc, policy: KeyPolicy) -> Result<u64, Failure> {
        if let Some((tag, value)) = doc.as_tagged() {
            return self.build_tagged(tag, value, policy);
        }
        let scalar = match doc {
            Doc::Null => ScalarValue::Null,
            Doc::Bool(b) => ScalarValue::Bool(*b),
            Doc::Number(n) => number_scalar(n)
                .ok_or_else(|| (ResultCode::IntOutOfRange, format!("unrepresentable number {n}")))?,
            Doc::Str(s) => {
                let width = select_string_width(s)
                    .map_err(|e| (ResultCode::StringTooLong, e.to_string()))?;
                ScalarValue::Str { value: s.clone(), width }
            }
            Doc::Seq(items) => return self.build_array(items, policy),
            Doc::Map(entries) => return self.build_object(entries, policy),
        };
        Ok(self.alloc(Slot::Scalar(scalar)))
    }

    /// Rebuild a `{"$t": tag, "v": value}` wrapper at its exact type
    fn build_tagged(&mut self, tag: &str, value: &Doc, policy: KeyPolicy) -> Result<u64, Failure> {
        let mismatch = || {
            (
                ResultCode::TypeMismatch,
                format!("type hint {tag} does not accept {}", value.kind()),
            )
        };
        let scalar = match (parse_tag(tag), value) {
            (None, _) => return Err((ResultCode::InvalidTypeHint, format!("unknown type hint {tag:?}"))),
            (Some(Tag::Str(width)), Doc::Str(s)) => {
                check_string_fits(s, width).map_err(|e| (ResultCode::StringTooLong, e.to_string()))?;
                ScalarValue::Str { value: s.clone(), width }
            }
            (Some(Tag::Type(ValueType::Str)), Doc::Str(_)) => return self.build(value, policy),
            (Some(Tag::Type(ty)), Doc::Number(n)) if ty.is_integer() => {
                let wide = n
                    .as_i64()
                    .map(i128::from)
                    .or_else(|| n.as_u64().map(i128::from))
                    .ok_or_else(mismatch)?;
                check_int_fits(wide, ty).map_err(|e| (ResultCode::IntOutOfRange, e.to_string()))?
            }
            (Some(Tag::Type(ValueType::F32)), Doc::Number(n)) => {
                ScalarValue::F32(n.as_f64().ok_or_else(mismatch)? as f32)
            }
            (Some(Tag::Type(ValueType::F64)), Doc::Number(n)) => {
                ScalarValue::F64(n.as_f64().ok_or_else(mismatch)?)
            }
            (Some(Tag::Type(ValueType::Bool)), Doc::Bool(b)) => ScalarValue::Bool(*b),
            (Some(Tag::Type(ValueType::Null)), Doc::Null) => ScalarValue::Null,
            (Some(Tag::Type(ValueType::Array)), Doc::Seq(items)) => return self.build_array(items, policy),
            // Escaped object; its own entries are not read as a wrapper
            (Some(Tag::Type(ValueType::Object)), Doc::Map(entries)) => {
                return self.build_object(entries, policy);
            }
            _ => return Err(mismatch()),
        };
        Ok(self.alloc(Slot::Scalar(scalar)))
    }

    fn build_array(&mut self, items: &[Doc], policy: KeyPolicy) -> Result<u64, Failure> {
        let mut children = Vec::with_capacity(items.len());
        for item in items {
            match self.build(item, policy) {
                Ok(id) => children.push(id),
                Err(failure) => {
                    self.free_all(children);
                    return Err(failure);
                }
            }
        }
        let id = self.alloc(Slot::Array(children.clone()));
        self.adopt(id, &children);
        Ok(id)
    }

    /// Build entries in order; a repeated key follows `policy`
    fn build_object(&mut self, entries: &[(String, Doc)], policy: KeyPolicy) -> Result<u64, Failure> {
        let mut map: IndexMap<String, u64> = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            let child = match self.build(value, policy) {
                Ok(id) => id,
                Err(failure) => {
                    self.free_all(map.into_values());
                    return Err(failure);
                }
            };
            if let Some(previous) = map.get(key).copied() {
                match policy {
                    KeyPolicy::Reject => {
                        self.free_tree(child);
                        self.free_all(map.into_values());
                        return Err((ResultCode::DuplicateKey, format!("duplicate key {key:?}")));
                    }
                    KeyPolicy::Overwrite => {
                        trace!("overwriting {key:?}, releasing #{previous}");
                        self.free_tree(previous);
                    }
                }
            }
            map.insert(key.clone(), child);
        }
        let children: Vec<u64> = map.values().copied().collect();
        let id = self.alloc(Slot::Object(map));
        self.adopt(id, &children);
        Ok(id)
    }

    fn free_all(&mut self, roots: impl IntoIterator<Item = u64>) {
        for id in roots {
            self.free_tree(id);
        }
    }

    fn adopt(&mut self, parent: u64, children: &[u64]) {
        for child in children {
            if let Some(entry) = self.nodes.get_mut(child) {
                entry.parent = Some(parent);
            }
        }
    }

    fn to_json(&self, id: u64, depth: usize, max_depth: usize) -> Result<JsonValue, String> {
        let slot = self.slot(id).ok_or_else(|| format!("invalid handle #{id}"))?;
        match slot {
            Slot::Scalar(scalar) => scalar_json(scalar),
            Slot::Object(map) => {
                check_depth(depth, max_depth)?;
                let mut out = Map::new();
                for (key, child) in map {
                    out.insert(key.clone(), self.to_json(*child, depth + 1, max_depth)?);
                }
                if looks_tagged(map.keys()) {
                    return Ok(wrap(ValueType::Object.name().to_string(), JsonValue::Object(out)));
                }
                Ok(JsonValue::Object(out))
            }
            Slot::Array(items) => {
                check_depth(depth, max_depth)?;
                items
                    .iter()
                    .map(|child| self.to_json(*child, depth + 1, max_depth))
                    .collect::<Result<Vec<_>, _>>()
                    .map(JsonValue::Array)
            }
        }
    }
}

fn check_depth(depth: usize, max_depth: usize) -> Result<(), String> {
    if depth > max_depth {
        return Err(format!("nesting depth {depth} exceeds max_depth {max_depth}"));
    }
    Ok(())
}

/// Bare JSON when parsing would re-select the same scalar, a tagged wrapper otherwise
fn scalar_json(scalar: &ScalarValue) -> Result<JsonValue, String> {
    let bare = match scalar {
        ScalarValue::I8(v) => JsonValue::from(*v),
        ScalarValue::I16(v) => JsonValue::from(*v),
        ScalarValue::I32(v) => JsonValue::from(*v),
        ScalarValue::I64(v) => JsonValue::from(*v),
        ScalarValue::U8(v) => JsonValue::from(*v),
        ScalarValue::U16(v) => JsonValue::from(*v),
        ScalarValue::U32(v) => JsonValue::from(*v),
        ScalarValue::U64(v) => JsonValue::from(*v),
        // Shortest f32 text, so 0.1f32 prints as 0.1
        ScalarValue::F32(v) => float_json(v.to_string().parse::<f64>().unwrap_or(f64::from(*v)))?,
        ScalarValue::F64(v) => float_json(*v)?,
        ScalarValue::Str { value, .. } => JsonValue::String(value.clone()),
        ScalarValue::Bool(b) => JsonValue::Bool(*b),
        ScalarValue::Null => JsonValue::Null,
    };
    if reselect(&bare).as_ref() == Some(scalar) {
        Ok(bare)
    } else {
        Ok(tagged(scalar, bare))
    }
}

fn float_json(v: f64) -> Result<JsonValue, String> {
    Number::from_f64(v)
        .map(JsonValue::Number)
        .ok_or_else(|| format!("cannot serialise non-finite float {v}"))
}

fn pretty_json(json: &JsonValue, indent: usize) -> Result<String, String> {
    let indent = vec![b' '; indent];
    let mut buf = Vec::new();
    {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        json.serialize(&mut ser).map_err(|e| e.to_string())?;
    }
    String::from_utf8(buf).map_err(|e| e.to_string())
}

fn parse_failure(err: &serde_json::Error) -> Failure {
    use serde_json::error::Category;
    let code = match err.classify() {
        Category::Eof => ResultCode::UnexpectedEof,
        Category::Syntax => ResultCode::InvalidSyntax,
        Category::Data => ResultCode::UnexpectedToken,
        Category::Io => ResultCode::Io,
    };
    (code, err.to_string())
}

/// Reference implementation of the engine contract
#[derive(Default)]
pub struct MemoryEngine {
    arena: Mutex<Arena>,
    key_policy: KeyPolicy,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_policy(key_policy: KeyPolicy) -> Self {
        Self {
            key_policy,
            ..Self::default()
        }
    }

    pub fn key_policy(&self) -> KeyPolicy {
        self.key_policy
    }

    /// Nodes allocated and not yet released
    pub fn live_nodes(&self) -> usize {
        self.lock().nodes.len()
    }

    fn lock(&self) -> MutexGuard<'_, Arena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, node: RawHandle, config: &GblnConfig, pretty: bool) -> Option<String> {
        let mut arena = self.lock();
        let json = match arena.to_json(node.id(), 1, config.max_depth()) {
            Ok(json) => json,
            Err(message) => {
                arena.fail(ResultCode::Serialise, message);
                return None;
            }
        };
        let rendered = if pretty {
            pretty_json(&json, config.indent())
        } else {
            serde_json::to_string(&json).map_err(|e| e.to_string())
        };
        match rendered {
            Ok(text) => Some(text),
            Err(message) => {
                arena.fail(ResultCode::Serialise, message);
                None
            }
        }
    }
}

impl Engine for MemoryEngine {
    fn parse(&self, text: &str) -> Result<RawHandle, ResultCode> {
        let mut arena = self.lock();
        let doc: Doc = match serde_json::from_str(text) {
            Ok(doc) => doc,
            Err(err) => {
                let (code, message) = parse_failure(&err);
                return Err(arena.fail(code, message));
            }
        };
        match arena.build(&doc, self.key_policy) {
            Ok(id) => RawHandle::from_id(id).ok_or(ResultCode::NullPointer),
            Err((code, message)) => Err(arena.fail(code, message)),
        }
    }

    fn serialize(&self, node: RawHandle, config: &GblnConfig) -> Option<String> {
        self.render(node, config, !config.mini_mode())
    }

    fn serialize_pretty(&self, node: RawHandle, config: &GblnConfig) -> Option<String> {
        self.render(node, config, true)
    }

    fn value_type(&self, node: RawHandle) -> i32 {
        match self.lock().slot(node.id()) {
            Some(Slot::Scalar(s)) => s.value_type().tag(),
            Some(Slot::Object(_)) => ValueType::Object.tag(),
            Some(Slot::Array(_)) => ValueType::Array.tag(),
            None => -1,
        }
    }

    fn read_scalar(&self, node: RawHandle, ty: ValueType) -> Option<ScalarValue> {
        match self.lock().slot(node.id()) {
            Some(Slot::Scalar(s)) if s.value_type() == ty => Some(s.clone()),
            _ => None,
        }
    }

    fn object_get(&self, object: RawHandle, key: &str) -> Option<RawHandle> {
        match self.lock().slot(object.id()) {
            Some(Slot::Object(map)) => map.get(key).copied().and_then(RawHandle::from_id),
            _ => None,
        }
    }

    fn object_set(&self, object: RawHandle, key: &str, child: RawHandle) -> ResultCode {
        let mut arena = self.lock();
        let (object_id, child_id) = (object.id(), child.id());
        if let Err(code) = arena.attach_check(object_id, child_id) {
            return code;
        }
        let existing = match arena.slot(object_id) {
            Some(Slot::Object(map)) => map.get(key).copied(),
            _ => return arena.fail(ResultCode::TypeMismatch, format!("#{object_id} is not an object")),
        };
        if let Some(previous) = existing {
            match self.key_policy {
                KeyPolicy::Reject => {
                    return arena.fail(ResultCode::DuplicateKey, format!("duplicate key {key:?}"));
                }
                KeyPolicy::Overwrite => {
                    trace!("overwriting {key:?}, releasing #{previous}");
                    arena.free_tree(previous);
                }
            }
        }
        if let Some(Entry { slot: Slot::Object(map), .. }) = arena.nodes.get_mut(&object_id) {
            map.insert(key.to_string(), child_id);
        }
        arena.adopt(object_id, &[child_id]);
        ResultCode::Ok
    }

    fn object_len(&self, object: RawHandle) -> Option<usize> {
        match self.lock().slot(object.id()) {
            Some(Slot::Object(map)) => Some(map.len()),
            _ => None,
        }
    }

    fn object_keys(&self, object: RawHandle) -> Option<Vec<String>> {
        match self.lock().slot(object.id()) {
            Some(Slot::Object(map)) => Some(map.keys().cloned().collect()),
            _ => None,
        }
    }

    fn array_get(&self, array: RawHandle, index: usize) -> Option<RawHandle> {
        match self.lock().slot(array.id()) {
            Some(Slot::Array(items)) => items.get(index).copied().and_then(RawHandle::from_id),
            _ => None,
        }
    }

    fn array_push(&self, array: RawHandle, child: RawHandle) -> ResultCode {
        let mut arena = self.lock();
        let (array_id, child_id) = (array.id(), child.id());
        if let Err(code) = arena.attach_check(array_id, child_id) {
            return code;
        }
        match arena.nodes.get_mut(&array_id) {
            Some(Entry { slot: Slot::Array(items), .. }) => items.push(child_id),
            _ => return arena.fail(ResultCode::TypeMismatch, format!("#{array_id} is not an array")),
        }
        arena.adopt(array_id, &[child_id]);
        ResultCode::Ok
    }

    fn array_len(&self, array: RawHandle) -> Option<usize> {
        match self.lock().slot(array.id()) {
            Some(Slot::Array(items)) => Some(items.len()),
            _ => None,
        }
    }

    fn new_scalar(&self, value: ScalarValue) -> Option<RawHandle> {
        let mut arena = self.lock();
        if let ScalarValue::Str { value: s, width } = &value {
            if let Err(err) = check_string_fits(s, *width) {
                arena.fail(ResultCode::StringTooLong, err.to_string());
                return None;
            }
        }
        RawHandle::from_id(arena.alloc(Slot::Scalar(value)))
    }

    fn new_object(&self) -> Option<RawHandle> {
        RawHandle::from_id(self.lock().alloc(Slot::Object(IndexMap::new())))
    }

    fn new_array(&self) -> Option<RawHandle> {
        RawHandle::from_id(self.lock().alloc(Slot::Array(Vec::new())))
    }

    /// Releasing an attached node or releasing twice is a caller bug and panics.
    fn free(&self, node: RawHandle) {
        let mut arena = self.lock();
        match arena.nodes.get(&node.id()).map(|e| e.parent) {
            None => {
                drop(arena);
                panic!("release of unknown or already released node {node}");
            }
            Some(Some(owner)) => {
                drop(arena);
                panic!("release of node {node} owned by container #{owner}");
            }
            Some(None) => {}
        }
        trace!("free {node}");
        arena.free_tree(node.id());
    }

    fn last_error_message(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    fn read_file(&self, path: &Path) -> Result<RawHandle, ResultCode> {
        match fs::read_to_string(path) {
            Ok(text) => self.parse(&text),
            Err(err) => Err(self
                .lock()
                .fail(ResultCode::Io, format!("{}: {err}", path.display()))),
        }
    }

    fn write_file(&self, node: RawHandle, path: &Path, config: &GblnConfig) -> ResultCode {
        if config.compress() {
            debug!(
                "compression level {} requested; the in-memory engine writes plain text",
                config.compression_level()
            );
        }
        let Some(text) = self.serialize(node, config) else {
            return ResultCode::Serialise;
        };
        match fs::write(path, text) {
            Ok(()) => ResultCode::Ok,
            Err(err) => self
                .lock()
                .fail(ResultCode::Io, format!("{}: {err}", path.display())),
        }
    }
}
