//! Ownership-tracked node handles
//!
//! An [`OwnedNode`] is the single owner of one engine node and releases it
//! (and everything attached to it) when dropped. Attaching a child moves the
//! `OwnedNode` into the container, so a consumed child can no longer be used
//! or released:
//!
//! ```compile_fail
//! use gbln_bridge::{MemoryEngine, OwnedNode, ScalarValue};
//!
//! let engine = MemoryEngine::new();
//! let mut array = OwnedNode::new_array(&engine).unwrap();
//! let child = OwnedNode::new_scalar(&engine, ScalarValue::Null).unwrap();
//! array.push(child).unwrap();
//! child.release(); // moved into `array`
//! ```
//!
//! Queries return a [`NodeRef`] borrowed from the container. It has no
//! release operation and cannot outlive the owner it came from.

use crate::engine::*;
use crate::error::*;
use crate::translate;
use crate::types::*;
use log::trace;
use std::fmt;
use std::mem::ManuallyDrop;

/// Owned root of a (sub)tree
pub struct OwnedNode<'e, E: Engine + ?Sized> {
    engine: &'e E,
    raw: RawHandle,
}

impl<'e, E: Engine + ?Sized> OwnedNode<'e, E> {
    /// Take ownership of a root handle returned by the engine.
    ///
    /// `raw` must be an unattached root that nothing else will release.
    pub fn from_raw(engine: &'e E, raw: RawHandle) -> Self {
        Self { engine, raw }
    }

    /// Give up ownership without releasing
    pub fn into_raw(self) -> RawHandle {
        let this = ManuallyDrop::new(self);
        this.raw
    }

    pub fn new_scalar(engine: &'e E, value: ScalarValue) -> Result<Self> {
        let ty = value.value_type();
        let raw = translate::handle(engine, engine.new_scalar(value), ty.name())?;
        Ok(Self::from_raw(engine, raw))
    }

    pub fn new_object(engine: &'e E) -> Result<Self> {
        let raw = translate::handle(engine, engine.new_object(), "new_object")?;
        Ok(Self::from_raw(engine, raw))
    }

    pub fn new_array(engine: &'e E) -> Result<Self> {
        let raw = translate::handle(engine, engine.new_array(), "new_array")?;
        Ok(Self::from_raw(engine, raw))
    }

    pub fn engine(&self) -> &'e E {
        self.engine
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Borrowed view, valid while `self` is alive and not mutated
    pub fn view(&self) -> NodeRef<'_, E> {
        NodeRef {
            engine: self.engine,
            raw: self.raw,
        }
    }

    pub fn value_type(&self) -> Result<ValueType> {
        self.view().value_type()
    }

    /// Consume-attach `child` under `key`.
    ///
    /// On failure the child is still owned here and released on return.
    pub fn insert(&mut self, key: &str, child: OwnedNode<'e, E>) -> Result<()> {
        let code = self.engine.object_set(self.raw, key, child.raw);
        translate::check_insert(self.engine, code, key)?;
        trace!("{} consumed by {} under {key:?}", child.raw, self.raw);
        child.into_raw();
        Ok(())
    }

    /// Consume-attach `child` at the end of an array
    pub fn push(&mut self, child: OwnedNode<'e, E>) -> Result<()> {
        let code = self.engine.array_push(self.raw, child.raw);
        translate::check(self.engine, code, "array_push")?;
        trace!("{} consumed by {}", child.raw, self.raw);
        child.into_raw();
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<NodeRef<'_, E>> {
        self.view().get(key)
    }

    pub fn index(&self, index: usize) -> Option<NodeRef<'_, E>> {
        self.view().index(index)
    }

    pub fn len(&self) -> Result<usize> {
        self.view().len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Release now rather than at end of scope
    pub fn release(self) {
        drop(self)
    }
}

impl<E: Engine + ?Sized> Drop for OwnedNode<'_, E> {
    fn drop(&mut self) {
        trace!("release {}", self.raw);
        self.engine.free(self.raw);
    }
}

impl<E: Engine + ?Sized> fmt::Debug for OwnedNode<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedNode").field(&self.raw).finish()
    }
}

/// Non-owning handle obtained by querying a container
pub struct NodeRef<'a, E: Engine + ?Sized> {
    engine: &'a E,
    raw: RawHandle,
}

impl<E: Engine + ?Sized> Clone for NodeRef<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Engine + ?Sized> Copy for NodeRef<'_, E> {}

impl<E: Engine + ?Sized> fmt::Debug for NodeRef<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.raw).finish()
    }
}

impl<'a, E: Engine + ?Sized> NodeRef<'a, E> {
    pub fn engine(&self) -> &'a E {
        self.engine
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    pub fn value_type(&self) -> Result<ValueType> {
        translate::value_type(self.engine, self.raw)
    }

    /// Typed accessor; fails with a type error if the node is not `ty`
    pub fn scalar(&self, ty: ValueType) -> Result<ScalarValue> {
        translate::accessor(self.engine, self.engine.read_scalar(self.raw, ty), ty, self.raw)
    }

    pub fn get(&self, key: &str) -> Option<NodeRef<'a, E>> {
        self.engine.object_get(self.raw, key).map(|raw| NodeRef {
            engine: self.engine,
            raw,
        })
    }

    pub fn index(&self, index: usize) -> Option<NodeRef<'a, E>> {
        self.engine.array_get(self.raw, index).map(|raw| NodeRef {
            engine: self.engine,
            raw,
        })
    }

    /// Object keys in engine order
    pub fn keys(&self) -> Result<Vec<String>> {
        translate::accessor(
            self.engine,
            self.engine.object_keys(self.raw),
            ValueType::Object,
            self.raw,
        )
    }

    /// Entry count of an object or array
    pub fn len(&self) -> Result<usize> {
        match self.value_type()? {
            ValueType::Object => translate::accessor(
                self.engine,
                self.engine.object_len(self.raw),
                ValueType::Object,
                self.raw,
            ),
            ValueType::Array => translate::accessor(
                self.engine,
                self.engine.array_len(self.raw),
                ValueType::Array,
                self.raw,
            ),
            other => Err(GblnError::type_mismatch("object or array", other.name())),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }
}
