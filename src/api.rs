//! Engine-facing entry points
//!
//! `Gbln` pairs an engine with a validated config and forwards to the bridge.
//! Every helper that acquires a root releases it before returning, on success
//! and on error alike.

use crate::bridge::{self, HostView};
use crate::config::GblnConfig;
use crate::engine::Engine;
use crate::error::*;
use crate::memory::MemoryEngine;
use crate::node::*;
use crate::translate;
use crate::types::HostValue;
use std::path::Path;

pub struct Gbln<E: Engine = MemoryEngine> {
    engine: E,
    config: GblnConfig,
}

impl Gbln<MemoryEngine> {
    /// Reference engine with default options
    pub fn in_memory() -> Self {
        Self::new(MemoryEngine::new(), GblnConfig::default())
    }
}

impl<E: Engine> Gbln<E> {
    pub fn new(engine: E, config: GblnConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &GblnConfig {
        &self.config
    }

    pub fn encode<H: HostView>(&self, host: &H) -> Result<OwnedNode<'_, E>> {
        bridge::encode(&self.engine, host)
    }

    pub fn decode(&self, node: NodeRef<'_, E>) -> Result<HostValue> {
        bridge::decode(node)
    }

    pub fn parse(&self, text: &str) -> Result<OwnedNode<'_, E>> {
        let raw = translate::outcome(&self.engine, self.engine.parse(text), "parse")?;
        Ok(OwnedNode::from_raw(&self.engine, raw))
    }

    pub fn serialize(&self, node: NodeRef<'_, E>) -> Result<String> {
        let text = self.engine.serialize(node.raw(), &self.config);
        translate::text(&self.engine, text, "serialize")
    }

    pub fn serialize_pretty(&self, node: NodeRef<'_, E>) -> Result<String> {
        let text = self.engine.serialize_pretty(node.raw(), &self.config);
        translate::text(&self.engine, text, "serialize_pretty")
    }

    /// Encode `host`, run `f` on the tree, then release it
    pub fn with_encoded<H, T, F>(&self, host: &H, f: F) -> Result<T>
    where
        H: HostView,
        F: FnOnce(NodeRef<'_, E>) -> Result<T>,
    {
        let root = self.encode(host)?;
        f(root.view())
    }

    /// Parse `text`, run `f` on the tree, then release it
    pub fn with_parsed<T, F>(&self, text: &str, f: F) -> Result<T>
    where
        F: FnOnce(NodeRef<'_, E>) -> Result<T>,
    {
        let root = self.parse(text)?;
        f(root.view())
    }

    pub fn to_string<H: HostView>(&self, host: &H) -> Result<String> {
        self.with_encoded(host, |node| self.serialize(node))
    }

    pub fn to_string_pretty<H: HostView>(&self, host: &H) -> Result<String> {
        self.with_encoded(host, |node| self.serialize_pretty(node))
    }

    pub fn from_str(&self, text: &str) -> Result<HostValue> {
        self.with_parsed(text, bridge::decode)
    }

    pub fn write_file(&self, node: NodeRef<'_, E>, path: impl AsRef<Path>) -> Result<()> {
        let code = self.engine.write_file(node.raw(), path.as_ref(), &self.config);
        translate::check(&self.engine, code, "write_file")
    }

    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<OwnedNode<'_, E>> {
        let result = self.engine.read_file(path.as_ref());
        let raw = translate::outcome(&self.engine, result, "read_file")?;
        Ok(OwnedNode::from_raw(&self.engine, raw))
    }

    /// Encode and write `host` to `path`
    pub fn save<H: HostView>(&self, host: &H, path: impl AsRef<Path>) -> Result<()> {
        self.with_encoded(host, |node| self.write_file(node, path))
    }

    /// Read and decode `path`
    pub fn load(&self, path: impl AsRef<Path>) -> Result<HostValue> {
        let root = self.read_file(path)?;
        bridge::decode(root.view())
    }
}
