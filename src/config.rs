//! Formatting and compression options handed to the engine
//!
//! A `GblnConfig` is validated when it is built and never changes afterwards.
//! The bridge does not read it; it only forwards it to the engine.

use crate::error::*;
use serde::{Deserialize, Serialize};

pub const MAX_COMPRESSION_LEVEL: u32 = 9;
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
pub const DEFAULT_INDENT: i64 = 2;
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Validated engine options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConfig", into = "RawConfig")]
pub struct GblnConfig {
    mini_mode: bool,
    compress: bool,
    compression_level: u32,
    indent: usize,
    strip_comments: bool,
    max_depth: usize,
}

/// Unvalidated field set, as read from a config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub mini_mode: bool,
    pub compress: bool,
    pub compression_level: u32,
    pub indent: i64,
    pub strip_comments: bool,
    pub max_depth: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            mini_mode: true,
            compress: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            indent: DEFAULT_INDENT,
            strip_comments: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TryFrom<RawConfig> for GblnConfig {
    type Error = GblnError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        if raw.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(GblnError::InvalidConfig {
                field: "compression_level",
                reason: format!("must be 0..={MAX_COMPRESSION_LEVEL}, got {}", raw.compression_level),
            });
        }
        let indent = usize::try_from(raw.indent).map_err(|_| GblnError::InvalidConfig {
            field: "indent",
            reason: format!("must not be negative, got {}", raw.indent),
        })?;
        if raw.max_depth == 0 {
            return Err(GblnError::InvalidConfig {
                field: "max_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(GblnConfig {
            mini_mode: raw.mini_mode,
            compress: raw.compress,
            compression_level: raw.compression_level,
            indent,
            strip_comments: raw.strip_comments,
            max_depth: raw.max_depth,
        })
    }
}

impl From<GblnConfig> for RawConfig {
    fn from(config: GblnConfig) -> Self {
        RawConfig {
            mini_mode: config.mini_mode,
            compress: config.compress,
            compression_level: config.compression_level,
            indent: config.indent as i64,
            strip_comments: config.strip_comments,
            max_depth: config.max_depth,
        }
    }
}

impl Default for GblnConfig {
    fn default() -> Self {
        Self {
            mini_mode: true,
            compress: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            indent: DEFAULT_INDENT as usize,
            strip_comments: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl GblnConfig {
    /// Validate a full option set
    pub fn new(
        mini_mode: bool,
        compress: bool,
        compression_level: u32,
        indent: i64,
        strip_comments: bool,
    ) -> Result<Self> {
        GblnConfig::try_from(RawConfig {
            mini_mode,
            compress,
            compression_level,
            indent,
            strip_comments,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    pub fn builder() -> GblnConfigBuilder {
        GblnConfigBuilder::default()
    }

    /// Compact output with compression, used for files
    pub fn io() -> Self {
        Self {
            compress: true,
            ..Self::default()
        }
    }

    /// Human-readable output, comments kept
    pub fn pretty() -> Self {
        Self {
            mini_mode: false,
            strip_comments: false,
            ..Self::default()
        }
    }

    /// Load and validate options from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;
        GblnConfig::try_from(raw)
    }

    pub fn mini_mode(&self) -> bool {
        self.mini_mode
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn strip_comments(&self) -> bool {
        self.strip_comments
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

/// Step-by-step construction; validation happens in `build`
#[derive(Debug, Clone, Default)]
pub struct GblnConfigBuilder {
    raw: RawConfig,
}

impl GblnConfigBuilder {
    pub fn mini_mode(mut self, on: bool) -> Self {
        self.raw.mini_mode = on;
        self
    }

    pub fn compress(mut self, on: bool) -> Self {
        self.raw.compress = on;
        self
    }

    pub fn compression_level(mut self, level: u32) -> Self {
        self.raw.compression_level = level;
        self
    }

    pub fn indent(mut self, indent: i64) -> Self {
        self.raw.indent = indent;
        self
    }

    pub fn strip_comments(mut self, on: bool) -> Self {
        self.raw.strip_comments = on;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.raw.max_depth = depth;
        self
    }

    pub fn build(self) -> Result<GblnConfig> {
        GblnConfig::try_from(self.raw)
    }
}
