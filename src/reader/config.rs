//! Decoder configuration.

use std::str::FromStr;

use crate::error::ConfigError;

/// Default maximum nesting depth of records, arrays, maps and unions.
///
/// Decoding to this depth and rendering the result as JSON fits in a 2 MiB
/// thread stack, the size Rust gives spawned threads by default.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Hard ceiling on the nesting depth; larger configured values are clamped.
///
/// Decoding to this depth fits in an 8 MiB stack, the usual size of a
/// process main thread.
pub const MAX_DEPTH_CEILING: usize = 1024;

/// Default cap on items whose schema encodes in zero bytes.
pub const DEFAULT_MAX_ZERO_WIDTH_ITEMS: usize = 1 << 20;

/// How a payload's end is checked against the decoded value's end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// The payload holds exactly one value; leftover bytes are an error.
    #[default]
    Single,
    /// Leftover bytes after the value are ignored.
    AllowTrailing,
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Framing::Single),
            "allow-trailing" | "allow_trailing" => Ok(Framing::AllowTrailing),
            other => Err(format!(
                "expected 'single' or 'allow-trailing', found '{}'",
                other
            )),
        }
    }
}

/// Configuration for decoding one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum nesting depth (default: 256).
    pub max_depth: usize,
    /// Maximum zero-width items per payload (default: 1 << 20).
    pub max_zero_width_items: usize,
    /// Check a sized block's declared byte size against what its items
    /// consumed (default: true).
    pub validate_block_sizes: bool,
    /// Payload framing (default: single value).
    pub framing: Framing,
    /// Reject schema names that break the Avro naming rules (default: false).
    pub strict_schema: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_zero_width_items: DEFAULT_MAX_ZERO_WIDTH_ITEMS,
            validate_block_sizes: true,
            framing: Framing::Single,
            strict_schema: false,
        }
    }
}

impl DecoderConfig {
    pub const ENV_MAX_DEPTH: &'static str = "AVRO_UDF_MAX_DEPTH";
    pub const ENV_MAX_ZERO_WIDTH_ITEMS: &'static str = "AVRO_UDF_MAX_ZERO_WIDTH_ITEMS";
    pub const ENV_VALIDATE_BLOCK_SIZES: &'static str = "AVRO_UDF_VALIDATE_BLOCK_SIZES";
    pub const ENV_FRAMING: &'static str = "AVRO_UDF_FRAMING";
    pub const ENV_STRICT_SCHEMA: &'static str = "AVRO_UDF_STRICT_SCHEMA";

    /// Create a new DecoderConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum nesting depth, clamped to [`MAX_DEPTH_CEILING`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.min(MAX_DEPTH_CEILING);
        self
    }

    /// The depth limit decoding enforces: `max_depth`, clamped to
    /// [`MAX_DEPTH_CEILING`] even when the field was set directly.
    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.min(MAX_DEPTH_CEILING)
    }

    /// Set the zero-width item cap.
    pub fn with_max_zero_width_items(mut self, limit: usize) -> Self {
        self.max_zero_width_items = limit;
        self
    }

    /// Enable or disable block byte-size validation.
    pub fn with_validate_block_sizes(mut self, validate: bool) -> Self {
        self.validate_block_sizes = validate;
        self
    }

    /// Set the payload framing.
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Accept trailing bytes after the value.
    pub fn allow_trailing(self) -> Self {
        self.with_framing(Framing::AllowTrailing)
    }

    /// Set strict schema name validation.
    pub fn with_strict_schema(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Defaults overridden by `AVRO_UDF_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `AVRO_UDF_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(Self::ENV_MAX_DEPTH) {
            let depth = parse_number(Self::ENV_MAX_DEPTH, &value)?;
            if depth > MAX_DEPTH_CEILING {
                return Err(invalid(
                    Self::ENV_MAX_DEPTH,
                    &value,
                    format!("must be at most {}", MAX_DEPTH_CEILING),
                ));
            }
            config.max_depth = depth;
        }
        if let Some(value) = lookup(Self::ENV_MAX_ZERO_WIDTH_ITEMS) {
            config.max_zero_width_items = parse_number(Self::ENV_MAX_ZERO_WIDTH_ITEMS, &value)?;
        }
        if let Some(value) = lookup(Self::ENV_VALIDATE_BLOCK_SIZES) {
            config.validate_block_sizes = parse_bool(Self::ENV_VALIDATE_BLOCK_SIZES, &value)?;
        }
        if let Some(value) = lookup(Self::ENV_FRAMING) {
            config.framing = value
                .parse()
                .map_err(|message| invalid(Self::ENV_FRAMING, &value, message))?;
        }
        if let Some(value) = lookup(Self::ENV_STRICT_SCHEMA) {
            config.strict_schema = parse_bool(Self::ENV_STRICT_SCHEMA, &value)?;
        }

        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(key, value, e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false".to_string())),
    }
}

fn invalid(key: &str, value: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message,
    }
}
