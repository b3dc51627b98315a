//! Language identifiers as they appear on the wire and in config.
//!
//! The pipeline treats language codes as opaque lowercase tags ("en", "es",
//! "pt-br") plus two sentinels: `auto` asks the translation backend to detect
//! the source language, `off` disables dubbing when used as a target.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized language code or sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Source-side sentinel: let the provider detect the language.
    pub const AUTO: &'static str = "auto";
    /// Target-side sentinel: dubbing disabled.
    pub const OFF: &'static str = "off";

    /// Normalizes to trimmed ASCII lowercase.
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_ascii_lowercase())
    }

    pub fn auto() -> Self {
        Self(Self::AUTO.to_string())
    }

    pub fn off() -> Self {
        Self(Self::OFF.to_string())
    }

    pub fn is_auto(&self) -> bool {
        self.0 == Self::AUTO
    }

    pub fn is_off(&self) -> bool {
        self.0 == Self::OFF
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageTag {
    fn default() -> Self {
        Self::auto()
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for LanguageTag {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}
