use std::fmt;
use std::str::FromStr;

use unicode_segmentation::UnicodeSegmentation;

use uuid::Uuid;

const MAX_LEN: usize = 128;

/// Opaque correlation token proving possession of a verification link
///
/// Freshly generated ids are UUID v4 strings, but any non-blank token is
/// accepted when parsing so that the store decides whether it matches.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ContactId(String);

impl ContactId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl FromStr for ContactId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err("Contact id cannot be empty".into());
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err("Contact id too long".into());
        }
        Ok(Self(value.to_string()))
    }
}

impl AsRef<str> for ContactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
