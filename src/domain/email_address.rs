use std::fmt;
use std::str::FromStr;

use regex::Regex;

use unicode_segmentation::UnicodeSegmentation;

const MAX_LEN: usize = 256;

/// A user supplied mailbox address
///
/// Accepts either a bare `local@domain` address or the display-name form
/// `Name <local@domain>`, in which case only the bare address is kept.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EmailAddress(String);

impl FromStr for EmailAddress {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref EMAIL_REGEX: Regex = Regex::new(
                r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$"
            )
            .unwrap();
        }

        let value = value.trim();
        if value.is_empty() {
            return Err("Email address cannot be empty".into());
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err("Email address too long".into());
        }

        let address = strip_display_name(value)?;
        if address.starts_with('.') || address.contains("..") || address.contains(".@") {
            return Err("Email address has misplaced dots".into());
        }
        if !EMAIL_REGEX.is_match(address) {
            return Err("Email address of incorrect format".into());
        }

        // Domains are case-insensitive, local parts are not
        let (local, domain) = address.rsplit_once('@').ok_or("Email address has no domain")?;

        Ok(Self(format!("{}@{}", local, domain.to_lowercase())))
    }
}

/// Extract `addr` from `Name <addr>`, or return the input unchanged
fn strip_display_name(value: &str) -> Result<&str, String> {
    match (value.rfind('<'), value.ends_with('>')) {
        (Some(open), true) => Ok(value[open + 1..value.len() - 1].trim()),
        (None, false) => Ok(value),
        _ => Err("Email address has unbalanced angle brackets".into()),
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
