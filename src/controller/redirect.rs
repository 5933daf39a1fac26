use std::collections::HashMap;

use url::form_urlencoded;

use crate::settings::PageSettings;

/// Path and query parameters of one inbound invocation
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    path: String,
    raw_query: String,
    query: HashMap<String, String>,
}

impl InboundRequest {
    /// Decode a raw query string. The first occurrence of a repeated key wins.
    pub fn new(path: impl Into<String>, raw_query: Option<&str>) -> Self {
        let raw_query = raw_query.unwrap_or_default().to_string();
        let mut query = HashMap::new();
        for (key, value) in form_urlencoded::parse(raw_query.as_bytes()) {
            query
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }

        Self {
            path: path.into(),
            raw_query,
            query,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// A query parameter, treating an empty value as absent
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Redirect targets a request can end on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Error,
    Success,
    ConfirmSubscribe,
    ConfirmUnsubscribe,
}

/// Absolute URLs of every [`Page`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pages {
    error: String,
    success: String,
    confirm_subscribe: String,
    confirm_unsubscribe: String,
}

impl Pages {
    pub fn url(&self, page: Page) -> &str {
        match page {
            Page::Error => &self.error,
            Page::Success => &self.success,
            Page::ConfirmSubscribe => &self.confirm_subscribe,
            Page::ConfirmUnsubscribe => &self.confirm_unsubscribe,
        }
    }
}

impl From<&PageSettings> for Pages {
    fn from(settings: &PageSettings) -> Self {
        let page = |path: &str| format!("{}{}", settings.base_url, path);
        Self {
            error: page(&settings.error_page),
            success: page(&settings.success_page),
            confirm_subscribe: page(&settings.confirm_subscribe_page),
            confirm_unsubscribe: page(&settings.confirm_unsubscribe_page),
        }
    }
}

/// Response to every invocation: `303 See Other` to `location`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

impl Redirect {
    pub const STATUS: u16 = 303;
    pub const ALLOW_ORIGIN: &'static str = "*";

    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}
