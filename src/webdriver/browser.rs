use std::fmt;

use super::error::WebDriverError;

/// Opaque handle to an element in the live page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

/// Element lookup strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// Strategy name and value as the WebDriver protocol expects them
    pub(crate) fn strategy(&self) -> (&'static str, &str) {
        match self {
            Locator::Css(s) => ("css selector", s),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{}`", s),
        }
    }
}

/// Trait for a controlled browser session
#[async_trait::async_trait]
pub trait Browser: Send + Sync {
    /// Load a URL in the session
    async fn navigate(&self, url: &str) -> Result<(), WebDriverError>;

    /// Reload the current page
    async fn refresh(&self) -> Result<(), WebDriverError>;

    /// URL of the page currently loaded
    async fn current_url(&self) -> Result<String, WebDriverError>;

    /// Serialized DOM of the current page
    async fn page_source(&self) -> Result<String, WebDriverError>;

    /// Locate an element in the page, `NoSuchElement` if absent
    async fn find(&self, locator: &Locator) -> Result<ElementId, WebDriverError>;

    async fn click(&self, element: &ElementId) -> Result<(), WebDriverError>;

    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), WebDriverError>;

    /// Accept an open `confirm()` dialog, `NoSuchAlert` if none is open
    async fn accept_alert(&self) -> Result<(), WebDriverError>;

    /// End the session and close the browser
    async fn quit(&self) -> Result<(), WebDriverError>;

    /// Get the browser type name for display purposes
    fn browser_type(&self) -> &'static str;
}
