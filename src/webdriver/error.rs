use thiserror::Error;

/// Errors surfaced by the WebDriver boundary
#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("no alert is open")]
    NoSuchAlert,

    #[error("webdriver returned {status} ({error}): {message}")]
    Protocol {
        status: u16,
        error: String,
        message: String,
    },

    #[error("webdriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected webdriver response: {0}")]
    UnexpectedResponse(String),
}

impl WebDriverError {
    /// True when the error only says that an element is not on the page
    pub fn is_not_found(&self) -> bool {
        matches!(self, WebDriverError::NoSuchElement(_))
    }
}
