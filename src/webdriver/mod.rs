//! Browser automation boundary
//!
//! This module speaks the W3C WebDriver protocol to a chromedriver instance and
//! exposes the handful of operations the GitHub flows need behind the `Browser` trait.

mod browser;
mod chrome;
mod downloads;
mod error;

pub use browser::{Browser, ElementId, Locator};
pub use chrome::ChromeDriver;
pub use downloads::DownloadDir;
pub use error::WebDriverError;

/// Type alias for browser trait object
pub type BrowserInstance = Box<dyn Browser>;
