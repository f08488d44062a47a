use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info, warn};

use super::browser::{Browser, ElementId, Locator};
use super::error::WebDriverError;
use crate::config::BrowserConfig;

/// Key under which W3C WebDriver returns element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Chrome session driven through a chromedriver endpoint
pub struct ChromeDriver {
    client: Client,
    address: String,
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

impl ChromeDriver {
    /// Start a new Chrome session that saves downloads into `download_dir`
    pub async fn connect(
        config: &BrowserConfig,
        download_dir: &Path,
    ) -> Result<Self, WebDriverError> {
        let address = config.webdriver_url.trim_end_matches('/').to_string();
        info!("Starting Chrome session via {}", address);

        let client = Client::builder().build()?;

        let mut args = Vec::new();
        if config.headless {
            args.push("--headless=new");
        }

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "prefs": {
                            "download.default_directory": download_dir.to_string_lossy(),
                            "download.prompt_for_download": false,
                        },
                    },
                },
            },
        });

        let value = send(
            &client,
            Method::POST,
            &format!("{}/session", address),
            Some(capabilities),
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WebDriverError::UnexpectedResponse(format!("new session without sessionId: {}", value))
            })?
            .to_string();
        debug!("WebDriver session {}", session_id);

        let driver = Self {
            client,
            address,
            session_id,
        };

        if let Err(e) = driver.enable_downloads(download_dir).await {
            let _ = driver.quit().await;
            return Err(e);
        }

        Ok(driver)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Allow downloads without a prompt via the chromium DevTools passthrough
    async fn enable_downloads(&self, download_dir: &Path) -> Result<(), WebDriverError> {
        let params = json!({
            "cmd": "Page.setDownloadBehavior",
            "params": {
                "behavior": "allow",
                "downloadPath": download_dir.to_string_lossy(),
            },
        });
        self.execute(Method::POST, "/chromium/send_command", Some(params))
            .await?;
        debug!("Downloads enabled into {}", download_dir.display());
        Ok(())
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        let url = format!("{}/session/{}{}", self.address, self.session_id, path);
        send(&self.client, method, &url, body).await
    }

    async fn find_from(
        &self,
        path: &str,
        locator: &Locator,
    ) -> Result<ElementId, WebDriverError> {
        let (using, value) = locator.strategy();
        let result = self
            .execute(Method::POST, path, Some(json!({ "using": using, "value": value })))
            .await
            .map_err(|e| match e {
                WebDriverError::NoSuchElement(_) => WebDriverError::NoSuchElement(locator.to_string()),
                other => other,
            })?;

        parse_element(&result)
    }
}

#[async_trait::async_trait]
impl Browser for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<(), WebDriverError> {
        debug!("Navigating to {}", url);
        self.execute(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<(), WebDriverError> {
        self.execute(Method::POST, "/refresh", Some(json!({}))).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, WebDriverError> {
        let value = self.execute(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::UnexpectedResponse(format!("url is not a string: {}", value)))
    }

    async fn page_source(&self) -> Result<String, WebDriverError> {
        let value = self.execute(Method::GET, "/source", None).await?;
        match value {
            Value::String(source) => Ok(source),
            other => Err(WebDriverError::UnexpectedResponse(format!(
                "page source is not a string: {}",
                other
            ))),
        }
    }

    async fn find(&self, locator: &Locator) -> Result<ElementId, WebDriverError> {
        self.find_from("/element", locator).await
    }

    async fn click(&self, element: &ElementId) -> Result<(), WebDriverError> {
        self.execute(
            Method::POST,
            &format!("/element/{}/click", element.0),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), WebDriverError> {
        self.execute(
            Method::POST,
            &format!("/element/{}/value", element.0),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn accept_alert(&self) -> Result<(), WebDriverError> {
        self.execute(Method::POST, "/alert/accept", Some(json!({})))
            .await?;
        Ok(())
    }

    async fn quit(&self) -> Result<(), WebDriverError> {
        info!("Closing Chrome session {}", self.session_id);
        let url = format!("{}/session/{}", self.address, self.session_id);
        if let Err(e) = send(&self.client, Method::DELETE, &url, None).await {
            warn!("Failed to close WebDriver session: {}", e);
            return Err(e);
        }
        Ok(())
    }

    fn browser_type(&self) -> &'static str {
        "chrome"
    }
}

/// Issue one WebDriver command and unwrap the `value` envelope
async fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, WebDriverError> {
    debug!("WebDriver {} {}", method, url);

    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    let wire: WireResponse = serde_json::from_str(&text).map_err(|e| {
        WebDriverError::UnexpectedResponse(format!("status {}: {} ({})", status, text, e))
    })?;

    if status.is_success() {
        return Ok(wire.value);
    }

    let err: WireError = serde_json::from_value(wire.value)
        .map_err(|_| WebDriverError::UnexpectedResponse(format!("status {}: {}", status, text)))?;

    Err(match err.error.as_str() {
        "no such element" => WebDriverError::NoSuchElement(err.message),
        "no such alert" => WebDriverError::NoSuchAlert,
        _ => WebDriverError::Protocol {
            status: status.as_u16(),
            error: err.error,
            message: err.message,
        },
    })
}

fn parse_element(value: &Value) -> Result<ElementId, WebDriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementId(id.to_string()))
        .ok_or_else(|| WebDriverError::UnexpectedResponse(format!("not an element reference: {}", value)))
}
