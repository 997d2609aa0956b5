use anyhow::Context;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use tokio::runtime::Runtime;
use tracing::{debug, info};
use url::Url;

use crate::errors::{ProbeError, ProbeResult};
use crate::session::{BrowserSession, Locator, xpath_literal};

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    /// Default WebDriver URL for this browser type
    pub fn default_webdriver_url(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "http://localhost:4444",
            BrowserType::Chrome => "http://localhost:9515",
        }
    }

    fn driver_name(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }
}

/// Parse window size from "WIDTHxHEIGHT" format (e.g., "1920x1080")
pub fn parse_window_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        anyhow::bail!("Invalid viewport format. Use WIDTHxHEIGHT (e.g., 1920x1080)");
    }

    let width = parts[0]
        .parse::<u32>()
        .map_err(|_| anyhow::anyhow!("Invalid width in viewport size"))?;
    let height = parts[1]
        .parse::<u32>()
        .map_err(|_| anyhow::anyhow!("Invalid height in viewport size"))?;

    Ok((width, height))
}

/// Settings for a WebDriver session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub browser: BrowserType,
    /// Overrides the browser's default WebDriver URL
    pub webdriver_url: Option<String>,
    pub headless: bool,
    /// HTTP(S) proxy to route the browser through, as "host:port"
    pub proxy: Option<String>,
    pub window_size: Option<(u32, u32)>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            browser: BrowserType::Firefox,
            webdriver_url: None,
            headless: true,
            proxy: None,
            window_size: None,
        }
    }
}

impl SessionConfig {
    pub fn webdriver_url(&self) -> String {
        self.webdriver_url
            .clone()
            .unwrap_or_else(|| self.browser.default_webdriver_url().to_string())
    }

    /// WebDriver capabilities for this configuration
    pub fn capabilities(
        &self,
        user_data_dir: Option<&std::path::Path>,
    ) -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();

        match self.browser {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if self.headless {
                    args.push("--headless".to_string());
                }
                if let Some((width, height)) = self.window_size {
                    args.push(format!("--width={}", width));
                    args.push(format!("--height={}", height));
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if self.headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                if let Some((width, height)) = self.window_size {
                    args.push(format!("--window-size={},{}", width, height));
                }
                if let Some(dir) = user_data_dir {
                    args.push(format!("--user-data-dir={}", dir.display()));
                }
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }

        if let Some(proxy) = &self.proxy {
            caps.insert(
                "proxy".to_string(),
                json!({
                    "proxyType": "manual",
                    "httpProxy": proxy,
                    "sslProxy": proxy,
                }),
            );
            // The proxy re-signs TLS traffic with its own root CA.
            caps.insert("acceptInsecureCerts".to_string(), json!(true));
        }

        caps
    }
}

/// Blocking [`BrowserSession`] over a WebDriver connection.
///
/// Owns a private tokio runtime and blocks on each WebDriver command, so it
/// must not be used from inside another async runtime.
pub struct WebDriverSession {
    runtime: Runtime,
    client: Client,
    browser: BrowserType,
    // Kept alive for the lifetime of the browser.
    _user_data_dir: Option<tempfile::TempDir>,
}

impl WebDriverSession {
    /// Connect to the WebDriver for `config.browser` and start a session
    pub fn connect(config: &SessionConfig) -> ProbeResult<Self> {
        let runtime = Runtime::new().context("Failed to start tokio runtime")?;
        let webdriver_url = config.webdriver_url();

        info!("Connecting to {:?} WebDriver at {}", config.browser, webdriver_url);

        if !runtime.block_on(is_webdriver_running(&webdriver_url)) {
            let driver_name = config.browser.driver_name();
            return Err(ProbeError::WebDriverFailed(format!(
                "Cannot connect to {} at {}. Start it with: {} --port {}",
                driver_name,
                webdriver_url,
                driver_name,
                driver_port(&webdriver_url, config.browser)
            )));
        }

        let user_data_dir = match config.browser {
            BrowserType::Chrome => Some(
                tempfile::Builder::new()
                    .prefix("hudprobe-chrome-")
                    .tempdir()
                    .context("Failed to create Chrome user data dir")?,
            ),
            BrowserType::Firefox => None,
        };
        let caps = config.capabilities(user_data_dir.as_ref().map(|d| d.path()));

        debug!("Capabilities: {}", serde_json::Value::Object(caps.clone()));

        let client = runtime
            .block_on(ClientBuilder::rustls().capabilities(caps).connect(&webdriver_url))
            .map_err(|e| ProbeError::WebDriverFailed(e.to_string()))?;

        if let Some((width, height)) = config.window_size {
            debug!("Setting window size to {}x{}", width, height);
            if let Err(e) = runtime.block_on(client.set_window_size(width, height)) {
                debug!("Note: Could not set window size: {}", e);
            }
        }

        Ok(Self {
            runtime,
            client,
            browser: config.browser,
            _user_data_dir: user_data_dir,
        })
    }

    pub fn browser(&self) -> BrowserType {
        self.browser
    }

    /// End the WebDriver session
    pub fn close(self) -> ProbeResult<()> {
        self.runtime
            .block_on(self.client.close())
            .map_err(|e| ProbeError::WebDriverFailed(e.to_string()))
    }

    fn fetch_all(&self, locator: &Locator) -> ProbeResult<Vec<Element>> {
        let elements = match locator {
            Locator::ClassName(class) => {
                let css = format!(".{}", class);
                self.runtime
                    .block_on(self.client.find_all(fantoccini::Locator::Css(&css)))
            }
            Locator::PartialLinkText(text) => {
                let xpath = format!("//a[contains(., {})]", xpath_literal(text));
                self.runtime
                    .block_on(self.client.find_all(fantoccini::Locator::XPath(&xpath)))
            }
            other => self
                .runtime
                .block_on(self.client.find_all(native_locator(other))),
        };
        elements.map_err(|e| cmd_error(e, locator))
    }
}

/// Port to suggest when starting the driver for `webdriver_url`
fn driver_port(webdriver_url: &str, browser: BrowserType) -> u16 {
    Url::parse(webdriver_url)
        .ok()
        .and_then(|url| url.port_or_known_default())
        .or_else(|| {
            Url::parse(browser.default_webdriver_url())
                .ok()
                .and_then(|url| url.port())
        })
        .unwrap_or(4444)
}

/// Locator strategies WebDriver supports directly
fn native_locator(locator: &Locator) -> fantoccini::Locator<'_> {
    match locator {
        Locator::Css(s) => fantoccini::Locator::Css(s),
        Locator::Id(s) => fantoccini::Locator::Id(s),
        Locator::XPath(s) => fantoccini::Locator::XPath(s),
        Locator::LinkText(s) => fantoccini::Locator::LinkText(s),
        // Translated in fetch_all
        Locator::ClassName(s) | Locator::PartialLinkText(s) => fantoccini::Locator::Css(s),
    }
}

fn cmd_error(err: CmdError, what: impl std::fmt::Display) -> ProbeError {
    if err.is_miss() {
        return ProbeError::ElementNotFound(what.to_string());
    }
    let msg = err.to_string();
    if msg.contains("stale element") {
        ProbeError::StaleElement(what.to_string())
    } else {
        ProbeError::WebDriverFailed(msg)
    }
}

/// Check the WebDriver status endpoint
pub async fn is_webdriver_running(url: &str) -> bool {
    let status_url = format!("{}/status", url.trim_end_matches('/'));

    match reqwest::get(&status_url).await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

impl BrowserSession for WebDriverSession {
    type Element = Element;

    fn navigate_to(&self, url: &str) -> ProbeResult<()> {
        info!("Navigating to {}", url);
        self.runtime
            .block_on(self.client.goto(url))
            .map_err(|e| cmd_error(e, url))
    }

    fn current_url(&self) -> ProbeResult<String> {
        let url = self
            .runtime
            .block_on(self.client.current_url())
            .map_err(|e| cmd_error(e, "current url"))?;
        Ok(url.to_string())
    }

    fn title(&self) -> ProbeResult<String> {
        self.runtime
            .block_on(self.client.title())
            .map_err(|e| cmd_error(e, "title"))
    }

    fn find_element(&self, locator: &Locator) -> ProbeResult<Element> {
        match locator {
            Locator::ClassName(_) | Locator::PartialLinkText(_) => self
                .fetch_all(locator)?
                .into_iter()
                .next()
                .ok_or_else(|| ProbeError::ElementNotFound(locator.to_string())),
            other => self
                .runtime
                .block_on(self.client.find(native_locator(other)))
                .map_err(|e| cmd_error(e, locator)),
        }
    }

    fn find_elements(&self, locator: &Locator) -> ProbeResult<Vec<Element>> {
        self.fetch_all(locator)
    }

    fn switch_to_frame(&self, frame: &Element) -> ProbeResult<()> {
        debug!("Entering frame");
        self.runtime
            .block_on(frame.clone().enter_frame())
            .map(|_| ())
            .map_err(|e| cmd_error(e, "frame"))
    }

    fn switch_to_parent_frame(&self) -> ProbeResult<()> {
        debug!("Leaving frame");
        self.runtime
            .block_on(self.client.clone().enter_parent_frame())
            .map(|_| ())
            .map_err(|e| cmd_error(e, "parent frame"))
    }

    fn switch_to_default_content(&self) -> ProbeResult<()> {
        self.runtime
            .block_on(self.client.clone().enter_frame(None))
            .map(|_| ())
            .map_err(|e| cmd_error(e, "top-level frame"))
    }

    fn click(&self, element: &Element) -> ProbeResult<()> {
        self.runtime
            .block_on(element.click())
            .map(|_| ())
            .map_err(|e| cmd_error(e, format!("{:?}", element)))
    }

    fn send_keys(&self, element: &Element, text: &str) -> ProbeResult<()> {
        self.runtime
            .block_on(element.send_keys(text))
            .map_err(|e| cmd_error(e, format!("{:?}", element)))
    }

    fn text(&self, element: &Element) -> ProbeResult<String> {
        self.runtime
            .block_on(element.text())
            .map_err(|e| cmd_error(e, format!("{:?}", element)))
    }

    fn is_displayed(&self, element: &Element) -> ProbeResult<bool> {
        self.runtime
            .block_on(element.is_displayed())
            .map_err(|e| cmd_error(e, format!("{:?}", element)))
    }

    fn execute_script(&self, script: &str) -> ProbeResult<serde_json::Value> {
        self.runtime
            .block_on(self.client.execute(script, vec![]))
            .map_err(|e| cmd_error(e, "script"))
    }
}

#[cfg(test)]
#[path = "webdriver_test.rs"]
mod webdriver_test;
