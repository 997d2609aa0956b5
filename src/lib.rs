//! # hudprobe
#![allow(clippy::uninlined_format_args)]
//!
//! Browser-driven checks for the HUD tutorial, built on explicit waits.
//!
//! Every scenario step that depends on asynchronous page state waits on a
//! named [`Condition`] through a [`WaitPoller`] instead of sleeping. The
//! browser is reached through the [`BrowserSession`] trait, so the polling
//! core and the HUD helpers can be exercised against a scripted session and a
//! [`ManualClock`].
//!
//! ## CLI Usage
//!
//! ```bash
//! # Start a WebDriver and route the browser through the proxy
//! geckodriver --port 4444 &
//! hudprobe tutorial page-alerts --proxy localhost:8080 --zap-api http://localhost:8080
//!
//! # Run a single scenario in a visible Chrome window
//! hudprobe tutorial page-alerts --scenario previous --browser chrome --no-headless
//!
//! # Wait up to 5s for an element to show up on any page
//! hudprobe wait "https://example.com" "css:h1" --timeout 5000 --interval 100
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use hudprobe::{BrowserSession, Hud, Locator, SessionConfig, WebDriverSession, conditions};
//!
//! # fn example() -> hudprobe::ProbeResult<()> {
//! let session = WebDriverSession::connect(&SessionConfig::default())?;
//! let hud = Hud::new(&session);
//!
//! hud.open_url_wait_for_hud("http://localhost:9998/PageAlerts")?;
//! let panel = hud.wait_for_left_panel()?;
//! session.switch_to_frame(&panel)?;
//!
//! let url = hud.wait_for(conditions::url_contains("PageAlerts"))?;
//! hud.log(&format!("Still on {}", url));
//! # Ok(())
//! # }
//! ```

/// Named wait conditions over a browser session
pub mod conditions;

/// Error types and exit codes
pub mod errors;

/// HUD page object
pub mod hud;

/// Page Alerts tutorial scenarios
pub mod scenario;

/// Browser session abstraction and locators
pub mod session;

/// Tutorial site fixtures
pub mod tutorial;

/// Polling core
pub mod wait;

/// WebDriver-backed browser session
pub mod webdriver;

/// Client for the proxy's HUD API
pub mod zap_api;

pub use errors::{ProbeError, ProbeResult};
pub use hud::{Hud, HudConfig};
pub use scenario::{PageAlertsScenario, ScenarioKind, ScenarioStep, TaskReset};
pub use session::{BrowserSession, Locator};
pub use tutorial::TutorialSite;
pub use wait::{
    Clock, Condition, ManualClock, PollResult, Polled, SystemClock, WaitOptions, WaitPoller,
    WaitTimeoutError, condition,
};
pub use webdriver::{BrowserType, SessionConfig, WebDriverSession};
pub use zap_api::{ZapApiClient, ZapApiConfig};
