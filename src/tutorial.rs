//! Tutorial site fixtures: page names, URLs and the locators the tutorial
//! pages share.

use url::Url;

use crate::errors::{ProbeError, ProbeResult};
use crate::session::Locator;

pub const ALERT_NOTIFICATIONS_PAGE: &str = "AlertNotifications";
pub const PAGE_ALERTS_PAGE: &str = "PageAlerts";
pub const SITE_ALERTS_PAGE: &str = "SiteAlerts";

/// Text every "Next" link on a tutorial page starts with
pub const NEXT_BUTTON_PREFIX: &str = "Next";
pub const PREVIOUS_BUTTON_PREFIX: &str = "Previous";
pub const NEXT_BUTTON_ID: &str = "next-button";

pub const KEY_INPUT_ID: &str = "key";
pub const SUBMIT_BUTTON_ID: &str = "submit";

pub fn next_button() -> Locator {
    Locator::id(NEXT_BUTTON_ID)
}

pub fn next_link() -> Locator {
    Locator::partial_link_text(NEXT_BUTTON_PREFIX)
}

pub fn previous_link() -> Locator {
    Locator::partial_link_text(PREVIOUS_BUTTON_PREFIX)
}

pub const DEFAULT_TUTORIAL_URL: &str = "http://localhost:9998/";

/// Where the tutorial pages are served
#[derive(Debug, Clone)]
pub struct TutorialSite {
    base: Url,
}

impl TutorialSite {
    pub fn new(base_url: &str) -> ProbeResult<Self> {
        let mut base = Url::parse(base_url).map_err(|e| {
            ProbeError::Other(anyhow::anyhow!("Invalid tutorial URL {}: {}", base_url, e))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    /// URL to open a tutorial page with
    pub fn page_url(&self, page: &str) -> String {
        self.join(page).to_string()
    }

    /// URL the browser ends up on once the HUD has taken over the page.
    ///
    /// The HUD upgrades the tutorial to https on the same host.
    /// An explicit port is kept; without one the https default applies.
    pub fn hud_page_url(&self, page: &str) -> ProbeResult<String> {
        let mut url = self.join(page);
        if url.scheme() == "http" {
            url.set_scheme("https").map_err(|()| {
                ProbeError::Other(anyhow::anyhow!("Cannot switch {} to https", url))
            })?;
        }
        Ok(url.to_string())
    }

    fn join(&self, page: &str) -> Url {
        // Page names are plain path segments, so joining cannot fail.
        self.base.join(page).unwrap_or_else(|_| self.base.clone())
    }
}

/// The secret key at the end of an alert description
pub fn key_from_description(description: &str, key_len: usize) -> ProbeResult<String> {
    let trimmed = description.trim_end();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() < key_len {
        return Err(ProbeError::mismatch(
            "alert description",
            format!("at least {} characters", key_len),
            trimmed,
        ));
    }
    Ok(chars[chars.len() - key_len..].iter().collect())
}

#[cfg(test)]
#[path = "tutorial_test.rs"]
mod tutorial_test;
