use std::time::Duration;

use tracing::{debug, info};

use crate::conditions;
use crate::errors::ProbeResult;
use crate::session::{BrowserSession, Locator};
use crate::wait::{Clock, Condition, SystemClock, WaitOptions, WaitPoller};

/// Frame ids and timeouts the HUD helpers rely on
#[derive(Debug, Clone)]
pub struct HudConfig {
    pub management_frame_id: String,
    pub left_panel_id: String,
    pub right_panel_id: String,
    pub bottom_drawer_id: String,
    pub display_panel_id: String,
    /// Class shared by every button in the side panels
    pub button_class: String,
    /// Used by every named wait unless stated otherwise
    pub wait: WaitOptions,
    pub page_load_timeout: Duration,
}

impl Default for HudConfig {
    fn default() -> Self {
        Self {
            management_frame_id: "zap-hud-management".to_string(),
            left_panel_id: "zap-hud-left-panel".to_string(),
            right_panel_id: "zap-hud-right-panel".to_string(),
            bottom_drawer_id: "zap-hud-bottom-drawer".to_string(),
            display_panel_id: "zap-hud-display".to_string(),
            button_class: "hud-button".to_string(),
            wait: WaitOptions::default(),
            page_load_timeout: Duration::from_secs(30),
        }
    }
}

/// Page object for a page with the HUD attached
pub struct Hud<'a, S, C = SystemClock> {
    session: &'a S,
    poller: WaitPoller<C>,
    config: HudConfig,
}

impl<'a, S: BrowserSession> Hud<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self::with_poller(session, WaitPoller::new(), HudConfig::default())
    }
}

impl<'a, S: BrowserSession, C: Clock> Hud<'a, S, C> {
    pub fn with_poller(session: &'a S, poller: WaitPoller<C>, config: HudConfig) -> Self {
        Self {
            session,
            poller,
            config,
        }
    }

    pub fn session(&self) -> &'a S {
        self.session
    }

    pub fn config(&self) -> &HudConfig {
        &self.config
    }

    /// Wait on any condition with the default HUD options
    pub fn wait_for<K: Condition<S>>(&self, condition: K) -> ProbeResult<K::Output> {
        self.wait_with(condition, &self.config.wait)
    }

    pub fn wait_with<K: Condition<S>>(
        &self,
        condition: K,
        options: &WaitOptions,
    ) -> ProbeResult<K::Output> {
        Ok(self.poller.until(self.session, condition, options)?.into_value())
    }

    /// Navigate to `url` and block until the HUD frames are attached.
    ///
    /// Leaves the session in the top-level browsing context.
    pub fn open_url_wait_for_hud(&self, url: &str) -> ProbeResult<()> {
        info!("Opening {} and waiting for the HUD", url);
        self.session.navigate_to(url)?;
        self.session.switch_to_default_content()?;
        self.wait_for_page_load()?;
        self.wait_for(conditions::element_present(Locator::id(
            &self.config.management_frame_id,
        )))?;
        self.wait_for_left_panel()?;
        debug!("HUD attached on {}", url);
        Ok(())
    }

    /// Block until `document.readyState` is complete
    pub fn wait_for_page_load(&self) -> ProbeResult<()> {
        let options = self.config.wait.with_timeout(self.config.page_load_timeout)?;
        self.wait_with(conditions::page_loaded(), &options)
    }

    pub fn wait_for_left_panel(&self) -> ProbeResult<S::Element> {
        self.wait_for_frame(&self.config.left_panel_id)
    }

    pub fn wait_for_right_panel(&self) -> ProbeResult<S::Element> {
        self.wait_for_frame(&self.config.right_panel_id)
    }

    pub fn wait_for_bottom_drawer(&self) -> ProbeResult<S::Element> {
        self.wait_for_frame(&self.config.bottom_drawer_id)
    }

    /// The display frame used for dialogs such as the alert list
    pub fn wait_for_display_panel(&self) -> ProbeResult<S::Element> {
        self.wait_for_frame(&self.config.display_panel_id)
    }

    fn wait_for_frame(&self, id: &str) -> ProbeResult<S::Element> {
        self.wait_for(conditions::element_visible(Locator::id(id)))
    }

    pub fn wait_for_element(&self, locator: Locator) -> ProbeResult<S::Element> {
        self.wait_for(conditions::element_present(locator))
    }

    /// First displayed element matching `locator`, waiting until one is shown
    pub fn first_visible(&self, locator: Locator) -> ProbeResult<S::Element> {
        self.wait_for(conditions::first_visible(locator))
    }

    /// HUD buttons in the current frame, without waiting
    pub fn hud_buttons(&self) -> ProbeResult<Vec<S::Element>> {
        self.session
            .find_elements(&Locator::class_name(&self.config.button_class))
    }

    /// The HUD button at `index`, waiting until the panel has rendered that many
    pub fn hud_button(&self, index: usize) -> ProbeResult<S::Element> {
        self.wait_for(conditions::element_at(
            Locator::class_name(&self.config.button_class),
            index,
        ))
    }

    pub fn wait_for_text_in_element(
        &self,
        element: &S::Element,
        text: &str,
    ) -> ProbeResult<String> {
        self.wait_for(conditions::text_present_in_element::<S>(
            element.clone(),
            text,
        ))
    }

    pub fn wait_for_url(&self, url: &str) -> ProbeResult<String> {
        self.wait_for(conditions::url_is(url))
    }

    pub fn log(&self, message: &str) {
        info!("{}", message);
    }
}
