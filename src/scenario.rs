//! The Page Alerts step of the HUD tutorial.
//!
//! Steps run strictly in order against one session. Any failed step ends the
//! scenario with its error.

use tracing::info;

use crate::errors::{ProbeError, ProbeResult, ensure_eq};
use crate::hud::Hud;
use crate::session::{BrowserSession, Locator};
use crate::tutorial::{self, TutorialSite};
use crate::wait::{Clock, SystemClock};
use crate::zap_api::ZapApiClient;

/// Index of the page alerts button among the left panel's HUD buttons
pub const PAGE_ALERTS_BUTTON_INDEX: usize = 6;
pub const ALERT_HEADER_CLASS: &str = "accordion-header";
pub const EXPECTED_ALERT_HEADER: &str = "HUD Tutorial Page Alert (1)";
/// Link text fragment of the alert instance raised on the tutorial page
pub const ALERT_INSTANCE_TEXT: &str = "/PageAlerts";
pub const KEY_MARKER: &str = "the key you need is";
pub const KEY_LENGTH: usize = 8;
pub const CLOSE_BUTTON_CLASS: &str = "btn-clear";

/// Server-side reset of tutorial progress
pub trait TaskReset {
    fn reset_tutorial_tasks(&self) -> ProbeResult<()>;
}

impl TaskReset for ZapApiClient {
    fn reset_tutorial_tasks(&self) -> ProbeResult<()> {
        ZapApiClient::reset_tutorial_tasks(self)
    }
}

/// Which checks to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// HUD frames attached and page basics present
    Generic,
    /// The previous link leads back to the alert notifications page
    Previous,
    /// Complete the key task, then follow the next link
    TaskAndNext,
    /// All of the above, in order
    All,
}

/// One runnable scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStep {
    Generic,
    Previous,
    TaskAndNext,
}

impl ScenarioKind {
    /// The steps this selection runs, in order
    pub fn expand(self) -> Vec<ScenarioStep> {
        match self {
            ScenarioKind::Generic => vec![ScenarioStep::Generic],
            ScenarioKind::Previous => vec![ScenarioStep::Previous],
            ScenarioKind::TaskAndNext => vec![ScenarioStep::TaskAndNext],
            ScenarioKind::All => vec![
                ScenarioStep::Generic,
                ScenarioStep::Previous,
                ScenarioStep::TaskAndNext,
            ],
        }
    }
}

pub struct PageAlertsScenario<'a, S, C = SystemClock> {
    hud: Hud<'a, S, C>,
    site: TutorialSite,
}

impl<'a, S: BrowserSession, C: Clock> PageAlertsScenario<'a, S, C> {
    pub fn new(hud: Hud<'a, S, C>, site: TutorialSite) -> Self {
        Self { hud, site }
    }

    pub fn hud(&self) -> &Hud<'a, S, C> {
        &self.hud
    }

    fn session(&self) -> &'a S {
        self.hud.session()
    }

    fn page_url(&self) -> String {
        self.site.page_url(tutorial::PAGE_ALERTS_PAGE)
    }

    pub fn run(&self, kind: ScenarioKind, reset: &dyn TaskReset) -> ProbeResult<()> {
        for step in kind.expand() {
            info!("Running {:?} scenario", step);
            match step {
                ScenarioStep::Generic => self.generic_page_checks()?,
                ScenarioStep::Previous => self.previous_button_works()?,
                ScenarioStep::TaskAndNext => self.task_and_next_button(reset)?,
            }
        }
        Ok(())
    }

    /// Checks every tutorial page should pass
    pub fn generic_page_checks(&self) -> ProbeResult<()> {
        self.hud.open_url_wait_for_hud(&self.page_url())?;

        self.hud.wait_for_right_panel()?;
        self.hud.wait_for_bottom_drawer()?;

        let title = self.session().title()?;
        if title.trim().is_empty() {
            return Err(ProbeError::mismatch("page title", "a title", title));
        }

        self.require(&tutorial::previous_link(), "previous link")?;
        Ok(())
    }

    pub fn previous_button_works(&self) -> ProbeResult<()> {
        self.hud.open_url_wait_for_hud(&self.page_url())?;

        let previous = self.require(&tutorial::previous_link(), "previous link")?;
        self.session().click(&previous)?;
        self.hud.wait_for_page_load()?;

        ensure_eq(
            "url after previous",
            &self.site.hud_page_url(tutorial::ALERT_NOTIFICATIONS_PAGE)?,
            &self.session().current_url()?,
        )
    }

    /// Find the page alert's key, submit it, and follow the unlocked next link
    pub fn task_and_next_button(&self, reset: &dyn TaskReset) -> ProbeResult<()> {
        let session = self.session();
        reset.reset_tutorial_tasks()?;
        self.hud.open_url_wait_for_hud(&self.page_url())?;

        match session.find_element(&tutorial::next_link()) {
            Ok(_) => {
                return Err(ProbeError::mismatch(
                    "next button before task",
                    "not a link",
                    "a link",
                ));
            }
            Err(ProbeError::ElementNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        // The alert count depends on the proxy's passive scanner.
        let panel = self.hud.wait_for_left_panel()?;
        session.switch_to_frame(&panel)?;
        let alerts_button = self.hud.hud_button(PAGE_ALERTS_BUTTON_INDEX)?;
        self.hud.wait_for_text_in_element(&alerts_button, "1")?;

        session.click(&alerts_button)?;
        session.switch_to_parent_frame()?;
        let panel = self.hud.wait_for_display_panel()?;
        session.switch_to_frame(&panel)?;

        let header = self
            .hud
            .first_visible(Locator::class_name(ALERT_HEADER_CLASS))?;
        ensure_eq("alert header", EXPECTED_ALERT_HEADER, &session.text(&header)?)?;
        session.click(&header)?;

        let instance = self
            .hud
            .first_visible(Locator::partial_link_text(ALERT_INSTANCE_TEXT))?;
        session.click(&instance)?;

        let description = self
            .hud
            .wait_for_element(Locator::containing_text(KEY_MARKER))?;
        let key = tutorial::key_from_description(&session.text(&description)?, KEY_LENGTH)?;
        self.hud.log(&format!("Got key {}", key));

        let close = self
            .hud
            .first_visible(Locator::class_name(CLOSE_BUTTON_CLASS))?;
        session.click(&close)?;

        // Reload so the page is not driven through the alert dialog's frame.
        self.hud.open_url_wait_for_hud(&self.page_url())?;
        let key_input = session.find_element(&Locator::id(tutorial::KEY_INPUT_ID))?;
        session.send_keys(&key_input, &key)?;
        let submit = session.find_element(&Locator::id(tutorial::SUBMIT_BUTTON_ID))?;
        session.click(&submit)?;

        // Fresh load, so no handle from the old page is reused.
        self.hud.open_url_wait_for_hud(&self.page_url())?;
        self.require(&tutorial::next_link(), "next link after task")?;

        let next = self.hud.wait_for_element(tutorial::next_button())?;
        session.click(&next)?;
        self.hud.wait_for_page_load()?;

        ensure_eq(
            "url after next",
            &self.site.hud_page_url(tutorial::SITE_ALERTS_PAGE)?,
            &session.current_url()?,
        )
    }

    /// Look up an element that must already be there
    fn require(&self, locator: &Locator, what: &str) -> ProbeResult<S::Element> {
        match self.session().find_element(locator) {
            Err(ProbeError::ElementNotFound(_)) => Err(ProbeError::mismatch(
                what,
                format!("element {}", locator),
                "nothing",
            )),
            other => other,
        }
    }
}
