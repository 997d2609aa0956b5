use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ProbeResult;

/// How to find an element in the current frame
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    Id(String),
    ClassName(String),
    XPath(String),
    LinkText(String),
    PartialLinkText(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn class_name(class: impl Into<String>) -> Self {
        Locator::ClassName(class.into())
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Locator::XPath(xpath.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Locator::LinkText(text.into())
    }

    pub fn partial_link_text(text: impl Into<String>) -> Self {
        Locator::PartialLinkText(text.into())
    }

    /// Any element whose own text contains `text`
    pub fn containing_text(text: &str) -> Self {
        Locator::XPath(format!("//*[contains(text(), {})]", xpath_literal(text)))
    }

    /// Parse "css:...", "id:...", "class:...", "xpath:...", "link:...",
    /// "partial-link:..."; anything else is treated as a CSS selector
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some(("css", rest)) => Locator::css(rest),
            Some(("id", rest)) => Locator::id(rest),
            Some(("class", rest)) => Locator::class_name(rest),
            Some(("xpath", rest)) => Locator::xpath(rest),
            Some(("link", rest)) => Locator::link_text(rest),
            Some(("partial-link", rest)) => Locator::partial_link_text(rest),
            _ => Locator::css(s),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css '{}'", s),
            Locator::Id(s) => write!(f, "id '{}'", s),
            Locator::ClassName(s) => write!(f, "class '{}'", s),
            Locator::XPath(s) => write!(f, "xpath '{}'", s),
            Locator::LinkText(s) => write!(f, "link text '{}'", s),
            Locator::PartialLinkText(s) => write!(f, "partial link text '{}'", s),
        }
    }
}

/// Quote a string for use inside an XPath expression
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// The browser surface the HUD checks need.
///
/// All calls block until the browser answers. Lookups that find nothing
/// return `ProbeError::ElementNotFound`; handles whose node is gone return
/// `ProbeError::StaleElement`.
pub trait BrowserSession {
    type Element: Clone + fmt::Debug;

    fn navigate_to(&self, url: &str) -> ProbeResult<()>;
    fn current_url(&self) -> ProbeResult<String>;
    fn title(&self) -> ProbeResult<String>;

    fn find_element(&self, locator: &Locator) -> ProbeResult<Self::Element>;
    fn find_elements(&self, locator: &Locator) -> ProbeResult<Vec<Self::Element>>;

    fn switch_to_frame(&self, frame: &Self::Element) -> ProbeResult<()>;
    fn switch_to_parent_frame(&self) -> ProbeResult<()>;
    fn switch_to_default_content(&self) -> ProbeResult<()>;

    fn click(&self, element: &Self::Element) -> ProbeResult<()>;
    fn send_keys(&self, element: &Self::Element, text: &str) -> ProbeResult<()>;
    fn text(&self, element: &Self::Element) -> ProbeResult<String>;
    fn is_displayed(&self, element: &Self::Element) -> ProbeResult<bool>;

    /// Run a script in the current frame and return its JSON result
    fn execute_script(&self, script: &str) -> ProbeResult<serde_json::Value>;
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
