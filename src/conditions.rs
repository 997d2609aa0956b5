//! Named wait conditions over a [`BrowserSession`].
//!
//! Every condition here only reads browser state. Lookup failures are
//! returned as errors and treated by the poller as "not yet"; any other
//! session error ends the wait.

use std::marker::PhantomData;

use crate::errors::ProbeResult;
use crate::session::{BrowserSession, Locator};
use crate::wait::Condition;

/// First element matching `locator`
pub fn element_present(locator: Locator) -> ElementPresent {
    ElementPresent { locator }
}

/// First element matching `locator`, once it is displayed
pub fn element_visible(locator: Locator) -> ElementVisible {
    ElementVisible {
        locator,
        last: None,
    }
}

/// First displayed element among all matches of `locator`
pub fn first_visible(locator: Locator) -> FirstVisible {
    FirstVisible {
        locator,
        last: None,
    }
}

/// Satisfied once nothing matches `locator`
pub fn element_absent(locator: Locator) -> ElementAbsent {
    ElementAbsent {
        locator,
        last: None,
    }
}

/// The element at `index` among matches of `locator`, once that many exist
pub fn element_at(locator: Locator, index: usize) -> ElementAt {
    ElementAt {
        locator,
        index,
        last: None,
    }
}

/// The element's text, once it contains `text`
pub fn text_present_in_element<S: BrowserSession>(
    element: S::Element,
    text: impl Into<String>,
) -> TextInElement<S> {
    TextInElement {
        element,
        text: text.into(),
        last: None,
        _session: PhantomData,
    }
}

/// First element matching `locator` whose text contains `text`
pub fn text_present(locator: Locator, text: impl Into<String>) -> TextPresent {
    TextPresent {
        locator,
        text: text.into(),
        last: None,
    }
}

/// The current URL, once it equals `url`
pub fn url_is(url: impl Into<String>) -> UrlMatches {
    UrlMatches {
        expected: url.into(),
        exact: true,
        last: None,
    }
}

/// The current URL, once it contains `fragment`
pub fn url_contains(fragment: impl Into<String>) -> UrlMatches {
    UrlMatches {
        expected: fragment.into(),
        exact: false,
        last: None,
    }
}

/// Satisfied once `document.readyState` is "complete"
pub fn page_loaded() -> PageLoaded {
    PageLoaded { last: None }
}

pub struct ElementPresent {
    locator: Locator,
}

impl<S: BrowserSession> Condition<S> for ElementPresent {
    type Output = S::Element;

    fn describe(&self) -> String {
        format!("element {} to be present", self.locator)
    }

    fn evaluate(&mut self, session: &S) -> ProbeResult<Option<S::Element>> {
        session.find_element(&self.locator).map(Some)
    }
}

pub struct ElementVisible {
    locator: Locator,
    last: Option<String>,
}

impl<S: BrowserSession> Condition<S> for ElementVisible {
    type Output = S::Element;

    fn describe(&self) -> String {
        format!("element {} to be visible", self.locator)
    }

    fn evaluate(&mut self, session: &S) -> ProbeResult<Option<S::Element>> {
        let element = session.find_element(&self.locator)?;
        if session.is_displayed(&element)? {
            Ok(Some(element))
        } else {
            self.last = Some("present but hidden".to_string());
            Ok(None)
        }
    }

    fn last_observed(&self) -> Option<String> {
        self.last.clone()
    }
}

pub struct FirstVisible {
    locator: Locator,
    last: Option<String>,
}

impl<S: BrowserSession> Condition<S> for FirstVisible {
    type Output = S::Element;

    fn describe(&self) -> String {
        format!("a visible element matching {}", self.locator)
    }

    fn evaluate(&mut self, session: &S) -> ProbeResult<Option<S::Element>> {
        let elements = session.find_elements(&self.locator)?;
        let total = elements.len();
        for element in elements {
            // A match going stale mid-scan just means it is not the one we want.
            match session.is_displayed(&element) {
                Ok(true) => return Ok(Some(element)),
                Ok(false) => {}
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(e),
            }
        }
        self.last = Some(format!("{} match(es), none displayed", total));
        Ok(None)
    }

    fn last_observed(&self) -> Option<String> {
        self.last.clone()
    }
}

pub struct ElementAbsent {
    locator: Locator,
    last: Option<String>,
}

impl<S: BrowserSession> Condition<S> for ElementAbsent {
    type Output = ();

    fn describe(&self) -> String {
        format!("no element matching {}", self.locator)
    }

    fn evaluate(&mut self, session: &S) -> ProbeResult<Option<()>> {
        let count = session.find_elements(&self.locator)?.len();
        if count == 0 {
            Ok(Some(()))
        } else {
            self.last = Some(format!("{} match(es)", count));
            Ok(None)
        }
    }

    fn last_observed(&self) -> Option<String> {
        self.last.clone()
    }
}

pub struct ElementAt {
    locator: Locator,
    index: usize,
    last: Option<String>,
}

impl<S: BrowserSession> Condition<S> for ElementAt {
    type Output = S::Element;

    fn describe(&self) -> String {
        format!("element #{} matching {}", self.index, self.locator)
    }

    fn evaluate(&mut self, session: &S) -> ProbeResult<Option<S::Element>> {
        let mut elements = session.find_elements(&self.locator)?;
        if self.index < elements.len() {
            Ok(Some(elements.swap_remove(self.index)))
        } else {
            self.last = Some(format!("{} match(es)", elements.len()));
            Ok(None)
        }
    }

    fn last_observed(&self) -> Option<String> {
        self.last.clone()
    }
}

pub struct TextInElement<S: BrowserSession> {
    element: S::Element,
    text: String,
    last: Option<String>,
    _session: PhantomData<fn(&S)>,
}

impl<S: BrowserSession> Condition<S> for TextInElement<S> {
    type Output = String;

    fn describe(&self) -> String {
        format!("text '{}' to be present in {:?}", self.text, self.element)
    }

    fn evaluate(&mut self, session: &S) -> ProbeResult<Option<String>> {
        let text = session.text(&self.element)?;
        if text.contains(&self.text) {
            Ok(Some(text))
        } else {
            self.last = Some(format!("text '{}'", text));
            Ok(None)
        }
    }

    fn last_observed(&self) -> Option<String> {
        self.last.clone()
    }
}

pub struct TextPresent {
    locator: Locator,
    text: String,
    last: Option<String>,
}

impl<S: BrowserSession> Condition<S> for TextPresent {
    type Output = S::Element;

    fn describe(&self) -> String {
        format!("text '{}' to be present in {}", self.text, self.locator)
    }

    fn evaluate(&mut self, session: &S) -> ProbeResult<Option<S::Element>> {
        let mut seen = Vec::new();
        for element in session.find_elements(&self.locator)? {
            let text = match session.text(&element) {
                Ok(text) => text,
                Err(e) if e.is_transient() => continue,
                Err(e) => return Err(e),
            };
            if text.contains(&self.text) {
                return Ok(Some(element));
            }
            seen.push(text);
        }
        self.last = Some(format!("texts {:?}", seen));
        Ok(None)
    }

    fn last_observed(&self) -> Option<String> {
        self.last.clone()
    }
}

pub struct UrlMatches {
    expected: String,
    exact: bool,
    last: Option<String>,
}

impl<S: BrowserSession> Condition<S> for UrlMatches {
    type Output = String;

    fn describe(&self) -> String {
        if self.exact {
            format!("url to be {}", self.expected)
        } else {
            format!("url to contain {}", self.expected)
        }
    }

    fn evaluate(&mut self, session: &S) -> ProbeResult<Option<String>> {
        let url = session.current_url()?;
        let matched = if self.exact {
            url == self.expected
        } else {
            url.contains(&self.expected)
        };
        if matched {
            Ok(Some(url))
        } else {
            self.last = Some(url);
            Ok(None)
        }
    }

    fn last_observed(&self) -> Option<String> {
        self.last.clone()
    }
}

pub struct PageLoaded {
    last: Option<String>,
}

impl<S: BrowserSession> Condition<S> for PageLoaded {
    type Output = ();

    fn describe(&self) -> String {
        "page to finish loading".to_string()
    }

    fn evaluate(&mut self, session: &S) -> ProbeResult<Option<()>> {
        let state = session.execute_script("return document.readyState;")?;
        if state.as_str() == Some("complete") {
            Ok(Some(()))
        } else {
            self.last = Some(format!("readyState {}", state));
            Ok(None)
        }
    }

    fn last_observed(&self) -> Option<String> {
        self.last.clone()
    }
}
