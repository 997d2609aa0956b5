// Scripted in-memory browser that plays the HUD tutorial on a virtual clock

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::time::Duration;

use hudprobe::{
    BrowserSession, Hud, HudConfig, Locator, ManualClock, PageAlertsScenario, ProbeError,
    ProbeResult, TaskReset, TutorialSite, WaitPoller,
};

pub const TUTORIAL_URL: &str = "http://localhost:9998/";
const HUD_ORIGIN: &str = "https://localhost:9998/";
pub const SECRET_KEY: &str = "5e1ec7ed";

const KNOWN_PAGES: &[&str] = &["AlertNotifications", "PageAlerts", "SiteAlerts"];

/// Timings and content of the simulated tutorial
#[derive(Debug, Clone)]
pub struct Script {
    /// Time until `document.readyState` is complete after a navigation
    pub load_time: Duration,
    /// Time until the HUD frames are attached after a navigation
    pub hud_delay: Duration,
    /// Time until the passive scanner raises the page alert, if ever
    pub alert_delay: Option<Duration>,
    pub alert_title: String,
    /// Whether the HUD moves the page to https
    pub upgrade_to_https: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            load_time: Duration::from_millis(150),
            hud_delay: Duration::from_millis(300),
            alert_delay: Some(Duration::from_millis(600)),
            alert_title: "HUD Tutorial Page Alert (1)".to_string(),
            upgrade_to_https: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeElement {
    node: usize,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
enum Click {
    Nothing,
    Navigate(&'static str),
    Show(&'static [&'static str]),
    Hide(&'static [&'static str]),
    SubmitKey,
}

#[derive(Debug, Clone)]
struct Node {
    name: &'static str,
    frame: Option<&'static str>,
    tag: &'static str,
    id: Option<&'static str>,
    classes: &'static [&'static str],
    text: String,
    later_text: Option<(Duration, String)>,
    attach_after: Duration,
    hidden: bool,
    click: Click,
}

fn node(name: &'static str, tag: &'static str, text: impl Into<String>) -> Node {
    Node {
        name,
        frame: None,
        tag,
        id: None,
        classes: &[],
        text: text.into(),
        later_text: None,
        attach_after: Duration::ZERO,
        hidden: false,
        click: Click::Nothing,
    }
}

impl Node {
    fn id(mut self, id: &'static str) -> Self {
        self.id = Some(id);
        self
    }

    fn classes(mut self, classes: &'static [&'static str]) -> Self {
        self.classes = classes;
        self
    }

    fn in_frame(mut self, frame: &'static str) -> Self {
        self.frame = Some(frame);
        self
    }

    fn after(mut self, delay: Duration) -> Self {
        self.attach_after = delay;
        self
    }

    fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    fn on_click(mut self, click: Click) -> Self {
        self.click = click;
        self
    }

    fn text_after(mut self, delay: Duration, text: &str) -> Self {
        self.later_text = Some((delay, text.to_string()));
        self
    }
}

#[derive(Debug, Default)]
struct World {
    url: String,
    title: String,
    loaded_at: Duration,
    generation: u64,
    nodes: Vec<Node>,
    frames: Vec<&'static str>,
    shown: HashSet<&'static str>,
    closed: HashSet<&'static str>,
    typed: String,
    task_complete: bool,
    resets: u32,
    history: Vec<String>,
}

pub struct FakeBrowser {
    clock: ManualClock,
    script: Script,
    world: RefCell<World>,
}

impl FakeBrowser {
    pub fn new(script: Script) -> Self {
        Self {
            clock: ManualClock::new(),
            script,
            world: RefCell::new(World {
                url: "about:blank".to_string(),
                ..Default::default()
            }),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn task_complete(&self) -> bool {
        self.world.borrow().task_complete
    }

    pub fn complete_task(&self) {
        self.world.borrow_mut().task_complete = true;
    }

    pub fn resets(&self) -> u32 {
        self.world.borrow().resets
    }

    /// Every URL requested, in order
    pub fn history(&self) -> Vec<String> {
        self.world.borrow().history.clone()
    }

    pub fn frame_depth(&self) -> usize {
        self.world.borrow().frames.len()
    }

    fn now(&self) -> Duration {
        self.clock.elapsed()
    }

    fn open(&self, world: &mut World, url: &str) {
        let name = url.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        let known = KNOWN_PAGES.iter().copied().find(|p| *p == name);

        world.history.push(url.to_string());
        world.url = if let (Some(page), true) = (known, self.script.upgrade_to_https) {
            format!("{}{}", HUD_ORIGIN, page)
        } else {
            url.to_string()
        };
        world.generation += 1;
        world.loaded_at = self.now();
        world.frames.clear();
        world.shown.clear();
        world.closed.clear();
        world.typed.clear();

        if let Some(page) = known {
            world.title = format!("ZAP HUD Tutorial - {}", page);
            world.nodes = self.build_page(page, world.task_complete);
        } else {
            world.title = "Not Found".to_string();
            world.nodes = Vec::new();
        }
    }

    fn build_page(&self, page: &'static str, task_complete: bool) -> Vec<Node> {
        let hud = self.script.hud_delay;
        let mut nodes = vec![
            node("management", "iframe", "").id("zap-hud-management").after(hud),
            node("left", "iframe", "").id("zap-hud-left-panel").after(hud),
            node("right", "iframe", "").id("zap-hud-right-panel").after(hud),
            node("drawer", "iframe", "").id("zap-hud-bottom-drawer").after(hud),
            node("display", "iframe", "").id("zap-hud-display").after(hud).hidden(),
            node("heading", "h1", page),
        ];

        const BUTTONS: [&str; 7] = ["b0", "b1", "b2", "b3", "b4", "b5", "b6"];
        for (i, name) in BUTTONS.into_iter().enumerate() {
            let mut button = node(name, "div", "0")
                .classes(&["hud-button"])
                .in_frame("left")
                .after(hud);
            if i == 6 {
                button = button.on_click(Click::Show(&["display"]));
                if let (Some(delay), "PageAlerts") = (self.script.alert_delay, page) {
                    button = button.text_after(delay, "1");
                }
            }
            nodes.push(button);
        }

        match page {
            "AlertNotifications" => {
                nodes.push(
                    node("prev", "a", "Previous: Introduction")
                        .on_click(Click::Navigate("Introduction")),
                );
                nodes.push(
                    node("next", "a", "Next: Page Alerts")
                        .id("next-button")
                        .on_click(Click::Navigate("PageAlerts")),
                );
            }
            "PageAlerts" => {
                nodes.push(
                    node("prev", "a", "Previous: Alert Notifications")
                        .on_click(Click::Navigate("AlertNotifications")),
                );
                if task_complete {
                    nodes.push(
                        node("next", "a", "Next: Site Alerts")
                            .id("next-button")
                            .on_click(Click::Navigate("SiteAlerts")),
                    );
                } else {
                    nodes.push(node("next", "span", "Next: Site Alerts"));
                }
                nodes.push(node("key", "input", "").id("key"));
                nodes.push(
                    node("submit", "button", "Submit")
                        .id("submit")
                        .on_click(Click::SubmitKey),
                );

                nodes.push(
                    node("header", "div", self.script.alert_title.clone())
                        .classes(&["accordion-header"])
                        .in_frame("display")
                        .on_click(Click::Show(&["instance"])),
                );
                nodes.push(
                    node("instance", "a", format!("{}PageAlerts", HUD_ORIGIN))
                        .in_frame("display")
                        .hidden()
                        .on_click(Click::Show(&["description"])),
                );
                nodes.push(
                    node(
                        "description",
                        "div",
                        format!("Well done, the key you need is {}", SECRET_KEY),
                    )
                    .in_frame("display")
                    .hidden(),
                );
                nodes.push(
                    node("close", "button", "Close")
                        .classes(&["btn-clear"])
                        .in_frame("display")
                        .on_click(Click::Hide(&["display"])),
                );
            }
            _ => {
                nodes.push(
                    node("prev", "a", "Previous: Page Alerts")
                        .on_click(Click::Navigate("PageAlerts")),
                );
            }
        }

        nodes
    }

    fn attached(&self, world: &World, node: &Node) -> bool {
        self.now() >= world.loaded_at + node.attach_after
    }

    fn displayed(&self, world: &World, index: usize) -> bool {
        let node = &world.nodes[index];
        if !self.attached(world, node) || world.closed.contains(node.name) {
            return false;
        }
        if node.hidden && !world.shown.contains(node.name) {
            return false;
        }
        match node.frame {
            None => true,
            Some(frame) => world
                .nodes
                .iter()
                .position(|n| n.name == frame)
                .is_some_and(|i| self.displayed(world, i)),
        }
    }

    fn resolve(&self, world: &World, element: &FakeElement) -> ProbeResult<usize> {
        if element.generation != world.generation || element.node >= world.nodes.len() {
            return Err(ProbeError::StaleElement(format!("{:?}", element)));
        }
        Ok(element.node)
    }

    fn matches(node: &Node, locator: &Locator) -> bool {
        match locator {
            Locator::Css(css) => {
                if let Some(id) = css.strip_prefix('#') {
                    node.id == Some(id)
                } else if let Some(class) = css.strip_prefix('.') {
                    node.classes.contains(&class)
                } else {
                    node.tag == css
                }
            }
            Locator::Id(id) => node.id == Some(id.as_str()),
            Locator::ClassName(class) => node.classes.contains(&class.as_str()),
            Locator::LinkText(text) => node.tag == "a" && node.text == *text,
            Locator::PartialLinkText(text) => node.tag == "a" && node.text.contains(text.as_str()),
            Locator::XPath(xpath) => xpath
                .strip_prefix("//*[contains(text(), '")
                .and_then(|rest| rest.strip_suffix("')]"))
                .is_some_and(|text| node.text.contains(text)),
        }
    }
}

impl BrowserSession for FakeBrowser {
    type Element = FakeElement;

    fn navigate_to(&self, url: &str) -> ProbeResult<()> {
        let mut world = self.world.borrow_mut();
        self.open(&mut world, url);
        Ok(())
    }

    fn current_url(&self) -> ProbeResult<String> {
        Ok(self.world.borrow().url.clone())
    }

    fn title(&self) -> ProbeResult<String> {
        Ok(self.world.borrow().title.clone())
    }

    fn find_element(&self, locator: &Locator) -> ProbeResult<FakeElement> {
        self.find_elements(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| ProbeError::ElementNotFound(locator.to_string()))
    }

    fn find_elements(&self, locator: &Locator) -> ProbeResult<Vec<FakeElement>> {
        let world = self.world.borrow();
        let frame = world.frames.last().copied();
        Ok(world
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.frame == frame && self.attached(&world, n))
            .filter(|(_, n)| Self::matches(n, locator))
            .map(|(node, _)| FakeElement {
                node,
                generation: world.generation,
            })
            .collect())
    }

    fn switch_to_frame(&self, frame: &FakeElement) -> ProbeResult<()> {
        let mut world = self.world.borrow_mut();
        let index = self.resolve(&world, frame)?;
        let node = &world.nodes[index];
        if node.tag != "iframe" {
            return Err(ProbeError::WebDriverFailed(format!(
                "{} is not a frame",
                node.name
            )));
        }
        let name = node.name;
        world.frames.push(name);
        Ok(())
    }

    fn switch_to_parent_frame(&self) -> ProbeResult<()> {
        self.world.borrow_mut().frames.pop();
        Ok(())
    }

    fn switch_to_default_content(&self) -> ProbeResult<()> {
        self.world.borrow_mut().frames.clear();
        Ok(())
    }

    fn click(&self, element: &FakeElement) -> ProbeResult<()> {
        let mut world = self.world.borrow_mut();
        let index = self.resolve(&world, element)?;
        if !self.displayed(&world, index) {
            return Err(ProbeError::WebDriverFailed(format!(
                "element not interactable: {}",
                world.nodes[index].name
            )));
        }
        let action = world.nodes[index].click;
        match action {
            Click::Nothing => {}
            Click::Navigate(page) => {
                let url = format!("{}{}", TUTORIAL_URL, page);
                self.open(&mut world, &url);
            }
            Click::Show(names) => {
                for &name in names {
                    world.shown.insert(name);
                    world.closed.remove(name);
                }
            }
            Click::Hide(names) => {
                for &name in names {
                    world.closed.insert(name);
                }
            }
            Click::SubmitKey => {
                if world.typed == SECRET_KEY {
                    world.task_complete = true;
                }
            }
        }
        Ok(())
    }

    fn send_keys(&self, element: &FakeElement, text: &str) -> ProbeResult<()> {
        let mut world = self.world.borrow_mut();
        let index = self.resolve(&world, element)?;
        if world.nodes[index].tag == "input" {
            world.typed.push_str(text);
        }
        Ok(())
    }

    fn text(&self, element: &FakeElement) -> ProbeResult<String> {
        let world = self.world.borrow();
        let index = self.resolve(&world, element)?;
        // Hidden elements have no rendered text.
        if !self.displayed(&world, index) {
            return Ok(String::new());
        }
        let node = &world.nodes[index];
        match &node.later_text {
            Some((delay, text)) if self.now() >= world.loaded_at + *delay => Ok(text.clone()),
            _ => Ok(node.text.clone()),
        }
    }

    fn is_displayed(&self, element: &FakeElement) -> ProbeResult<bool> {
        let world = self.world.borrow();
        let index = self.resolve(&world, element)?;
        Ok(self.displayed(&world, index))
    }

    fn execute_script(&self, script: &str) -> ProbeResult<serde_json::Value> {
        let world = self.world.borrow();
        if script.contains("document.readyState") {
            let state = if self.now() >= world.loaded_at + self.script.load_time {
                "complete"
            } else {
                "interactive"
            };
            return Ok(serde_json::json!(state));
        }
        Ok(serde_json::Value::Null)
    }
}

impl TaskReset for FakeBrowser {
    fn reset_tutorial_tasks(&self) -> ProbeResult<()> {
        let mut world = self.world.borrow_mut();
        world.task_complete = false;
        world.resets += 1;
        Ok(())
    }
}

/// HUD helpers polling on the browser's virtual clock
pub fn hud_for(browser: &FakeBrowser) -> Hud<'_, FakeBrowser, ManualClock> {
    Hud::with_poller(
        browser,
        WaitPoller::with_clock(browser.clock().clone()),
        HudConfig::default(),
    )
}

pub fn scenario_for(browser: &FakeBrowser) -> PageAlertsScenario<'_, FakeBrowser, ManualClock> {
    let site = TutorialSite::new(TUTORIAL_URL).expect("valid tutorial URL");
    PageAlertsScenario::new(hud_for(browser), site)
}
