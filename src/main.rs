#![allow(clippy::uninlined_format_args)]

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hudprobe::errors::with_cleanup;
use hudprobe::webdriver::{is_webdriver_running, parse_window_size};
use hudprobe::{
    BrowserSession, BrowserType, Hud, HudConfig, Locator, PageAlertsScenario, ProbeError,
    ProbeResult, ScenarioKind, SessionConfig, TutorialSite, WaitOptions, WaitPoller,
    WebDriverSession, ZapApiClient, ZapApiConfig, conditions,
};

const EXIT_SUCCESS: i32 = 0;

#[derive(Parser)]
#[command(name = "hudprobe")]
#[command(about = "Drive the HUD tutorial in a real browser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Browser options shared by every command that opens a session
#[derive(Args, Clone)]
struct BrowserArgs {
    /// Browser to use
    #[arg(short, long, default_value = "firefox")]
    browser: String,

    /// Run browser in visible mode (disables headless)
    #[arg(long = "no-headless")]
    no_headless: bool,

    /// Route the browser through this proxy (host:port)
    #[arg(long)]
    proxy: Option<String>,

    /// WebDriver URL (defaults to localhost:4444 for Firefox, 9515 for Chrome)
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Set window size (WIDTHxHEIGHT, e.g., 1920x1080)
    #[arg(long)]
    viewport: Option<String>,
}

impl BrowserArgs {
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        Ok(SessionConfig {
            browser: self.browser.parse::<BrowserType>()?,
            webdriver_url: self.webdriver_url.clone(),
            headless: !self.no_headless,
            proxy: self.proxy.clone(),
            window_size: self.viewport.as_deref().map(parse_window_size).transpose()?,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open a page and wait for an element
    Wait {
        /// URL to open
        url: String,

        /// Locator: css:, id:, class:, xpath:, link:, partial-link: (default css)
        locator: String,

        /// Also require the element text to contain this
        #[arg(long)]
        text: Option<String>,

        /// Require the element to be displayed
        #[arg(long)]
        visible: bool,

        /// Timeout in milliseconds
        #[arg(long, default_value = "10000")]
        timeout: u64,

        /// Poll interval in milliseconds
        #[arg(long, default_value = "100")]
        interval: u64,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Run HUD tutorial scenarios
    Tutorial {
        #[command(subcommand)]
        command: TutorialCommands,
    },

    /// Check whether the WebDriver is reachable
    Status {
        #[command(flatten)]
        browser: BrowserArgs,
    },
}

#[derive(Subcommand)]
enum TutorialCommands {
    /// The Page Alerts tutorial step
    PageAlerts {
        /// Which scenario to run
        #[arg(long, value_enum, default_value = "all")]
        scenario: ScenarioKind,

        /// Base URL of the tutorial pages
        #[arg(long, default_value = hudprobe::tutorial::DEFAULT_TUTORIAL_URL)]
        tutorial_url: String,

        /// Base URL of the proxy API
        #[arg(long, default_value = "http://localhost:8080")]
        zap_api: String,

        /// Proxy API key
        #[arg(long)]
        api_key: Option<String>,

        /// Default timeout for HUD waits in milliseconds
        #[arg(long, default_value = "10000")]
        timeout: u64,

        #[command(flatten)]
        browser: BrowserArgs,
    },
}

fn main() {
    // Initialize tracing to stderr (so JSON output to stdout remains clean)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hudprobe=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            // Output JSON error to stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": err.to_string(),
                "exit_code": err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            eprintln!("Error: {}", err);
            std::process::exit(err.exit_code());
        }
    }
}

fn run(cli: Cli) -> ProbeResult<()> {
    match cli.command {
        Commands::Wait {
            url,
            locator,
            text,
            visible,
            timeout,
            interval,
            browser,
        } => handle_wait(url, locator, text, visible, timeout, interval, browser),

        Commands::Tutorial {
            command:
                TutorialCommands::PageAlerts {
                    scenario,
                    tutorial_url,
                    zap_api,
                    api_key,
                    timeout,
                    browser,
                },
        } => handle_page_alerts(scenario, tutorial_url, zap_api, api_key, timeout, browser),

        Commands::Status { browser } => handle_status(browser),
    }
}

fn handle_wait(
    url: String,
    locator: String,
    text: Option<String>,
    visible: bool,
    timeout: u64,
    interval: u64,
    browser: BrowserArgs,
) -> ProbeResult<()> {
    let options = WaitOptions::from_millis(timeout, interval)?;
    let locator = Locator::parse(&locator);
    let session = WebDriverSession::connect(&browser.session_config()?)?;
    let poller = WaitPoller::new();

    let result = (|| -> ProbeResult<()> {
        session.navigate_to(&url)?;
        let polled = match (&text, visible) {
            (Some(text), _) => poller.until(
                &session,
                conditions::text_present(locator.clone(), text.clone()),
                &options,
            )?,
            (None, true) => {
                poller.until(&session, conditions::element_visible(locator.clone()), &options)?
            }
            (None, false) => {
                poller.until(&session, conditions::element_present(locator.clone()), &options)?
            }
        };
        let element_text = session.text(&polled.value).ok();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "locator": locator,
                "url": session.current_url()?,
                "elapsed_ms": polled.elapsed.as_millis() as u64,
                "attempts": polled.attempts,
                "text": element_text,
            }))
            .map_err(anyhow::Error::from)?
        );
        Ok(())
    })();

    with_cleanup(result, session.close())
}

fn handle_page_alerts(
    scenario: ScenarioKind,
    tutorial_url: String,
    zap_api: String,
    api_key: Option<String>,
    timeout: u64,
    browser: BrowserArgs,
) -> ProbeResult<()> {
    let site = TutorialSite::new(&tutorial_url)?;
    let api = ZapApiClient::new(ZapApiConfig {
        base_url: zap_api,
        api_key,
        ..Default::default()
    })?;
    let config = HudConfig {
        wait: WaitOptions::default().with_timeout(Duration::from_millis(timeout))?,
        ..Default::default()
    };

    let session = WebDriverSession::connect(&browser.session_config()?)?;
    let hud = Hud::with_poller(&session, WaitPoller::new(), config);
    let result = PageAlertsScenario::new(hud, site).run(scenario, &api);
    with_cleanup(result, session.close())?;

    println!(
        "{}",
        json!({ "scenario": format!("{:?}", scenario), "passed": true })
    );
    Ok(())
}

fn handle_status(browser: BrowserArgs) -> ProbeResult<()> {
    let config = browser.session_config()?;
    let url = config.webdriver_url();
    let runtime = tokio::runtime::Runtime::new().map_err(anyhow::Error::from)?;
    let running = runtime.block_on(is_webdriver_running(&url));

    println!(
        "{}",
        json!({ "browser": config.browser, "webdriver_url": url, "running": running })
    );
    if running {
        Ok(())
    } else {
        Err(ProbeError::WebDriverFailed(format!(
            "No WebDriver answering at {}",
            url
        )))
    }
}
