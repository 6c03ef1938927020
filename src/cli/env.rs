use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use render_snapshot::config::millis;
use render_snapshot::RenderConfig;

/// Render a page in a WebDriver browser, wait until its loading marker is
/// gone, and write the rendered HTML.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Port of the local origin and of the navigation URL [default: 8084]
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Static root directory served by the local origin
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Page path appended to http://localhost:<port>/
    #[arg(long, value_name = "PATH")]
    pub page: Option<String>,

    /// CSS selector of the loading marker; rendering is done once it no longer matches
    #[arg(long, value_name = "SELECTOR")]
    pub selector: Option<String>,

    /// Output file (standard output when absent)
    #[arg(long, value_name = "FILE")]
    pub outfile: Option<PathBuf>,

    /// Do not start a local origin; probe the page URL instead
    #[arg(long)]
    pub external_origin: bool,

    /// Run chromedriver with --verbose and forward its output to the log
    #[arg(long)]
    pub driver_verbose: bool,

    /// Show the browser window
    #[arg(long)]
    pub driver_head: bool,

    /// Existing WebDriver endpoint to connect to instead of spawning chromedriver
    #[arg(long, value_name = "URL")]
    pub webdriver_url: Option<String>,

    /// chromedriver binary to spawn
    #[arg(long, value_name = "FILE")]
    pub chromedriver: Option<PathBuf>,

    /// Port for a spawned chromedriver [default: 9515]
    #[arg(long, value_name = "PORT")]
    pub driver_port: Option<u16>,

    /// Browser binary handed to chromedriver
    #[arg(long, value_name = "FILE")]
    pub browser_binary: Option<PathBuf>,

    /// Delay between readiness polls, e.g. 100ms [default: 100ms]
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Give up when the marker is still present after this long [default: 60s]
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub max_wait: Option<Duration>,

    /// Give up after this many polls
    #[arg(long, value_name = "N")]
    pub max_polls: Option<u64>,

    /// Poll until the marker disappears, however long that takes
    #[arg(long, conflicts_with_all = ["max_wait", "max_polls"])]
    pub no_wait_limit: bool,

    /// Timeout of the external origin probe [default: 10s]
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub probe_timeout: Option<Duration>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,
}

impl CliArgs {
    /// Flags take precedence over file and environment values.
    pub fn apply_to(&self, config: &mut RenderConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = &self.dir {
            config.dir = Some(dir.clone());
        }
        if let Some(page) = &self.page {
            config.page = page.clone();
        }
        if let Some(selector) = &self.selector {
            config.selector = selector.clone();
        }
        if let Some(outfile) = &self.outfile {
            config.outfile = Some(outfile.clone());
        }
        if self.external_origin {
            config.external_origin = true;
        }
        if let Some(timeout) = self.probe_timeout {
            config.probe_timeout_ms = millis(timeout);
        }

        let driver = &mut config.driver;
        if self.driver_verbose {
            driver.verbose = true;
        }
        if self.driver_head {
            driver.headless = false;
        }
        if let Some(url) = &self.webdriver_url {
            driver.webdriver_url = Some(url.clone());
        }
        if let Some(path) = &self.chromedriver {
            driver.chromedriver = Some(path.clone());
        }
        if let Some(port) = self.driver_port {
            driver.port = port;
        }
        if let Some(path) = &self.browser_binary {
            driver.browser_binary = Some(path.clone());
        }

        let poll = &mut config.poll;
        if let Some(interval) = self.poll_interval {
            poll.interval_ms = millis(interval);
        }
        if let Some(max_wait) = self.max_wait {
            poll.max_wait_ms = Some(millis(max_wait));
        }
        if let Some(max_polls) = self.max_polls {
            poll.max_polls = Some(max_polls);
        }
        if self.no_wait_limit {
            poll.unbounded = true;
        }
    }
}
