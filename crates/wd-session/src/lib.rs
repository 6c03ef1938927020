//! WebDriver browser session for render-snapshot.
//!
//! The crate exposes the narrow [`BrowserSession`] surface the render-wait
//! coordinator needs (navigate, query the DOM, read element properties) and a
//! [`WebDriverSession`] implementation backed by `fantoccini`. A session either
//! attaches to an existing WebDriver endpoint or spawns a chromedriver child
//! process that lives as long as the session.

use std::{env, path::PathBuf};

use which::which;

pub mod metrics;
pub mod registry;
pub mod service;
pub mod session;
pub mod webdriver;

pub use config::DriverConfig;
pub use error::SessionError;
pub use ids::ElementId;
pub use service::DriverService;
pub use session::{BrowserSession, ElementQuery, SessionConnector};
pub use webdriver::{WebDriverConnector, WebDriverSession};

pub mod ids {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use uuid::Uuid;

    /// Session-local handle for an element returned by a DOM query.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct ElementId(pub Uuid);

    impl ElementId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl Default for ElementId {
        fn default() -> Self {
            Self::new()
        }
    }

    impl fmt::Display for ElementId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }
}

pub mod error {
    use thiserror::Error;

    use crate::ids::ElementId;

    /// Failures surfaced by a browser session.
    #[derive(Debug, Error)]
    pub enum SessionError {
        /// The driver answered a lookup with the W3C "no such element" error.
        #[error("no such element: {0}")]
        NoSuchElement(String),
        #[error("unknown element handle {0}")]
        UnknownElement(ElementId),
        #[error("webdriver transport failure: {0}")]
        Transport(String),
        #[error("webdriver command failed: {0}")]
        Command(String),
        #[error("could not open webdriver session: {0}")]
        Start(String),
        #[error("driver service failure: {0}")]
        Driver(String),
        #[error("session already closed")]
        Closed,
    }

    impl SessionError {
        pub fn is_no_such_element(&self) -> bool {
            matches!(self, SessionError::NoSuchElement(_))
        }

        pub fn code(&self) -> &'static str {
            match self {
                SessionError::NoSuchElement(_) => "no_such_element",
                SessionError::UnknownElement(_) => "unknown_element",
                SessionError::Transport(_) => "transport",
                SessionError::Command(_) => "command",
                SessionError::Start(_) => "session_start",
                SessionError::Driver(_) => "driver",
                SessionError::Closed => "closed",
            }
        }
    }
}

pub mod config {
    use crate::{detect_driver_executable, env_value};
    use serde::{Deserialize, Serialize};
    use std::{env, path::PathBuf, time::Duration};
    use tracing::warn;
    use url::Url;

    pub const DEFAULT_DRIVER_PORT: u16 = 9515;

    /// How the browser session is obtained and shaped.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct DriverConfig {
        /// Existing WebDriver endpoint; when unset a chromedriver is spawned.
        pub webdriver_url: Option<Url>,
        pub chromedriver: Option<PathBuf>,
        pub driver_port: u16,
        pub browser_binary: Option<PathBuf>,
        pub headless: bool,
        pub verbose: bool,
        pub startup_timeout: Duration,
        pub window_size: (u32, u32),
    }

    impl DriverConfig {
        /// Built-in values, without consulting the environment.
        pub fn builtin() -> Self {
            Self {
                webdriver_url: None,
                chromedriver: None,
                driver_port: DEFAULT_DRIVER_PORT,
                browser_binary: None,
                headless: true,
                verbose: false,
                startup_timeout: Duration::from_secs(20),
                window_size: (1280, 800),
            }
        }
    }

    impl Default for DriverConfig {
        fn default() -> Self {
            Self {
                webdriver_url: resolve_webdriver_url(),
                chromedriver: detect_driver_executable(),
                browser_binary: resolve_browser_binary(),
                headless: resolve_headless_default(),
                ..Self::builtin()
            }
        }
    }

    pub(crate) fn resolve_headless_default() -> bool {
        headless_from_env().unwrap_or(true)
    }

    /// `RENDER_SNAPSHOT_HEADLESS`; "0", "false", "no", "off" mean headed.
    pub fn headless_from_env() -> Option<bool> {
        let value = env::var("RENDER_SNAPSHOT_HEADLESS").ok()?;
        let lower = value.trim().to_ascii_lowercase();
        Some(!matches!(lower.as_str(), "0" | "false" | "no" | "off"))
    }

    /// Raw `RENDER_SNAPSHOT_WEBDRIVER_URL`, unparsed.
    pub fn webdriver_url_from_env() -> Option<String> {
        env_value("RENDER_SNAPSHOT_WEBDRIVER_URL")
    }

    /// Parsed `RENDER_SNAPSHOT_WEBDRIVER_URL`. An unparsable value is logged
    /// and ignored, so a driver gets spawned instead.
    pub fn resolve_webdriver_url() -> Option<Url> {
        let raw = webdriver_url_from_env()?;
        match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(value = %raw, error = %err, "ignoring invalid RENDER_SNAPSHOT_WEBDRIVER_URL");
                None
            }
        }
    }

    pub fn resolve_browser_binary() -> Option<PathBuf> {
        env_value("RENDER_SNAPSHOT_BROWSER").map(PathBuf::from)
    }
}

/// Trimmed value of `key`, or `None` when unset or blank.
fn env_value(key: &str) -> Option<String> {
    let raw = env::var(key).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Locate a chromedriver binary. `RENDER_SNAPSHOT_CHROMEDRIVER` wins over
/// `PATH`, which wins over the usual install locations. Setting
/// `RENDER_SNAPSHOT_SKIP_OS_PATHS` leaves the install locations out.
pub fn detect_driver_executable() -> Option<PathBuf> {
    driver_from_env()
        .or_else(|| {
            driver_executable_names()
                .iter()
                .find_map(|name| which(name).ok())
        })
        .or_else(|| {
            if os_paths_disabled() {
                return None;
            }
            os_specific_driver_paths()
                .into_iter()
                .find(|candidate| candidate.exists())
        })
}

/// `RENDER_SNAPSHOT_CHROMEDRIVER`, when it names an existing file.
pub fn driver_from_env() -> Option<PathBuf> {
    env_value("RENDER_SNAPSHOT_CHROMEDRIVER")
        .map(PathBuf::from)
        .filter(|candidate| candidate.exists())
}

fn os_paths_disabled() -> bool {
    env_value("RENDER_SNAPSHOT_SKIP_OS_PATHS").is_some()
}

fn driver_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chromedriver.exe", "msedgedriver.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &["chromedriver", "chromium.chromedriver"]
    }
}

fn os_specific_driver_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/opt/homebrew/bin/chromedriver"),
            PathBuf::from("/usr/local/bin/chromedriver"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/chromedriver"),
            PathBuf::from("/usr/lib/chromium/chromedriver"),
            PathBuf::from("/usr/lib/chromium-browser/chromedriver"),
            PathBuf::from("/snap/bin/chromium.chromedriver"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "freebsd")))]
    {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::config::{resolve_headless_default, resolve_webdriver_url, webdriver_url_from_env};
    use super::detect_driver_executable;
    use serial_test::serial;
    use std::{env, fs};
    use tempfile::tempdir;

    fn restore(key: &str, value: Option<String>) {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }

    #[test]
    #[serial]
    fn detects_driver_from_env_var() {
        let dir = tempdir().unwrap();
        let exe_path = dir.path().join("my-chromedriver");
        fs::write(&exe_path, b"").unwrap();
        let original = env::var("RENDER_SNAPSHOT_CHROMEDRIVER").ok();
        env::set_var(
            "RENDER_SNAPSHOT_CHROMEDRIVER",
            exe_path.to_string_lossy().to_string(),
        );
        let detected = detect_driver_executable();
        restore("RENDER_SNAPSHOT_CHROMEDRIVER", original);
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    #[serial]
    fn ignores_env_var_pointing_nowhere() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("not-there");
        let original_env = env::var("RENDER_SNAPSHOT_CHROMEDRIVER").ok();
        let original_path = env::var("PATH").ok();
        let skip_flag = env::var("RENDER_SNAPSHOT_SKIP_OS_PATHS").ok();
        env::set_var(
            "RENDER_SNAPSHOT_CHROMEDRIVER",
            missing.to_string_lossy().to_string(),
        );
        env::set_var("RENDER_SNAPSHOT_SKIP_OS_PATHS", "1");
        env::set_var("PATH", dir.path());
        let detected = detect_driver_executable();
        restore("PATH", original_path);
        restore("RENDER_SNAPSHOT_CHROMEDRIVER", original_env);
        restore("RENDER_SNAPSHOT_SKIP_OS_PATHS", skip_flag);
        assert_eq!(detected, None);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn path_lookup_comes_before_install_locations() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let exe_path = dir.path().join("chromedriver");
        fs::write(&exe_path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&exe_path, fs::Permissions::from_mode(0o755)).unwrap();
        let original_env = env::var("RENDER_SNAPSHOT_CHROMEDRIVER").ok();
        let original_path = env::var("PATH").ok();
        env::remove_var("RENDER_SNAPSHOT_CHROMEDRIVER");
        env::set_var("PATH", dir.path());
        let detected = detect_driver_executable();
        restore("PATH", original_path);
        restore("RENDER_SNAPSHOT_CHROMEDRIVER", original_env);
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    #[serial]
    fn blank_skip_flag_keeps_install_locations() {
        let original = env::var("RENDER_SNAPSHOT_SKIP_OS_PATHS").ok();
        env::set_var("RENDER_SNAPSHOT_SKIP_OS_PATHS", "  ");
        let disabled = super::os_paths_disabled();
        env::set_var("RENDER_SNAPSHOT_SKIP_OS_PATHS", "1");
        let enabled = super::os_paths_disabled();
        restore("RENDER_SNAPSHOT_SKIP_OS_PATHS", original);
        assert!(!disabled);
        assert!(enabled);
    }

    #[test]
    #[serial]
    fn unparsable_webdriver_url_keeps_raw_value() {
        let original = env::var("RENDER_SNAPSHOT_WEBDRIVER_URL").ok();
        env::set_var("RENDER_SNAPSHOT_WEBDRIVER_URL", " not a url ");
        let raw = webdriver_url_from_env();
        let parsed = resolve_webdriver_url();
        restore("RENDER_SNAPSHOT_WEBDRIVER_URL", original);
        assert_eq!(raw.as_deref(), Some("not a url"));
        assert_eq!(parsed, None);
    }

    #[test]
    #[serial]
    fn headless_env_switch() {
        let original = env::var("RENDER_SNAPSHOT_HEADLESS").ok();
        env::set_var("RENDER_SNAPSHOT_HEADLESS", "off");
        assert!(!resolve_headless_default());
        env::set_var("RENDER_SNAPSHOT_HEADLESS", "1");
        assert!(resolve_headless_default());
        env::remove_var("RENDER_SNAPSHOT_HEADLESS");
        assert!(resolve_headless_default());
        restore("RENDER_SNAPSHOT_HEADLESS", original);
    }
}
