use crate::{
    browser::{
        config::{BrowserProfile, ConnectionOptions, LaunchOptions},
        page::{cdp_command, inject_cookies},
        stealth::{ClientHintInterceptor, stealth_script},
    },
    error::{AcquireError, Result},
    session::{CookieJar, Credentials, StructuredCookie},
};
use headless_chrome::{
    Browser, Tab,
    protocol::cdp::{Emulation, Page},
};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

/// How the context was acquired, which decides what teardown is allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMode {
    /// Launched and owned by this process; storage state is saved here on close
    Managed { storage_state: PathBuf },
    /// Borrowed from a browser the user runs; never torn down
    Attached,
}

/// Owner of the run's single browser context and factory for its pages
pub struct BrowserContextManager {
    browser: Browser,
    mode: ContextMode,
    profile: BrowserProfile,
    /// Tabs this process opened; the only ones closed in attached mode
    opened: Mutex<Vec<Arc<Tab>>>,
}

impl BrowserContextManager {
    /// Launch a managed browser with stealth flags, restore the previous storage state and
    /// inject `credentials`.
    pub fn launch(
        options: &LaunchOptions,
        profile: BrowserProfile,
        credentials: &Credentials,
        cookie_domain: &str,
        storage_state: PathBuf,
    ) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));
        launch_opts.args.push(OsStr::new("--disable-infobars"));
        let lang_arg = OsString::from(format!("--lang={}", profile.locale));
        launch_opts.args.push(lang_arg.as_os_str());

        // Traversals run for hours; the default 30s idle timeout would close the browser mid-run
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.sandbox = options.sandbox;

        if let Some(path) = &options.chrome_path {
            launch_opts.path = Some(path.clone());
        }

        if let Some(dir) = &options.user_data_dir {
            launch_opts.user_data_dir = Some(dir.clone());
        }

        let browser = Browser::new(launch_opts).map_err(|e| AcquireError::LaunchFailed(e.to_string()))?;
        let bootstrap = browser
            .wait_for_initial_tab()
            .or_else(|_| browser.new_tab())
            .map_err(|e| AcquireError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        let restored = load_storage_state(&storage_state)?;
        if !restored.is_empty() {
            log::info!("Restoring {} cookies from {}", restored.len(), storage_state.display());
            inject_cookies(&bootstrap, &restored, cookie_domain)?;
        }
        inject_cookies(&bootstrap, &credentials.cookies, cookie_domain)?;

        log::info!("Launched managed browser (headless: {})", options.headless);
        Ok(Self { browser, mode: ContextMode::Managed { storage_state }, profile, opened: Mutex::default() })
    }

    /// Attach to a browser the user already runs. Nothing is injected and no stealth is
    /// applied; credentials are read from this context instead.
    pub fn attach(options: ConnectionOptions, profile: BrowserProfile) -> Result<Self> {
        let browser = Browser::connect_with_timeout(options.ws_url.clone(), Duration::from_millis(options.timeout))
            .map_err(|e| AcquireError::ConnectionFailed(format!("{}: {}", options.ws_url, e)))?;

        log::info!("Attached to browser at {}", options.ws_url);
        Ok(Self { browser, mode: ContextMode::Attached, profile, opened: Mutex::default() })
    }

    pub fn mode(&self) -> &ContextMode {
        &self.mode
    }

    pub fn is_managed(&self) -> bool {
        matches!(self.mode, ContextMode::Managed { .. })
    }

    /// Create a page ready for navigation
    pub fn new_page(&self) -> Result<Arc<Tab>> {
        let tab = self.open_tab()?;
        tab.set_default_timeout(Duration::from_secs(self.profile.navigation_timeout_secs));

        match self.mode {
            ContextMode::Managed { .. } => self.apply_stealth(&tab)?,
            // remote debugging connections may not set a viewport at all
            ContextMode::Attached => self.apply_viewport(&tab)?,
        }

        Ok(tab)
    }

    /// A page whose cookie jar reflects the context: the first open tab, or a bare new one
    pub fn cookie_source(&self) -> Result<Arc<Tab>> {
        let existing = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to get tabs: {}", e)))?
            .first()
            .cloned();

        match existing {
            Some(tab) => Ok(tab),
            None => self.open_tab(),
        }
    }

    fn open_tab(&self) -> Result<Arc<Tab>> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to create tab: {}", e)))?;
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(Arc::clone(&tab));
        }
        Ok(tab)
    }

    fn apply_stealth(&self, tab: &Tab) -> Result<()> {
        let profile = &self.profile;

        let script: Page::AddScriptToEvaluateOnNewDocument =
            cdp_command(serde_json::json!({ "source": stealth_script(profile) }))?;
        tab.call_method(script)
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to install init script: {}", e)))?;

        tab.set_user_agent(&profile.user_agent, Some(&profile.accept_language), Some(&profile.platform))
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to set user agent: {}", e)))?;

        let timezone: Emulation::SetTimezoneOverride =
            cdp_command(serde_json::json!({ "timezoneId": profile.timezone }))?;
        tab.call_method(timezone)
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to set timezone: {}", e)))?;

        let locale: Emulation::SetLocaleOverride = cdp_command(serde_json::json!({ "locale": profile.locale }))?;
        tab.call_method(locale).map_err(|e| AcquireError::PageOperationFailed(format!("Failed to set locale: {}", e)))?;

        self.apply_viewport(tab)?;

        tab.enable_fetch(None, None)
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to enable request interception: {}", e)))?;
        tab.enable_request_interception(ClientHintInterceptor::new(profile.client_hint.clone()))
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to install request interceptor: {}", e)))?;

        Ok(())
    }

    fn apply_viewport(&self, tab: &Tab) -> Result<()> {
        let metrics: Emulation::SetDeviceMetricsOverride = cdp_command(serde_json::json!({
            "width": self.profile.viewport_width,
            "height": self.profile.viewport_height,
            "deviceScaleFactor": 1,
            "mobile": false,
        }))?;
        tab.call_method(metrics)
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to set viewport: {}", e)))?;

        Ok(())
    }

    /// Tear the context down. Managed: save cookies to the storage-state file and close the
    /// browser. Attached: close only the tabs this process opened and leave the user's
    /// browser running.
    pub fn close(self) -> Result<()> {
        let tabs = match &self.mode {
            ContextMode::Managed { storage_state } => {
                let cookies = self.cookie_source()?.all_cookies()?;
                save_storage_state(storage_state, &cookies)?;
                log::info!("Saved {} cookies to {}", cookies.len(), storage_state.display());

                self.browser
                    .get_tabs()
                    .lock()
                    .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to get tabs: {}", e)))?
                    .clone()
            }
            ContextMode::Attached => {
                let opened = self
                    .opened
                    .lock()
                    .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to get opened tabs: {}", e)))?
                    .clone();
                log::debug!("Closing {} tabs opened in the attached browser", opened.len());
                opened
            }
        };

        for tab in tabs {
            if let Err(e) = tab.close(false) {
                log::debug!("Failed to close tab {}: {}", tab.get_target_id(), e);
            }
        }

        // a launched Chrome process is killed when `browser` drops; an attached one keeps running
        Ok(())
    }

    /// Number of tabs this process opened in the browser
    pub fn opened_tabs(&self) -> usize {
        self.opened.lock().map(|tabs| tabs.len()).unwrap_or_default()
    }
}

/// Read a storage-state file; a missing file is an empty state
pub fn load_storage_state(path: &Path) -> Result<Vec<StructuredCookie>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(cookies) => Ok(cookies),
        Err(e) => {
            log::warn!("Ignoring unreadable storage state {}: {}", path.display(), e);
            Ok(Vec::new())
        }
    }
}

/// Write a storage-state file atomically
pub fn save_storage_state(path: &Path, cookies: &[StructuredCookie]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.part");
    std::fs::write(&tmp, serde_json::to_vec_pretty(cookies)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("storage_state.json");

        assert!(load_storage_state(&path).unwrap().is_empty());

        let cookies = vec![StructuredCookie::new("sid", "abc").scoped(".portal.example", "/")];
        save_storage_state(&path, &cookies).unwrap();
        assert_eq!(load_storage_state(&path).unwrap(), cookies);
        assert!(!path.with_extension("json.part").exists());
    }

    #[test]
    fn test_corrupt_storage_state_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage_state.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(load_storage_state(&path).unwrap().is_empty());
    }

    // Integration tests (require Chrome to be installed)
    #[test]
    #[ignore] // Ignore by default, run with: cargo test -- --ignored
    fn test_managed_launch_and_close_saves_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("storage_state.json");
        let credentials = crate::session::transform("sid=abc");

        let manager = BrowserContextManager::launch(
            &LaunchOptions::new().headless(true),
            BrowserProfile::default(),
            &credentials,
            "example.com",
            state.clone(),
        )
        .expect("Failed to launch browser");
        assert!(manager.is_managed());

        let page = manager.new_page().expect("Failed to create page");
        let webdriver = page.evaluate("String(navigator.webdriver)", false).unwrap();
        assert_eq!(webdriver.value, Some(serde_json::json!("undefined")));

        manager.close().unwrap();
        let saved = load_storage_state(&state).unwrap();
        assert!(saved.iter().any(|c| c.name == "sid"));
    }

    #[test]
    #[ignore] // Requires Chrome to be installed
    fn test_attached_close_only_closes_own_tabs() {
        let mut launch_opts = headless_chrome::LaunchOptions::default();
        launch_opts.port = Some(9333);
        let user_browser = Browser::new(launch_opts).expect("Failed to launch browser");
        user_browser.new_tab().unwrap().navigate_to("data:text/html,<p>user tab</p>").unwrap();
        let tabs_before = user_browser.get_tabs().lock().unwrap().len();

        let body = reqwest::blocking::get("http://127.0.0.1:9333/json/version").unwrap().text().unwrap();
        let version: serde_json::Value = serde_json::from_str(&body).unwrap();
        let ws_url = version["webSocketDebuggerUrl"].as_str().unwrap().to_string();

        let manager = BrowserContextManager::attach(ConnectionOptions::new(ws_url), BrowserProfile::default())
            .expect("Failed to attach");
        assert!(!manager.is_managed());
        manager.new_page().unwrap();
        manager.new_page().unwrap();
        assert_eq!(manager.opened_tabs(), 2);
        manager.close().unwrap();

        std::thread::sleep(Duration::from_millis(500));
        let remaining = user_browser.get_tabs().lock().unwrap().len();
        assert_eq!(remaining, tabs_before);
    }
}
