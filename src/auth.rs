//! One-shot authentication check against the portal's landing page

use crate::{
    browser::DocumentPage,
    error::{AcquireError, Result},
};
use std::{fmt, io::BufRead};
use url::Url;

/// Outcome of an authentication check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated,
    /// The account's subscription has lapsed; `message` is whatever the portal displays
    SubscriptionExpired { message: Option<String> },
    /// The portal redirected somewhere outside the authenticated origin
    LoginFailed { landed_url: String },
    /// The landing page could not be loaded even after the user stepped in
    Unreachable { reason: String },
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated => write!(f, "authenticated"),
            Self::SubscriptionExpired { message: Some(message) } => write!(f, "subscription expired ({})", message),
            Self::SubscriptionExpired { message: None } => write!(f, "subscription expired"),
            Self::LoginFailed { landed_url } => write!(f, "login failed, landed on {}", landed_url),
            Self::Unreachable { reason } => write!(f, "landing page unreachable ({})", reason),
        }
    }
}

/// A single blocking wait on the user (e.g. to dismiss an interstitial by hand)
pub trait Intervention {
    fn wait_for_user(&self, message: &str) -> Result<()>;
}

/// Waits for Enter on stdin
#[derive(Debug, Default)]
pub struct StdinIntervention;

impl Intervention for StdinIntervention {
    fn wait_for_user(&self, message: &str) -> Result<()> {
        eprintln!("{}", message);
        eprintln!("Press Enter to continue...");
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(())
    }
}

/// Returns immediately; for tests and unattended runs
#[derive(Debug, Default)]
pub struct NoIntervention;

impl Intervention for NoIntervention {
    fn wait_for_user(&self, message: &str) -> Result<()> {
        log::debug!("Skipping manual intervention: {}", message);
        Ok(())
    }
}

/// Where to check authentication and how to recognize the outcome
#[derive(Debug, Clone)]
pub struct AuthCheck {
    /// Page only reachable with a valid session
    pub landing_url: String,

    /// Origin the landing page must stay on (scheme + host + port)
    pub expected_origin: String,

    /// Substring of the URL the portal redirects to when the subscription lapsed
    pub expired_marker: String,

    /// CSS selector of the element holding the expiry notice
    pub expired_message_selector: Option<String>,
}

/// Navigate to the landing page once and classify where it ends up.
///
/// A failed navigation gets exactly one retry after `intervention` returns.
pub fn verify(page: &dyn DocumentPage, check: &AuthCheck, intervention: &dyn Intervention) -> Result<AuthStatus> {
    log::info!("Verifying authentication via {}", check.landing_url);

    if let Err(e) = page.goto(&check.landing_url) {
        log::warn!("Landing page navigation failed: {}", e);
        intervention.wait_for_user("Could not reach the authenticated landing page. Resolve it in the browser window.")?;
        page.goto(&check.landing_url)
            .map_err(|e| AcquireError::Authentication(AuthStatus::Unreachable { reason: e.to_string() }))?;
    }

    let landed = page.current_url();
    let status = classify(&landed, check, || expiry_message(page, check));
    log::info!("Authentication status: {}", status);
    Ok(status)
}

fn classify(landed: &str, check: &AuthCheck, expiry_message: impl FnOnce() -> Option<String>) -> AuthStatus {
    if !check.expired_marker.is_empty() && landed.contains(&check.expired_marker) {
        return AuthStatus::SubscriptionExpired { message: expiry_message() };
    }

    if !same_origin(landed, &check.expected_origin) {
        return AuthStatus::LoginFailed { landed_url: landed.to_string() };
    }

    AuthStatus::Authenticated
}

fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

fn expiry_message(page: &dyn DocumentPage, check: &AuthCheck) -> Option<String> {
    let selector = check.expired_message_selector.as_deref()?;
    let selector = serde_json::to_string(selector).ok()?;
    let script = format!("(() => {{ const el = document.querySelector({}); return el ? el.innerText : null; }})()", selector);

    page.eval_string(&script).ok().flatten().map(|m| m.trim().to_string()).filter(|m| !m.is_empty())
}
