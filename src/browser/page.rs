use crate::{
    error::{AcquireError, Result},
    session::{CookieJar, StructuredCookie},
};
use headless_chrome::{Tab, protocol::cdp::Network};
use serde::de::DeserializeOwned;

/// The page operations the verifier and persistence engine need from a driven browser
pub trait DocumentPage {
    /// Navigate to `url` and wait until the load completes
    fn goto(&self, url: &str) -> Result<()>;

    /// URL the page currently shows (after redirects)
    fn current_url(&self) -> String;

    /// Rendered markup of the current document
    fn content(&self) -> Result<String>;

    /// Print the current document to PDF
    fn print_pdf(&self) -> Result<Vec<u8>>;

    /// Evaluate `script` and return its value if it is a string
    fn eval_string(&self, script: &str) -> Result<Option<String>>;
}

impl DocumentPage for Tab {
    fn goto(&self, url: &str) -> Result<()> {
        self.navigate_to(url)
            .map_err(|e| AcquireError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?
            .wait_until_navigated()
            .map_err(|e| AcquireError::NavigationFailed(format!("Navigation to {} did not complete: {}", url, e)))?;

        Ok(())
    }

    fn current_url(&self) -> String {
        self.get_url()
    }

    fn content(&self) -> Result<String> {
        self.get_content().map_err(|e| AcquireError::PageOperationFailed(format!("Failed to read page content: {}", e)))
    }

    fn print_pdf(&self) -> Result<Vec<u8>> {
        self.print_to_pdf(None).map_err(|e| AcquireError::PageOperationFailed(format!("Failed to print PDF: {}", e)))
    }

    fn eval_string(&self, script: &str) -> Result<Option<String>> {
        let result =
            self.evaluate(script, false).map_err(|e| AcquireError::PageOperationFailed(format!("Evaluation failed: {}", e)))?;

        Ok(result.value.and_then(|v| v.as_str().map(str::to_string)))
    }
}

impl CookieJar for Tab {
    fn cookies_for_urls(&self, urls: &[String]) -> Result<Vec<StructuredCookie>> {
        let command: Network::GetCookies = cdp_command(serde_json::json!({ "urls": urls }))?;
        let cookies = self
            .call_method(command)
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to read cookies: {}", e)))?
            .cookies;

        Ok(cookies.into_iter().map(|c| StructuredCookie::new(c.name, c.value).scoped(c.domain, c.path)).collect())
    }

    fn all_cookies(&self) -> Result<Vec<StructuredCookie>> {
        let cookies = self
            .call_method(Network::GetAllCookies(None))
            .map_err(|e| AcquireError::PageOperationFailed(format!("Failed to read cookies: {}", e)))?
            .cookies;

        Ok(cookies.into_iter().map(|c| StructuredCookie::new(c.name, c.value).scoped(c.domain, c.path)).collect())
    }
}

/// Write cookies into the browser context the tab belongs to.
///
/// Cookies without a domain get `default_domain`; cookies without a path get `/`.
pub fn inject_cookies(tab: &Tab, cookies: &[StructuredCookie], default_domain: &str) -> Result<()> {
    if cookies.is_empty() {
        return Ok(());
    }

    let params: Vec<serde_json::Value> = cookies
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "value": c.value,
                "domain": c.domain.as_deref().unwrap_or(default_domain),
                "path": c.path.as_deref().unwrap_or("/"),
            })
        })
        .collect();

    let command: Network::SetCookies = cdp_command(serde_json::json!({ "cookies": params }))?;
    tab.call_method(command).map_err(|e| AcquireError::PageOperationFailed(format!("Failed to set cookies: {}", e)))?;

    log::debug!("Injected {} cookies", cookies.len());
    Ok(())
}

/// Build a CDP command from its JSON parameters.
///
/// The generated protocol structs gain optional fields between Chrome revisions; going
/// through serde keeps unset fields at `None` whatever the revision is.
pub(crate) fn cdp_command<C: DeserializeOwned>(params: serde_json::Value) -> Result<C> {
    serde_json::from_value(params)
        .map_err(|e| AcquireError::PageOperationFailed(format!("Invalid DevTools command parameters: {}", e)))
}
