//! Plain HTTP channel to the portal
//!
//! The client carries the session cookie as a default header, so every request made
//! after [`PortalClient::with_cookie_header`] is authenticated the same way the browser is.

use crate::error::{AcquireError, Result};
use reqwest::{
    blocking::Client,
    header::{COOKIE, HeaderMap, HeaderValue},
};
use std::time::Duration;

/// Minimal fetch capability the document tree resolver depends on
pub trait PortalFetch {
    /// GET `url` and return the response body as text; non-2xx statuses are errors
    fn get_text(&self, url: &str) -> Result<String>;
}

/// Blocking reqwest client with a default `Cookie` header
#[derive(Debug, Clone)]
pub struct PortalClient {
    client: Client,
    user_agent: String,
    timeout: Duration,
}

impl PortalClient {
    /// Build a client without session cookies
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self> {
        let user_agent = user_agent.into();
        let client = Self::build(&user_agent, timeout, HeaderMap::new())?;
        Ok(Self { client, user_agent, timeout })
    }

    /// Rebuild the client so every subsequent request sends `header` as its cookie
    pub fn with_cookie_header(&self, header: &str) -> Result<Self> {
        let mut defaults = HeaderMap::new();
        if !header.is_empty() {
            let value = HeaderValue::from_str(header)
                .map_err(|e| AcquireError::Config(format!("Cookie header is not a valid header value: {}", e)))?;
            defaults.insert(COOKIE, value);
        }
        let client = Self::build(&self.user_agent, self.timeout, defaults)?;
        Ok(Self { client, user_agent: self.user_agent.clone(), timeout: self.timeout })
    }

    fn build(user_agent: &str, timeout: Duration, defaults: HeaderMap) -> Result<Client> {
        Client::builder()
            .user_agent(user_agent)
            .default_headers(defaults)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| AcquireError::Setup(format!("Failed to build HTTP client: {}", e)))
    }
}

impl PortalFetch for PortalClient {
    fn get_text(&self, url: &str) -> Result<String> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }
}
