use crate::{
    error::Result,
    http::PortalClient,
    session::cookies::{Credentials, StructuredCookie, from_browser_cookies},
};

/// Read access to the cookies stored in a browser context
pub trait CookieJar {
    /// Cookies that would be sent to any of `urls`
    fn cookies_for_urls(&self, urls: &[String]) -> Result<Vec<StructuredCookie>>;

    /// Every cookie in the context, regardless of scope
    fn all_cookies(&self) -> Result<Vec<StructuredCookie>>;
}

/// Owner of the run's current credentials and of the HTTP channel that carries them
#[derive(Debug)]
pub struct SessionBridge {
    credentials: Credentials,
    http: PortalClient,
}

impl SessionBridge {
    /// Start with an unauthenticated HTTP client and empty credentials
    pub fn new(http: PortalClient) -> Self {
        Self { credentials: Credentials::default(), http }
    }

    /// Make `credentials` current: the HTTP client's default cookie header is replaced and
    /// any context created afterwards injects the same structured cookies.
    pub fn apply(&mut self, credentials: Credentials) -> Result<()> {
        self.http = self.http.with_cookie_header(&credentials.processed_header)?;
        log::info!("Session credentials applied ({} cookies)", credentials.cookies.len());
        self.credentials = credentials;
        Ok(())
    }

    /// Harvest credentials from an attached browser and make them current.
    ///
    /// Returns `false` when the context holds no matching cookies; the caller should ask the
    /// user to sign in manually.
    pub fn replace_from_harvest(&mut self, jar: &dyn CookieJar, origins: &[String], domain_hint: &str) -> Result<bool> {
        match harvest(jar, origins, domain_hint)? {
            Some(credentials) => {
                self.apply(credentials)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn http(&self) -> &PortalClient {
        &self.http
    }
}

/// Read authentication cookies already present in a browser context.
///
/// The prioritized `origins` are tried first; the first one yielding cookies wins. If none
/// does, every cookie whose domain contains `domain_hint` is taken instead. The substring
/// match is a heuristic: it also accepts unrelated hosts that happen to contain the hint
/// and misses cookies scoped to a domain spelled differently.
pub fn harvest(jar: &dyn CookieJar, origins: &[String], domain_hint: &str) -> Result<Option<Credentials>> {
    for origin in origins {
        let cookies = jar.cookies_for_urls(std::slice::from_ref(origin))?;
        if !cookies.is_empty() {
            log::debug!("Harvested {} cookies for {}", cookies.len(), origin);
            return Ok(Some(from_browser_cookies(cookies)));
        }
    }

    if domain_hint.is_empty() {
        return Ok(None);
    }

    let matched: Vec<StructuredCookie> = jar
        .all_cookies()?
        .into_iter()
        .filter(|c| c.domain.as_deref().is_some_and(|d| d.contains(domain_hint)))
        .collect();

    if matched.is_empty() {
        return Ok(None);
    }

    log::debug!("Harvested {} cookies by domain match on '{}'", matched.len(), domain_hint);
    Ok(Some(from_browser_cookies(matched)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FakeJar {
        cookies: Vec<StructuredCookie>,
    }

    impl CookieJar for FakeJar {
        fn cookies_for_urls(&self, urls: &[String]) -> Result<Vec<StructuredCookie>> {
            Ok(self
                .cookies
                .iter()
                .filter(|c| {
                    let domain = c.domain.as_deref().unwrap_or_default().trim_start_matches('.');
                    urls.iter().any(|u| {
                        url::Url::parse(u)
                            .ok()
                            .and_then(|u| u.host_str().map(str::to_string))
                            .is_some_and(|host| host == domain || host.ends_with(&format!(".{}", domain)))
                    })
                })
                .cloned()
                .collect())
        }

        fn all_cookies(&self) -> Result<Vec<StructuredCookie>> {
            Ok(self.cookies.clone())
        }
    }

    fn origins() -> Vec<String> {
        vec!["https://www.portal.example".to_string(), "https://portal.example".to_string()]
    }

    #[test]
    fn test_harvest_prefers_origin_lookup() {
        let jar = FakeJar {
            cookies: vec![
                StructuredCookie::new("sid", "1").scoped(".portal.example", "/"),
                StructuredCookie::new("other", "2").scoped("unrelated.test", "/"),
            ],
        };
        let creds = harvest(&jar, &origins(), "portal").unwrap().unwrap();
        assert_eq!(creds.processed_header, "sid=1");
    }

    #[test]
    fn test_harvest_falls_back_to_domain_substring() {
        // only a content-delivery subdomain cookie, nothing for the portal origins
        let jar = FakeJar { cookies: vec![StructuredCookie::new("cdn_auth", "tok").scoped("cdn.portalcontent.net", "/")] };
        let creds = harvest(&jar, &origins(), "portalcontent").unwrap();
        let creds = creds.expect("fallback should find the subdomain cookie");
        assert!(!creds.is_empty());
        assert_eq!(creds.cookies[0].name, "cdn_auth");
    }

    #[test]
    fn test_harvest_returns_none_when_nothing_matches() {
        let jar = FakeJar { cookies: vec![StructuredCookie::new("x", "1").scoped("elsewhere.test", "/")] };
        assert!(harvest(&jar, &origins(), "portal").unwrap().is_none());
        assert!(harvest(&jar, &origins(), "").unwrap().is_none());
    }

    #[test]
    fn test_apply_and_replace_from_harvest() {
        let http = PortalClient::new("test-agent", Duration::from_secs(5)).unwrap();
        let mut bridge = SessionBridge::new(http);
        assert!(bridge.credentials().is_empty());

        let empty = FakeJar { cookies: vec![] };
        assert!(!bridge.replace_from_harvest(&empty, &origins(), "portal").unwrap());
        assert!(bridge.credentials().is_empty());

        let jar = FakeJar { cookies: vec![StructuredCookie::new("sid", "abc").scoped("www.portal.example", "/")] };
        assert!(bridge.replace_from_harvest(&jar, &origins(), "portal").unwrap());
        assert_eq!(bridge.credentials().processed_header, "sid=abc");
    }
}
