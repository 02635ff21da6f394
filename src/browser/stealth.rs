//! Anti-detection countermeasures for managed browser pages
//!
//! Two layers: an init script that runs before any page script and normalizes the
//! navigator properties automation checks look at, and a request interceptor that keeps
//! the `sec-ch-ua` client hint consistent with the advertised user agent.

use crate::browser::config::BrowserProfile;
use headless_chrome::{
    browser::{
        tab::{RequestInterceptor, RequestPausedDecision},
        transport::{SessionId, Transport},
    },
    protocol::cdp::Fetch::{self, events::RequestPausedEvent},
};
use std::sync::Arc;

const CLIENT_HINT_HEADER: &str = "sec-ch-ua";

/// Init script masking automation fingerprints for the given profile
pub fn stealth_script(profile: &BrowserProfile) -> String {
    let languages: Vec<&str> = profile
        .accept_language
        .split(',')
        .map(|l| l.split(';').next().unwrap_or_default().trim())
        .filter(|l| !l.is_empty())
        .collect();
    let languages = serde_json::to_string(&languages).unwrap_or_else(|_| "[\"en-US\"]".to_string());
    let platform = serde_json::to_string(&profile.platform).unwrap_or_else(|_| "\"Win32\"".to_string());
    let language = serde_json::to_string(&profile.locale).unwrap_or_else(|_| "\"en-US\"".to_string());

    format!(
        r#"(() => {{
    const define = (key, value) => {{
        try {{
            Object.defineProperty(Navigator.prototype, key, {{ get: () => value, configurable: true }});
        }} catch (_) {{}}
    }};
    define('webdriver', undefined);
    define('platform', {platform});
    define('language', {language});
    define('languages', Object.freeze({languages}));
    define('hardwareConcurrency', {concurrency});
    define('deviceMemory', {memory});
    const plugins = [
        {{ name: 'PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }},
        {{ name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }},
        {{ name: 'Chromium PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }},
    ];
    define('plugins', Object.freeze(plugins));
    if (!window.chrome) {{
        window.chrome = {{ runtime: {{}} }};
    }}
}})();"#,
        concurrency = profile.hardware_concurrency,
        memory = profile.device_memory,
    )
}

/// Header list for a paused request with the client hint rewritten.
///
/// Returns `None` for `file:` URLs, which are passed through untouched.
pub fn rewrite_client_hint(url: &str, headers: &serde_json::Value, client_hint: &str) -> Option<Vec<(String, String)>> {
    if url.starts_with("file:") {
        return None;
    }

    let mut rewritten: Vec<(String, String)> = headers
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(name, _)| !name.eq_ignore_ascii_case(CLIENT_HINT_HEADER))
                .map(|(name, value)| {
                    let value = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                    (name.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default();

    rewritten.push((CLIENT_HINT_HEADER.to_string(), client_hint.to_string()));
    Some(rewritten)
}

/// Fetch-domain interceptor applying [`rewrite_client_hint`] to every paused request
pub struct ClientHintInterceptor {
    client_hint: String,
}

impl ClientHintInterceptor {
    pub fn new(client_hint: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { client_hint: client_hint.into() })
    }
}

impl RequestInterceptor for ClientHintInterceptor {
    fn intercept(&self, _transport: Arc<Transport>, _session_id: SessionId, event: RequestPausedEvent) -> RequestPausedDecision {
        let request = &event.params.request;
        let headers = serde_json::to_value(&request.headers).unwrap_or(serde_json::Value::Null);

        let Some(rewritten) = rewrite_client_hint(&request.url, &headers, &self.client_hint) else {
            return RequestPausedDecision::Continue(None);
        };

        let entries: Vec<serde_json::Value> =
            rewritten.into_iter().map(|(name, value)| serde_json::json!({ "name": name, "value": value })).collect();

        let params = serde_json::json!({ "requestId": event.params.request_id, "headers": entries });
        match serde_json::from_value::<Fetch::ContinueRequest>(params) {
            Ok(continue_request) => RequestPausedDecision::Continue(Some(continue_request)),
            Err(e) => {
                log::debug!("Passing request through unmodified: {}", e);
                RequestPausedDecision::Continue(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_replaces_existing_hint_case_insensitively() {
        let headers = serde_json::json!({
            "Accept": "text/html",
            "Sec-CH-UA": "\"HeadlessChrome\";v=\"131\"",
        });
        let rewritten = rewrite_client_hint("https://portal.example/a", &headers, "\"Google Chrome\";v=\"131\"").unwrap();

        let hints: Vec<_> = rewritten.iter().filter(|(n, _)| n.eq_ignore_ascii_case("sec-ch-ua")).collect();
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].1, "\"Google Chrome\";v=\"131\"");
        assert!(rewritten.contains(&("Accept".to_string(), "text/html".to_string())));
    }

    #[test]
    fn test_rewrite_adds_hint_when_missing() {
        let rewritten = rewrite_client_hint("https://portal.example", &serde_json::Value::Null, "x").unwrap();
        assert_eq!(rewritten, vec![("sec-ch-ua".to_string(), "x".to_string())]);
    }

    #[test]
    fn test_rewrite_skips_file_scheme() {
        assert!(rewrite_client_hint("file:///tmp/a.html", &serde_json::json!({}), "x").is_none());
    }

    #[test]
    fn test_stealth_script_reflects_profile() {
        let profile = BrowserProfile { platform: "MacIntel".into(), hardware_concurrency: 4, ..Default::default() };
        let script = stealth_script(&profile);
        assert!(script.contains("define('webdriver', undefined)"));
        assert!(script.contains("\"MacIntel\""));
        assert!(script.contains("define('hardwareConcurrency', 4)"));
        assert!(script.contains("[\"en-US\",\"en\"]"));
    }
}
