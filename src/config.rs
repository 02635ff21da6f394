use crate::{
    browser::BrowserProfile,
    error::{AcquireError, Result},
    persist::SaveOptions,
    tree::ManualEra,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Portal locations and markers. URL templates accept `{name}`, `{year}` and any key of
/// the phase's `params`; the document template also keeps a `{ref}` placeholder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortalEndpoints {
    /// Page only reachable with a valid session
    pub landing_url: String,
    pub authenticated_origin: String,
    pub expired_marker: String,
    pub expired_message_selector: Option<String>,

    /// Origins whose cookies are read first when attaching to a running browser
    pub harvest_origins: Vec<String>,

    /// Domain substring for the fallback cookie scan
    pub cookie_domain_hint: String,

    /// Domain given to injected cookies
    pub cookie_domain: String,

    pub tree_url: String,
    pub cover_url: Option<String>,
    pub document_url: String,

    pub index_url: String,
    pub index_link_selector: Option<String>,
}

/// One manual (e.g. workshop or wiring) acquired into its own subdirectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPhase {
    pub name: String,
    pub year: u16,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl ManualPhase {
    pub fn era(&self) -> ManualEra {
        ManualEra::for_year(self.year)
    }

    /// Substitute this phase's values into a URL template
    pub fn fill(&self, template: &str) -> String {
        let mut filled = template.replace("{name}", &self.name).replace("{year}", &self.year.to_string());
        for (key, value) in &self.params {
            filled = filled.replace(&format!("{{{}}}", key), value);
        }
        filled
    }
}

/// Everything a run needs, loaded from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AcquireConfig {
    /// Cookie header copied from a signed-in browser; may span several lines
    pub cookie_string: String,

    pub output_dir: PathBuf,

    /// Holds the browser storage state between managed runs
    pub cache_dir: PathBuf,

    pub portal: PortalEndpoints,
    pub browser: BrowserProfile,
    pub phases: Vec<ManualPhase>,

    pub save_html: bool,
    pub ignore_save_errors: bool,
    pub resume: bool,

    /// `[min, max]` pause between document navigations, in milliseconds
    pub pause_ms: Option<(u64, u64)>,

    pub http_timeout_secs: u64,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            cookie_string: String::new(),
            output_dir: PathBuf::from("manual"),
            cache_dir: dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache")).join("manual-fetch"),
            portal: PortalEndpoints::default(),
            browser: BrowserProfile::default(),
            phases: Vec::new(),
            save_html: false,
            ignore_save_errors: false,
            resume: false,
            pause_ms: Some((500, 2500)),
            http_timeout_secs: 60,
        }
    }
}

impl AcquireConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AcquireError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| AcquireError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every phase has the endpoints its era needs
    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            return Err(AcquireError::Config("No manual phases configured".to_string()));
        }
        if self.portal.landing_url.is_empty() || self.portal.authenticated_origin.is_empty() {
            return Err(AcquireError::Config("portal.landingUrl and portal.authenticatedOrigin are required".to_string()));
        }

        for phase in &self.phases {
            let missing = match phase.era() {
                ManualEra::Modern if self.portal.tree_url.is_empty() => Some("portal.treeUrl"),
                ManualEra::Modern if !self.portal.document_url.contains("{ref}") => Some("portal.documentUrl with {ref}"),
                ManualEra::Legacy if self.portal.index_url.is_empty() => Some("portal.indexUrl"),
                _ => None,
            };
            if let Some(missing) = missing {
                return Err(AcquireError::Config(format!("Phase '{}' ({}) needs {}", phase.name, phase.year, missing)));
            }
        }

        Ok(())
    }

    pub fn save_options(&self) -> SaveOptions {
        let options =
            SaveOptions::new().save_html(self.save_html).ignore_save_errors(self.ignore_save_errors).resume(self.resume);
        match self.pause_ms {
            Some((min, max)) => options.pause_ms(min, max),
            None => options,
        }
    }

    pub fn storage_state_path(&self) -> PathBuf {
        self.cache_dir.join("storage_state.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "cookieString": "a=1;\n b=2",
        "outputDir": "/tmp/manuals",
        "portal": {
            "landingUrl": "https://www.portal.example/content/home",
            "authenticatedOrigin": "https://www.portal.example",
            "expiredMarker": "subscriptionExpired",
            "treeUrl": "https://www.portal.example/api/tree?v={vehicleId}&year={year}",
            "documentUrl": "https://www.portal.example/doc/{ref}?v={vehicleId}",
            "indexUrl": "https://www.portal.example/index/{year}/alpha.html"
        },
        "phases": [
            { "name": "Workshop", "year": 2012, "params": { "vehicleId": "F150" } },
            { "name": "Workshop", "year": 1999 }
        ],
        "pauseMs": [100, 200]
    }"#;

    #[test]
    fn test_parse_and_defaults() {
        let config = AcquireConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.phases.len(), 2);
        assert_eq!(config.http_timeout_secs, 60);
        assert!(!config.save_html);
        assert_eq!(config.browser, BrowserProfile::default());
        assert_eq!(config.save_options().pause_ms, Some((100, 200)));
        assert!(config.storage_state_path().ends_with("storage_state.json"));
    }

    #[test]
    fn test_phase_fill() {
        let config = AcquireConfig::from_json(CONFIG).unwrap();
        let phase = &config.phases[0];
        assert_eq!(phase.era(), ManualEra::Modern);
        assert_eq!(phase.fill(&config.portal.tree_url), "https://www.portal.example/api/tree?v=F150&year=2012");
        assert_eq!(phase.fill(&config.portal.document_url), "https://www.portal.example/doc/{ref}?v=F150");
        assert_eq!(config.phases[1].era(), ManualEra::Legacy);
    }

    #[test]
    fn test_validate_missing_endpoint() {
        let json = r#"{
            "portal": { "landingUrl": "https://p/home", "authenticatedOrigin": "https://p" },
            "phases": [{ "name": "Old", "year": 1998 }]
        }"#;
        let err = AcquireConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("portal.indexUrl"));
    }

    #[test]
    fn test_validate_no_phases() {
        assert!(AcquireConfig::from_json("{}").is_err());
    }
}
