//! One acquisition run: session → browser → auth check → per-phase resolve and persist

use crate::{
    auth::{AuthCheck, Intervention, verify},
    browser::{BrowserContextManager, ConnectionOptions, DocumentPage, LaunchOptions},
    config::{AcquireConfig, ManualPhase},
    error::{AcquireError, Result},
    http::{PortalClient, PortalFetch},
    persist::{SaveOptions, TraversalResult, persist},
    session::{SessionBridge, collapse_header_lines, transform},
    tree::{ManualEra, ResolvedTree, legacy, modern, safe_file_name},
};
use std::{path::PathBuf, time::Duration};

/// Outcome of one manual phase
#[derive(Debug, Clone)]
pub struct PhaseSummary {
    pub name: String,
    pub output_dir: PathBuf,
    pub result: TraversalResult,
}

/// Outcome of a whole run; recoverable node failures end up here
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub phases: Vec<PhaseSummary>,
}

impl RunSummary {
    pub fn saved(&self) -> usize {
        self.phases.iter().map(|p| p.result.saved()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.phases.iter().map(|p| p.result.skipped()).sum()
    }

    /// `(phase, node id)` for every failed node
    pub fn failed_nodes(&self) -> Vec<(&str, &str)> {
        self.phases
            .iter()
            .flat_map(|p| p.result.failed().into_iter().map(move |o| (p.name.as_str(), o.node_id.as_str())))
            .collect()
    }

    pub fn log(&self) {
        let failed = self.failed_nodes();
        log::info!("Done: {} saved, {} skipped, {} failed", self.saved(), self.skipped(), failed.len());
        for (phase, node_id) in failed {
            log::warn!("Failed node in {}: {}", phase, node_id);
        }
    }
}

/// Where the run's browser comes from
#[derive(Debug, Clone)]
pub enum BrowserSource {
    Launch(LaunchOptions),
    Attach(ConnectionOptions),
}

/// Run every configured phase. Setup, authentication and plan failures abort the run;
/// node failures abort it only when `ignore_save_errors` is off.
pub fn run(config: &AcquireConfig, source: BrowserSource, intervention: &dyn Intervention) -> Result<RunSummary> {
    for dir in [&config.output_dir, &config.cache_dir] {
        std::fs::create_dir_all(dir)
            .map_err(|e| AcquireError::Setup(format!("Cannot create directory {}: {}", dir.display(), e)))?;
    }

    let http = PortalClient::new(&config.browser.user_agent, Duration::from_secs(config.http_timeout_secs))?;
    let mut bridge = SessionBridge::new(http);
    let context = open_context(config, source, &mut bridge, intervention)?;

    let outcome = run_phases(config, &context, &bridge, intervention);
    let closed = context.close();

    let summary = outcome?;
    closed?;
    summary.log();
    Ok(summary)
}

fn open_context(
    config: &AcquireConfig,
    source: BrowserSource,
    bridge: &mut SessionBridge,
    intervention: &dyn Intervention,
) -> Result<BrowserContextManager> {
    match source {
        BrowserSource::Launch(options) => {
            let credentials = transform(&collapse_header_lines(&config.cookie_string));
            if credentials.is_empty() {
                log::warn!("No cookies configured; relying on the saved browser state");
            }
            bridge.apply(credentials)?;

            BrowserContextManager::launch(
                &options,
                config.browser.clone(),
                bridge.credentials(),
                &config.portal.cookie_domain,
                config.storage_state_path(),
            )
        }
        BrowserSource::Attach(options) => {
            let context = BrowserContextManager::attach(options, config.browser.clone())?;
            let jar = context.cookie_source()?;
            let origins = &config.portal.harvest_origins;
            let hint = &config.portal.cookie_domain_hint;

            if !bridge.replace_from_harvest(&*jar, origins, hint)? {
                intervention.wait_for_user("No portal session found in the attached browser. Sign in there first.")?;
                if !bridge.replace_from_harvest(&*jar, origins, hint)? {
                    return Err(AcquireError::NoSessionCookies);
                }
            }

            Ok(context)
        }
    }
}

fn run_phases(
    config: &AcquireConfig,
    context: &BrowserContextManager,
    bridge: &SessionBridge,
    intervention: &dyn Intervention,
) -> Result<RunSummary> {
    let check = AuthCheck {
        landing_url: config.portal.landing_url.clone(),
        expected_origin: config.portal.authenticated_origin.clone(),
        expired_marker: config.portal.expired_marker.clone(),
        expired_message_selector: config.portal.expired_message_selector.clone(),
    };

    let first_page = context.new_page()?;
    let status = verify(&*first_page, &check, intervention)?;
    if !status.is_authenticated() {
        return Err(AcquireError::Authentication(status));
    }

    let options = config.save_options();
    let mut summary = RunSummary::default();
    let mut first_page = Some(first_page);

    for phase in &config.phases {
        let page = match first_page.take() {
            Some(page) => page,
            None => context.new_page()?,
        };
        summary.phases.push(run_phase(config, phase, bridge.http(), &*page, &options)?);
    }

    Ok(summary)
}

/// Resolve one manual and persist it into `<output_dir>/<phase name>`
pub fn run_phase(
    config: &AcquireConfig,
    phase: &ManualPhase,
    fetch: &dyn PortalFetch,
    page: &dyn DocumentPage,
    options: &SaveOptions,
) -> Result<PhaseSummary> {
    log::info!("Acquiring {} ({}, {:?})", phase.name, phase.year, phase.era());
    let tree = resolve_phase(config, phase, fetch)?;

    let output_dir = config.output_dir.join(safe_file_name(&phase.name));
    tree.write_index_files(&output_dir)?;
    let result = persist(&tree, &output_dir, page, options)?;

    Ok(PhaseSummary { name: phase.name.clone(), output_dir, result })
}

fn resolve_phase(config: &AcquireConfig, phase: &ManualPhase, fetch: &dyn PortalFetch) -> Result<ResolvedTree> {
    let portal = &config.portal;
    match phase.era() {
        ManualEra::Modern => modern::resolve(fetch, &modern::ModernSource {
            tree_url: phase.fill(&portal.tree_url),
            cover_url: portal.cover_url.as_deref().map(|url| phase.fill(url)),
            document_url_template: phase.fill(&portal.document_url),
            root_title: phase.name.clone(),
        }),
        ManualEra::Legacy => {
            legacy::resolve(fetch, &phase.fill(&portal.index_url), portal.index_link_selector.as_deref())
        }
    }
}
