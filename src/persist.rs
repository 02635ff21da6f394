//! Tree persistence: walks a resolved plan on one shared page and writes the artifacts

use crate::{
    browser::DocumentPage,
    error::{AcquireError, Result},
    tree::{PlanStep, ResolvedTree, StepAction},
};
use rand::Rng;
use serde::Serialize;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

/// Options applied uniformly to every node of a traversal
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Also keep the rendered HTML next to the PDF
    pub save_html: bool,

    /// Record node failures and keep going instead of aborting the run
    pub ignore_save_errors: bool,

    /// Skip documents whose PDF already exists
    pub resume: bool,

    /// Random pause between document navigations, in milliseconds (min, max)
    pub pause_ms: Option<(u64, u64)>,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: keep rendered HTML
    pub fn save_html(mut self, save_html: bool) -> Self {
        self.save_html = save_html;
        self
    }

    /// Builder method: continue past node failures
    pub fn ignore_save_errors(mut self, ignore: bool) -> Self {
        self.ignore_save_errors = ignore;
        self
    }

    /// Builder method: skip documents already saved
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Builder method: pause between navigations
    pub fn pause_ms(mut self, min: u64, max: u64) -> Self {
        self.pause_ms = Some((min.min(max), max.max(min)));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Saved,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeOutcome {
    pub node_id: String,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Per-node outcomes of a traversal, in visit order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalResult {
    pub outcomes: Vec<NodeOutcome>,
}

impl TraversalResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn count(&self, status: NodeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn saved(&self) -> usize {
        self.count(NodeStatus::Saved)
    }

    pub fn skipped(&self) -> usize {
        self.count(NodeStatus::Skipped)
    }

    /// Failed outcomes, in visit order
    pub fn failed(&self) -> Vec<&NodeOutcome> {
        self.outcomes.iter().filter(|o| o.status == NodeStatus::Failed).collect()
    }

    /// Append another traversal's outcomes
    pub fn extend(&mut self, other: TraversalResult) {
        self.outcomes.extend(other.outcomes);
    }

    fn record(&mut self, node_id: &str, status: NodeStatus, error_detail: Option<String>) {
        self.outcomes.push(NodeOutcome { node_id: node_id.to_string(), status, error_detail });
    }
}

/// Persist a resolved tree under `output_root`
pub fn persist(
    tree: &ResolvedTree,
    output_root: &Path,
    page: &dyn DocumentPage,
    options: &SaveOptions,
) -> Result<TraversalResult> {
    let steps = tree.plan()?;
    execute_plan(&steps, output_root, page, options)
}

/// Execute plan steps in order on one page.
///
/// With `ignore_save_errors` unset the first failing node aborts the traversal; the
/// returned [`AcquireError::TraversalAborted`] carries the outcomes recorded before it.
pub fn execute_plan(
    steps: &[PlanStep],
    output_root: &Path,
    page: &dyn DocumentPage,
    options: &SaveOptions,
) -> Result<TraversalResult> {
    std::fs::create_dir_all(output_root)
        .map_err(|e| AcquireError::Setup(format!("Cannot create output directory {}: {}", output_root.display(), e)))?;

    let total = steps.len();
    let mut result = TraversalResult::default();
    let mut navigated = false;

    for (i, step) in steps.iter().enumerate() {
        let outcome = match &step.action {
            StepAction::Directory { rel_path } => {
                std::fs::create_dir_all(output_root.join(rel_path)).map(|_| NodeStatus::Saved).map_err(AcquireError::from)
            }
            StepAction::Document { url, rel_base } => {
                log::info!("[{}/{}] {}", i + 1, total, step.title);
                save_document(page, url, &output_root.join(rel_base), options, &mut navigated)
            }
        };

        match outcome {
            Ok(status) => result.record(&step.node_id, status, None),
            Err(e) if options.ignore_save_errors => {
                log::warn!("Failed to save '{}' ({}): {}", step.title, step.node_id, e);
                result.record(&step.node_id, NodeStatus::Failed, Some(e.to_string()));
            }
            Err(e) => {
                log::error!("Aborting traversal at '{}' ({}): {}", step.title, step.node_id, e);
                return Err(AcquireError::TraversalAborted {
                    node_id: step.node_id.clone(),
                    reason: e.to_string(),
                    partial: result,
                });
            }
        }
    }

    Ok(result)
}

fn save_document(
    page: &dyn DocumentPage,
    url: &str,
    base: &Path,
    options: &SaveOptions,
    navigated: &mut bool,
) -> Result<NodeStatus> {
    let pdf_path = with_suffix(base, ".pdf");
    if options.resume && pdf_path.exists() {
        log::debug!("Already saved: {}", pdf_path.display());
        return Ok(NodeStatus::Skipped);
    }

    if *navigated {
        pace(options);
    }
    *navigated = true;

    page.goto(url)?;

    if options.save_html {
        let html = page.content()?;
        write_atomic(&with_suffix(base, ".html"), html.as_bytes())?;
    }

    let pdf = page.print_pdf()?;
    if pdf.is_empty() {
        return Err(AcquireError::PageOperationFailed(format!("Empty PDF for {}", url)));
    }
    write_atomic(&pdf_path, &pdf)?;

    Ok(NodeStatus::Saved)
}

fn pace(options: &SaveOptions) {
    if let Some((min, max)) = options.pause_ms {
        let ms = if max > min { rand::thread_rng().gen_range(min..=max) } else { min };
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Append a suffix without touching dots already in the name ("1.2 Brakes" stays intact)
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write `bytes` to a `.part` sibling, then rename it over `path`, so an interrupted write
/// never leaves a truncated artifact. The parent directory must already exist.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = with_suffix(path, ".part");
    std::fs::write(&tmp, bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
