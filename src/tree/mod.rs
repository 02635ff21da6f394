//! Document tree resolution
//!
//! A manual's content comes in one of two shapes, picked by model year:
//! - [`modern`]: a nested category tree fetched as JSON, plus a cover page
//! - [`legacy`]: a flat alphabetical index page
//!
//! Both resolve to a [`ResolvedTree`], which lowers to one pre-order [`PlanStep`] sequence
//! so the persistence engine has a single execution path.

pub mod legacy;
pub mod modern;
pub mod naming;
pub mod node;

pub use naming::safe_file_name;
pub use node::{ContentNode, FlatDocumentEntry, NodeKind, PlanStep, StepAction};

use crate::{
    error::{AcquireError, Result},
    persist::write_atomic,
};
use naming::SiblingNames;
use std::path::{Path, PathBuf};

/// First model year published with the nested content tree
pub const MODERN_ERA_START_YEAR: u16 = 2003;

pub const LEGACY_TOC_FILE: &str = "AAA_Table_Of_Contents.html";
pub const LEGACY_ORIGINAL_TOC_FILE: &str = "AA_originalTableOfContents.html";
pub const LEGACY_INDEX_FILE: &str = "AA_alphabeticalIndex.json";
pub const MODERN_COVER_FILE: &str = "AAA_Cover.html";
pub const MODERN_TOC_FILE: &str = "AA_tableOfContents.json";

/// Which tree shape a manual uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualEra {
    Modern,
    Legacy,
}

impl ManualEra {
    pub fn for_year(year: u16) -> Self {
        if year >= MODERN_ERA_START_YEAR { Self::Modern } else { Self::Legacy }
    }
}

/// A fully fetched traversal plan source
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTree {
    Modern {
        root: ContentNode,
        cover_html: Option<String>,
        /// Template with a `{ref}` placeholder
        document_url_template: String,
    },
    Legacy {
        documents: Vec<FlatDocumentEntry>,
        page_html: String,
        /// `page_html` with document links pointing at the local artifacts
        modified_html: String,
    },
}

impl ResolvedTree {
    /// Number of nodes a traversal visits
    pub fn node_count(&self) -> usize {
        match self {
            Self::Modern { root, .. } => root.count(),
            Self::Legacy { documents, .. } => documents.len(),
        }
    }

    /// Lower the tree to pre-order steps: every directory step precedes the steps of
    /// everything beneath it.
    pub fn plan(&self) -> Result<Vec<PlanStep>> {
        match self {
            Self::Modern { root, document_url_template, .. } => {
                let mut steps = Vec::with_capacity(root.count());
                plan_node(root, PathBuf::new(), document_url_template, &mut steps)?;
                Ok(steps)
            }
            Self::Legacy { documents, .. } => Ok(documents
                .iter()
                .zip(legacy::file_names(documents))
                .map(|(entry, name)| PlanStep {
                    node_id: entry.source_ref.clone(),
                    title: entry.title.clone(),
                    action: StepAction::Document { url: entry.source_ref.clone(), rel_base: PathBuf::from(name) },
                })
                .collect()),
        }
    }

    /// Write the archival index files into `output_root`
    pub fn write_index_files(&self, output_root: &Path) -> Result<()> {
        std::fs::create_dir_all(output_root)?;

        match self {
            Self::Modern { root, cover_html, .. } => {
                write_atomic(&output_root.join(MODERN_TOC_FILE), &serde_json::to_vec_pretty(root)?)?;
                if let Some(cover) = cover_html {
                    write_atomic(&output_root.join(MODERN_COVER_FILE), cover.as_bytes())?;
                }
            }
            Self::Legacy { documents, page_html, modified_html } => {
                write_atomic(&output_root.join(LEGACY_TOC_FILE), modified_html.as_bytes())?;
                write_atomic(&output_root.join(LEGACY_ORIGINAL_TOC_FILE), page_html.as_bytes())?;
                write_atomic(&output_root.join(LEGACY_INDEX_FILE), &serde_json::to_vec_pretty(documents)?)?;
            }
        }

        Ok(())
    }
}

fn plan_node(node: &ContentNode, rel_path: PathBuf, url_template: &str, steps: &mut Vec<PlanStep>) -> Result<()> {
    match node.kind {
        NodeKind::Document => {
            let source_ref = node.source_ref.as_deref().unwrap_or(&node.id);
            if source_ref.is_empty() {
                return Err(AcquireError::PlanAcquisition(format!("Document '{}' has no locator", node.title)));
            }
            steps.push(PlanStep {
                node_id: node.id.clone(),
                title: node.title.clone(),
                action: StepAction::Document { url: modern::document_url(url_template, source_ref), rel_base: rel_path },
            });
        }
        NodeKind::Category => {
            steps.push(PlanStep {
                node_id: node.id.clone(),
                title: node.title.clone(),
                action: StepAction::Directory { rel_path: rel_path.clone() },
            });

            let mut names = SiblingNames::new();
            for child in &node.children {
                let child_path = rel_path.join(names.claim(&child.title, &child.id));
                plan_node(child, child_path, url_template, steps)?;
            }
        }
    }

    Ok(())
}
