use crate::error::{AcquireError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Kind of a node in the modern content tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[serde(alias = "folder", alias = "section")]
    Category,
    #[serde(alias = "page", alias = "doc", alias = "leaf")]
    Document,
}

/// One entry of the modern nested content tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(alias = "name")]
    pub title: String,

    #[serde(alias = "type")]
    pub kind: NodeKind,

    /// Ordered as the source returned them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,

    /// Opaque locator the resolver turns into a fetchable URL
    #[serde(default, rename = "sourceRef", alias = "source_ref", alias = "ref", skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
}

impl ContentNode {
    pub fn category(id: impl Into<String>, title: impl Into<String>, children: Vec<ContentNode>) -> Self {
        Self { id: id.into(), title: title.into(), kind: NodeKind::Category, children, source_ref: None }
    }

    pub fn document(id: impl Into<String>, title: impl Into<String>, source_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: NodeKind::Document,
            children: Vec::new(),
            source_ref: Some(source_ref.into()),
        }
    }

    pub fn is_document(&self) -> bool {
        self.kind == NodeKind::Document
    }

    /// Number of nodes in this subtree, including `self`
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ContentNode::count).sum::<usize>()
    }

    /// Check that documents are leaves
    pub fn validate(&self) -> Result<()> {
        if self.is_document() && !self.children.is_empty() {
            return Err(AcquireError::PlanAcquisition(format!(
                "Document node '{}' ({}) has {} children",
                self.title,
                self.id,
                self.children.len()
            )));
        }
        self.children.iter().try_for_each(ContentNode::validate)
    }
}

/// One entry of the legacy alphabetical index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatDocumentEntry {
    pub title: String,

    /// Absolute URL of the document
    pub source_ref: String,

    /// Index heading the entry appeared under; used for file naming only
    pub group_label: String,
}

/// One step of the normalized traversal both tree shapes lower to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub node_id: String,
    pub title: String,
    pub action: StepAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Create a directory, relative to the output root (empty path is the root itself)
    Directory { rel_path: PathBuf },
    /// Fetch `url` and write `<rel_base>.pdf` (and `<rel_base>.html`)
    Document { url: String, rel_base: PathBuf },
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
