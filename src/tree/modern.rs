use crate::{
    error::{AcquireError, Result},
    http::PortalFetch,
    tree::{ResolvedTree, node::ContentNode},
};

/// Where the modern tree, its cover page and its documents live
#[derive(Debug, Clone)]
pub struct ModernSource {
    pub tree_url: String,
    pub cover_url: Option<String>,

    /// Document URL template with a `{ref}` placeholder
    pub document_url_template: String,

    /// Title for the synthetic root when the payload is a list of top-level nodes
    pub root_title: String,
}

/// Fetch and parse the nested content tree. Nothing is returned unless the whole tree
/// parses.
pub fn resolve(fetch: &dyn PortalFetch, source: &ModernSource) -> Result<ResolvedTree> {
    log::info!("Fetching content tree from {}", source.tree_url);
    let payload = fetch
        .get_text(&source.tree_url)
        .map_err(|e| AcquireError::PlanAcquisition(format!("Failed to fetch tree from {}: {}", source.tree_url, e)))?;
    let root = parse_tree(&payload, &source.root_title)?;

    let cover_html = match &source.cover_url {
        Some(url) => Some(
            fetch
                .get_text(url)
                .map_err(|e| AcquireError::PlanAcquisition(format!("Failed to fetch cover page {}: {}", url, e)))?,
        ),
        None => None,
    };

    log::info!("Resolved content tree with {} nodes", root.count());
    Ok(ResolvedTree::Modern { root, cover_html, document_url_template: source.document_url_template.clone() })
}

/// Parse a tree payload: either one root node or an array of top-level nodes
pub fn parse_tree(payload: &str, root_title: &str) -> Result<ContentNode> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| AcquireError::PlanAcquisition(format!("Tree payload is not JSON: {}", e)))?;

    let root = if value.is_array() {
        let children: Vec<ContentNode> = serde_json::from_value(value)
            .map_err(|e| AcquireError::PlanAcquisition(format!("Malformed tree payload: {}", e)))?;
        ContentNode::category("root", root_title, children)
    } else {
        serde_json::from_value(value)
            .map_err(|e| AcquireError::PlanAcquisition(format!("Malformed tree payload: {}", e)))?
    };

    root.validate()?;
    Ok(root)
}

/// Fill the document URL template for a node
pub fn document_url(template: &str, source_ref: &str) -> String {
    template.replace("{ref}", source_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::NodeKind;
    use std::collections::HashMap;

    struct FixtureFetch {
        pages: HashMap<String, String>,
    }

    impl PortalFetch for FixtureFetch {
        fn get_text(&self, url: &str) -> Result<String> {
            self.pages.get(url).cloned().ok_or_else(|| AcquireError::Http(format!("404 for {}", url)))
        }
    }

    fn source() -> ModernSource {
        ModernSource {
            tree_url: "https://portal.example/tree?vehicle=1".into(),
            cover_url: Some("https://portal.example/cover?vehicle=1".into()),
            document_url_template: "https://portal.example/doc/{ref}".into(),
            root_title: "Workshop".into(),
        }
    }

    #[test]
    fn test_array_payload_gets_synthetic_root() {
        let payload = r#"[
            {"id": "a", "title": "Engine", "kind": "category", "children": [
                {"id": "a1", "title": "Removal", "kind": "document", "sourceRef": "R1"}
            ]},
            {"id": "b", "title": "Body", "kind": "category"}
        ]"#;
        let root = parse_tree(payload, "Workshop").unwrap();
        assert_eq!(root.title, "Workshop");
        assert_eq!(root.kind, NodeKind::Category);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].title, "Engine");
        assert_eq!(root.children[1].title, "Body");
    }

    #[test]
    fn test_resolve_fetches_tree_and_cover() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://portal.example/tree?vehicle=1".to_string(),
            r#"{"id": "r", "title": "Root", "kind": "category", "children": []}"#.to_string(),
        );
        pages.insert("https://portal.example/cover?vehicle=1".to_string(), "<html>cover</html>".to_string());

        let resolved = resolve(&FixtureFetch { pages }, &source()).unwrap();
        match resolved {
            ResolvedTree::Modern { root, cover_html, .. } => {
                assert_eq!(root.id, "r");
                assert_eq!(cover_html.as_deref(), Some("<html>cover</html>"));
            }
            _ => panic!("Expected modern tree"),
        }
    }

    #[test]
    fn test_resolve_fails_fast_without_cover() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://portal.example/tree?vehicle=1".to_string(),
            r#"{"id": "r", "title": "Root", "kind": "category"}"#.to_string(),
        );

        let result = resolve(&FixtureFetch { pages }, &source());
        assert!(matches!(result, Err(AcquireError::PlanAcquisition(_))));
    }

    #[test]
    fn test_malformed_payload_is_plan_failure() {
        assert!(matches!(parse_tree("<html>login</html>", "x"), Err(AcquireError::PlanAcquisition(_))));
        assert!(matches!(parse_tree(r#"{"id": "r"}"#, "x"), Err(AcquireError::PlanAcquisition(_))));
    }

    #[test]
    fn test_document_url() {
        assert_eq!(document_url("https://p/doc/{ref}?lang=en", "G1"), "https://p/doc/G1?lang=en");
    }
}
