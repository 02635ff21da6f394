use manual_fetch::{
    AcquireError, ContentNode, DocumentPage, NodeStatus, ResolvedTree, SaveOptions, persist, tree::legacy,
};
use std::{
    cell::{Cell, RefCell},
    path::Path,
};

/// Page double: records navigations and renders every URL as a tiny document
#[derive(Default)]
struct RecordingPage {
    visited: RefCell<Vec<String>>,
    current: RefCell<String>,
    fail_on: Option<String>,
    pdf_calls: Cell<usize>,
}

impl RecordingPage {
    fn failing_on(url: &str) -> Self {
        Self { fail_on: Some(url.to_string()), ..Default::default() }
    }
}

impl DocumentPage for RecordingPage {
    fn goto(&self, url: &str) -> manual_fetch::Result<()> {
        if self.fail_on.as_deref() == Some(url) {
            return Err(AcquireError::NavigationFailed(format!("timed out loading {}", url)));
        }
        self.visited.borrow_mut().push(url.to_string());
        *self.current.borrow_mut() = url.to_string();
        Ok(())
    }

    fn current_url(&self) -> String {
        self.current.borrow().clone()
    }

    fn content(&self) -> manual_fetch::Result<String> {
        Ok(format!("<html><body>{}</body></html>", self.current.borrow()))
    }

    fn print_pdf(&self) -> manual_fetch::Result<Vec<u8>> {
        self.pdf_calls.set(self.pdf_calls.get() + 1);
        Ok(format!("%PDF-1.4 {}", self.current.borrow()).into_bytes())
    }

    fn eval_string(&self, _script: &str) -> manual_fetch::Result<Option<String>> {
        Ok(None)
    }
}

fn workshop_tree() -> ResolvedTree {
    ResolvedTree::Modern {
        root: ContentNode::category("root", "Workshop", vec![
            ContentNode::category("10", "Engine", vec![
                ContentNode::category("11", "Cylinder Head", vec![
                    ContentNode::document("111", "Removal", "R111"),
                    ContentNode::document("112", "Installation", "R112"),
                ]),
                ContentNode::document("12", "Specifications", "R12"),
            ]),
            ContentNode::category("20", "Brakes", vec![ContentNode::document("21", "Bleeding", "R21")]),
            ContentNode::document("30", "Introduction", "R30"),
        ]),
        cover_html: None,
        document_url_template: "https://portal.example/doc/{ref}".to_string(),
    }
}

fn no_pause() -> SaveOptions {
    SaveOptions::new()
}

fn files_with_extension(root: &Path, ext: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|e| e == ext) {
                found.push(path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"));
            }
        }
    }
    found.sort();
    found
}

#[test]
fn test_every_node_visited_once_in_pre_order() {
    let dir = tempfile::tempdir().unwrap();
    let tree = workshop_tree();
    let page = RecordingPage::default();

    let result = persist(&tree, dir.path(), &page, &no_pause()).unwrap();

    assert_eq!(result.len(), tree.node_count());
    let ids: Vec<&str> = result.outcomes.iter().map(|o| o.node_id.as_str()).collect();
    assert_eq!(ids, vec!["root", "10", "11", "111", "112", "12", "20", "21", "30"]);
    assert!(result.outcomes.iter().all(|o| o.status == NodeStatus::Saved));

    assert_eq!(*page.visited.borrow(), vec![
        "https://portal.example/doc/R111",
        "https://portal.example/doc/R112",
        "https://portal.example/doc/R12",
        "https://portal.example/doc/R21",
        "https://portal.example/doc/R30",
    ]);
}

#[test]
fn test_tree_mirrored_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    persist(&workshop_tree(), dir.path(), &RecordingPage::default(), &SaveOptions::new().save_html(true)).unwrap();

    assert!(dir.path().join("Engine").join("Cylinder Head").is_dir());
    assert!(dir.path().join("Brakes").is_dir());
    assert_eq!(files_with_extension(dir.path(), "pdf"), vec![
        "Brakes/Bleeding.pdf",
        "Engine/Cylinder Head/Installation.pdf",
        "Engine/Cylinder Head/Removal.pdf",
        "Engine/Specifications.pdf",
        "Introduction.pdf",
    ]);
    assert_eq!(files_with_extension(dir.path(), "html").len(), 5);

    let html = std::fs::read_to_string(dir.path().join("Brakes").join("Bleeding.html")).unwrap();
    assert!(html.contains("https://portal.example/doc/R21"));
}

#[test]
fn test_first_failure_aborts_with_partial_result() {
    let dir = tempfile::tempdir().unwrap();
    let tree = workshop_tree();
    let page = RecordingPage::failing_on("https://portal.example/doc/R12");

    let err = persist(&tree, dir.path(), &page, &no_pause()).unwrap_err();

    let AcquireError::TraversalAborted { node_id, reason, partial } = &err else {
        panic!("expected an aborted traversal, got {:?}", err);
    };
    assert_eq!(node_id, "12");
    assert!(reason.contains("timed out"));
    assert!(partial.len() < tree.node_count());
    assert_eq!(partial.len(), 5);
    assert!(partial.failed().is_empty());

    // nothing after the failing node was attempted
    assert!(!dir.path().join("Brakes").exists());
    assert_eq!(err.partial_result().map(|p| p.len()), Some(5));
}

#[test]
fn test_ignore_save_errors_records_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let tree = workshop_tree();
    let page = RecordingPage::failing_on("https://portal.example/doc/R12");

    let result = persist(&tree, dir.path(), &page, &SaveOptions::new().ignore_save_errors(true)).unwrap();

    assert_eq!(result.len(), tree.node_count());
    let failed = result.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].node_id, "12");
    assert!(failed[0].error_detail.as_deref().is_some_and(|d| d.contains("timed out")));

    assert!(!dir.path().join("Engine").join("Specifications.pdf").exists());
    assert!(dir.path().join("Introduction.pdf").exists());
}

#[test]
fn test_resume_skips_saved_documents() {
    let dir = tempfile::tempdir().unwrap();
    let tree = workshop_tree();

    let first = RecordingPage::failing_on("https://portal.example/doc/R21");
    persist(&tree, dir.path(), &first, &SaveOptions::new().ignore_save_errors(true)).unwrap();
    assert_eq!(first.pdf_calls.get(), 4);

    let second = RecordingPage::default();
    let result = persist(&tree, dir.path(), &second, &SaveOptions::new().resume(true)).unwrap();

    assert_eq!(result.skipped(), 4);
    assert_eq!(*second.visited.borrow(), vec!["https://portal.example/doc/R21"]);
    assert!(dir.path().join("Brakes").join("Bleeding.pdf").exists());
}

#[test]
fn test_rerun_overwrites_without_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let tree = workshop_tree();

    persist(&tree, dir.path(), &RecordingPage::default(), &no_pause()).unwrap();
    let before = files_with_extension(dir.path(), "pdf");
    let result = persist(&tree, dir.path(), &RecordingPage::default(), &no_pause()).unwrap();

    assert_eq!(result.saved(), tree.node_count());
    assert_eq!(files_with_extension(dir.path(), "pdf"), before);
    assert!(files_with_extension(dir.path(), "part").is_empty());
}

#[test]
fn test_empty_pdf_is_a_node_failure() {
    struct BlankPage;
    impl DocumentPage for BlankPage {
        fn goto(&self, _url: &str) -> manual_fetch::Result<()> {
            Ok(())
        }
        fn current_url(&self) -> String {
            String::new()
        }
        fn content(&self) -> manual_fetch::Result<String> {
            Ok(String::new())
        }
        fn print_pdf(&self) -> manual_fetch::Result<Vec<u8>> {
            Ok(Vec::new())
        }
        fn eval_string(&self, _script: &str) -> manual_fetch::Result<Option<String>> {
            Ok(None)
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let tree = ResolvedTree::Modern {
        root: ContentNode::category("root", "Workshop", vec![ContentNode::document("1", "Blank", "B")]),
        cover_html: None,
        document_url_template: "https://portal.example/doc/{ref}".to_string(),
    };

    let result = persist(&tree, dir.path(), &BlankPage, &SaveOptions::new().ignore_save_errors(true)).unwrap();
    assert_eq!(result.failed().len(), 1);
    assert!(!dir.path().join("Blank.pdf").exists());
}

#[test]
fn test_legacy_toc_links_match_saved_files() {
    let dir = tempfile::tempdir().unwrap();
    let index = r#"<html><body>
        <h2>A</h2><a href="/doc/abs.html">ABS</a> <a href="/doc/ac.html">A/C System</a>
        <h2>W</h2><a href="/doc/wipers.html">Wipers &amp; Washers</a>
    </body></html>"#;
    let base = url::Url::parse("https://portal.example/index/alpha.html").unwrap();
    let documents = legacy::parse_index(index, &base, None).unwrap();
    let names = legacy::file_names(&documents);
    let modified_html = legacy::rewrite_links(index, &base, &documents, &names);
    let tree = ResolvedTree::Legacy { documents, page_html: index.to_string(), modified_html: modified_html.clone() };

    tree.write_index_files(dir.path()).unwrap();
    let result = persist(&tree, dir.path(), &RecordingPage::default(), &no_pause()).unwrap();
    assert_eq!(result.saved(), 3);

    for file in files_with_extension(dir.path(), "pdf") {
        let href = manual_fetch::tree::naming::local_href(&file);
        assert!(modified_html.contains(&format!("href=\"{}\"", href)), "no link to {}", file);
    }
    assert!(dir.path().join(manual_fetch::tree::LEGACY_TOC_FILE).exists());
    assert!(dir.path().join(manual_fetch::tree::LEGACY_INDEX_FILE).exists());
}
