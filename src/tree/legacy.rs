use crate::{
    error::{AcquireError, Result},
    http::PortalFetch,
    tree::{
        ResolvedTree,
        naming::{SiblingNames, local_href},
        node::FlatDocumentEntry,
    },
};
use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Selector};
use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};
use url::Url;

/// Extension of the artifact every document is always saved as
pub const PRIMARY_EXTENSION: &str = "pdf";

static ANCHOR_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>").expect("valid anchor regex"));
static HREF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(\bhref\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#).expect("valid href regex")
});

/// Fetch the alphabetical index page and derive the flat document list plus a local
/// table of contents.
pub fn resolve(fetch: &dyn PortalFetch, index_url: &str, link_selector: Option<&str>) -> Result<ResolvedTree> {
    log::info!("Fetching alphabetical index from {}", index_url);
    let base = Url::parse(index_url)
        .map_err(|e| AcquireError::PlanAcquisition(format!("Invalid index URL {}: {}", index_url, e)))?;
    let page_html = fetch
        .get_text(index_url)
        .map_err(|e| AcquireError::PlanAcquisition(format!("Failed to fetch index {}: {}", index_url, e)))?;

    let documents = parse_index(&page_html, &base, link_selector)?;
    if documents.is_empty() {
        return Err(AcquireError::PlanAcquisition(format!("No document links found in {}", index_url)));
    }

    let names = file_names(&documents);
    let modified_html = rewrite_links(&page_html, &base, &documents, &names);

    log::info!("Resolved alphabetical index with {} documents", documents.len());
    Ok(ResolvedTree::Legacy { documents, page_html, modified_html })
}

/// Extract document links in page order, each labelled with the nearest preceding
/// heading. Duplicate targets are kept once.
pub fn parse_index(html: &str, base: &Url, link_selector: Option<&str>) -> Result<Vec<FlatDocumentEntry>> {
    let selector = link_selector
        .map(|s| Selector::parse(s).map_err(|e| AcquireError::Config(format!("Invalid link selector '{}': {}", s, e))))
        .transpose()?;

    let document = Html::parse_document(html);
    let mut group = String::new();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        match element.value().name() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => group = collapsed_text(&element),
            "a" => {
                if selector.as_ref().is_some_and(|s| !s.matches(&element)) {
                    continue;
                }
                let Some(target) = element.value().attr("href").and_then(|href| resolve_href(base, href)) else {
                    continue;
                };
                if !seen.insert(target.clone()) {
                    continue;
                }

                let mut title = collapsed_text(&element);
                if title.is_empty() {
                    title = target.rsplit('/').next().unwrap_or_default().to_string();
                }
                entries.push(FlatDocumentEntry { title, source_ref: target, group_label: group.clone() });
            }
            _ => {}
        }
    }

    Ok(entries)
}

/// File stem for each entry, in entry order: `<group> - <title>`, disambiguated
pub fn file_names(entries: &[FlatDocumentEntry]) -> Vec<String> {
    let mut names = SiblingNames::new();
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = if entry.group_label.is_empty() {
                entry.title.clone()
            } else {
                format!("{} - {}", entry.group_label, entry.title)
            };
            names.claim(&label, &(i + 1).to_string())
        })
        .collect()
}

/// Rewrite every link that points at an extracted document to the local file the
/// persistence engine writes for it; other markup is left byte-for-byte intact.
pub fn rewrite_links(html: &str, base: &Url, entries: &[FlatDocumentEntry], names: &[String]) -> String {
    let targets: HashMap<&str, String> = entries
        .iter()
        .zip(names)
        .map(|(entry, name)| (entry.source_ref.as_str(), local_href(&format!("{}.{}", name, PRIMARY_EXTENSION))))
        .collect();

    ANCHOR_TAG
        .replace_all(html, |tag: &Captures| {
            let tag = &tag[0];
            HREF_ATTR
                .replace(tag, |attr: &Captures| {
                    let raw = attr.get(2).or_else(|| attr.get(3)).or_else(|| attr.get(4)).map_or("", |m| m.as_str());
                    let local = resolve_href(base, &decode_entities(raw)).and_then(|t| targets.get(t.as_str()));
                    match local {
                        Some(local) => format!("{}\"{}\"", &attr[1], local),
                        None => attr[0].to_string(),
                    }
                })
                .into_owned()
        })
        .into_owned()
}

fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty() || href.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("mailto:") {
        return None;
    }
    base.join(href).ok().map(String::from)
}

fn collapsed_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode an attribute value with the same HTML parser [`parse_index`] reads hrefs through,
/// so both sides agree on every entity form
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let fragment = Html::parse_fragment(&format!("<a href=\"{}\"></a>", raw.replace('"', "&quot;")));
    fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "a")
        .and_then(|e| e.value().attr("href"))
        .map_or_else(|| raw.to_string(), str::to_string)
}
