use serde::{Deserialize, Serialize};

/// A single cookie usable by a driven-browser context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredCookie {
    pub name: String,
    pub value: String,

    /// Left unset by [`transform`]; the consumer decides at injection time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl StructuredCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), domain: None, path: None }
    }

    /// Builder method: set domain and path
    pub fn scoped(mut self, domain: impl Into<String>, path: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self.path = Some(path.into());
        self
    }
}

/// Session credentials in the two shapes the browser and HTTP channels need
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    /// Header line as it was provided
    pub raw_header: String,

    /// One record per accepted `name=value` pair, in input order
    pub cookies: Vec<StructuredCookie>,

    /// Canonical `name=value; name2=value2` re-serialization
    pub processed_header: String,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Collapse embedded line breaks (and the whitespace around them) into single spaces
pub fn collapse_header_lines(raw: &str) -> String {
    raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Parse a single-line cookie header into [`Credentials`].
///
/// Malformed segments (empty, missing `=`, empty name) are dropped without failing
/// the whole header.
pub fn transform(raw_header_line: &str) -> Credentials {
    let cookies: Vec<StructuredCookie> = raw_header_line
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(StructuredCookie::new(name, value.trim()))
        })
        .collect();

    let processed_header =
        cookies.iter().map(|c| format!("{}={}", c.name, c.value)).collect::<Vec<_>>().join("; ");

    Credentials { raw_header: raw_header_line.to_string(), cookies, processed_header }
}

/// Build credentials from cookie records read out of a live browser
pub fn from_browser_cookies<I>(cookies: I) -> Credentials
where
    I: IntoIterator<Item = StructuredCookie>,
{
    let header = cookies.into_iter().map(|c| format!("{}={}", c.name, c.value)).collect::<Vec<_>>().join("; ");
    transform(&header)
}
