//! Session credentials shared by the browser and HTTP channels
//!
//! - [`cookies`]: pure cookie-header parsing into [`Credentials`]
//! - [`bridge`]: the [`SessionBridge`] that owns the current credentials, plus cookie
//!   harvesting from an attached browser

pub mod bridge;
pub mod cookies;

pub use bridge::{CookieJar, SessionBridge, harvest};
pub use cookies::{Credentials, StructuredCookie, collapse_header_lines, transform};
