//! Driven-browser side of the session
//!
//! - [`config`]: launch/attach options and the fingerprint profile
//! - [`context`]: the [`BrowserContextManager`] owning the run's browser context
//! - [`page`]: the [`DocumentPage`] seam implemented by `headless_chrome::Tab`
//! - [`stealth`]: init script and client-hint request rewriting

pub mod config;
pub mod context;
pub mod page;
pub mod stealth;

pub use config::{BrowserProfile, ConnectionOptions, LaunchOptions};
pub use context::{BrowserContextManager, ContextMode};
pub use page::DocumentPage;
