//! # manual-fetch
//!
//! Acquire a vendor's hierarchical service manual from an authenticated web portal and
//! persist it as paired HTML/PDF snapshots, mirroring the manual's tree on disk.
//!
//! ## Features
//!
//! - **Two authenticated channels**: a driven Chrome (via CDP) and a plain HTTP client share
//!   one set of session cookies
//! - **Managed or attached browser**: launch a stealth-configured Chrome, or borrow the
//!   user's own signed-in browser over remote debugging without ever closing it
//! - **Two tree shapes**: modern nested category trees and legacy alphabetical indexes,
//!   lowered to a single traversal plan
//! - **Failure policy**: abort on the first failed page, or record it and keep going
//! - **Resumable**: atomic writes and skip-existing reruns
//!
//! ## Command Line
//!
//! ```bash
//! # Launch a managed browser using the cookie string from the config file
//! cargo run --bin manual-fetch -- --config manual.json
//!
//! # Borrow an already signed-in Chrome started with --remote-debugging-port=9222
//! cargo run --bin manual-fetch -- --config manual.json --attach ws://127.0.0.1:9222/devtools/browser/<id>
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use manual_fetch::{AcquireConfig, BrowserSource, LaunchOptions, StdinIntervention, run};
//! use std::path::Path;
//!
//! # fn main() -> manual_fetch::Result<()> {
//! let config = AcquireConfig::from_file(Path::new("manual.json"))?;
//! let summary = run(&config, BrowserSource::Launch(LaunchOptions::new().headless(true)), &StdinIntervention)?;
//!
//! println!("{} pages saved, {} failed", summary.saved(), summary.failed_nodes().len());
//! # Ok(())
//! # }
//! ```
//!
//! ### Persisting a tree with your own page
//!
//! ```rust,no_run
//! use manual_fetch::{ContentNode, ResolvedTree, SaveOptions, persist};
//! use manual_fetch::browser::{BrowserContextManager, BrowserProfile, LaunchOptions};
//! use manual_fetch::session::transform;
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> manual_fetch::Result<()> {
//! let credentials = transform("SESSION=abc123; theme=dark");
//! let context = BrowserContextManager::launch(
//!     &LaunchOptions::default(),
//!     BrowserProfile::default(),
//!     &credentials,
//!     ".portal.example",
//!     PathBuf::from("/tmp/manual-fetch/storage_state.json"),
//! )?;
//! let page = context.new_page()?;
//!
//! let tree = ResolvedTree::Modern {
//!     root: ContentNode::category("root", "Workshop", vec![ContentNode::document("1", "Brakes", "G1")]),
//!     cover_html: None,
//!     document_url_template: "https://portal.example/doc/{ref}".to_string(),
//! };
//! let result = persist(&tree, Path::new("out"), &*page, &SaveOptions::new().save_html(true))?;
//! println!("{} nodes visited", result.len());
//!
//! context.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`session`]: cookie-header parsing and the session bridge
//! - [`http`]: the HTTP channel
//! - [`browser`]: browser context management, stealth, and the page seam
//! - [`auth`]: the authentication check
//! - [`tree`]: document tree resolution (modern and legacy)
//! - [`persist`]: the tree persistence engine
//! - [`acquire`]: a full run across manual phases
//! - [`config`]: run configuration
//! - [`error`]: error types and result aliases

pub mod acquire;
pub mod auth;
pub mod browser;
pub mod config;
pub mod error;
pub mod http;
pub mod persist;
pub mod session;
pub mod tree;

pub use acquire::{BrowserSource, PhaseSummary, RunSummary, run};
pub use auth::{AuthStatus, Intervention, NoIntervention, StdinIntervention};
pub use browser::{BrowserContextManager, ConnectionOptions, DocumentPage, LaunchOptions};
pub use config::{AcquireConfig, ManualPhase, PortalEndpoints};
pub use error::{AcquireError, ErrorClass, Result};
pub use persist::{NodeOutcome, NodeStatus, SaveOptions, TraversalResult, persist};
pub use session::{Credentials, SessionBridge};
pub use tree::{ContentNode, FlatDocumentEntry, ManualEra, ResolvedTree};
