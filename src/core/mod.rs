//! Console host identification and encoding checks.
//!
//! - **encoding**: literal, OS codepage and path decoding checks
//! - **version**: `Version` and the version resource parser
//! - **locator**: finds the console window by a title swap
//! - **ascension**: window → owning process → executable → module name
//! - **host**: classifies the console host
//! - **session**: UTF-8 console guard
//! - **context**: per-process memoized state
//!
//! # Architecture
//!
//! ```text
//! AppContext
//! ├── console_host() ── host::detect_host
//! │                     ├── locator::find_console_window
//! │                     ├── ascension::owning_process
//! │                     └── version::opt_product_version
//! ├── encoding_assumption()
//! └── utf8_session() ── ConsoleSession
//! ```

pub mod ascension;
pub mod context;
pub mod encoding;
pub mod host;
pub mod locator;
pub mod session;
pub mod version;

pub use context::AppContext;
pub use encoding::{check_path_encoding, PathEncoding};
pub use host::{ConsoleHost, ConsoleHostId, ConsoleKind};
pub use version::{Version, VersionInfo};
