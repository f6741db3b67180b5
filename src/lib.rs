//! # flagtrail
//!
//! Keeps the most recent feature flag evaluations of each execution
//! context so they can be attached to error reports.
//!
//! ## Modules
//!
//! - [`buffer`] - Bounded, recency-ordered flag buffer
//! - [`scope`] - Per-thread and per-task isolation scopes
//! - [`report`] - Reports carrying the flags context
//! - [`cli`] - Command line interface
//! - [`types`] - Shared types
//!
//! ```
//! use flagtrail::FlagBuffer;
//!
//! let buffer = FlagBuffer::new(2)?;
//! buffer.set("a", true);
//! buffer.set("b", false);
//! buffer.set("a", false);
//! buffer.set("c", true);
//!
//! let names: Vec<_> = buffer.snapshot().into_iter().map(|e| e.flag).collect();
//! assert_eq!(names, ["a", "c"]);
//! # Ok::<(), flagtrail::FlagError>(())
//! ```

pub mod buffer;
#[cfg(feature = "cli")]
pub mod cli;
pub mod report;
pub mod scope;
pub mod types;

pub use buffer::{BufferStats, FlagBuffer};
pub use scope::{build_flags_context, record_evaluation};
pub use types::config::Config;
pub use types::errors::{FlagError, FlagResult};
pub use types::flags::{FlagEntry, FlagsContext};
