pub mod error;
pub mod runner;

pub use error::{PagefeedError, Result};
pub use runner::{publish_snapshot, render_page, run_site, RunSummary, Snapshot};
