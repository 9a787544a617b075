pub mod catalog;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod handle_budget;
pub mod heap;
pub mod loader;
pub mod logging;
pub mod merger;
pub mod record;
pub mod scheduler;
pub mod writer;

pub use error::*;
pub use logging::init_tracing;
pub use merger::{MergeReport, Merger, merge};
