//! Dependency Graph and Scheduling
//!
//! The dependency relation is a bipartite graph between cells and the
//! subscribers that read them, stored in both directions:
//!
//! - cell -> subscribers, used to notify on write
//! - subscriber -> cells, used to drop stale edges before each re-run
//!
//! The scheduler consumes the notifications and decides when subscribers
//! run.

pub mod relation;
pub mod scheduler;

pub use relation::DependencyGraph;
pub use scheduler::{batch, flush, next_tick, FlushStats};
