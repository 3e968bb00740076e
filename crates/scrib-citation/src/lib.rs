//! Citation allocation
//!
//! Chooses which excerpts back each generated paragraph under three
//! competing constraints:
//! - Density: enough citations per unit (quota min/target/max)
//! - Diversity: avoid repeatedly citing one author/year cluster
//! - Non-repetition: per-excerpt and run-wide usage caps
//!
//! The [`UsageLedger`] is the run-scoped mutable record; allocation
//! commits against it transactionally (all chosen ids or none).

pub mod allocator;
pub mod bibliography;
pub mod error;
pub mod ledger;
pub mod quota;

pub use allocator::{Allocation, AllocatorConfig, CitationAllocator};
pub use bibliography::{render_bibliography, CitationStats};
pub use error::AllocationError;
pub use ledger::{LedgerConfig, UsageLedger};
pub use quota::CitationQuota;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
