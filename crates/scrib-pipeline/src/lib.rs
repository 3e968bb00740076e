//! Section orchestration
//!
//! Drives draft generation stage by stage:
//! - Declarative [`DocumentTemplate`] with dynamic expand-then-fill sections
//! - [`Draft`] arena of generation units with version snapshots
//! - [`SectionOrchestrator`] state machine invoking the citation allocator
//!   and the generation capability per unit
//!
//! # Example
//!
//! ```rust,ignore
//! use scrib_pipeline::{DocumentTemplate, SectionOrchestrator};
//!
//! # async fn example(orchestrator: SectionOrchestrator, template: DocumentTemplate)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let draft = orchestrator.run(&template).await?;
//! println!("{} units generated", draft.units().len());
//! # Ok(())
//! # }
//! ```

pub mod draft;
pub mod error;
pub mod orchestrator;
pub mod proposal;
pub mod template;

pub use draft::{Draft, DraftVersion, GenerationUnit, StageRecord, UnitId, VersionHistory};
pub use error::{DraftError, PipelineError, TemplateError};
pub use orchestrator::{ExternalSearch, OrchestratorConfig, SectionOrchestrator, Stage};
pub use proposal::{parse_structural_proposal, SectionPlan};
pub use template::{DocumentTemplate, SectionRole, SectionTemplate};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
