/*!
 * Core rename and validation operations
 */

pub mod convention;
pub mod dry_run;
pub mod rename;
pub mod validation;

pub use convention::{ConventionPlan, NamingConvention};
pub use dry_run::{DryRunOperation, DryRunRecorder, DryRunSummary};
pub use rename::{RenameLog, RenameOptions, RenameOutcome, RenamePlan, RenameSession};
pub use validation::{validate_bag, ValidationSummary};
