//! Services module
//!
//! Business logic layered over the store: template authoring, response
//! collection, and backup/export.

pub mod backup;
pub mod builder;
pub mod collector;

pub use backup::{BackupEngine, ExportBundle};
pub use builder::{MoveDirection, QuestionPatch, SectionPatch, TemplateBuilder};
pub use collector::{collect_answers, FieldValue, FieldValues, ResponseCollector};
