//! formvault — offline-first form template and response storage engine
//!
//! The persistence and data-model core of a client-side form builder:
//! a durable local store over five collections (branding, templates,
//! responses, analytics, backup queue), a validating template authoring
//! session, a response collector, and a portable JSON export/import
//! engine. Rendering, PDF layout, and sync surfaces are external
//! collaborators that consume this crate's read/write contract.

pub mod config;
pub mod error;
pub mod ids;
pub mod services;
pub mod store;

pub use error::{AppError, Result};
pub use ids::{IdAllocator, SequentialAllocator, UuidAllocator};
pub use services::{
    collect_answers, BackupEngine, ExportBundle, FieldValue, FieldValues, MoveDirection,
    QuestionPatch, ResponseCollector, SectionPatch, TemplateBuilder,
};
pub use store::{
    Answer, AnalyticsEvent, BackupQueueItem, Branding, Collection, ExportDocument, ImportSummary,
    Question, QuestionType, Response, Section, Store, Template,
};
