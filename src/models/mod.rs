pub mod document;
pub mod enrollment;
pub mod loaders;
pub mod report;

pub use document::{mime_for_extension, DocumentFingerprint, DocumentStatus, RawDocument};
pub use enrollment::{MappedSubject, ParsedDocument, SubjectKey, SubjectRecord};
pub use loaders::{load_documents, load_seed_file};
pub use report::{
    FailureKind, ProcessMode, ProcessingResult, ResourceDelta, StageTimings, StressTestReport,
    ValidationOutcome, ValidationSummary,
};
