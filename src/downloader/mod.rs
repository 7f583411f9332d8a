// Downloader module - extraction behind an ordered profile cascade

pub mod cascade;
pub mod diagnostics;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod profiles;
pub mod quality;
pub mod resolver;
pub mod utils;
pub mod validation;

pub use cascade::{AttemptOutcome, Cascade};
pub use errors::{ExtractionError, FailureKind, ResolveError};
pub use models::{DirectLink, MaterializedFile, MediaMetadata, RawMediaResult};
pub use orchestrator::ExtractionOrchestrator;
pub use profiles::{CascadeSettings, ExtractionProfile};
pub use quality::Quality;
pub use resolver::{DownloadTarget, Resolver, YtDlpResolver};
