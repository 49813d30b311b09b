pub mod document;
pub mod preview;
pub mod qa;

pub use document::{DocumentHandle, DocumentUpload, MimeKind};
pub use preview::{PreviewRegistry, PreviewUrl};
pub use qa::{Phase, PhaseStatus, QaPair, Stage};
