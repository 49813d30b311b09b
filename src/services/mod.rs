pub mod exporter;
pub mod progress_tracker;
pub mod review_model;

pub use exporter::GeneratedDocument;
pub use progress_tracker::{ProgressSnapshot, ProgressTracker};
pub use review_model::{normalize_questions, ReviewModel};
