//! Repository integrity detection
//!
//! Seven independent structural checks run concurrently, each bounded by its
//! own timeout. Their findings are merged into a single scored
//! [`DetectionResult`].

pub mod configuration;
pub mod detector;
pub mod index;
pub mod locks;
pub mod objects;
pub mod operations;
pub mod permissions;
pub mod references;
pub mod types;

pub use detector::{CheckContext, CorruptionDetector, DetectionError, ScanDepth};
pub use types::{integrity_score, CorruptionIssue, CorruptionType, DetectionResult, Severity};
