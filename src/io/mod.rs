/// Command-line interface and layout runner
pub mod cli;
/// Layout constants and runtime defaults
pub mod configuration;
/// Error types
pub mod error;
/// PNG loading and composite export
pub mod image;
/// Terminal progress bars
pub mod progress;
