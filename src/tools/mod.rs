//! The tools module provides the helpers around the archive format itself.
//!
//! The tools are:
//! - cli: Command line interface for the archiver.
//! - dir_walk: Ordered directory listings and root entry names.
//! - freq_count: Byte frequency counting, chunked across threads for large inputs.
//! - progress: Progress reporting during encoding.
//! - prompt: Password and continue/abort questions.
//!
pub mod cli;
pub mod dir_walk;
pub mod freq_count;
pub mod progress;
pub mod prompt;
