//! CLI command implementations

pub mod conan;
pub mod context;
pub mod merge;
pub mod style;
pub mod triplet;
pub mod upload;
