//! cci-tasks - maintenance tasks for a fork of the Conan Center Index
//!
//! - merge conan-io/conan-center-index into the fork, turning conflicts
//!   that policy cannot resolve into a pull request
//! - merge the staging branch into production
//! - export and upload changed recipes to a Conan remote
//! - convert between GNU target triplets and Conan `arch`/`os` settings
//!
//! All external tools (`git`, `gh`, `conan`) run through
//! [`runner::CommandRunner`], so every task can be driven by a scripted runner.

pub mod conan;
pub mod config;
pub mod error;
pub mod gh;
pub mod git;
pub mod merge;
pub mod runner;
pub mod triplet;
pub mod types;
pub mod upload;

pub use error::{Error, Result};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, TaskContext};
pub use types::MergeStatus;
