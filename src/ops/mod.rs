//! High-level operations.
//!
//! This module contains the implementation of batchbuild commands.

pub mod batch_build;
pub mod doctor;
pub mod list;

pub use batch_build::{
    build, resume_after, resume_from, select_modules, BuildOptions, BuildResult, FailureRecord,
};
pub use doctor::{doctor, CheckResult, DoctorReport};
pub use list::{list_modules, ProjectModules};
