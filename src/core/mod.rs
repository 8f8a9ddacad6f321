//! Core domain types.

pub mod cascade;
pub mod module;

pub use cascade::CascadedConfig;
pub use module::Module;
