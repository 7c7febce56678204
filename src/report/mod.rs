//! Report module - tables, recommendation text, JSON export and run summary

pub mod export;
pub mod recommendations;
pub mod summary;
pub mod tables;

pub use export::*;
pub use recommendations::{generate, generate_named, top_features};
pub use summary::*;
pub use tables::*;
