//! usagescope - package dependency usage analyzer
//!
//! This crate resolves the package dependency graph of every project in a
//! solution, binds the loaded package modules to it, and measures how much
//! of each package the project's source actually references.

pub mod analysis;
pub mod config;
pub mod exclusion;
pub mod export;
pub mod graph;
pub mod logger;
pub mod metrics;
pub mod oracle;
pub mod parser;
pub mod report;
