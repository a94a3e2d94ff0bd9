//! # git-precommit
//!
//! Triggers a parameterized precommit build on Jenkins for the current
//! branch and comments on the Jira issue named in the branch.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod http;
pub mod issue;
pub mod jenkins;
pub mod jira;
pub mod secrets;
pub mod shell;
pub mod ui;

// Re-export commonly used types
pub use config::{Config, ProjectConfig};
pub use error::{Error, Result};
pub use secrets::SecretResolver;
