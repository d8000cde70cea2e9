//! File and workspace selection for agentlint.
//!
//! Answers "which files does this run validate?": glob expansion against
//! the workspace root, ignore handling (`.agentlintignore` plus config
//! patterns), optional narrowing to VCS-changed files, and monorepo
//! package discovery from workspace manifests.

mod artifact;
mod error;
mod packages;
mod selector;
mod vcs;

pub use artifact::ArtifactKind;
pub use error::{Result, WorkspaceError};
pub use packages::{discover_packages, find_package, WorkspacePackage};
pub use selector::{select, ChangedFilter, SelectOptions, Selection, SelectorWarning};
pub use vcs::changed_files;
