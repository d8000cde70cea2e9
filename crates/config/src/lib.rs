//! Cascading configuration for agentlint.
//!
//! Every directory between the workspace root and a validated file may
//! contribute one config file (`.agentlintrc.json` or
//! `agentlint.config.json`). The [`ConfigResolver`] folds that chain,
//! root to leaf, into one [`EffectiveConfig`] per file: `extends` targets
//! are applied first (named presets are terminal), then the file's own
//! `rules` and `ignorePatterns` are deep-merged on top, with leaf values
//! winning per key.
//!
//! Rule defaults and option schemas are injected through
//! [`RuleInfoProvider`] so this crate stays a leaf; the rule registry
//! implements the trait.

mod error;
mod file;
mod merge;
mod resolver;
mod severity;

pub use error::{ConfigError, Result};
pub use file::{
    find_config_in, load_config_file, CacheSettings, ConfigFile, ExtendsList, RuleEntry,
    CONFIG_FILE_NAMES,
};
pub use merge::deep_merge;
pub use resolver::{ConfigResolver, EffectiveConfig, ResolvedRule, RuleInfoProvider};
pub use severity::Severity;
