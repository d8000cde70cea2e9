use crate::{ConfigError, Result, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names searched in each directory, in order of preference.
pub const CONFIG_FILE_NAMES: &[&str] = &[".agentlintrc.json", "agentlint.config.json"];

/// Configuration for a single rule.
///
/// Supports the three shapes rule entries take in config files:
/// ```json
/// {
///   "rules": {
///     "context-file-empty": "warn",
///     "context-file-size": ["error", { "maxSize": 40000 }],
///     "skill-description-length": { "severity": "warn", "options": { "maxLength": 1024 } }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleEntry {
    /// Just a severity level (simple case)
    Severity(Severity),

    /// Detailed config with options
    Detailed {
        severity: Severity,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<serde_json::Value>,
    },
}

impl RuleEntry {
    /// Get the severity for this rule entry.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Severity(s) | Self::Detailed { severity: s, .. } => *s,
        }
    }

    /// Get the options for this rule entry (if any).
    #[must_use]
    pub fn options(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Severity(_) => None,
            Self::Detailed { options, .. } => options.as_ref(),
        }
    }
}

/// Custom deserializer for `RuleEntry` to handle the array shape
impl<'de> Deserialize<'de> for RuleEntry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, SeqAccess, Visitor};

        struct RuleEntryVisitor;

        impl<'de> Visitor<'de> for RuleEntryVisitor {
            type Value = RuleEntry;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str(
                    "a severity string ('off', 'warn', 'error'), \
                     an array [severity, options], \
                     or an object { severity, options }",
                )
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                let severity = match value {
                    "off" => Severity::Off,
                    "warn" => Severity::Warn,
                    "error" => Severity::Error,
                    _ => return Err(E::custom(format!("unknown severity: {value}"))),
                };
                Ok(RuleEntry::Severity(severity))
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let severity: Severity = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &"array with severity"))?;

                let options: Option<serde_json::Value> = seq.next_element()?;

                Ok(RuleEntry::Detailed { severity, options })
            }

            fn visit_map<A>(self, map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                #[derive(Deserialize)]
                #[serde(deny_unknown_fields)]
                struct DetailedEntry {
                    severity: Severity,
                    #[serde(default)]
                    options: Option<serde_json::Value>,
                }

                let entry =
                    DetailedEntry::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(RuleEntry::Detailed {
                    severity: entry.severity,
                    options: entry.options,
                })
            }
        }

        deserializer.deserialize_any(RuleEntryVisitor)
    }
}

/// Extends targets - a single reference or several, applied in order.
///
/// A target is either a named built-in preset (terminal) or a relative
/// path to another config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtendsList {
    Single(String),
    Multiple(Vec<String>),
}

impl ExtendsList {
    /// Get all targets as a slice-like vector (normalizes single to vec).
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// Cache behavior controlled from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CacheSettings {
    /// Whether the result cache is consulted at all.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Store file location, relative to the workspace root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
}

const fn default_cache_enabled() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            location: None,
        }
    }
}

impl CacheSettings {
    /// Resolve the store file path against the workspace root.
    #[must_use]
    pub fn store_path(&self, workspace_root: &Path) -> PathBuf {
        match &self.location {
            Some(loc) if loc.is_absolute() => loc.clone(),
            Some(loc) => workspace_root.join(loc),
            None => workspace_root.join(".agentlint-cache.json"),
        }
    }
}

/// One directory-scoped configuration record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    /// Presets or relative config paths to extend (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<ExtendsList>,

    /// Rule configurations (optional)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub rules: HashMap<String, RuleEntry>,

    /// Glob patterns for files this scope excludes from validation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_patterns: Vec<String>,

    /// Cache behavior overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSettings>,

    /// Directories scanned for plugin manifests
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugin_dirs: Vec<PathBuf>,
}

/// Find a config file in the given directory, if one exists.
#[must_use]
pub fn find_config_in(dir: &Path) -> Option<PathBuf> {
    for file_name in CONFIG_FILE_NAMES {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Load and parse a config file.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("JSON parse error: {e}"),
    })?;

    tracing::debug!("Config file loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_severity_entry() {
        let json = r#"{ "rules": { "context-file-empty": "warn" } }"#;
        let config: ConfigFile = serde_json::from_str(json).unwrap();
        let entry = &config.rules["context-file-empty"];
        assert_eq!(entry.severity(), Severity::Warn);
        assert!(entry.options().is_none());
    }

    #[test]
    fn test_array_entry_with_options() {
        let json = r#"{ "rules": { "context-file-size": ["error", { "maxSize": 40000 }] } }"#;
        let config: ConfigFile = serde_json::from_str(json).unwrap();
        let entry = &config.rules["context-file-size"];
        assert_eq!(entry.severity(), Severity::Error);
        assert_eq!(
            entry.options().unwrap().get("maxSize").unwrap().as_u64(),
            Some(40000)
        );
    }

    #[test]
    fn test_array_entry_severity_only() {
        let json = r#"{ "rules": { "context-file-size": ["error"] } }"#;
        let config: ConfigFile = serde_json::from_str(json).unwrap();
        let entry = &config.rules["context-file-size"];
        assert_eq!(entry.severity(), Severity::Error);
        assert!(entry.options().is_none());
    }

    #[test]
    fn test_object_entry() {
        let json = r#"
        { "rules": { "skill-description-length": { "severity": "warn", "options": { "maxLength": 512 } } } }
        "#;
        let config: ConfigFile = serde_json::from_str(json).unwrap();
        let entry = &config.rules["skill-description-length"];
        assert_eq!(entry.severity(), Severity::Warn);
        assert!(entry.options().is_some());
    }

    #[test]
    fn test_unknown_severity_rejected() {
        let json = r#"{ "rules": { "context-file-empty": "loud" } }"#;
        assert!(serde_json::from_str::<ConfigFile>(json).is_err());
    }

    #[test]
    fn test_extends_shapes() {
        let single: ConfigFile =
            serde_json::from_str(r#"{ "extends": "recommended" }"#).unwrap();
        assert_eq!(single.extends.unwrap().targets(), vec!["recommended"]);

        let multiple: ConfigFile =
            serde_json::from_str(r#"{ "extends": ["recommended", "./base.json"] }"#).unwrap();
        assert_eq!(
            multiple.extends.unwrap().targets(),
            vec!["recommended", "./base.json"]
        );
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let json = r#"{ "rule": { "context-file-empty": "warn" } }"#;
        assert!(serde_json::from_str::<ConfigFile>(json).is_err());
    }

    #[test]
    fn test_cache_settings_default_location() {
        let settings = CacheSettings::default();
        assert!(settings.enabled);
        assert_eq!(
            settings.store_path(Path::new("/ws")),
            PathBuf::from("/ws/.agentlint-cache.json")
        );
    }

    #[test]
    fn test_find_config_prefers_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".agentlintrc.json"), "{}").unwrap();
        fs::write(dir.path().join("agentlint.config.json"), "{}").unwrap();

        let found = find_config_in(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), ".agentlintrc.json");
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".agentlintrc.json");
        fs::write(&path, "{ nope").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
