use agentlint_config::Severity;
use agentlint_workspace::ArtifactKind;
use serde_json::Value;

/// Everything the engine knows about a rule besides its validate body.
#[derive(Debug, Clone)]
pub struct RuleMetadata {
    /// Globally unique, kebab-case.
    pub id: String,
    pub name: String,
    pub description: String,
    /// The artifact kind this rule applies to.
    pub kind: ArtifactKind,
    pub default_severity: Severity,
    /// Part of the `recommended` preset.
    pub recommended: bool,
    pub fixable: bool,
    pub deprecated: bool,
    /// agentlint version that introduced the rule.
    pub introduced_in: String,
    /// JSON Schema (draft-7) the resolved options must satisfy.
    pub options_schema: Option<Value>,
    pub default_options: Option<Value>,
}

impl RuleMetadata {
    /// Metadata with the common defaults: warn severity, not
    /// recommended, not fixable, no options.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ArtifactKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            kind,
            default_severity: Severity::Warn,
            recommended: false,
            fixable: false,
            deprecated: false,
            introduced_in: "0.1.0".to_string(),
            options_schema: None,
            default_options: None,
        }
    }

    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.default_severity = severity;
        self
    }

    #[must_use]
    pub fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }

    #[must_use]
    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }

    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    #[must_use]
    pub fn introduced_in(mut self, version: impl Into<String>) -> Self {
        self.introduced_in = version.into();
        self
    }

    #[must_use]
    pub fn options(mut self, schema: Value, defaults: Value) -> Self {
        self.options_schema = Some(schema);
        self.default_options = Some(defaults);
        self
    }
}
