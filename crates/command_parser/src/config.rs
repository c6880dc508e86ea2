//! Declarative rule-set configuration as loaded from JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default token separator.
pub const DEFAULT_SEPARATOR: &str = r"\s+";
/// Default option-flag marker; must match at the start of a token. Only the marker itself is
/// stripped, so `--verbose` names the flag `-verbose`.
pub const DEFAULT_OPTION_MARKER: &str = "^-";
/// Default pattern recognizing a help request in the second token.
pub const DEFAULT_HELP_PATTERN: &str = "(?i)^(?:help|h|-h|-help|--help)$";

/// Builtin behaviors a rule can delegate to instead of carrying a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinAction {
    /// List every command with its help text.
    Help,
    /// List the entries of the current location.
    List,
    /// Display a section, or enter a category.
    Open,
    /// Change the current location.
    Navigate,
    /// Leave the terminal.
    Exit,
}

/// How a rule recognizes its command word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchConfig {
    /// Exact string equality.
    Literal(String),
    /// Regular expression test.
    Pattern {
        /// Regex source.
        pattern: String,
    },
}

impl MatchConfig {
    /// Pattern matcher from a regex source.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
        }
    }
}

/// One rule entry.
///
/// A rule with `match` recognizes a command word and its `options` describe accepted flags. A
/// rule without `match` but with `options` is a group whose options are nested rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Explicit name; table entries use their key instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Command-word matcher.
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub matcher: Option<MatchConfig>,
    /// Name shown in listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Builtin behavior served by the navigator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<BuiltinAction>,
    /// Option descriptors, or nested rules for a group.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<RuleConfig>,
}

impl RuleConfig {
    /// Rule matching `pattern`, listed as `display`.
    pub fn pattern(display: &str, pattern: &str) -> Self {
        Self {
            matcher: Some(MatchConfig::pattern(pattern)),
            display: Some(display.to_string()),
            ..Self::default()
        }
    }

    /// Sets the help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Sets the builtin action.
    pub fn with_action(mut self, action: BuiltinAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Sets the option descriptors.
    pub fn with_options(mut self, options: Vec<RuleConfig>) -> Self {
        self.options = options;
        self
    }
}

/// Complete command grammar configuration.
///
/// [`Default`] yields the stock command set; a deserialized document only gets the default
/// patterns, its rule tables are taken as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    /// Token separator regex.
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Option-flag marker regex.
    #[serde(default = "default_option_marker")]
    pub option_marker: String,
    /// Help-request regex tested against the second token.
    #[serde(default = "default_help_pattern")]
    pub help_pattern: String,
    /// Top-level rules in declaration order.
    #[serde(default)]
    pub commands: IndexMap<String, RuleConfig>,
    /// Site-specific rules scanned after every top-level rule.
    #[serde(default)]
    pub custom: IndexMap<String, RuleConfig>,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_option_marker() -> String {
    DEFAULT_OPTION_MARKER.to_string()
}

fn default_help_pattern() -> String {
    DEFAULT_HELP_PATTERN.to_string()
}

impl Default for RuleSetConfig {
    fn default() -> Self {
        let mut commands = IndexMap::new();
        commands.insert(
            "close".to_string(),
            RuleConfig::pattern("exit", "(?i)^exit$")
                .with_help("Closes the terminal")
                .with_action(BuiltinAction::Exit),
        );
        commands.insert(
            "render".to_string(),
            RuleConfig::pattern("open", "(?i)^open$")
                .with_help("Displays the information from an available section")
                .with_action(BuiltinAction::Open)
                .with_options(vec![
                    RuleConfig::pattern("-all", r"(?i)^(?:\*|all)$")
                        .with_help("Force the display of all the renderable objects within range"),
                    RuleConfig::pattern("-t", "(?i)^t$")
                        .with_help("Displays the selected section as plain text"),
                ]),
        );
        commands.insert(
            "navigate".to_string(),
            RuleConfig::pattern("cd", "(?i)^cd$")
                .with_help("Navigates to the selected available category")
                .with_action(BuiltinAction::Navigate),
        );
        commands.insert(
            "showlist".to_string(),
            RuleConfig::pattern("ls", "(?i)^ls$")
                .with_help(
                    "Shows the list of current available categories for navigation or sections for opening them",
                )
                .with_action(BuiltinAction::List),
        );
        commands.insert(
            "help".to_string(),
            RuleConfig::pattern("help", "(?i)^help$")
                .with_help("Lists the available commands")
                .with_action(BuiltinAction::Help),
        );

        let mut custom = IndexMap::new();
        custom.insert(
            "answer".to_string(),
            RuleConfig::pattern("answer", "(?i)^answer$")
                .with_help("Use for the ultimate question..."),
        );

        Self {
            separator: default_separator(),
            option_marker: default_option_marker(),
            help_pattern: default_help_pattern(),
            commands,
            custom,
        }
    }
}

impl RuleSetConfig {
    /// Parses a configuration from JSON. Missing patterns fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] when `raw` is not a valid configuration document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn json_tables_keep_declaration_order() {
        let config = RuleSetConfig::from_json(
            r#"{
                "commands": {
                    "zeta": {"match": "zeta"},
                    "alpha": {"match": {"pattern": "^a"}, "help": "first letter"}
                }
            }"#,
        )
        .expect("parse");

        assert_eq!(
            config.commands.keys().cloned().collect::<Vec<_>>(),
            vec!["zeta".to_string(), "alpha".to_string()]
        );
        assert_eq!(
            config.commands["alpha"].matcher,
            Some(MatchConfig::pattern("^a"))
        );
        assert_eq!(
            config.commands["zeta"].matcher,
            Some(MatchConfig::Literal("zeta".to_string()))
        );
        assert_eq!(config.separator, DEFAULT_SEPARATOR);
        assert!(config.custom.is_empty());
    }

    #[test]
    fn actions_use_kebab_case() {
        let config: RuleConfig =
            serde_json::from_str(r#"{"match": "cd", "action": "navigate"}"#).expect("parse");
        assert_eq!(config.action, Some(BuiltinAction::Navigate));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = RuleSetConfig::from_json("{\"commands\": 3}").expect_err("bad json");
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
