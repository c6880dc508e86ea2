//! Widget configuration: command grammar, messages, prompt, limits, and the section map.

use command_parser::{ConfigError, RuleSetConfig};
use serde::{Deserialize, Serialize};

use crate::navigator::SiteMap;

/// Placeholder replaced by the unmatched command word in [`Messages::not_found`].
pub const COMMAND_PLACEHOLDER: &str = "[c]";
const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_SCROLLBACK_LIMIT: usize = 200;

/// User-facing message templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Unknown-command template; `[c]` is replaced by the command word.
    pub not_found: String,
    /// Line echoed when the widget starts.
    pub welcome: String,
    /// Line echoed when a navigation target does not exist.
    pub no_file: String,
    /// Line echoed by the exit builtin.
    pub goodbye: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            not_found: "[c]: command not found".to_string(),
            welcome: "Welcome to my site".to_string(),
            no_file: "File does not exist".to_string(),
            goodbye: "Closing my site, Goodbye!".to_string(),
        }
    }
}

impl Messages {
    /// Renders the unknown-command message for `command`.
    pub fn not_found_for(&self, command: &str) -> String {
        self.not_found.replace(COMMAND_PLACEHOLDER, command)
    }
}

/// Prompt and response prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// User name shown before the location.
    pub username: String,
    /// Text after the location.
    pub terminal_prefix: String,
    /// Prefix for help responses.
    pub response_prefix: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            username: "root".to_string(),
            terminal_prefix: "$ ".to_string(),
            response_prefix: "-bash: ".to_string(),
        }
    }
}

impl PromptConfig {
    /// Renders the prompt for a location label such as `~` or `/about`.
    pub fn render(&self, location: &str) -> String {
        format!("{}: {location}{}", self.username, self.terminal_prefix)
    }
}

/// Full widget configuration. Missing top-level keys fall back to the stock values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Command grammar.
    pub rules: RuleSetConfig,
    /// Message templates.
    pub messages: Messages,
    /// Prompt settings.
    pub prompt: PromptConfig,
    /// Maximum retained history entries.
    pub history_limit: usize,
    /// Maximum retained scrollback lines in the signal display.
    pub scrollback_limit: usize,
    /// Navigable sections.
    pub map: SiteMap,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            rules: RuleSetConfig::default(),
            messages: Messages::default(),
            prompt: PromptConfig::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            scrollback_limit: DEFAULT_SCROLLBACK_LIMIT,
            map: SiteMap::default(),
        }
    }
}

impl TerminalConfig {
    /// Parses a widget configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] when `raw` does not match the configuration schema.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}
