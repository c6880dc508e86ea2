//! Command interpretation for the fake terminal: declarative rule sets and the line parser.
//!
//! A [`RuleSet`] is compiled once from a [`RuleSetConfig`] and is read-only afterwards. Parsing a
//! line is a pure function of the line and the rule set; it never fails, and configuration
//! problems surface as [`ConfigError`] when the rule set is built.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use thiserror::Error;

mod config;
mod parser;
mod rules;

pub use config::{
    BuiltinAction, MatchConfig, RuleConfig, RuleSetConfig, DEFAULT_HELP_PATTERN,
    DEFAULT_OPTION_MARKER, DEFAULT_SEPARATOR,
};
pub use parser::{parse, parse_arguments, tokenize, ParsedArguments};
pub use rules::{Matcher, Rule, RuleHandler, RuleSet, RuleSetBuilder, CUSTOM_GROUP};

/// Rule-set configuration error. Fatal to construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A separator, marker, help, or rule pattern does not compile.
    #[error("invalid {context} pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// Which pattern failed.
        context: String,
        /// Pattern source.
        pattern: String,
        /// Regex compiler error.
        source: regex::Error,
    },
    /// A rule has neither a matcher nor nested rules.
    #[error("rule `{rule}` needs a `match` entry or nested options")]
    MissingMatcher {
        /// Rule name.
        rule: String,
    },
    /// Two matchable rules share a name.
    #[error("rule name `{rule}` is declared more than once")]
    DuplicateRule {
        /// Rule name.
        rule: String,
    },
    /// A handler was attached to a name no rule carries.
    #[error("handler registered for unknown rule `{rule}`")]
    UnknownHandlerTarget {
        /// Requested rule name.
        rule: String,
    },
    /// The configuration document is not valid JSON for this schema.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}
