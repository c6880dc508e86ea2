//! Shared terminal contracts used by the command parser, the interpreter engine, and host display
//! layers.
//!
//! This crate is intentionally runtime-agnostic. It defines serializable parse results, response
//! lines, key intents, and event names without depending on Leptos, browser APIs, or the engine
//! internals.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use serde::{Deserialize, Serialize};

/// Event names exchanged over the terminal buses.
pub mod barks {
    /// A submitted line was parsed and is ready for interpretation.
    pub const EXECUTE: &str = "command_execute";
    /// The first word of a submitted line matched no rule.
    pub const COMMAND_NOT_FOUND: &str = "command_not_found";
    /// The user asked for a completion of the current line.
    pub const NAV_SUGGEST: &str = "navigation_suggest";
    /// A line should be appended to the scrollback.
    pub const RESPONSE: &str = "command_response";
    /// A navigation target does not exist in the current location.
    pub const FILE_NOT_EXIST: &str = "file_doesnt_exist";
    /// The user asked to leave the terminal.
    pub const EXIT: &str = "terminal_exit";
}

/// Values attached to one option flag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValues {
    /// The flag was given without a value.
    #[default]
    None,
    /// Exactly one value followed the flag.
    Single(String),
    /// Several values followed the flag.
    Many(Vec<String>),
}

impl OptionValues {
    /// Builds the value set for the run of value tokens that followed a flag.
    pub fn from_run(mut run: Vec<String>) -> Self {
        match run.len() {
            0 => Self::None,
            1 => Self::Single(run.remove(0)),
            _ => Self::Many(run),
        }
    }

    /// Returns every value as a slice-friendly vector.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Single(value) => vec![value.clone()],
            Self::Many(values) => values.clone(),
        }
    }

    /// Returns the first value, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Single(value) => Some(value),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }
}

/// One `-flag value...` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedOption {
    /// Flag name without the option marker.
    pub flag: String,
    /// Values owned by the flag.
    pub values: OptionValues,
}

impl ParsedOption {
    /// Creates an option group.
    pub fn new(flag: impl Into<String>, values: OptionValues) -> Self {
        Self {
            flag: flag.into(),
            values,
        }
    }
}

/// Structured result of interpreting one submitted line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// Line exactly as submitted.
    pub raw_text: String,
    /// Tokens produced by the separator split.
    pub tokens: Vec<String>,
    /// First token, when the line had one.
    pub command: Option<String>,
    /// Name of the matched rule.
    pub matched_rule: Option<String>,
    /// Whether a rule matched the first token.
    pub found: bool,
    /// Whether the second token asked for help.
    pub help_requested: bool,
    /// Free-text value made of the non-flag tokens before the first flag.
    pub argument: Option<String>,
    /// Option groups in left-to-right order.
    pub options: Vec<ParsedOption>,
}

impl ParsedCommand {
    /// Returns the first option group with `flag`.
    pub fn option(&self, flag: &str) -> Option<&ParsedOption> {
        self.options.iter().find(|option| option.flag == flag)
    }

    /// Returns whether `flag` was given.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.option(flag).is_some()
    }

    /// Returns the token after the command word, flag or not.
    pub fn first_argument_token(&self) -> Option<&str> {
        self.tokens.get(1).map(String::as_str)
    }
}

/// Classification of a scrollback line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseKind {
    /// Prompt plus the submitted line.
    Echo,
    /// Text returned by a command handler or builtin.
    Output,
    /// Help text for a single command.
    Help,
    /// Unknown command message.
    NotFound,
    /// Host or runtime notice (welcome, missing file, goodbye).
    Notice,
    /// One row of a command or location listing.
    Listing,
}

/// One line appended to the scrollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseLine {
    /// Line classification.
    pub kind: ResponseKind,
    /// Line text.
    pub text: String,
}

impl ResponseLine {
    /// Creates a response line.
    pub fn new(kind: ResponseKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Handler or builtin output.
    pub fn output(text: impl Into<String>) -> Self {
        Self::new(ResponseKind::Output, text)
    }

    /// Host notice.
    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(ResponseKind::Notice, text)
    }
}

/// Discrete key intents received from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "char", rename_all = "kebab-case")]
pub enum KeyIntent {
    /// Insert one character at the caret.
    WriteChar(char),
    /// Delete the character before the caret.
    Backspace,
    /// Move the caret one character left.
    CaretLeft,
    /// Move the caret one character right.
    CaretRight,
    /// Recall the previous history entry.
    HistoryPrev,
    /// Recall the next history entry.
    HistoryNext,
    /// Submit the current line.
    Submit,
    /// Ask for a completion of the current line.
    RequestNavSuggest,
}

/// Editing mode of the line being typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// The buffer is empty.
    #[default]
    Idle,
    /// The buffer holds typed text.
    Editing,
    /// The buffer holds a recalled history entry that has not been edited.
    HistoryBrowsing,
}

/// Payload carried by terminal bus events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum BarkPayload {
    /// A parsed command line.
    Command(ParsedCommand),
    /// Plain text such as an unmatched command word or the current buffer.
    Text(String),
    /// A scrollback line.
    Response(ResponseLine),
}

impl BarkPayload {
    /// Returns the parsed command, if this payload carries one.
    pub fn as_command(&self) -> Option<&ParsedCommand> {
        match self {
            Self::Command(command) => Some(command),
            _ => None,
        }
    }

    /// Returns the text, if this payload carries plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the response line, if this payload carries one.
    pub fn as_response(&self) -> Option<&ResponseLine> {
        match self {
            Self::Response(line) => Some(line),
            _ => None,
        }
    }
}
