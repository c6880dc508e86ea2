//! Line tokenization, rule matching, and option parsing.

use regex::Regex;
use terminal_contract::{OptionValues, ParsedCommand, ParsedOption};

use crate::rules::RuleSet;

/// Splits `line` on `separator`.
///
/// An empty line has no tokens. The first token is kept even when empty so a leading separator
/// yields an empty command word; later empty tokens are dropped.
pub fn tokenize(line: &str, separator: &Regex) -> Vec<String> {
    if line.is_empty() {
        return Vec::new();
    }
    let mut parts = separator.split(line);
    let Some(first) = parts.next() else {
        return Vec::new();
    };
    std::iter::once(first)
        .chain(parts.filter(|part| !part.is_empty()))
        .map(str::to_string)
        .collect()
}

/// Arguments following the command word.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedArguments {
    /// Value tokens before the first flag.
    pub leading: Vec<String>,
    /// Flag groups in left-to-right order.
    pub options: Vec<ParsedOption>,
}

impl ParsedArguments {
    /// Leading values joined into one free-text argument.
    pub fn argument(&self) -> Option<String> {
        (!self.leading.is_empty()).then(|| self.leading.join(" "))
    }
}

/// Parses the tokens after the command word into a free-text argument and flag groups.
///
/// Tokens are visited from the last one back to the first. Value tokens collect into a pending
/// run; a flag claims that run and starts a new one. Whatever run is left at the front becomes
/// the leading values.
pub fn parse_arguments(tokens: &[String], option_marker: &Regex) -> ParsedArguments {
    let mut run: Vec<String> = Vec::new();
    let mut options = Vec::new();
    for token in tokens.iter().rev() {
        match strip_marker(token, option_marker) {
            Some(flag) => {
                let mut values = std::mem::take(&mut run);
                values.reverse();
                options.push(ParsedOption::new(flag, OptionValues::from_run(values)));
            }
            None => run.push(token.clone()),
        }
    }
    run.reverse();
    options.reverse();
    ParsedArguments {
        leading: run,
        options,
    }
}

fn strip_marker<'a>(token: &'a str, option_marker: &Regex) -> Option<&'a str> {
    let marker = option_marker.find(token)?;
    if marker.start() != 0 {
        return None;
    }
    let flag = &token[marker.end()..];
    (!flag.is_empty()).then_some(flag)
}

/// Interprets one submitted line against `rules`.
///
/// This never fails: an unmatched or empty command word yields `found == false`.
pub fn parse(line: &str, rules: &RuleSet) -> ParsedCommand {
    let tokens = tokenize(line, rules.separator());
    let mut parsed = ParsedCommand {
        raw_text: line.to_string(),
        command: tokens.first().cloned(),
        tokens,
        ..ParsedCommand::default()
    };

    let matched = parsed
        .command
        .as_deref()
        .and_then(|word| rules.resolve(word))
        .map(|rule| rule.name().to_string());
    let Some(matched) = matched else {
        return parsed;
    };

    parsed.found = true;
    parsed.matched_rule = Some(matched);
    parsed.help_requested = parsed
        .tokens
        .get(1)
        .is_some_and(|token| rules.help_pattern().is_match(token));
    if !parsed.help_requested {
        let arguments = parse_arguments(&parsed.tokens[1..], rules.option_marker());
        parsed.argument = arguments.argument();
        parsed.options = arguments.options;
    }
    parsed
}

impl RuleSet {
    /// Interprets `line` against this rule set. See [`parse`].
    pub fn parse(&self, line: &str) -> ParsedCommand {
        parse(line, self)
    }
}
