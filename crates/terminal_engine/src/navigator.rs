//! Site map, location stack, and the navigation builtins (`help`, `ls`, `cd`, `open`).

use command_parser::RuleSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use terminal_contract::{ParsedCommand, ResponseKind, ResponseLine};
use thiserror::Error;

const ROOT_LABEL: &str = "~";
const OPEN_ALL: &str = "*";
const PLAIN_TEXT_FLAG: &str = "t";
const ALL_FLAGS: [&str; 2] = ["all", "*"];

/// One entry of the site map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapNode {
    /// Displayable content.
    Section(String),
    /// Nested entries reachable with `cd`.
    Category(SiteMap),
}

/// Ordered tree of categories and sections.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteMap(IndexMap<String, MapNode>);

impl SiteMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a section and returns the map.
    pub fn with_section(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.0.insert(name.into(), MapNode::Section(content.into()));
        self
    }

    /// Adds a category and returns the map.
    pub fn with_category(mut self, name: impl Into<String>, category: SiteMap) -> Self {
        self.0.insert(name.into(), MapNode::Category(category));
        self
    }

    /// Looks up a direct entry.
    pub fn get(&self, name: &str) -> Option<&MapNode> {
        self.0.get(name)
    }

    /// Number of direct entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Direct entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &MapNode)> {
        self.0.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Walks `path` through nested categories.
    pub fn category(&self, path: &[String]) -> Option<&SiteMap> {
        path.iter().try_fold(self, |map, name| match map.get(name)? {
            MapNode::Category(nested) => Some(nested),
            MapNode::Section(_) => None,
        })
    }
}

/// A navigation target that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    /// Nothing with this name exists at the resolved location.
    #[error("`{0}` does not exist")]
    Missing(String),
    /// The name is a section where a category was needed.
    #[error("`{0}` is a section, not a category")]
    NotACategory(String),
}

impl NavError {
    /// The offending name.
    pub fn target(&self) -> &str {
        match self {
            Self::Missing(name) | Self::NotACategory(name) => name,
        }
    }
}

/// Completion result for the line being typed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Suggestion {
    /// Replacement for the whole buffer when the completion extends it.
    pub line: Option<String>,
    /// Every candidate matching the word being completed.
    pub candidates: Vec<String>,
}

/// Location-aware view over a [`SiteMap`].
#[derive(Debug, Clone, Default)]
pub struct SiteNavigator {
    map: SiteMap,
    location: Vec<String>,
}

impl SiteNavigator {
    /// Starts at the root of `map`.
    pub fn new(map: SiteMap) -> Self {
        Self {
            map,
            location: Vec::new(),
        }
    }

    /// Category names from the root to the current location.
    pub fn location(&self) -> &[String] {
        &self.location
    }

    /// Prompt label of the current location: `~` at the root, `/a/b` below it.
    pub fn location_label(&self) -> String {
        if self.location.is_empty() {
            ROOT_LABEL.to_string()
        } else {
            format!("/{}", self.location.join("/"))
        }
    }

    fn current(&self) -> &SiteMap {
        self.map.category(&self.location).unwrap_or(&self.map)
    }

    /// One listing row per command, in resolution order.
    pub fn help(rules: &RuleSet) -> Vec<ResponseLine> {
        let commands = rules.commands();
        let width = commands
            .iter()
            .map(|rule| rule.display().chars().count())
            .max()
            .unwrap_or(0);
        commands
            .into_iter()
            .map(|rule| {
                let row = format!("{:<width$}  {}", rule.display(), rule.help().unwrap_or(""));
                ResponseLine::new(ResponseKind::Listing, row.trim_end())
            })
            .collect()
    }

    /// Entries of the current location; categories carry a trailing `/`.
    pub fn list(&self) -> Vec<ResponseLine> {
        self.current()
            .entries()
            .map(|(name, node)| {
                let row = match node {
                    MapNode::Category(_) => format!("{name}/"),
                    MapNode::Section(_) => name.to_string(),
                };
                ResponseLine::new(ResponseKind::Listing, row)
            })
            .collect()
    }

    /// Changes location.
    ///
    /// `None` re-displays the current location. Targets may be paths: `..` goes up, a leading
    /// `/` or `~` starts from the root. The location is unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] when a path segment is missing or names a section.
    pub fn navigate(&mut self, target: Option<&str>) -> Result<Vec<ResponseLine>, NavError> {
        let Some(target) = target.filter(|target| !target.is_empty()) else {
            return Ok(vec![ResponseLine::output(self.location_label())]);
        };
        self.location = self.resolve(target)?;
        Ok(Vec::new())
    }

    /// Displays a section, or enters a category.
    ///
    /// The target is the free-text argument, or the value given to a flag (`open -t about`).
    /// `-t` strips markup; `-all`, `-*` or a bare `*` display every section of the current
    /// location.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] when the target cannot be resolved.
    pub fn open(&mut self, command: &ParsedCommand) -> Result<Vec<ResponseLine>, NavError> {
        let plain = command.has_flag(PLAIN_TEXT_FLAG);
        let target = open_target(command);
        let all = target.as_deref() == Some(OPEN_ALL)
            || ALL_FLAGS.iter().any(|flag| command.has_flag(flag));

        if all {
            return Ok(self
                .current()
                .entries()
                .filter_map(|(_, node)| match node {
                    MapNode::Section(content) => Some(content.as_str()),
                    MapNode::Category(_) => None,
                })
                .flat_map(|content| render_section(content, plain))
                .collect());
        }

        let Some(target) = target else {
            return Ok(vec![ResponseLine::output("open: name a section to display")]);
        };
        let (parent, name) = match target.rsplit_once('/') {
            Some(("", name)) => (Vec::new(), name),
            Some((parent, name)) => (self.resolve(parent)?, name),
            None => (self.location.clone(), target.as_str()),
        };
        let node = self
            .map
            .category(&parent)
            .and_then(|category| category.get(name))
            .ok_or_else(|| NavError::Missing(name.to_string()))?;
        match node {
            MapNode::Section(content) => Ok(render_section(content, plain)),
            MapNode::Category(_) => {
                let mut location = parent;
                location.push(name.to_string());
                self.location = location;
                Ok(Vec::new())
            }
        }
    }

    /// Completes the last word of `buffer`: command names for the first word, entries of the
    /// current location afterwards.
    pub fn suggest(&self, buffer: &str, rules: &RuleSet) -> Suggestion {
        let word = buffer
            .rsplit_once(char::is_whitespace)
            .map_or(buffer, |(_, word)| word);
        let head = &buffer[..buffer.len() - word.len()];
        let completing_command = head.trim().is_empty();
        let needle = word.to_lowercase();

        let mut candidates: Vec<String> = Vec::new();
        let names: Vec<String> = if completing_command {
            rules
                .commands()
                .into_iter()
                .map(|rule| rule.display().to_string())
                .collect()
        } else {
            self.current()
                .entries()
                .map(|(name, _)| name.to_string())
                .collect()
        };
        for name in names {
            if name.to_lowercase().starts_with(&needle) && !candidates.contains(&name) {
                candidates.push(name);
            }
        }

        let line = match candidates.as_slice() {
            [] => None,
            [only] if completing_command => Some(format!("{head}{only} ")),
            [only] => Some(format!("{head}{only}")),
            many => {
                let prefix = common_prefix(many);
                (prefix.chars().count() > word.chars().count()).then(|| format!("{head}{prefix}"))
            }
        };
        Suggestion { line, candidates }
    }

    fn resolve(&self, target: &str) -> Result<Vec<String>, NavError> {
        let (mut location, rest) = match target
            .strip_prefix(ROOT_LABEL)
            .or_else(|| target.strip_prefix('/'))
        {
            Some(rest) => (Vec::new(), rest),
            None => (self.location.clone(), target),
        };
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    location.pop();
                }
                name => match self.map.category(&location).and_then(|map| map.get(name)) {
                    Some(MapNode::Category(_)) => location.push(name.to_string()),
                    Some(MapNode::Section(_)) => {
                        return Err(NavError::NotACategory(name.to_string()))
                    }
                    None => return Err(NavError::Missing(name.to_string())),
                },
            }
        }
        Ok(location)
    }
}

fn open_target(command: &ParsedCommand) -> Option<String> {
    command.argument.clone().or_else(|| {
        command.options.iter().find_map(|option| {
            let values = option.values.to_vec();
            (!values.is_empty()).then(|| values.join(" "))
        })
    })
}

fn render_section(content: &str, plain: bool) -> Vec<ResponseLine> {
    let text = if plain {
        strip_markup(content)
    } else {
        content.to_string()
    };
    text.lines().map(ResponseLine::output).collect()
}

fn strip_markup(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for ch in content.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn common_prefix(names: &[String]) -> String {
    let Some((first, rest)) = names.split_first() else {
        return String::new();
    };
    let mut prefix: Vec<char> = first.chars().collect();
    for name in rest {
        let shared = prefix
            .iter()
            .zip(name.chars())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(shared);
    }
    prefix.into_iter().collect()
}
