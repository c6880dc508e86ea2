//! Compiled rules and the immutable rule set consulted by the parser.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    rc::Rc,
};

use regex::Regex;
use terminal_contract::ParsedCommand;

use crate::{
    config::{BuiltinAction, MatchConfig, RuleConfig, RuleSetConfig},
    ConfigError,
};

/// Name of the group rule holding the `custom` table.
pub const CUSTOM_GROUP: &str = "custom";

/// Text-producing command handler.
pub type RuleHandler = Rc<dyn Fn(&ParsedCommand) -> Option<String>>;

/// How a rule recognizes its command word, decided at load time.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Regular expression test.
    Pattern(Regex),
    /// Exact string equality.
    Literal(String),
    /// Group of nested rules scanned as a unit.
    Nested(Vec<Rule>),
}

/// One recognized command.
#[derive(Clone)]
pub struct Rule {
    name: String,
    display: String,
    matcher: Matcher,
    help: Option<String>,
    handler: Option<RuleHandler>,
    action: Option<BuiltinAction>,
    options: Vec<Rule>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("display", &self.display)
            .field("matcher", &self.matcher)
            .field("help", &self.help)
            .field("handler", &self.handler.is_some())
            .field("action", &self.action)
            .field("options", &self.options)
            .finish()
    }
}

impl Rule {
    /// Unique rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name shown in listings.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Command-word matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Help text.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Attached handler.
    pub fn handler(&self) -> Option<&RuleHandler> {
        self.handler.as_ref()
    }

    /// Builtin behavior.
    pub fn action(&self) -> Option<BuiltinAction> {
        self.action
    }

    /// Option descriptors. Empty for groups.
    pub fn options(&self) -> &[Rule] {
        &self.options
    }

    /// Whether this rule is a group of nested rules.
    pub fn is_group(&self) -> bool {
        matches!(self.matcher, Matcher::Nested(_))
    }

    /// Whether this rule's own matcher accepts `word`. Groups never match directly.
    pub fn accepts(&self, word: &str) -> bool {
        match &self.matcher {
            Matcher::Pattern(pattern) => pattern.is_match(word),
            Matcher::Literal(literal) => literal == word,
            Matcher::Nested(_) => false,
        }
    }

    fn resolve(&self, word: &str) -> Option<&Rule> {
        match &self.matcher {
            Matcher::Nested(rules) => resolve_in(rules, word),
            _ => self.accepts(word).then_some(self),
        }
    }

    fn collect_commands<'a>(&'a self, out: &mut Vec<&'a Rule>) {
        match &self.matcher {
            Matcher::Nested(rules) => collect_in(rules, out),
            _ => out.push(self),
        }
    }
}

// Plain rules first, then groups, each in declaration order.
fn resolve_in<'a>(rules: &'a [Rule], word: &str) -> Option<&'a Rule> {
    rules
        .iter()
        .filter(|rule| !rule.is_group())
        .find(|rule| rule.accepts(word))
        .or_else(|| {
            rules
                .iter()
                .filter(|rule| rule.is_group())
                .find_map(|rule| rule.resolve(word))
        })
}

fn collect_in<'a>(rules: &'a [Rule], out: &mut Vec<&'a Rule>) {
    for rule in rules.iter().filter(|rule| !rule.is_group()) {
        out.push(rule);
    }
    for rule in rules.iter().filter(|rule| rule.is_group()) {
        rule.collect_commands(out);
    }
}

fn find_named<'a>(rules: &'a [Rule], name: &str) -> Option<&'a Rule> {
    rules.iter().find_map(|rule| {
        if rule.name == name {
            return Some(rule);
        }
        match &rule.matcher {
            Matcher::Nested(nested) => find_named(nested, name),
            _ => None,
        }
    })
}

/// Immutable command grammar: ordered rules plus compiled separator, option marker, and help
/// patterns.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    separator: Regex,
    option_marker: Regex,
    help_pattern: Regex,
}

impl RuleSet {
    /// Compiles `config` without handlers.
    ///
    /// # Errors
    ///
    /// See [`RuleSetBuilder::build`].
    pub fn from_config(config: &RuleSetConfig) -> Result<Self, ConfigError> {
        RuleSetBuilder::new(config.clone()).build()
    }

    /// Starts a builder so handlers can be attached before compiling.
    pub fn builder(config: RuleSetConfig) -> RuleSetBuilder {
        RuleSetBuilder::new(config)
    }

    /// Top-level rules in declaration order; the `custom` group comes last.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the rule that claims `word`, or `None`. An empty word never matches.
    pub fn resolve(&self, word: &str) -> Option<&Rule> {
        if word.is_empty() {
            return None;
        }
        resolve_in(&self.rules, word)
    }

    /// Looks up a rule or group by name, including nested rules.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        find_named(&self.rules, name)
    }

    /// Every matchable rule in the order [`RuleSet::resolve`] tries them.
    pub fn commands(&self) -> Vec<&Rule> {
        let mut out = Vec::new();
        collect_in(&self.rules, &mut out);
        out
    }

    /// Token separator.
    pub fn separator(&self) -> &Regex {
        &self.separator
    }

    /// Option-flag marker.
    pub fn option_marker(&self) -> &Regex {
        &self.option_marker
    }

    /// Help-request pattern.
    pub fn help_pattern(&self) -> &Regex {
        &self.help_pattern
    }
}

/// Attaches handlers to named rules, then compiles the configuration.
pub struct RuleSetBuilder {
    config: RuleSetConfig,
    handlers: HashMap<String, RuleHandler>,
}

impl fmt::Debug for RuleSetBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSetBuilder")
            .field("config", &self.config)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleSetBuilder {
    /// Starts from `config` with no handlers.
    pub fn new(config: RuleSetConfig) -> Self {
        Self {
            config,
            handlers: HashMap::new(),
        }
    }

    /// Attaches `handler` to the rule named `rule`, replacing any earlier one.
    pub fn handler(
        mut self,
        rule: impl Into<String>,
        handler: impl Fn(&ParsedCommand) -> Option<String> + 'static,
    ) -> Self {
        self.handlers.insert(rule.into(), Rc::new(handler));
        self
    }

    /// Compiles patterns and rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for a regex that does not compile,
    /// [`ConfigError::MissingMatcher`] for a rule with neither `match` nor options,
    /// [`ConfigError::DuplicateRule`] when two matchable rules share a name, and
    /// [`ConfigError::UnknownHandlerTarget`] when a handler names no rule.
    pub fn build(mut self) -> Result<RuleSet, ConfigError> {
        let separator = compile_pattern("separator", &self.config.separator)?;
        let option_marker = compile_pattern("option marker", &self.config.option_marker)?;
        let help_pattern = compile_pattern("help", &self.config.help_pattern)?;

        let mut rules = Vec::with_capacity(self.config.commands.len() + 1);
        for (name, rule) in &self.config.commands {
            rules.push(compile_rule(name.clone(), rule, &mut self.handlers)?);
        }
        if !self.config.custom.is_empty() {
            let mut nested = Vec::with_capacity(self.config.custom.len());
            for (name, rule) in &self.config.custom {
                nested.push(compile_rule(name.clone(), rule, &mut self.handlers)?);
            }
            rules.push(Rule {
                name: CUSTOM_GROUP.to_string(),
                display: CUSTOM_GROUP.to_string(),
                matcher: Matcher::Nested(nested),
                help: None,
                handler: None,
                action: None,
                options: Vec::new(),
            });
        }

        check_unique_names(&rules)?;
        if let Some(rule) = self.handlers.into_keys().min() {
            return Err(ConfigError::UnknownHandlerTarget { rule });
        }

        Ok(RuleSet {
            rules,
            separator,
            option_marker,
            help_pattern,
        })
    }
}

fn compile_pattern(context: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        context: context.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_matcher(name: &str, matcher: &MatchConfig) -> Result<Matcher, ConfigError> {
    match matcher {
        MatchConfig::Literal(literal) => Ok(Matcher::Literal(literal.clone())),
        MatchConfig::Pattern { pattern } => {
            compile_pattern(&format!("rule `{name}`"), pattern).map(Matcher::Pattern)
        }
    }
}

fn compile_children(
    parent: &str,
    children: &[RuleConfig],
    handlers: &mut HashMap<String, RuleHandler>,
) -> Result<Vec<Rule>, ConfigError> {
    children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let name = child
                .name
                .clone()
                .unwrap_or_else(|| format!("{parent}.{index}"));
            compile_rule(name, child, handlers)
        })
        .collect()
}

fn compile_rule(
    name: String,
    config: &RuleConfig,
    handlers: &mut HashMap<String, RuleHandler>,
) -> Result<Rule, ConfigError> {
    let (matcher, options) = match &config.matcher {
        Some(matcher) => {
            // Option descriptors never carry handlers.
            let descriptors = compile_children(&name, &config.options, &mut HashMap::new())?;
            (compile_matcher(&name, matcher)?, descriptors)
        }
        None if !config.options.is_empty() => (
            Matcher::Nested(compile_children(&name, &config.options, handlers)?),
            Vec::new(),
        ),
        None => return Err(ConfigError::MissingMatcher { rule: name }),
    };

    Ok(Rule {
        display: config.display.clone().unwrap_or_else(|| name.clone()),
        handler: handlers.remove(&name),
        help: config.help.clone(),
        action: config.action,
        matcher,
        options,
        name,
    })
}

fn check_unique_names(rules: &[Rule]) -> Result<(), ConfigError> {
    fn visit<'a>(rules: &'a [Rule], seen: &mut BTreeSet<&'a str>) -> Result<(), ConfigError> {
        for rule in rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigError::DuplicateRule {
                    rule: rule.name.clone(),
                });
            }
            if let Matcher::Nested(nested) = &rule.matcher {
                visit(nested, seen)?;
            }
        }
        Ok(())
    }

    visit(rules, &mut BTreeSet::new())
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::*;

    fn literal(word: &str) -> RuleConfig {
        RuleConfig {
            matcher: Some(MatchConfig::Literal(word.to_string())),
            ..RuleConfig::default()
        }
    }

    fn config_with(
        commands: Vec<(&str, RuleConfig)>,
        custom: Vec<(&str, RuleConfig)>,
    ) -> RuleSetConfig {
        RuleSetConfig {
            commands: commands
                .into_iter()
                .map(|(name, rule)| (name.to_string(), rule))
                .collect::<IndexMap<_, _>>(),
            custom: custom
                .into_iter()
                .map(|(name, rule)| (name.to_string(), rule))
                .collect::<IndexMap<_, _>>(),
            ..RuleSetConfig::default()
        }
    }

    #[test]
    fn stock_config_compiles_with_custom_group_last() {
        let rules = RuleSet::from_config(&RuleSetConfig::default()).expect("compile");
        let names = rules
            .rules()
            .iter()
            .map(Rule::name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["close", "render", "navigate", "showlist", "help", "custom"]);
        assert_eq!(rules.resolve("OPEN").map(Rule::name), Some("render"));
        assert_eq!(rules.resolve("answer").map(Rule::name), Some("answer"));
        assert_eq!(rules.get("render").map(|rule| rule.options().len()), Some(2));
    }

    #[test]
    fn first_declared_rule_wins() {
        let rules = RuleSet::from_config(&config_with(
            vec![
                ("first", RuleConfig::pattern("first", "^go")),
                ("second", literal("go")),
            ],
            Vec::new(),
        ))
        .expect("compile");
        assert_eq!(rules.resolve("go").map(Rule::name), Some("first"));
    }

    #[test]
    fn groups_are_scanned_after_plain_rules() {
        let group = RuleConfig {
            name: None,
            options: vec![RuleConfig {
                name: Some("grouped".to_string()),
                ..literal("go")
            }],
            ..RuleConfig::default()
        };
        let rules = RuleSet::from_config(&config_with(
            vec![("group", group), ("plain", literal("go"))],
            Vec::new(),
        ))
        .expect("compile");
        assert_eq!(rules.resolve("go").map(Rule::name), Some("plain"));
        assert!(rules.get("group").is_some_and(Rule::is_group));
        assert!(rules.get("grouped").is_some());
    }

    #[test]
    fn rule_without_matcher_or_options_is_rejected() {
        let err = RuleSet::from_config(&config_with(
            vec![("broken", RuleConfig::default())],
            Vec::new(),
        ))
        .expect_err("missing matcher");
        assert!(matches!(err, ConfigError::MissingMatcher { rule } if rule == "broken"));
    }

    #[test]
    fn duplicate_names_across_custom_are_rejected() {
        let err = RuleSet::from_config(&config_with(
            vec![("answer", literal("a"))],
            vec![("answer", literal("b"))],
        ))
        .expect_err("duplicate");
        assert!(matches!(err, ConfigError::DuplicateRule { rule } if rule == "answer"));
    }

    #[test]
    fn invalid_patterns_are_reported_at_construction() {
        let mut config = RuleSetConfig::default();
        config.separator = "(".to_string();
        let err = RuleSet::from_config(&config).expect_err("bad separator");
        assert!(matches!(
            err,
            ConfigError::InvalidPattern { context, .. } if context == "separator"
        ));

        let err = RuleSet::from_config(&config_with(
            vec![("bad", RuleConfig::pattern("bad", "[unclosed"))],
            Vec::new(),
        ))
        .expect_err("bad rule");
        assert!(matches!(
            err,
            ConfigError::InvalidPattern { context, .. } if context == "rule `bad`"
        ));
    }

    #[test]
    fn handlers_attach_by_name() {
        let rules = RuleSet::builder(RuleSetConfig::default())
            .handler("answer", |_| Some("42".to_string()))
            .build()
            .expect("compile");
        let handler = rules
            .get("answer")
            .and_then(Rule::handler)
            .expect("handler");
        assert_eq!(handler(&ParsedCommand::default()), Some("42".to_string()));
    }

    #[test]
    fn handler_for_unknown_rule_is_rejected() {
        let err = RuleSet::builder(RuleSetConfig::default())
            .handler("missing", |_| None)
            .build()
            .expect_err("unknown");
        assert!(matches!(err, ConfigError::UnknownHandlerTarget { rule } if rule == "missing"));
    }

    #[test]
    fn commands_flatten_in_resolution_order() {
        let rules = RuleSet::from_config(&RuleSetConfig::default()).expect("compile");
        let displays = rules
            .commands()
            .into_iter()
            .map(Rule::display)
            .collect::<Vec<_>>();
        assert_eq!(displays, vec!["exit", "open", "cd", "ls", "help", "answer"]);
    }
}
