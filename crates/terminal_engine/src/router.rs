//! Turns executed commands into scrollback lines and host events.

use std::{cell::RefCell, rc::Rc};

use command_parser::{BuiltinAction, Rule, RuleSet};
use event_bus::EventBus;
use leptos::logging;
use terminal_contract::{barks, BarkPayload, ParsedCommand, ResponseKind, ResponseLine};

use crate::{
    config::{Messages, PromptConfig, TerminalConfig},
    navigator::{NavError, SiteNavigator, Suggestion},
};

/// Answers `command_execute` deliveries on the output bus.
pub struct ResponseRouter {
    rules: Rc<RuleSet>,
    messages: Messages,
    prompt: PromptConfig,
    navigator: RefCell<SiteNavigator>,
    output: Rc<EventBus<BarkPayload>>,
}

impl ResponseRouter {
    /// Creates a router at the root of the configured map. Responses go to `output`.
    pub fn new(
        rules: Rc<RuleSet>,
        config: &TerminalConfig,
        output: Rc<EventBus<BarkPayload>>,
    ) -> Self {
        Self {
            rules,
            messages: config.messages.clone(),
            prompt: config.prompt.clone(),
            navigator: RefCell::new(SiteNavigator::new(config.map.clone())),
            output,
        }
    }

    /// Prompt for the current location, e.g. `root: /work$ `.
    pub fn prompt(&self) -> String {
        self.prompt
            .render(&self.navigator.borrow().location_label())
    }

    /// Category names from the root to the current location.
    pub fn location(&self) -> Vec<String> {
        self.navigator.borrow().location().to_vec()
    }

    /// Completion for a partially typed line.
    pub fn suggest(&self, buffer: &str) -> Suggestion {
        self.navigator.borrow().suggest(buffer, &self.rules)
    }

    /// Appends `line` to the scrollback through the output bus.
    pub fn emit(&self, line: ResponseLine) {
        self.dispatch(barks::RESPONSE, BarkPayload::Response(line));
    }

    /// Responds to one executed command.
    ///
    /// The echo comes first, then one of: the not-found message, the rule's help, the handler
    /// output, or the builtin action output.
    pub fn route(&self, command: &ParsedCommand) {
        self.emit(ResponseLine::new(
            ResponseKind::Echo,
            format!("{}{}", self.prompt(), command.raw_text),
        ));

        if !command.found {
            let word = command.command.as_deref().unwrap_or_default();
            self.emit(ResponseLine::new(
                ResponseKind::NotFound,
                self.messages.not_found_for(word),
            ));
            return;
        }

        let Some(rule) = command
            .matched_rule
            .as_deref()
            .and_then(|name| self.rules.get(name))
        else {
            logging::warn!(
                "matched rule {:?} is not part of the rule set",
                command.matched_rule
            );
            return;
        };

        if command.help_requested {
            self.help_for(rule);
        } else if let Some(handler) = rule.handler() {
            if let Some(text) = handler(command) {
                self.emit(ResponseLine::output(text));
            }
        } else if let Some(action) = rule.action() {
            self.run_action(action, command);
        }
    }

    fn help_for(&self, rule: &Rule) {
        let help = rule
            .help()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}: no help available", rule.display()));
        self.emit(ResponseLine::new(
            ResponseKind::Help,
            format!("{}{help}", self.prompt.response_prefix),
        ));
        for option in rule.options() {
            let row = format!("  {}  {}", option.display(), option.help().unwrap_or(""));
            self.emit(ResponseLine::new(ResponseKind::Help, row.trim_end()));
        }
    }

    fn run_action(&self, action: BuiltinAction, command: &ParsedCommand) {
        match action {
            BuiltinAction::Help => self.emit_all(SiteNavigator::help(&self.rules)),
            BuiltinAction::List => {
                let lines = self.navigator.borrow().list();
                self.emit_all(lines);
            }
            BuiltinAction::Open => {
                let result = self.navigator.borrow_mut().open(command);
                self.emit_navigation(result);
            }
            BuiltinAction::Navigate => {
                let result = self
                    .navigator
                    .borrow_mut()
                    .navigate(command.argument.as_deref());
                self.emit_navigation(result);
            }
            BuiltinAction::Exit => {
                self.emit(ResponseLine::notice(self.messages.goodbye.clone()));
                self.dispatch(barks::EXIT, BarkPayload::Command(command.clone()));
            }
        }
    }

    fn emit_navigation(&self, result: Result<Vec<ResponseLine>, NavError>) {
        match result {
            Ok(lines) => self.emit_all(lines),
            Err(err) => self.dispatch(
                barks::FILE_NOT_EXIST,
                BarkPayload::Text(err.target().to_string()),
            ),
        }
    }

    fn emit_all(&self, lines: Vec<ResponseLine>) {
        for line in lines {
            self.emit(line);
        }
    }

    fn dispatch(&self, event: &str, payload: BarkPayload) {
        if let Err(err) = self.output.dispatch(event, payload) {
            logging::warn!("output bus dispatch of `{event}` failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use command_parser::RuleSetConfig;
    use event_bus::Bark;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::navigator::SiteMap;

    struct Fixture {
        router: ResponseRouter,
        rules: Rc<RuleSet>,
        events: Rc<RefCell<Vec<(String, BarkPayload)>>>,
    }

    fn fixture(rules: RuleSet) -> Fixture {
        let config = TerminalConfig {
            map: SiteMap::new()
                .with_section("about", "hello")
                .with_category("work", SiteMap::new().with_section("rust", "crates")),
            ..TerminalConfig::default()
        };
        let rules = Rc::new(rules);
        let output = Rc::new(EventBus::new());
        let events = Rc::new(RefCell::new(Vec::new()));
        for event in [barks::RESPONSE, barks::FILE_NOT_EXIST, barks::EXIT] {
            let events = events.clone();
            output
                .subscribe(
                    event,
                    move |bark: &Bark<BarkPayload>| {
                        events
                            .borrow_mut()
                            .push((bark.name().to_string(), bark.payload().clone()));
                    },
                    None,
                )
                .expect("subscribe");
        }
        Fixture {
            router: ResponseRouter::new(rules.clone(), &config, output),
            rules,
            events,
        }
    }

    fn stock() -> Fixture {
        fixture(RuleSet::from_config(&RuleSetConfig::default()).expect("compile"))
    }

    impl Fixture {
        fn run(&self, line: &str) -> Vec<ResponseLine> {
            self.events.borrow_mut().clear();
            self.router.route(&self.rules.parse(line));
            self.events
                .borrow()
                .iter()
                .filter_map(|(_, payload)| payload.as_response().cloned())
                .collect()
        }

        fn event_names(&self) -> Vec<String> {
            self.events
                .borrow()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }
    }

    #[test]
    fn unknown_command_echoes_and_reports() {
        let fx = stock();
        let lines = fx.run("frobnicate now");
        assert_eq!(
            lines,
            vec![
                ResponseLine::new(ResponseKind::Echo, "root: ~$ frobnicate now"),
                ResponseLine::new(ResponseKind::NotFound, "frobnicate: command not found"),
            ]
        );
    }

    #[test]
    fn bare_help_lists_commands() {
        let fx = stock();
        let lines = fx.run("help");
        assert_eq!(lines.len(), 7);
        assert!(lines[1..]
            .iter()
            .all(|line| line.kind == ResponseKind::Listing));
        assert!(lines[2].text.starts_with("open"));
    }

    #[test]
    fn help_request_uses_response_prefix_and_lists_options() {
        let fx = stock();
        let lines = fx.run("open --help");
        assert_eq!(
            lines[1..].to_vec(),
            vec![
                ResponseLine::new(
                    ResponseKind::Help,
                    "-bash: Displays the information from an available section"
                ),
                ResponseLine::new(
                    ResponseKind::Help,
                    "  -all  Force the display of all the renderable objects within range"
                ),
                ResponseLine::new(
                    ResponseKind::Help,
                    "  -t  Displays the selected section as plain text"
                ),
            ]
        );
    }

    #[test]
    fn handler_output_is_emitted_and_help_suppresses_it() {
        let rules = RuleSet::builder(RuleSetConfig::default())
            .handler("answer", |_| Some("42".to_string()))
            .build()
            .expect("compile");
        let fx = fixture(rules);
        assert_eq!(fx.run("answer life")[1], ResponseLine::output("42"));

        let help = fx.run("answer -h");
        assert_eq!(help.len(), 2);
        assert_eq!(help[1].kind, ResponseKind::Help);
    }

    #[test]
    fn rule_without_handler_or_action_only_echoes() {
        let fx = stock();
        assert_eq!(fx.run("answer").len(), 1);
    }

    #[test]
    fn navigation_changes_prompt() {
        let fx = stock();
        fx.run("cd work");
        assert_eq!(fx.router.prompt(), "root: /work$ ");
        assert_eq!(fx.router.location(), vec!["work".to_string()]);
        let lines = fx.run("ls");
        assert_eq!(lines[0].text, "root: /work$ ls");
        assert_eq!(lines[1], ResponseLine::new(ResponseKind::Listing, "rust"));
        assert_eq!(fx.run("open rust")[1], ResponseLine::output("crates"));
    }

    #[test]
    fn missing_target_raises_file_event() {
        let fx = stock();
        fx.run("open blog");
        assert_eq!(fx.event_names(), vec![barks::RESPONSE, barks::FILE_NOT_EXIST]);
        assert_eq!(
            fx.events.borrow()[1].1,
            BarkPayload::Text("blog".to_string())
        );
    }

    #[test]
    fn exit_says_goodbye_then_signals_host() {
        let fx = stock();
        let lines = fx.run("exit");
        assert_eq!(lines[1], ResponseLine::notice("Closing my site, Goodbye!"));
        assert_eq!(
            fx.event_names(),
            vec![barks::RESPONSE, barks::RESPONSE, barks::EXIT]
        );
    }
}
