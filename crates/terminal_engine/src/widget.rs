//! Composition root wiring the controller, router, buses, and display together.

use std::rc::{Rc, Weak};

use command_parser::{RuleConfig, RuleSet, RuleSetConfig};
use event_bus::{Bark, EventBus};
use terminal_contract::{barks, BarkPayload, KeyIntent, ParsedCommand, ResponseKind, ResponseLine};

use crate::{
    config::TerminalConfig, display::DisplaySink, input::InputController, router::ResponseRouter,
    WidgetError,
};

/// Name of the stock rule answered by [`answer`].
pub const ANSWER_RULE: &str = "answer";
const ANSWER_TOPICS: [&str; 5] = ["*", "all", "life", "universe", "everything"];

/// Stock handler for the `answer` rule.
pub fn answer(command: &ParsedCommand) -> Option<String> {
    let asked = command.first_argument_token().is_some_and(|topic| {
        let topic = topic.to_lowercase();
        ANSWER_TOPICS.contains(&topic.as_str())
    });
    Some(if asked { "42" } else { "Answer to what?" }.to_string())
}

/// Compiles `config`, attaching the stock handlers to the rules that exist.
///
/// # Errors
///
/// Returns [`command_parser::ConfigError`] when the configuration does not compile.
pub fn stock_rules(config: &RuleSetConfig) -> Result<RuleSet, command_parser::ConfigError> {
    let mut builder = RuleSet::builder(config.clone());
    if declares(config, ANSWER_RULE) {
        builder = builder.handler(ANSWER_RULE, answer);
    }
    builder.build()
}

fn declares(config: &RuleSetConfig, name: &str) -> bool {
    fn nested(rule: &RuleConfig, name: &str) -> bool {
        rule.matcher.is_none()
            && rule
                .options
                .iter()
                .any(|option| option.name.as_deref() == Some(name) || nested(option, name))
    }
    config
        .commands
        .iter()
        .chain(&config.custom)
        .any(|(key, rule)| key == name || nested(rule, name))
}

/// A complete fake terminal.
///
/// Keystrokes go in through [`TerminalWidget::handle`]. Everything a host may observe is
/// dispatched on [`TerminalWidget::events`]: `command_execute`, `command_not_found`,
/// `navigation_suggest`, `command_response`, `file_doesnt_exist`, and `terminal_exit`.
pub struct TerminalWidget {
    config: TerminalConfig,
    rules: Rc<RuleSet>,
    input_bus: Rc<EventBus<BarkPayload>>,
    output_bus: Rc<EventBus<BarkPayload>>,
    controller: Rc<InputController>,
    router: Rc<ResponseRouter>,
    display: Rc<dyn DisplaySink>,
}

impl TerminalWidget {
    /// Builds a widget from `config` with the stock handlers.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Config`] when the command grammar does not compile.
    pub fn new(config: TerminalConfig, display: Rc<dyn DisplaySink>) -> Result<Self, WidgetError> {
        let rules = stock_rules(&config.rules)?;
        Self::with_rules(config, rules, display)
    }

    /// Builds a widget around an already compiled rule set. `config.rules` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Bus`] when the internal event wiring is rejected.
    pub fn with_rules(
        config: TerminalConfig,
        rules: RuleSet,
        display: Rc<dyn DisplaySink>,
    ) -> Result<Self, WidgetError> {
        let rules = Rc::new(rules);
        let input_bus = Rc::new(EventBus::new());
        let output_bus = Rc::new(EventBus::new());
        let controller = Rc::new(InputController::new(
            rules.clone(),
            input_bus.clone(),
            display.clone(),
            config.history_limit,
        ));
        let router = Rc::new(ResponseRouter::new(
            rules.clone(),
            &config,
            output_bus.clone(),
        ));

        input_bus.bubble(barks::COMMAND_NOT_FOUND, &output_bus)?;
        input_bus.bubble(barks::EXECUTE, &output_bus)?;
        input_bus.subscribe(
            barks::EXECUTE,
            {
                let router = router.clone();
                move |bark: &Bark<BarkPayload>| {
                    if let Some(command) = bark.payload().as_command() {
                        router.route(command);
                    }
                }
            },
            None,
        )?;
        input_bus.subscribe(
            barks::NAV_SUGGEST,
            {
                let router = router.clone();
                let controller = Rc::downgrade(&controller);
                move |bark: &Bark<BarkPayload>| {
                    if let Some(buffer) = bark.payload().as_text() {
                        complete(&router, &controller, buffer);
                    }
                }
            },
            Some(&output_bus),
        )?;

        output_bus.subscribe(
            barks::RESPONSE,
            {
                let display = display.clone();
                move |bark: &Bark<BarkPayload>| {
                    if let Some(line) = bark.payload().as_response() {
                        display.append_line(line);
                    }
                }
            },
            None,
        )?;
        output_bus.subscribe(
            barks::FILE_NOT_EXIST,
            {
                let bus = Rc::downgrade(&output_bus);
                let no_file = config.messages.no_file.clone();
                move |_: &Bark<BarkPayload>| {
                    if let Some(bus) = bus.upgrade() {
                        let line = BarkPayload::Response(ResponseLine::notice(no_file.clone()));
                        if let Err(err) = bus.dispatch(barks::RESPONSE, line) {
                            leptos::logging::warn!("missing-file notice was not delivered: {err}");
                        }
                    }
                }
            },
            None,
        )?;

        let widget = Self {
            config,
            rules,
            input_bus,
            output_bus,
            controller,
            router,
            display,
        };
        widget.echo(&widget.config.messages.welcome);
        widget.display.set_prompt(&widget.router.prompt());
        Ok(widget)
    }

    /// Applies one key intent. Returns the parsed command when the intent submitted a line.
    pub fn handle(&self, intent: KeyIntent) -> Option<ParsedCommand> {
        match intent {
            KeyIntent::WriteChar(ch) => self.controller.write(ch.encode_utf8(&mut [0; 4])),
            KeyIntent::Backspace => self.controller.clear(Some(1)),
            KeyIntent::CaretLeft => {
                self.controller.move_caret(-1);
            }
            KeyIntent::CaretRight => {
                self.controller.move_caret(1);
            }
            KeyIntent::HistoryPrev => {
                self.controller.navigate_history(-1);
            }
            KeyIntent::HistoryNext => {
                self.controller.navigate_history(1);
            }
            KeyIntent::Submit => {
                let parsed = self.controller.submit();
                self.display.set_prompt(&self.router.prompt());
                return parsed;
            }
            KeyIntent::RequestNavSuggest => self.controller.request_suggestion(),
        }
        None
    }

    /// Types `line` and submits it.
    pub fn run(&self, line: &str) -> Option<ParsedCommand> {
        self.controller.clear(None);
        self.controller.write(line);
        self.handle(KeyIntent::Submit)
    }

    /// Appends a notice to the scrollback.
    pub fn echo(&self, text: &str) {
        self.router.emit(ResponseLine::notice(text));
    }

    /// Host-facing bus.
    pub fn events(&self) -> &Rc<EventBus<BarkPayload>> {
        &self.output_bus
    }

    /// Bus the controller announces on. Host listeners normally belong on [`Self::events`].
    pub fn input_events(&self) -> &Rc<EventBus<BarkPayload>> {
        &self.input_bus
    }

    /// The line editor.
    pub fn controller(&self) -> &InputController {
        &self.controller
    }

    /// The compiled command grammar.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Configuration the widget was built with.
    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    /// Prompt for the current location.
    pub fn prompt(&self) -> String {
        self.router.prompt()
    }
}

fn complete(router: &ResponseRouter, controller: &Weak<InputController>, buffer: &str) {
    let suggestion = router.suggest(buffer);
    if let (Some(line), Some(controller)) = (&suggestion.line, controller.upgrade()) {
        controller.replace(line);
    }
    if suggestion.candidates.len() > 1 {
        router.emit(ResponseLine::new(
            ResponseKind::Listing,
            suggestion.candidates.join("  "),
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use leptos::SignalGetUntracked;
    use pretty_assertions::assert_eq;
    use terminal_contract::InputMode;

    use super::*;
    use crate::{display::SignalDisplay, navigator::SiteMap};

    fn widget() -> (TerminalWidget, SignalDisplay) {
        let _ = leptos::create_runtime();
        let config = TerminalConfig {
            map: SiteMap::new()
                .with_section("about", "<b>hello</b>")
                .with_section("contact", "mail")
                .with_category("work", SiteMap::new().with_section("rust", "crates")),
            ..TerminalConfig::default()
        };
        let display = SignalDisplay::new(config.scrollback_limit);
        let widget = TerminalWidget::new(config, Rc::new(display)).expect("widget");
        (widget, display)
    }

    fn texts(display: &SignalDisplay) -> Vec<String> {
        display.lines().into_iter().map(|line| line.text).collect()
    }

    fn type_text(widget: &TerminalWidget, text: &str) {
        for ch in text.chars() {
            widget.handle(KeyIntent::WriteChar(ch));
        }
    }

    #[test]
    fn starts_with_welcome_and_prompt() {
        let (_widget, display) = widget();
        assert_eq!(texts(&display), vec!["Welcome to my site"]);
        assert_eq!(display.prompt().get_untracked(), "root: ~$ ");
    }

    #[test]
    fn typing_and_submitting_updates_display() {
        let (widget, display) = widget();
        type_text(&widget, "cd wrk");
        widget.handle(KeyIntent::CaretLeft);
        widget.handle(KeyIntent::CaretLeft);
        widget.handle(KeyIntent::WriteChar('o'));
        assert_eq!(display.input_line(), "cd wo|rk");

        let parsed = widget.handle(KeyIntent::Submit).expect("submitted");
        assert_eq!(parsed.argument.as_deref(), Some("work"));
        assert_eq!(display.prompt().get_untracked(), "root: /work$ ");
        assert_eq!(display.input_line(), "|");
        assert_eq!(widget.controller().mode(), InputMode::Idle);
    }

    #[test]
    fn host_sees_execute_before_responses() {
        let (widget, _display) = widget();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for event in [barks::COMMAND_NOT_FOUND, barks::EXECUTE, barks::RESPONSE] {
            let seen = seen.clone();
            widget
                .events()
                .subscribe(
                    event,
                    move |bark: &Bark<BarkPayload>| seen.borrow_mut().push(bark.name().to_string()),
                    None,
                )
                .expect("subscribe");
        }
        widget.run("frobnicate");
        assert_eq!(
            *seen.borrow(),
            vec![
                barks::COMMAND_NOT_FOUND,
                barks::EXECUTE,
                barks::RESPONSE,
                barks::RESPONSE
            ]
        );
    }

    #[test]
    fn answer_rule_uses_stock_handler() {
        let (widget, display) = widget();
        widget.run("answer everything");
        widget.run("answer me");
        let lines = texts(&display);
        assert_eq!(lines[2], "42");
        assert_eq!(lines[4], "Answer to what?");
    }

    #[test]
    fn missing_file_echoes_notice() {
        let (widget, display) = widget();
        let missing = Rc::new(RefCell::new(None));
        {
            let missing = missing.clone();
            widget
                .events()
                .subscribe(
                    barks::FILE_NOT_EXIST,
                    move |bark: &Bark<BarkPayload>| {
                        *missing.borrow_mut() = bark.payload().as_text().map(str::to_string);
                    },
                    None,
                )
                .expect("subscribe");
        }
        widget.run("cd nowhere");
        assert_eq!(texts(&display).last().map(String::as_str), Some("File does not exist"));
        assert_eq!(missing.borrow().as_deref(), Some("nowhere"));
    }

    #[test]
    fn open_plain_text_strips_markup() {
        let (widget, display) = widget();
        widget.run("open -t about");
        assert_eq!(texts(&display).last().map(String::as_str), Some("hello"));
    }

    #[test]
    fn tab_completion_extends_buffer_or_lists() {
        let (widget, display) = widget();
        type_text(&widget, "op");
        widget.handle(KeyIntent::RequestNavSuggest);
        assert_eq!(widget.controller().buffer(), "open ");

        widget.handle(KeyIntent::RequestNavSuggest);
        assert_eq!(widget.controller().buffer(), "open ");
        assert_eq!(
            display.lines().last(),
            Some(&ResponseLine::new(ResponseKind::Listing, "about  contact  work"))
        );

        type_text(&widget, "w");
        widget.handle(KeyIntent::RequestNavSuggest);
        assert_eq!(display.input_line(), "open work|");
    }

    #[test]
    fn suggestion_request_reaches_host() {
        let (widget, _display) = widget();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            widget
                .events()
                .subscribe(
                    barks::NAV_SUGGEST,
                    move |bark: &Bark<BarkPayload>| {
                        seen.borrow_mut().push(bark.payload().clone());
                    },
                    None,
                )
                .expect("subscribe");
        }
        type_text(&widget, "ls");
        widget.handle(KeyIntent::RequestNavSuggest);
        assert_eq!(*seen.borrow(), vec![BarkPayload::Text("ls".to_string())]);
    }

    #[test]
    fn history_recall_through_intents() {
        let (widget, display) = widget();
        widget.run("ls");
        widget.run("help");
        widget.handle(KeyIntent::HistoryPrev);
        widget.handle(KeyIntent::HistoryPrev);
        assert_eq!(display.input_line(), "ls|");
        widget.handle(KeyIntent::HistoryNext);
        widget.handle(KeyIntent::Backspace);
        assert_eq!(widget.controller().buffer(), "hel");
    }

    #[test]
    fn exit_notifies_host() {
        let (widget, display) = widget();
        let exited = Rc::new(RefCell::new(false));
        {
            let exited = exited.clone();
            widget
                .events()
                .subscribe(
                    barks::EXIT,
                    move |_: &Bark<BarkPayload>| *exited.borrow_mut() = true,
                    None,
                )
                .expect("subscribe");
        }
        widget.run("exit");
        assert!(*exited.borrow());
        assert_eq!(
            texts(&display).last().map(String::as_str),
            Some("Closing my site, Goodbye!")
        );
    }

    #[test]
    fn configs_without_answer_rule_still_build() {
        let _ = leptos::create_runtime();
        let mut config = TerminalConfig::default();
        config.rules.custom.clear();
        let display = SignalDisplay::new(10);
        let widget = TerminalWidget::new(config, Rc::new(display)).expect("widget");
        assert!(widget.rules().get(ANSWER_RULE).is_none());
    }

    #[test]
    fn invalid_grammar_is_a_config_error() {
        let _ = leptos::create_runtime();
        let mut config = TerminalConfig::default();
        config.rules.separator = "(".to_string();
        let display = SignalDisplay::new(10);
        let err = TerminalWidget::new(config, Rc::new(display))
            .err()
            .expect("invalid separator");
        assert!(matches!(err, WidgetError::Config(_)));
    }
}
