//! Line editing, history, and submission.

use std::{cell::RefCell, rc::Rc};

use command_parser::RuleSet;
use event_bus::EventBus;
use leptos::logging;
use serde::{Deserialize, Serialize};
use terminal_contract::{barks, BarkPayload, InputMode, ParsedCommand};

use crate::display::DisplaySink;

/// Editable state of the prompt line.
///
/// `caret` counts characters, not bytes. `history_cursor == history.len()` means no entry is
/// recalled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputState {
    /// Line being typed.
    pub buffer: String,
    /// Caret position in `0..=buffer.chars().count()`.
    pub caret: usize,
    /// Submitted lines, oldest first.
    pub history: Vec<String>,
    /// Index of the recalled history entry.
    pub history_cursor: usize,
    /// Editing mode.
    pub mode: InputMode,
}

impl InputState {
    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, caret: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(caret)
            .map_or(self.buffer.len(), |(offset, _)| offset)
    }

    fn split(&self) -> (String, String) {
        let (pre, post) = self.buffer.split_at(self.byte_offset(self.caret));
        (pre.to_string(), post.to_string())
    }

    fn settle_mode(&mut self) {
        self.mode = if self.buffer.is_empty() {
            InputMode::Idle
        } else {
            InputMode::Editing
        };
    }
}

/// Owns the prompt line and turns submitted lines into bus events.
pub struct InputController {
    rules: Rc<RuleSet>,
    bus: Rc<EventBus<BarkPayload>>,
    display: Rc<dyn DisplaySink>,
    history_limit: usize,
    state: RefCell<InputState>,
}

impl InputController {
    /// Creates an idle controller. Submitted lines are parsed with `rules` and announced on `bus`.
    pub fn new(
        rules: Rc<RuleSet>,
        bus: Rc<EventBus<BarkPayload>>,
        display: Rc<dyn DisplaySink>,
        history_limit: usize,
    ) -> Self {
        Self {
            rules,
            bus,
            display,
            history_limit,
            state: RefCell::new(InputState::default()),
        }
    }

    /// Snapshot of the editing state.
    pub fn state(&self) -> InputState {
        self.state.borrow().clone()
    }

    /// Current line.
    pub fn buffer(&self) -> String {
        self.state.borrow().buffer.clone()
    }

    /// Caret position in characters.
    pub fn caret(&self) -> usize {
        self.state.borrow().caret
    }

    /// Current editing mode.
    pub fn mode(&self) -> InputMode {
        self.state.borrow().mode
    }

    /// Inserts `text` at the caret.
    pub fn write(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        {
            let mut state = self.state.borrow_mut();
            let offset = state.byte_offset(state.caret);
            state.buffer.insert_str(offset, text);
            state.caret += text.chars().count();
            state.mode = InputMode::Editing;
        }
        self.render();
    }

    /// Moves the caret by `delta` characters. Returns the caret position; a move that would leave
    /// the line does nothing.
    pub fn move_caret(&self, delta: isize) -> usize {
        let moved = {
            let mut state = self.state.borrow_mut();
            let target = state.caret.checked_add_signed(delta);
            match target {
                Some(target) if delta != 0 && target <= state.char_len() => {
                    state.caret = target;
                    true
                }
                _ => false,
            }
        };
        if moved {
            self.render();
        }
        self.caret()
    }

    /// Puts the caret after the last character.
    pub fn move_caret_to_end(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.caret = state.char_len();
        }
        self.render();
    }

    /// Deletes up to `count` characters before the caret, or resets the line when `count` is
    /// `None`.
    pub fn clear(&self, count: Option<usize>) {
        {
            let mut state = self.state.borrow_mut();
            match count {
                Some(count) => {
                    let removed = count.min(state.caret);
                    if removed == 0 {
                        return;
                    }
                    let start = state.byte_offset(state.caret - removed);
                    let end = state.byte_offset(state.caret);
                    state.buffer.replace_range(start..end, "");
                    state.caret -= removed;
                    state.settle_mode();
                }
                None => {
                    state.buffer.clear();
                    state.caret = 0;
                    state.mode = InputMode::Idle;
                }
            }
        }
        self.render();
    }

    /// Replaces the line with `text` and moves the caret to its end.
    pub fn replace(&self, text: &str) {
        {
            let mut state = self.state.borrow_mut();
            state.buffer = text.to_string();
            state.settle_mode();
        }
        self.move_caret_to_end();
    }

    /// Recalls a history entry `direction` steps away from the cursor, clamped to the history.
    /// Returns the new cursor.
    pub fn navigate_history(&self, direction: isize) -> usize {
        {
            let mut state = self.state.borrow_mut();
            if state.history.is_empty() {
                return state.history_cursor;
            }
            let last = state.history.len() - 1;
            let target = state
                .history_cursor
                .saturating_add_signed(direction)
                .min(last);
            state.buffer = state.history[target].clone();
            state.history_cursor = target;
            state.mode = InputMode::HistoryBrowsing;
        }
        self.move_caret_to_end();
        self.state.borrow().history_cursor
    }

    /// Parses and announces the current line, records it in history, and clears the prompt.
    ///
    /// An unmatched command word is announced on `command_not_found` before `command_execute`.
    /// Returns `None` for an empty line; nothing is dispatched or recorded then.
    pub fn submit(&self) -> Option<ParsedCommand> {
        let line = self.buffer();
        if line.is_empty() {
            return None;
        }
        let parsed = self.rules.parse(&line);

        if !parsed.found {
            let word = parsed.command.clone().unwrap_or_default();
            self.dispatch(barks::COMMAND_NOT_FOUND, BarkPayload::Text(word));
        }

        {
            let mut state = self.state.borrow_mut();
            state.history.push(line);
            if state.history.len() > self.history_limit {
                let overflow = state.history.len() - self.history_limit;
                state.history.drain(0..overflow);
            }
            state.history_cursor = state.history.len();
        }

        self.dispatch(barks::EXECUTE, BarkPayload::Command(parsed.clone()));
        self.clear(None);
        Some(parsed)
    }

    /// Announces the current line on `navigation_suggest`.
    pub fn request_suggestion(&self) {
        let line = self.buffer();
        self.dispatch(barks::NAV_SUGGEST, BarkPayload::Text(line));
    }

    fn dispatch(&self, event: &str, payload: BarkPayload) {
        if let Err(err) = self.bus.dispatch(event, payload) {
            logging::warn!("input bus dispatch of `{event}` failed: {err}");
        }
    }

    fn render(&self) {
        let (pre, post) = self.state.borrow().split();
        self.display.render_split_text(&pre, &post);
    }
}
