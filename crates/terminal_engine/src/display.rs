//! Presentation boundary: what the engine tells a renderer, and a signal-backed renderer.

use leptos::{
    create_rw_signal, ReadSignal, RwSignal, SignalGetUntracked, SignalSet, SignalUpdate,
};
use terminal_contract::ResponseLine;

/// Receives everything the engine wants shown.
pub trait DisplaySink {
    /// Shows the line being typed, split at the caret.
    fn render_split_text(&self, pre_caret: &str, post_caret: &str);
    /// Appends one line to the scrollback.
    fn append_line(&self, line: &ResponseLine);
    /// Replaces the prompt.
    fn set_prompt(&self, prompt: &str);
}

/// [`DisplaySink`] that stores its state in reactive signals for a view to subscribe to.
#[derive(Clone, Copy)]
pub struct SignalDisplay {
    pre_caret: RwSignal<String>,
    post_caret: RwSignal<String>,
    prompt: RwSignal<String>,
    scrollback: RwSignal<Vec<ResponseLine>>,
    scrollback_limit: usize,
}

impl SignalDisplay {
    /// Creates empty signals in the current reactive owner. Scrollback keeps the newest
    /// `scrollback_limit` lines.
    pub fn new(scrollback_limit: usize) -> Self {
        Self {
            pre_caret: create_rw_signal(String::new()),
            post_caret: create_rw_signal(String::new()),
            prompt: create_rw_signal(String::new()),
            scrollback: create_rw_signal(Vec::new()),
            scrollback_limit,
        }
    }

    /// Text before the caret.
    pub fn pre_caret(&self) -> ReadSignal<String> {
        self.pre_caret.read_only()
    }

    /// Text after the caret.
    pub fn post_caret(&self) -> ReadSignal<String> {
        self.post_caret.read_only()
    }

    /// Current prompt.
    pub fn prompt(&self) -> ReadSignal<String> {
        self.prompt.read_only()
    }

    /// Retained scrollback, oldest first.
    pub fn scrollback(&self) -> ReadSignal<Vec<ResponseLine>> {
        self.scrollback.read_only()
    }

    /// Snapshot of the scrollback without tracking.
    pub fn lines(&self) -> Vec<ResponseLine> {
        self.scrollback.get_untracked()
    }

    /// Typed line with the caret position marked by `|`.
    pub fn input_line(&self) -> String {
        format!(
            "{}|{}",
            self.pre_caret.get_untracked(),
            self.post_caret.get_untracked()
        )
    }
}

impl DisplaySink for SignalDisplay {
    fn render_split_text(&self, pre_caret: &str, post_caret: &str) {
        self.pre_caret.set(pre_caret.to_string());
        self.post_caret.set(post_caret.to_string());
    }

    fn append_line(&self, line: &ResponseLine) {
        let limit = self.scrollback_limit;
        self.scrollback.update(|lines| {
            lines.push(line.clone());
            if lines.len() > limit {
                let overflow = lines.len() - limit;
                lines.drain(0..overflow);
            }
        });
    }

    fn set_prompt(&self, prompt: &str) {
        self.prompt.set(prompt.to_string());
    }
}
