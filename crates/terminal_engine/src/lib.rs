//! Fake-terminal engine: line editing, command routing, site navigation, and the widget that
//! ties them to an [`event_bus::EventBus`] pair and a [`DisplaySink`].
//!
//! The engine is single-threaded. Shared pieces live behind `Rc` and interior mutability, and
//! every reaction happens synchronously inside the dispatch that caused it.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use thiserror::Error;

mod config;
mod display;
mod input;
mod navigator;
mod router;
mod widget;

pub use config::{Messages, PromptConfig, TerminalConfig, COMMAND_PLACEHOLDER};
pub use display::{DisplaySink, SignalDisplay};
pub use input::{InputController, InputState};
pub use navigator::{MapNode, NavError, SiteMap, SiteNavigator, Suggestion};
pub use router::ResponseRouter;
pub use widget::{answer, stock_rules, TerminalWidget, ANSWER_RULE};

/// Widget construction error.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// The command grammar does not compile.
    #[error(transparent)]
    Config(#[from] command_parser::ConfigError),
    /// The internal event wiring was rejected.
    #[error(transparent)]
    Bus(#[from] event_bus::BusError),
}
