//! Terminal browser built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: browser state, keyboard event loop, pane focus and the
//!   flattened cursor tree
//! - **[`panes`]**: stateless render functions for each visible pane (cursor
//!   tree, source, details, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it over a parsed
//! [`TranslationUnit`] and call [`App::run`] to start the event loop.
//!
//! [`TranslationUnit`]: crate::unit::TranslationUnit
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
