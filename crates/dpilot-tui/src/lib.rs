//! dpilot-tui - Terminal UI for droidpilot
//!
//! A ratatui front end over [`dpilot_app`]: it turns terminal events into
//! messages, renders [`dpilot_app::AppState`] and drives the flow executor
//! through the shared TEA plumbing.

pub mod event;
pub mod layout;
pub mod render;
pub mod runner;
pub mod terminal;
pub mod theme;
pub mod widgets;

#[cfg(test)]
pub mod test_utils;

pub use runner::run;
