//! dpilot-app - Automation journeys, flow executor and application state
//!
//! Layers, bottom-up:
//! - [`config`]: `.droidpilot/config.toml` loading
//! - [`page`] and [`music`]: page objects over a [`dpilot_driver::DeviceDriver`]
//! - [`flow`]: the [`Journey`] trait and the artist journey
//! - [`executor`]: one run per device, phases, stop and events
//! - TEA front-end plumbing ([`state`], [`message`], [`handler`],
//!   [`actions`], [`process`]) shared by the TUI

pub mod actions;
pub mod config;
pub mod executor;
pub mod flow;
pub mod handler;
pub mod input_key;
pub mod message;
pub mod music;
pub mod page;
pub mod pacing;
pub mod process;
pub mod state;

pub use config::Settings;
pub use executor::FlowExecutor;
pub use flow::{ArtistJourney, FlowParams, Journey};
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use state::AppState;
