//! Handler module - TEA update function and key handling
//!
//! - `update`: the update function and message dispatch
//! - `keys`: key events to messages, per UI mode

pub(crate) mod keys;
pub(crate) mod update;


use crate::flow::FlowParams;
use crate::message::Message;

pub use keys::handle_key;
pub use update::update;

/// Side effects the event loop performs after an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// List devices in the background
    DiscoverDevices,

    StartFlow {
        device_id: String,
        params: FlowParams,
    },

    /// Discover devices and start a run on each
    StartAll { params: FlowParams },

    StopFlow { device_id: String },

    /// Signal every live run (used on quit)
    StopAll,
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Follow-up message to process immediately
    pub message: Option<Message>,
    /// Action for the event loop to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }
}
