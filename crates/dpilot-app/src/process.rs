//! Message processing: run the update function and dispatch its actions

use std::sync::Arc;

use dpilot_driver::{DeviceSource, SessionFactory};
use tokio::sync::mpsc;

use crate::actions::handle_action;
use crate::executor::FlowExecutor;
use crate::flow::Journey;
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update loop, following up chained
/// messages and handing actions to the executor
pub fn process_message<F, J, S>(
    state: &mut AppState,
    message: Message,
    msg_tx: &mpsc::Sender<Message>,
    executor: &Arc<FlowExecutor<F, J, S>>,
) where
    F: SessionFactory,
    J: Journey,
    S: DeviceSource + Sync + 'static,
{
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            handle_action(action, msg_tx.clone(), executor);
        }

        msg = result.message;
    }
}
