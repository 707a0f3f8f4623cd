//! Main update function - handles state transitions (TEA pattern)

use crate::message::Message;
use crate::state::{AppState, UiMode};
use tracing::{debug, info, warn};

use super::{keys::handle_key, UpdateAction, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Key(key) => match handle_key(state, key) {
            Some(msg) => UpdateResult::message(msg),
            None => UpdateResult::none(),
        },

        Message::Tick => UpdateResult::none(),

        Message::Quit => {
            info!("Quit requested");
            state.request_quit();
            UpdateResult::action(UpdateAction::StopAll)
        }

        // ─────────────────────────────────────────────────────────
        // Devices
        // ─────────────────────────────────────────────────────────
        Message::RefreshDevices => {
            if state.discovering {
                return UpdateResult::none();
            }
            state.discovering = true;
            UpdateResult::action(UpdateAction::DiscoverDevices)
        }

        Message::DevicesDiscovered(devices) => {
            debug!("{} device(s) discovered", devices.len());
            state.adb_available = true;
            state.set_devices(devices);
            UpdateResult::none()
        }

        Message::AdbUnavailable(reason) => {
            warn!("adb unavailable: {}", reason);
            state.adb_available = false;
            state.set_devices(Vec::new());
            state.set_status(reason);
            UpdateResult::none()
        }

        Message::SelectNext => {
            state.select_next();
            UpdateResult::none()
        }
        Message::SelectPrevious => {
            state.select_previous();
            UpdateResult::none()
        }
        Message::SelectFirst => {
            state.select_first();
            UpdateResult::none()
        }
        Message::SelectLast => {
            state.select_last();
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Runs
        // ─────────────────────────────────────────────────────────
        Message::StartSelected => {
            let Some(device) = state.selected_device() else {
                state.set_status("No device selected");
                return UpdateResult::none();
            };
            let device_id = device.id.clone();
            UpdateResult::action(UpdateAction::StartFlow {
                device_id,
                params: state.flow_params(),
            })
        }

        Message::StartAll => UpdateResult::action(UpdateAction::StartAll {
            params: state.flow_params(),
        }),

        Message::StopSelected => {
            let Some(device) = state.selected_device() else {
                state.set_status("No device selected");
                return UpdateResult::none();
            };
            UpdateResult::action(UpdateAction::StopFlow {
                device_id: device.id.clone(),
            })
        }

        Message::FlowStartResult {
            device_id,
            accepted,
        } => {
            if accepted {
                state.set_status(format!("Started flow on {}", device_id));
            } else {
                state.set_status(format!("A flow is already running on {}", device_id));
            }
            UpdateResult::none()
        }

        Message::StartAllResult { started } => {
            state.set_status(format!("Started flows on {} device(s)", started));
            UpdateResult::none()
        }

        Message::StopResult { device_id, stopped } => {
            if stopped {
                state.set_status(format!("Stopping flow on {}", device_id));
            } else {
                state.set_status(format!("No flow running on {}", device_id));
            }
            UpdateResult::none()
        }

        Message::Flow(event) => {
            state.apply_event(event);
            UpdateResult::none()
        }

        Message::StatusSnapshot(statuses) => {
            state.apply_snapshot(statuses);
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Artist field
        // ─────────────────────────────────────────────────────────
        Message::EditArtist => {
            state.begin_artist_edit();
            UpdateResult::none()
        }

        Message::ArtistInput(c) => {
            if state.ui_mode == UiMode::EditingArtist {
                state.artist_draft.push(c);
            }
            UpdateResult::none()
        }

        Message::ArtistBackspace => {
            state.artist_draft.pop();
            UpdateResult::none()
        }

        Message::ArtistClear => {
            state.artist_draft.clear();
            UpdateResult::none()
        }

        Message::CommitArtist => {
            state.commit_artist_edit();
            UpdateResult::none()
        }

        Message::CancelArtist => {
            state.cancel_artist_edit();
            UpdateResult::none()
        }
    }
}
