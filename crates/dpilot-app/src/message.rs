//! Message types for the application (TEA pattern)

use dpilot_core::{Device, FlowEvent, FlowPhase};

use crate::input_key::InputKey;

/// Everything that can change [`crate::state::AppState`]
#[derive(Debug, Clone)]
pub enum Message {
    /// Keyboard event from the terminal
    Key(InputKey),

    /// Periodic redraw/refresh tick
    Tick,

    /// Quit, stopping every run first
    Quit,

    // ─────────────────────────────────────────────────────────
    // Devices
    // ─────────────────────────────────────────────────────────
    RefreshDevices,
    DevicesDiscovered(Vec<Device>),
    /// Discovery found no `adb` to run
    AdbUnavailable(String),

    SelectNext,
    SelectPrevious,
    SelectFirst,
    SelectLast,

    // ─────────────────────────────────────────────────────────
    // Runs
    // ─────────────────────────────────────────────────────────
    StartSelected,
    StartAll,
    StopSelected,

    /// Answer of the executor to a start request
    FlowStartResult {
        device_id: String,
        accepted: bool,
    },
    /// Answer of the executor to a start-all request
    StartAllResult {
        started: usize,
    },
    StopResult {
        device_id: String,
        stopped: bool,
    },

    /// Phase change pushed by the executor
    Flow(FlowEvent),
    /// Full phase snapshot polled from the executor
    StatusSnapshot(Vec<(String, FlowPhase)>),

    // ─────────────────────────────────────────────────────────
    // Artist field
    // ─────────────────────────────────────────────────────────
    EditArtist,
    ArtistInput(char),
    ArtistBackspace,
    ArtistClear,
    CommitArtist,
    CancelArtist,
}
