//! Application state (the Model in TEA)

use chrono::{DateTime, Local};
use dpilot_core::{Device, FlowEvent, FlowPhase};
use std::collections::HashMap;

use crate::config::Settings;
use crate::flow::FlowParams;

/// Which part of the screen owns the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Device list navigation and run controls
    #[default]
    Normal,
    /// Typing into the artist field
    EditingArtist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppPhase {
    #[default]
    Running,
    Quitting,
}

/// Complete application state
#[derive(Debug)]
pub struct AppState {
    pub ui_mode: UiMode,
    pub phase: AppPhase,

    pub settings: Settings,

    /// Devices from the last discovery, in `adb` order
    pub devices: Vec<Device>,

    /// Index into `devices`
    pub selected: usize,

    /// Last known phase per device id; survives devices disappearing
    pub statuses: HashMap<String, FlowPhase>,

    /// Artist the next run searches for
    pub artist: String,

    /// Pending text while in [`UiMode::EditingArtist`]
    pub artist_draft: String,

    /// Bottom line feedback ("Started emulator-5554", errors, ...)
    pub status_line: Option<String>,

    /// Discovery in flight
    pub discovering: bool,

    pub devices_last_updated: Option<DateTime<Local>>,

    /// `false` once discovery found no usable `adb`
    pub adb_available: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let artist = settings.flow.artist.clone();
        Self {
            ui_mode: UiMode::Normal,
            phase: AppPhase::Running,
            settings,
            devices: Vec::new(),
            selected: 0,
            statuses: HashMap::new(),
            artist,
            artist_draft: String::new(),
            status_line: None,
            discovering: false,
            devices_last_updated: None,
            adb_available: true,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.phase == AppPhase::Quitting
    }

    pub fn request_quit(&mut self) {
        self.phase = AppPhase::Quitting;
    }

    // ─────────────────────────────────────────────────────────
    // Devices
    // ─────────────────────────────────────────────────────────

    /// Replace the device list, keeping the selection on the same device
    /// when it is still connected
    pub fn set_devices(&mut self, devices: Vec<Device>) {
        let selected_id = self.selected_device().map(|d| d.id.clone());

        self.devices = devices;
        self.selected = selected_id
            .and_then(|id| self.devices.iter().position(|d| d.id == id))
            .unwrap_or(0);
        self.discovering = false;
        self.devices_last_updated = Some(Local::now());
    }

    pub fn selected_device(&self) -> Option<&Device> {
        self.devices.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.devices.is_empty() {
            self.selected = (self.selected + 1) % self.devices.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.devices.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.devices.len() - 1);
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.devices.len().saturating_sub(1);
    }

    // ─────────────────────────────────────────────────────────
    // Run status
    // ─────────────────────────────────────────────────────────

    pub fn phase_of(&self, device_id: &str) -> FlowPhase {
        self.statuses.get(device_id).cloned().unwrap_or_default()
    }

    pub fn apply_event(&mut self, event: FlowEvent) {
        self.statuses.insert(event.device_id, event.phase);
    }

    /// Replace known phases with an executor snapshot
    pub fn apply_snapshot(&mut self, statuses: Vec<(String, FlowPhase)>) {
        self.statuses.extend(statuses);
    }

    /// Devices currently connecting or running
    pub fn active_runs(&self) -> usize {
        self.statuses.values().filter(|p| p.is_active()).count()
    }

    pub fn flow_params(&self) -> FlowParams {
        FlowParams::new(self.artist.clone())
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_line = Some(message.into());
    }

    // ─────────────────────────────────────────────────────────
    // Artist field
    // ─────────────────────────────────────────────────────────

    pub fn begin_artist_edit(&mut self) {
        self.artist_draft = self.artist.clone();
        self.ui_mode = UiMode::EditingArtist;
    }

    /// Keep the draft unless it is blank
    pub fn commit_artist_edit(&mut self) {
        let draft = self.artist_draft.trim();
        if draft.is_empty() {
            self.set_status("Artist cannot be empty");
        } else {
            self.artist = draft.to_string();
            self.set_status(format!("Artist set to '{}'", self.artist));
        }
        self.artist_draft.clear();
        self.ui_mode = UiMode::Normal;
    }

    pub fn cancel_artist_edit(&mut self) {
        self.artist_draft.clear();
        self.ui_mode = UiMode::Normal;
    }
}
