//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Serial prefix the device bridge uses for emulator instances
pub const EMULATOR_PREFIX: &str = "emulator-";

/// Longest error message kept in a [`FlowPhase::Failed`] label
pub const STATUS_MESSAGE_MAX_CHARS: usize = 50;

/// A device reported ready by the device bridge.
///
/// Re-created on every discovery poll; the serial is the only identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    /// Serial as printed by `adb devices`
    pub id: String,

    /// Whether the serial follows the emulator naming convention
    pub emulator: bool,
}

impl Device {
    /// Build a device, classifying it from its serial
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let emulator = is_emulator_serial(&id);
        Self { id, emulator }
    }

    /// "Emulator" or "Physical device"
    pub fn kind_label(&self) -> &'static str {
        if self.emulator {
            "Emulator"
        } else {
            "Physical device"
        }
    }

    /// Exact serial match, or a case-insensitive serial prefix
    pub fn matches(&self, specifier: &str) -> bool {
        if self.id == specifier {
            return true;
        }
        self.id
            .to_lowercase()
            .starts_with(&specifier.to_lowercase())
    }
}

/// Emulator classification by naming convention only
pub fn is_emulator_serial(id: &str) -> bool {
    id.starts_with(EMULATOR_PREFIX)
}

/// Phase of a per-device automation run.
///
/// Transitions only move forward: `NotStarted -> Starting -> Connecting ->
/// Running -> {Completed, Failed, Stopped}`. A new run starts over from
/// `Starting`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", content = "message", rename_all = "snake_case")]
pub enum FlowPhase {
    /// No run was ever requested for this device
    #[default]
    NotStarted,
    /// Run accepted, task spawned
    Starting,
    /// Opening the remote automation session
    Connecting,
    /// Session open, journey in progress
    Running,
    /// Journey finished successfully
    Completed,
    /// Session or journey failed
    Failed(String),
    /// Run was stopped on request
    Stopped,
}

impl FlowPhase {
    /// Build a failure phase, truncating the message for display
    pub fn failed(message: impl AsRef<str>) -> Self {
        let message: String = message
            .as_ref()
            .chars()
            .take(STATUS_MESSAGE_MAX_CHARS)
            .collect();
        FlowPhase::Failed(message)
    }

    /// Completed, Failed and Stopped never change without a new start
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowPhase::Completed | FlowPhase::Failed(_) | FlowPhase::Stopped
        )
    }

    /// A run is in flight in this phase
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            FlowPhase::Starting | FlowPhase::Connecting | FlowPhase::Running
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FlowPhase::Failed(_))
    }

    /// Human-readable status label
    pub fn label(&self) -> String {
        match self {
            FlowPhase::NotStarted => "Not started".to_string(),
            FlowPhase::Starting => "Starting...".to_string(),
            FlowPhase::Connecting => "Connecting...".to_string(),
            FlowPhase::Running => "Running flow...".to_string(),
            FlowPhase::Completed => "Completed".to_string(),
            FlowPhase::Failed(message) => format!("Error: {}", message),
            FlowPhase::Stopped => "Stopped".to_string(),
        }
    }
}

impl fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Phase change of one device's run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowEvent {
    pub device_id: String,
    pub phase: FlowPhase,
}

impl FlowEvent {
    pub fn new(device_id: impl Into<String>, phase: FlowPhase) -> Self {
        Self {
            device_id: device_id.into(),
            phase,
        }
    }
}
