//! Headless mode - NDJSON event output instead of the TUI
//!
//! Every device gets a run; progress is written to stdout as newline-delimited
//! JSON so scripts and CI jobs can follow it without parsing terminal output.
//! Each event has an "event" field naming its type.
//!
//! # Example Output
//!
//! ```json
//! {"event":"device_detected","device_id":"emulator-5554","kind":"Emulator","timestamp":1704700001000}
//! {"event":"flow_started","device_id":"emulator-5554","artist":"Martin Garrix","timestamp":1704700001005}
//! {"event":"flow_status","device_id":"emulator-5554","status":"Completed","terminal":true,"timestamp":1704700042000}
//! {"event":"summary","devices":1,"started":1,"completed":1,"failed":0,"stopped":0,"timestamp":1704700042001}
//! ```

pub mod runner;

pub use runner::{run_headless, RunSummary};

use chrono::Utc;
use dpilot_core::{Device, FlowEvent};
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

/// Events emitted in headless mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Device reported ready by the device bridge
    DeviceDetected {
        device_id: String,
        kind: String,
        timestamp: i64,
    },

    /// Run accepted for a device
    FlowStarted {
        device_id: String,
        artist: String,
        timestamp: i64,
    },

    /// Run refused, usually because one is already alive
    FlowRejected {
        device_id: String,
        reason: String,
        timestamp: i64,
    },

    /// Phase change of a run
    FlowStatus {
        device_id: String,
        status: String,
        terminal: bool,
        timestamp: i64,
    },

    /// Totals, emitted once every run has ended
    Summary {
        devices: usize,
        started: usize,
        completed: usize,
        failed: usize,
        stopped: usize,
        timestamp: i64,
    },

    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn device_detected(device: &Device) -> Self {
        Self::DeviceDetected {
            device_id: device.id.clone(),
            kind: device.kind_label().to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn flow_started(device_id: &str, artist: &str) -> Self {
        Self::FlowStarted {
            device_id: device_id.to_string(),
            artist: artist.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn flow_rejected(device_id: &str, reason: impl Into<String>) -> Self {
        Self::FlowRejected {
            device_id: device_id.to_string(),
            reason: reason.into(),
            timestamp: Self::now(),
        }
    }

    pub fn flow_status(event: &FlowEvent) -> Self {
        Self::FlowStatus {
            device_id: event.device_id.clone(),
            status: event.phase.label(),
            terminal: event.phase.is_terminal(),
            timestamp: Self::now(),
        }
    }

    pub fn summary(summary: &RunSummary) -> Self {
        Self::Summary {
            devices: summary.devices,
            started: summary.started,
            completed: summary.completed,
            failed: summary.failed,
            stopped: summary.stopped,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
            timestamp: Self::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpilot_core::FlowPhase;

    fn to_value(event: &HeadlessEvent) -> serde_json::Value {
        let json = serde_json::to_string(event).expect("serialization failed");
        serde_json::from_str(&json).expect("invalid JSON")
    }

    #[test]
    fn test_device_detected_serialization() {
        let device = Device::new("emulator-5554");
        let value = to_value(&HeadlessEvent::device_detected(&device));

        assert_eq!(value["event"], "device_detected");
        assert_eq!(value["device_id"], "emulator-5554");
        assert_eq!(value["kind"], "Emulator");
        assert!(value["timestamp"].is_number());
    }

    #[test]
    fn test_flow_started_serialization() {
        let value = to_value(&HeadlessEvent::flow_started("R5CT227FYRV", "Martin Garrix"));

        assert_eq!(value["event"], "flow_started");
        assert_eq!(value["device_id"], "R5CT227FYRV");
        assert_eq!(value["artist"], "Martin Garrix");
    }

    #[test]
    fn test_flow_status_uses_phase_label() {
        let event = FlowEvent::new(
            "emulator-5554",
            FlowPhase::failed("[APP_NOT_FOUND]: The app is not installed"),
        );
        let value = to_value(&HeadlessEvent::flow_status(&event));

        assert_eq!(value["event"], "flow_status");
        assert_eq!(value["status"], "Error: [APP_NOT_FOUND]: The app is not installed");
        assert_eq!(value["terminal"], true);

        let running = to_value(&HeadlessEvent::flow_status(&FlowEvent::new(
            "emulator-5554",
            FlowPhase::Running,
        )));
        assert_eq!(running["status"], "Running flow...");
        assert_eq!(running["terminal"], false);
    }

    #[test]
    fn test_summary_serialization() {
        let summary = RunSummary {
            devices: 3,
            started: 3,
            completed: 1,
            failed: 1,
            stopped: 1,
        };
        let value = to_value(&HeadlessEvent::summary(&summary));

        assert_eq!(value["event"], "summary");
        assert_eq!(value["devices"], 3);
        assert_eq!(value["completed"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["stopped"], 1);
    }

    #[test]
    fn test_error_serialization() {
        let value = to_value(&HeadlessEvent::error("No devices found", true));

        assert_eq!(value["event"], "error");
        assert_eq!(value["message"], "No devices found");
        assert_eq!(value["fatal"], true);
    }
}
