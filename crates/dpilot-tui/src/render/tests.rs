//! Full-frame rendering tests

use super::view;
use crate::test_utils::{state_with_devices, TestTerminal};
use dpilot_core::{FlowEvent, FlowPhase};

#[test]
fn test_empty_state_renders_all_sections() {
    let state = dpilot_app::AppState::new();
    let mut term = TestTerminal::new();

    term.draw_with(|frame| view(frame, &state));

    assert!(term.buffer_contains("droidpilot"));
    assert!(term.buffer_contains("Martin Garrix"));
    assert!(term.buffer_contains("Devices (0)"));
    assert!(term.line_contains(23, "Ready"));
}

#[test]
fn test_devices_and_statuses_render() {
    let mut state = state_with_devices(&["emulator-5554", "R5CT227FYRV"]);
    state.apply_event(FlowEvent::new("emulator-5554", FlowPhase::Completed));
    state.apply_event(FlowEvent::new(
        "R5CT227FYRV",
        FlowPhase::failed("[APP_NOT_FOUND]: The app 'com.spotify.music' is not installed"),
    ));
    let mut term = TestTerminal::with_size(120, 24);

    term.draw_with(|frame| view(frame, &state));

    assert!(term.buffer_contains("Devices (2)"));
    assert!(term.buffer_contains("Completed"));
    assert!(term.buffer_contains("Error: [APP_NOT_FOUND]"));
}

#[test]
fn test_editing_shows_draft() {
    let mut state = dpilot_app::AppState::new();
    state.begin_artist_edit();
    state.artist_draft = "Avicii".to_string();
    let mut term = TestTerminal::new();

    term.draw_with(|frame| view(frame, &state));

    assert!(term.buffer_contains("Avicii▏"));
    assert!(!term.buffer_contains("Martin Garrix"));
}

#[test]
fn test_status_line_message() {
    let mut state = state_with_devices(&["emulator-5554"]);
    state.set_status("A flow is already running on emulator-5554");
    let mut term = TestTerminal::new();

    term.draw_with(|frame| view(frame, &state));

    assert!(term.line_contains(23, "A flow is already running"));
}
