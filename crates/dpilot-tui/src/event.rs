//! Terminal event polling

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use dpilot_app::input_key::InputKey;
use dpilot_app::message::Message;
use dpilot_core::prelude::*;
use std::time::Duration;

/// Poll timeout; also the tick rate when idle (20 FPS)
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Convert a crossterm key event to an [`InputKey`]
pub fn key_event_to_input(key: crossterm::event::KeyEvent) -> Option<InputKey> {
    match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(InputKey::CharCtrl(c))
        }
        KeyCode::Char(c) => Some(InputKey::Char(c)),
        KeyCode::Enter => Some(InputKey::Enter),
        KeyCode::Esc => Some(InputKey::Esc),
        KeyCode::Backspace => Some(InputKey::Backspace),
        KeyCode::Up => Some(InputKey::Up),
        KeyCode::Down => Some(InputKey::Down),
        KeyCode::Home => Some(InputKey::Home),
        KeyCode::End => Some(InputKey::End),
        _ => None,
    }
}

/// Poll for a terminal event; a quiet interval yields [`Message::Tick`]
pub fn poll() -> Result<Option<Message>> {
    if !event::poll(POLL_INTERVAL)? {
        return Ok(Some(Message::Tick));
    }

    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            Ok(key_event_to_input(key).map(Message::Key))
        }
        _ => Ok(None),
    }
}
