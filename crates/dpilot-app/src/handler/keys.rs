//! Key event handlers for the UI modes

use crate::input_key::InputKey;
use crate::message::Message;
use crate::state::{AppState, UiMode};

/// Convert a key event to a message based on the current UI mode
pub fn handle_key(state: &AppState, key: InputKey) -> Option<Message> {
    if key.is_interrupt() {
        return Some(Message::Quit);
    }

    match state.ui_mode {
        UiMode::Normal => handle_key_normal(key),
        UiMode::EditingArtist => handle_key_artist(key),
    }
}

fn handle_key_normal(key: InputKey) -> Option<Message> {
    match key {
        InputKey::Char('q') | InputKey::Esc => Some(Message::Quit),

        InputKey::Char('j') | InputKey::Down => Some(Message::SelectNext),
        InputKey::Char('k') | InputKey::Up => Some(Message::SelectPrevious),
        InputKey::Char('g') | InputKey::Home => Some(Message::SelectFirst),
        InputKey::Char('G') | InputKey::End => Some(Message::SelectLast),

        InputKey::Char('s') | InputKey::Enter => Some(Message::StartSelected),
        InputKey::Char('a') => Some(Message::StartAll),
        InputKey::Char('x') => Some(Message::StopSelected),
        InputKey::Char('r') => Some(Message::RefreshDevices),
        InputKey::Char('e') => Some(Message::EditArtist),

        _ => None,
    }
}

fn handle_key_artist(key: InputKey) -> Option<Message> {
    match key {
        InputKey::Enter => Some(Message::CommitArtist),
        InputKey::Esc => Some(Message::CancelArtist),
        InputKey::Backspace => Some(Message::ArtistBackspace),
        InputKey::CharCtrl('u') => Some(Message::ArtistClear),
        InputKey::Char(c) => Some(Message::ArtistInput(c)),
        _ => None,
    }
}
