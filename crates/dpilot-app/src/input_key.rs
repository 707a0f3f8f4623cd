//! Terminal-independent key events
//!
//! The TUI converts crossterm key events into [`InputKey`] at its boundary,
//! so the update logic here never depends on a terminal library.

/// A key press, as seen by the update function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    /// Printable character
    Char(char),
    /// Character with Ctrl held
    CharCtrl(char),

    Up,
    Down,
    Home,
    End,

    Enter,
    Esc,
    Backspace,
}

impl InputKey {
    /// Ctrl+C quits from every mode
    pub fn is_interrupt(&self) -> bool {
        matches!(self, InputKey::CharCtrl('c'))
    }
}
