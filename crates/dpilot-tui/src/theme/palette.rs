//! Color palette

use ratatui::style::Color;

// --- Background layers ---
pub const DEEPEST_BG: Color = Color::Black;
pub const CARD_BG: Color = Color::Black;

// --- Borders ---
pub const BORDER_DIM: Color = Color::DarkGray;
pub const BORDER_ACTIVE: Color = Color::Cyan;

// --- Accent ---
pub const ACCENT: Color = Color::Cyan;
pub const CONTRAST_FG: Color = Color::Black;

// --- Text ---
pub const TEXT_PRIMARY: Color = Color::White;
pub const TEXT_SECONDARY: Color = Color::Gray;
pub const TEXT_MUTED: Color = Color::DarkGray;

// --- Status ---
pub const STATUS_GREEN: Color = Color::Green; // Completed
pub const STATUS_RED: Color = Color::Red; // Error
pub const STATUS_YELLOW: Color = Color::Yellow; // Connecting/running
pub const STATUS_BLUE: Color = Color::Blue; // Emulator tag
