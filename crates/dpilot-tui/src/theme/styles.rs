//! Semantic style builders

use dpilot_core::FlowPhase;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders};

use super::palette;

// --- Text styles ---
pub fn text_primary() -> Style {
    Style::default().fg(palette::TEXT_PRIMARY)
}

pub fn text_secondary() -> Style {
    Style::default().fg(palette::TEXT_SECONDARY)
}

pub fn text_muted() -> Style {
    Style::default().fg(palette::TEXT_MUTED)
}

// --- Border styles ---
pub fn border_inactive() -> Style {
    Style::default().fg(palette::BORDER_DIM)
}

pub fn border_active() -> Style {
    Style::default().fg(palette::BORDER_ACTIVE)
}

// --- Accent styles ---
pub fn accent_bold() -> Style {
    Style::default()
        .fg(palette::ACCENT)
        .add_modifier(Modifier::BOLD)
}

/// Key in a `[k] Action` hint
pub fn keybinding() -> Style {
    Style::default().fg(palette::STATUS_YELLOW)
}

/// "Black on Cyan" for the selected row
pub fn focused_selected() -> Style {
    Style::default()
        .fg(palette::CONTRAST_FG)
        .bg(palette::ACCENT)
        .add_modifier(Modifier::BOLD)
}

// --- Block builders ---
pub fn glass_block(focused: bool) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if focused {
            border_active()
        } else {
            border_inactive()
        })
}

// --- Run phase mapping ---

/// Color of a run phase: errors red, completed green, connecting and
/// running yellow, everything else unstyled
pub fn phase_style(phase: &FlowPhase) -> Style {
    match phase {
        FlowPhase::Failed(_) => Style::default().fg(palette::STATUS_RED),
        FlowPhase::Completed => Style::default().fg(palette::STATUS_GREEN),
        FlowPhase::Connecting | FlowPhase::Running => Style::default()
            .fg(palette::STATUS_YELLOW)
            .add_modifier(Modifier::BOLD),
        _ => Style::default(),
    }
}

/// Status dot shown before a device's phase label
pub fn phase_icon(phase: &FlowPhase) -> &'static str {
    match phase {
        FlowPhase::NotStarted => "○",
        FlowPhase::Starting | FlowPhase::Connecting => "◌",
        FlowPhase::Running => "●",
        FlowPhase::Completed => "✓",
        FlowPhase::Failed(_) => "✗",
        FlowPhase::Stopped => "■",
    }
}
