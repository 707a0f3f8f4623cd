//! Screen layout for the TUI

use ratatui::layout::{Constraint, Layout, Rect};

/// Screen areas, top to bottom
#[derive(Debug, Clone, Copy)]
pub struct ScreenAreas {
    /// Title and key hints
    pub header: Rect,

    /// Artist input field
    pub artist: Rect,

    /// Device list with per-device status
    pub devices: Rect,

    /// One-line feedback
    pub status: Rect,
}

/// Split the screen into header, artist field, device list and status line
pub fn create(area: Rect) -> ScreenAreas {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Header (bordered, one row)
        Constraint::Length(3), // Artist field (bordered, one row)
        Constraint::Min(3),    // Device list
        Constraint::Length(1), // Status line
    ])
    .split(area);

    ScreenAreas {
        header: chunks[0],
        artist: chunks[1],
        devices: chunks[2],
        status: chunks[3],
    }
}
