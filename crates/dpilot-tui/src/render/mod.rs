//! Main render/view function (View in TEA pattern)

#[cfg(test)]
mod tests;

use dpilot_app::state::{AppState, UiMode};
use ratatui::style::Style;
use ratatui::widgets::Block;
use ratatui::Frame;

use super::{layout, widgets};
use crate::theme::palette;

/// Render the complete UI; reads state only
pub fn view(frame: &mut Frame, state: &AppState) {
    let area = frame.area();

    let bg_block = Block::default().style(Style::default().bg(palette::DEEPEST_BG));
    frame.render_widget(bg_block, area);

    let areas = layout::create(area);

    frame.render_widget(
        widgets::MainHeader::new(state.devices.len(), state.active_runs()),
        areas.header,
    );

    let editing = state.ui_mode == UiMode::EditingArtist;
    let artist = if editing {
        state.artist_draft.as_str()
    } else {
        state.artist.as_str()
    };
    frame.render_widget(widgets::ArtistInput::new(artist, editing), areas.artist);

    frame.render_widget(
        widgets::DeviceList::new(&state.devices, &state.statuses, state.selected)
            .adb_available(state.adb_available)
            .discovering(state.discovering),
        areas.devices,
    );

    frame.render_widget(
        widgets::StatusBar::new(state.status_line.as_deref(), state.devices_last_updated),
        areas.status,
    );
}
