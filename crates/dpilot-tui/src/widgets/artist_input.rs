//! Artist field

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::theme::{palette, styles};

/// Shown at the end of the text while editing
const CURSOR: &str = "▏";

/// The free-text artist parameter, editable with `e`
pub struct ArtistInput<'a> {
    value: &'a str,
    editing: bool,
}

impl<'a> ArtistInput<'a> {
    /// `value` is the committed artist, or the draft while editing
    pub fn new(value: &'a str, editing: bool) -> Self {
        Self { value, editing }
    }
}

impl Widget for ArtistInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let hint = if self.editing {
            " Enter to keep, Esc to cancel "
        } else {
            " [e] edit "
        };
        let block = styles::glass_block(self.editing)
            .title(" Artist ")
            .title_bottom(Line::from(Span::styled(hint, styles::text_muted())).right_aligned());

        let mut spans = vec![Span::styled(self.value, styles::text_primary())];
        if self.editing {
            spans.push(Span::styled(
                CURSOR,
                Style::default().fg(palette::ACCENT),
            ));
        }

        Paragraph::new(Line::from(spans))
            .block(block)
            .render(area, buf);
    }
}
