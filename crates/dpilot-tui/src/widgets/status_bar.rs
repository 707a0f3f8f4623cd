//! Bottom status line

use chrono::{DateTime, Local};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::styles;

/// Last feedback message on the left, last device refresh on the right
pub struct StatusBar<'a> {
    message: Option<&'a str>,
    last_refresh: Option<DateTime<Local>>,
}

impl<'a> StatusBar<'a> {
    pub fn new(message: Option<&'a str>, last_refresh: Option<DateTime<Local>>) -> Self {
        Self {
            message,
            last_refresh,
        }
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let left = Line::from(vec![
            Span::raw(" "),
            Span::styled(self.message.unwrap_or("Ready"), styles::text_secondary()),
        ]);
        buf.set_line(area.x, area.y, &left, area.width);

        if let Some(at) = self.last_refresh {
            let right = Line::from(Span::styled(
                format!("devices @ {} ", at.format("%H:%M:%S")),
                styles::text_muted(),
            ));
            let width = right.width() as u16;
            if left.width() as u16 + width + 1 <= area.width {
                buf.set_line(area.x + area.width - width, area.y, &right, width);
            }
        }
    }
}
