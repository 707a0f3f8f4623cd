//! Header bar: title, run summary and key hints

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::{palette, styles};

const HINTS: &[(&str, &str)] = &[
    ("↑↓", "Select"),
    ("s", "Start"),
    ("a", "All"),
    ("x", "Stop"),
    ("r", "Refresh"),
    ("e", "Artist"),
    ("q", "Quit"),
];

/// Main header showing the app title, how many runs are active and the
/// keybindings
pub struct MainHeader {
    device_count: usize,
    active_runs: usize,
}

impl MainHeader {
    pub fn new(device_count: usize, active_runs: usize) -> Self {
        Self {
            device_count,
            active_runs,
        }
    }

    fn title_line(&self) -> Line<'static> {
        let (dot, dot_style) = if self.active_runs > 0 {
            ("●", Style::default().fg(palette::STATUS_YELLOW))
        } else {
            ("○", styles::text_muted())
        };

        Line::from(vec![
            Span::raw(" "),
            Span::styled(dot, dot_style),
            Span::raw(" "),
            Span::styled("droidpilot", styles::accent_bold()),
            Span::styled(" / ", styles::text_muted()),
            Span::styled(
                format!(
                    "{} device(s), {} running",
                    self.device_count, self.active_runs
                ),
                styles::text_secondary(),
            ),
        ])
    }

    fn hints_line() -> Line<'static> {
        let mut spans = Vec::with_capacity(HINTS.len() * 3);
        for (i, (key, action)) in HINTS.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled("[", styles::text_muted()));
            spans.push(Span::styled(*key, styles::keybinding()));
            spans.push(Span::styled(format!("] {}", action), styles::text_muted()));
        }
        Line::from(spans)
    }
}

impl Widget for MainHeader {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = styles::glass_block(false).style(Style::default().bg(palette::CARD_BG));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let title = self.title_line();
        let title_width = title.width() as u16;
        buf.set_line(inner.x, inner.y, &title, inner.width);

        // Hints are right-aligned and dropped when they don't fit
        let hints = Self::hints_line();
        let hints_width = hints.width() as u16;
        if title_width + hints_width + 2 <= inner.width {
            let x = inner.x + inner.width - hints_width - 1;
            buf.set_line(x, inner.y, &hints, hints_width);
        }
    }
}
