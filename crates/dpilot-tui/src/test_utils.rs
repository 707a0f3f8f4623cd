//! Test utilities for TUI rendering
//!
//! Widgets and full frames render into ratatui's `TestBackend`, so tests
//! can assert on buffer contents without a real terminal.

use dpilot_app::AppState;
use dpilot_driver::test_utils::test_devices;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;
use ratatui::Frame;
use ratatui::Terminal;

/// Standard test terminal size
pub const TEST_WIDTH: u16 = 80;
pub const TEST_HEIGHT: u16 = 24;

/// Wrapper around a `TestBackend` terminal
pub struct TestTerminal {
    terminal: Terminal<TestBackend>,
}

impl TestTerminal {
    pub fn new() -> Self {
        Self::with_size(TEST_WIDTH, TEST_HEIGHT)
    }

    pub fn with_size(width: u16, height: u16) -> Self {
        let backend = TestBackend::new(width, height);
        let terminal = Terminal::new(backend).expect("Failed to create test terminal");
        Self { terminal }
    }

    pub fn area(&self) -> Rect {
        let size = self.terminal.size().expect("Failed to get terminal size");
        Rect::new(0, 0, size.width, size.height)
    }

    pub fn render_widget<W: Widget>(&mut self, widget: W, area: Rect) {
        self.terminal
            .draw(|frame| frame.render_widget(widget, area))
            .expect("Failed to render widget");
    }

    /// Full-frame rendering, e.g. `render::view`
    pub fn draw_with<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal.draw(f).expect("Failed to draw frame");
    }

    pub fn buffer(&self) -> &Buffer {
        self.terminal.backend().buffer()
    }

    pub fn buffer_contains(&self, text: &str) -> bool {
        buffer_to_string(self.buffer()).contains(text)
    }

    pub fn line_contains(&self, line: u16, text: &str) -> bool {
        get_line_content(self.buffer(), line).contains(text)
    }

    /// Row index of the first line containing `text`
    pub fn find_line(&self, text: &str) -> Option<u16> {
        let buffer = self.buffer();
        (0..buffer.area.height).find(|y| get_line_content(buffer, *y).contains(text))
    }
}

fn buffer_to_string(buffer: &Buffer) -> String {
    let mut result = String::new();
    for y in 0..buffer.area.height {
        result.push_str(&get_line_content(buffer, y));
        result.push('\n');
    }
    result
}

fn get_line_content(buffer: &Buffer, line: u16) -> String {
    let mut result = String::new();
    if line < buffer.area.height {
        for x in 0..buffer.area.width {
            result.push_str(buffer[(x, line)].symbol());
        }
    }
    result
}

/// State with the given devices already discovered
pub fn state_with_devices(ids: &[&str]) -> AppState {
    let mut state = AppState::new();
    state.set_devices(test_devices(ids));
    state
}
