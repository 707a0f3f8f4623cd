//! Device list with per-device run status

use std::collections::HashMap;

use dpilot_core::{Device, FlowPhase};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::theme::{palette, styles};

/// Width of the "Physical device" column
const KIND_WIDTH: usize = 15;

pub struct DeviceList<'a> {
    devices: &'a [Device],
    statuses: &'a HashMap<String, FlowPhase>,
    selected: usize,
    adb_available: bool,
    discovering: bool,
}

impl<'a> DeviceList<'a> {
    pub fn new(
        devices: &'a [Device],
        statuses: &'a HashMap<String, FlowPhase>,
        selected: usize,
    ) -> Self {
        Self {
            devices,
            statuses,
            selected,
            adb_available: true,
            discovering: false,
        }
    }

    pub fn adb_available(mut self, available: bool) -> Self {
        self.adb_available = available;
        self
    }

    pub fn discovering(mut self, discovering: bool) -> Self {
        self.discovering = discovering;
        self
    }

    fn empty_message(&self) -> Line<'static> {
        if !self.adb_available {
            Line::from(Span::styled(
                "adb is not available. Install the Android platform-tools or set device_bridge.adb_path.",
                Style::default().fg(palette::STATUS_RED),
            ))
        } else if self.discovering {
            Line::from(Span::styled("Looking for devices...", styles::text_muted()))
        } else {
            Line::from(vec![
                Span::styled("No devices found. Press ", styles::text_muted()),
                Span::styled("r", styles::keybinding()),
                Span::styled(" to refresh.", styles::text_muted()),
            ])
        }
    }

    fn row(&self, index: usize, device: &'a Device, id_width: usize) -> Line<'a> {
        let phase = self.statuses.get(&device.id).cloned().unwrap_or_default();
        let is_selected = index == self.selected;

        let marker = if is_selected { "▶ " } else { "  " };
        let id_pad = id_width.saturating_sub(device.id.width());
        let kind_style = if device.emulator {
            Style::default().fg(palette::STATUS_BLUE)
        } else {
            styles::text_secondary()
        };

        let mut line = Line::from(vec![
            Span::raw(marker),
            Span::styled(device.id.as_str(), styles::text_primary()),
            Span::raw(" ".repeat(id_pad + 2)),
            Span::styled(
                format!("{:<width$}", device.kind_label(), width = KIND_WIDTH),
                kind_style,
            ),
            Span::raw("  "),
            Span::styled(styles::phase_icon(&phase), styles::phase_style(&phase)),
            Span::raw(" "),
            Span::styled(phase.label(), styles::phase_style(&phase)),
        ]);
        if is_selected {
            line = line.style(styles::focused_selected());
        }
        line
    }
}

impl Widget for DeviceList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(" Devices ({}) ", self.devices.len());
        let block = styles::glass_block(true).title(title);

        if self.devices.is_empty() {
            Paragraph::new(self.empty_message())
                .block(block)
                .render(area, buf);
            return;
        }

        let id_width = self
            .devices
            .iter()
            .map(|d| d.id.width())
            .max()
            .unwrap_or(0);

        // Keep the selected row visible
        let visible = block.inner(area).height as usize;
        let offset = (self.selected + 1).saturating_sub(visible);

        let lines: Vec<Line> = self
            .devices
            .iter()
            .enumerate()
            .skip(offset)
            .map(|(i, device)| self.row(i, device, id_width))
            .collect();

        Paragraph::new(lines).block(block).render(area, buf);
    }
}
