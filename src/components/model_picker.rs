use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::models::ModelPicker;

const HINT: &str = "[Enter] Use  [R] Reload  [Esc] Close";

/// Centered popup listing the generation models.
pub struct ModelPickerWidget<'a> {
    picker: &'a ModelPicker,
}

impl<'a> ModelPickerWidget<'a> {
    pub fn new(picker: &'a ModelPicker) -> Self {
        Self { picker }
    }

    /// Status lines shown instead of (or above) the list.
    fn notice(&self) -> Option<(String, Color)> {
        if let Some(error) = &self.picker.error {
            Some((error.clone(), Color::Red))
        } else if self.picker.loading {
            Some(("Loading…".into(), Color::DarkGray))
        } else if self.picker.models.is_empty() {
            Some(("No models available".into(), Color::DarkGray))
        } else {
            None
        }
    }
}

impl<'a> Widget for ModelPickerWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.picker.open {
            return;
        }
        let notice = self.notice();
        let rows = self.picker.models.len() + usize::from(notice.is_some());
        let height = u16::try_from(rows)
            .unwrap_or(u16::MAX)
            .saturating_add(3)
            .min(area.height);
        let width = 40u16.min(area.width);
        let rect = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );

        Clear.render(rect, buf);
        let block = Block::default()
            .title(" Models ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .padding(Padding::horizontal(1));
        let inner = block.inner(rect);
        block.render(rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        // Last row is the hint; the rest holds the notice and the list.
        let body = inner.height - 1;
        let mut y = inner.y;
        if let Some((text, color)) = notice {
            let line = Line::from(Span::styled(text, Style::default().fg(color)));
            buf.set_line(inner.x, y, &line, inner.width);
            y += 1;
        }

        let selected = self.picker.selected();
        let visible = usize::from(body.saturating_sub(y - inner.y));
        let skip = (self.picker.cursor + 1).saturating_sub(visible);
        for (i, name) in self
            .picker
            .models
            .iter()
            .enumerate()
            .skip(skip)
            .take(visible)
        {
            let marker = if selected.as_deref() == Some(name.as_str()) {
                "● "
            } else {
                "  "
            };
            let style = if i == self.picker.cursor {
                Style::default()
                    .bg(Color::Magenta)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let line = Line::from(Span::styled(format!("{}{}", marker, name), style));
            buf.set_line(inner.x, y, &line, inner.width);
            y += 1;
        }

        let hint = Line::from(Span::styled(
            HINT,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM),
        ));
        buf.set_line(inner.x, inner.y + body, &hint, inner.width);
    }
}
