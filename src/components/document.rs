use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::document::{DocumentBuffer, DocumentEditor};

/// Widget for the open document: line numbers, a cursor, and the prompt
/// and generated-text panels underneath.
pub struct DocumentWidget<'a> {
    editor: &'a DocumentEditor,
    focused: bool,
    block: Option<Block<'a>>,
}

impl<'a> DocumentWidget<'a> {
    pub fn new(editor: &'a DocumentEditor) -> Self {
        Self {
            editor,
            focused: false,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Pane title: the document name with a `[+]` marker for unsaved edits.
    pub fn title(editor: &DocumentEditor) -> String {
        match &editor.document {
            Some(doc) if doc.is_dirty() => format!(" {} [+] ", doc.name),
            Some(doc) => format!(" {} ", doc.name),
            None => " Document ".to_string(),
        }
    }

    /// Rows taken by the panels below the text for an inner area of
    /// `height` rows.
    pub fn footer_height(editor: &DocumentEditor, height: u16) -> u16 {
        let mut rows = 0u16;
        if editor.prompt.is_some() || editor.generating {
            rows += 1;
        }
        if let Some(text) = &editor.pending {
            let wanted = u16::try_from(text.lines().count().max(1))
                .unwrap_or(u16::MAX)
                .saturating_add(1);
            rows += wanted.min(height / 2);
        }
        rows.min(height)
    }

    fn gutter_width(buffer: &DocumentBuffer) -> u16 {
        let digits = buffer.lines.len().max(1).to_string().len() as u16;
        digits + 2
    }

    fn render_text(&self, buffer: &DocumentBuffer, area: Rect, buf: &mut Buffer) {
        let gutter_w = Self::gutter_width(buffer);
        let text_width = area.width.saturating_sub(gutter_w);
        if text_width == 0 {
            return;
        }

        let cursor_style = Style::default().fg(Color::Black).bg(Color::White);
        let text_x = area.x + gutter_w;

        for row in 0..area.height {
            let line_idx = buffer.scroll_offset + row as usize;
            let y = area.y + row;

            let Some(line) = buffer.lines.get(line_idx) else {
                buf.set_string(area.x, y, "~", Style::default().fg(Color::DarkGray));
                continue;
            };

            let is_current_line = line_idx == buffer.cursor_line;
            let num_str = format!("{:>width$} ", line_idx + 1, width = (gutter_w - 2) as usize);
            let gutter_style = if is_current_line {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            buf.set_span(area.x, y, &Span::styled(num_str, gutter_style), gutter_w);
            buf.set_string(
                area.x + gutter_w - 1,
                y,
                "│",
                Style::default().fg(Color::DarkGray),
            );

            let mut col = 0u16;
            for (char_col, ch) in line.chars().enumerate() {
                if col >= text_width {
                    break;
                }
                let style = if self.focused && is_current_line && char_col == buffer.cursor_col {
                    cursor_style
                } else {
                    Style::default().fg(Color::White)
                };
                buf.set_string(text_x + col, y, ch.to_string(), style);
                col += 1;
            }

            if self.focused && is_current_line && buffer.cursor_col >= line.chars().count() {
                let col = u16::try_from(buffer.cursor_col).unwrap_or(u16::MAX);
                let cursor_x = text_x.saturating_add(col);
                if cursor_x < area.x + area.width {
                    buf.set_string(cursor_x, y, " ", cursor_style);
                }
            }
        }
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let mut y = area.y;
        let bottom = area.y + area.height;
        let hint_style = Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM);

        if let Some(text) = &self.editor.pending {
            let header = Line::from(vec![
                Span::styled(
                    "Generated ",
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("[^Y] Append  [^N] Discard", hint_style),
            ]);
            buf.set_line(area.x, y, &header, area.width);
            y += 1;
            for line in text.lines() {
                if y >= bottom.saturating_sub(u16::from(self.editor.prompt.is_some())) {
                    break;
                }
                buf.set_string(area.x, y, line, Style::default().fg(Color::Magenta));
                y += 1;
            }
        }

        let last = bottom.saturating_sub(1);
        if self.editor.generating {
            let line = Line::from(Span::styled(
                "Generating…",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ));
            buf.set_line(area.x, last, &line, area.width);
        } else if let Some(prompt) = &self.editor.prompt {
            let (before, rest) = prompt.value.split_at(prompt.cursor);
            let (cursor_char, after) = match rest.chars().next() {
                Some(ch) => rest.split_at(ch.len_utf8()),
                None => (" ", ""),
            };
            let line = Line::from(vec![
                Span::styled(
                    "Prompt: ",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(before),
                Span::styled(cursor_char, Style::default().fg(Color::Black).bg(Color::White)),
                Span::raw(after),
            ]);
            buf.set_line(area.x, last, &line, area.width);
        }
    }
}

impl<'a> Widget for DocumentWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let Some(doc) = &self.editor.document else {
            let message = if self.editor.loading.is_some() {
                "Loading…"
            } else {
                "Select a file to open it."
            };
            let line = Line::from(Span::styled(
                message,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        };

        let footer = Self::footer_height(self.editor, inner.height);
        let text_area = Rect::new(inner.x, inner.y, inner.width, inner.height - footer);
        self.render_text(&doc.buffer, text_area, buf);

        if footer > 0 {
            let footer_area = Rect::new(inner.x, inner.y + text_area.height, inner.width, footer);
            self.render_footer(footer_area, buf);
        }
    }
}
