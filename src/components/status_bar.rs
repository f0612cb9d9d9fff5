use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Key hints shown while the tree has focus.
pub const TREE_HINTS: &str =
    " m:menu  n:new  N:dir  e:edit  d:del  R:refresh  M:model  L:login  q:quit ";
/// Key hints shown while the document has focus.
pub const DOCUMENT_HINTS: &str = " ^S:save  ^G:generate  Esc:tree ";

/// Status bar widget: the cursor node, session info and key hints, or a
/// transient status message.
pub struct StatusBarWidget<'a> {
    location: &'a str,
    info: &'a str,
    key_hints: &'a str,
    status_message: Option<&'a str>,
    is_error: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(location: &'a str, info: &'a str) -> Self {
        Self {
            location,
            info,
            key_hints: TREE_HINTS,
            status_message: None,
            is_error: false,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    pub fn key_hints(mut self, hints: &'a str) -> Self {
        self.key_hints = hints;
        self
    }
}

/// Truncate to at most `max` characters.
fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default().bg(Color::Red).fg(Color::White)
            } else {
                Style::default().fg(Color::Green)
            };
            let display = format!("{:<width$}", truncate(msg, width), width = width);
            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [location] [info] [key_hints]
        let hints_len = self.key_hints.chars().count();
        let remaining = width.saturating_sub(hints_len);

        let info_len = self.info.chars().count();
        let location_budget = remaining.saturating_sub(info_len).saturating_sub(1);
        let location_len = self.location.chars().count();
        let location_display = if location_len > location_budget {
            if location_budget > 3 {
                let tail: String = self
                    .location
                    .chars()
                    .skip(location_len - (location_budget - 3))
                    .collect();
                format!("...{}", tail)
            } else {
                truncate(self.location, location_budget)
            }
        } else {
            self.location.to_string()
        };

        let info_display = truncate(
            self.info,
            remaining.saturating_sub(location_display.chars().count()),
        );
        let gap = remaining
            .saturating_sub(location_display.chars().count())
            .saturating_sub(info_display.chars().count());

        let spans = vec![
            Span::styled(location_display, Style::default().fg(Color::White)),
            Span::raw(" ".repeat(gap)),
            Span::styled(info_display, Style::default().fg(Color::Cyan)),
            Span::styled(
                self.key_hints,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM),
            ),
        ];

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
