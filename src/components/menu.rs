use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

use crate::tree::state::TreeState;

/// The open action menu, drawn as a small popup under its node's row.
pub struct MenuWidget<'a> {
    tree_state: &'a TreeState,
}

impl<'a> MenuWidget<'a> {
    pub fn new(tree_state: &'a TreeState) -> Self {
        Self { tree_state }
    }

    /// Popup rectangle for a menu anchored on `row`, kept inside `area`.
    fn popup_rect(row: u16, entries: u16, area: Rect) -> Rect {
        let width = 20u16.min(area.width);
        let height = (entries + 2).min(area.height);
        let below = row.saturating_add(1);
        let y = if below + height <= area.y + area.height {
            below
        } else {
            (area.y + area.height).saturating_sub(height).max(area.y)
        };
        let x = area.x + 2u16.min(area.width.saturating_sub(width));
        Rect::new(x, y, width, height)
    }
}

impl<'a> Widget for MenuWidget<'a> {
    /// `area` is the tree's inner area, the same one the tree rows use.
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(menu) = &self.tree_state.menu else {
            return;
        };
        let Some(index) = self.tree_state.index_of(menu.key) else {
            return;
        };
        if index < self.tree_state.scroll_offset || area.height == 0 {
            return;
        }
        let Ok(offset) = u16::try_from(index - self.tree_state.scroll_offset) else {
            return;
        };
        if offset >= area.height {
            return;
        }

        let actions = self.tree_state.menu_actions();
        let rect = Self::popup_rect(area.y + offset, actions.len() as u16, area);
        Clear.render(rect, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let inner = block.inner(rect);
        block.render(rect, buf);

        for (i, action) in actions.iter().enumerate().take(inner.height as usize) {
            let style = if i == menu.cursor {
                Style::default()
                    .bg(Color::Yellow)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let line = Line::from(Span::styled(format!(" {}", action.label()), style));
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }
    }
}
