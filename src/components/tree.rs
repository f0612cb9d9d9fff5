use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::tree::node::{FlatNode, NodeKind};
use crate::tree::state::TreeState;

/// Tree widget that renders the workspace tree with box-drawing characters.
pub struct TreeWidget<'a> {
    tree_state: &'a TreeState,
    use_icons: bool,
    focused: bool,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(tree_state: &'a TreeState, use_icons: bool) -> Self {
        Self {
            tree_state,
            use_icons,
            focused: true,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Dim the cursor highlight while another pane has focus.
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Build the indentation prefix for an item.
    ///
    /// Continuation lines depend on whether each ancestor was the last of
    /// its siblings, found by walking back to the nearest item at that level.
    fn build_prefix(item: &FlatNode, items: &[FlatNode], item_index: usize) -> String {
        if item.level == 0 {
            return String::new();
        }

        let mut parts: Vec<&str> = Vec::new();
        for level in 1..item.level {
            let mut ancestor_is_last = false;
            for j in (0..item_index).rev() {
                if items[j].level == level {
                    ancestor_is_last = items[j].is_last_sibling;
                    break;
                }
                if items[j].level < level {
                    break;
                }
            }
            parts.push(if ancestor_is_last { "   " } else { "│  " });
        }

        parts.push(if item.is_last_sibling { "└──" } else { "├──" });
        parts.join("")
    }

    fn item_indicator(&self, item: &FlatNode) -> &'static str {
        if self.use_icons {
            match item.kind() {
                NodeKind::Directory if item.is_expanded => "\u{f07c} ",
                NodeKind::Directory => "\u{f07b} ",
                NodeKind::File => Self::file_icon_by_ext(&item.name),
            }
        } else {
            match item.kind() {
                NodeKind::Directory if item.is_expanded => "[-] ",
                NodeKind::Directory => "[+] ",
                NodeKind::File => "[F] ",
            }
        }
    }

    /// Nerd Font icon for a document, by extension.
    fn file_icon_by_ext(name: &str) -> &'static str {
        let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "md" | "markdown" => "\u{e73e} ",
            "txt" | "rst" => "\u{f15c} ",
            "json" => "\u{e60b} ",
            "toml" | "yaml" | "yml" => "\u{e615} ",
            "pdf" => "\u{f1c1} ",
            _ => "\u{f15b} ",
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let items = &self.tree_state.flat_items;
        let cursor = self.tree_state.selected_index;
        let visible_height = inner_area.height as usize;

        if items.is_empty() || visible_height == 0 {
            return;
        }

        let scroll = self.tree_state.scroll_offset;
        let visible_items = items.iter().enumerate().skip(scroll).take(visible_height);

        for (i, (idx, item)) in visible_items.enumerate() {
            let y = inner_area.y + i as u16;
            let prefix = Self::build_prefix(item, items, idx);
            let indicator = self.item_indicator(item);
            let is_selected = self.tree_state.is_selected(item.key);

            let mut style = match item.kind() {
                NodeKind::Directory => Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
                NodeKind::File if is_selected => Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
                NodeKind::File => Style::default().fg(Color::White),
            };
            if idx == cursor {
                let bg = if self.focused {
                    Color::Cyan
                } else {
                    Color::DarkGray
                };
                style = style.bg(bg).fg(Color::Black);
            }

            let marker = if is_selected { "● " } else { "" };
            let menu_mark = if self.tree_state.is_menu_open(item.key) {
                " …"
            } else {
                ""
            };
            let line_content = format!(
                "{}{}{}{}{}",
                prefix, marker, indicator, item.name, menu_mark
            );
            let line = Line::from(Span::styled(line_content, style));
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::tree::node::{Node, NodeKey};

    fn sample_state() -> TreeState {
        let mut state = TreeState::new();
        state.replace_tree(Arc::new(vec![
            Node::directory(
                1,
                "notes",
                "",
                vec![Node::file(2, "a.md"), Node::file(3, "b.md")],
            ),
            Node::file(4, "todo.txt"),
        ]));
        state.toggle_expanded(NodeKey::Directory(1));
        state
    }

    fn render(state: &TreeState) -> Vec<String> {
        let area = Rect::new(0, 0, 40, 6);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(state, false).render(area, &mut buf);
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_renders_box_drawing_prefixes() {
        let lines = render(&sample_state());
        assert_eq!(lines[0], "[-] notes");
        assert_eq!(lines[1], "├──[F] a.md");
        assert_eq!(lines[2], "└──[F] b.md");
        assert_eq!(lines[3], "[F] todo.txt");
        assert_eq!(lines[4], "");
    }

    #[test]
    fn test_collapsed_directory_hides_children() {
        let mut state = sample_state();
        state.toggle_expanded(NodeKey::Directory(1));
        let lines = render(&state);
        assert_eq!(lines[0], "[+] notes");
        assert_eq!(lines[1], "[F] todo.txt");
    }

    #[test]
    fn test_selected_file_is_marked() {
        let mut state = sample_state();
        state.sync_selection(Some(3));
        let lines = render(&state);
        assert_eq!(lines[2], "└──● [F] b.md");
        assert!(!lines[1].contains('●'));
    }

    #[test]
    fn test_cursor_row_is_highlighted() {
        let mut state = sample_state();
        state.select_next();
        let area = Rect::new(0, 0, 40, 6);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&state, false).render(area, &mut buf);
        assert_eq!(buf.cell((0, 1)).unwrap().bg, Color::Cyan);
        assert_ne!(buf.cell((0, 0)).unwrap().bg, Color::Cyan);
    }

    #[test]
    fn test_open_menu_marks_its_row() {
        let mut state = sample_state();
        state.open_menu(NodeKey::File(4));
        let lines = render(&state);
        assert_eq!(lines[3], "[F] todo.txt …");
        assert_eq!(lines[0], "[-] notes");
    }

    #[test]
    fn test_scroll_offset_skips_rows() {
        let mut state = sample_state();
        state.scroll_offset = 2;
        let lines = render(&state);
        assert_eq!(lines[0], "└──[F] b.md");
    }

    #[test]
    fn test_empty_tree_renders_nothing() {
        let state = TreeState::new();
        let lines = render(&state);
        assert!(lines.iter().all(|l| l.is_empty()));
    }
}
