use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::modal::{InputField, ModalCoordinator, ModalField, ModalMode, ModalState, ModalTarget};
use crate::tree::node::NodeKind;

/// Dialog widget that renders the open modal as a centered overlay.
pub struct DialogWidget<'a> {
    modal: &'a ModalCoordinator,
}

impl<'a> DialogWidget<'a> {
    pub fn new(modal: &'a ModalCoordinator) -> Self {
        Self { modal }
    }

    /// Calculate a centered rectangle within the given area.
    fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        let w = width.min(area.width);
        let h = height.min(area.height);
        Rect::new(x, y, w, h)
    }
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let ModalState::Open {
            mode,
            target,
            name,
            context,
            focus,
        } = &self.modal.state
        else {
            return;
        };

        match (mode, target) {
            (ModalMode::ConfirmDelete, ModalTarget::Node(node)) => {
                render_confirm_dialog(&node.name, node.key.kind(), area, buf);
            }
            (ModalMode::ConfirmDelete, ModalTarget::Parent(_)) => {}
            _ => render_input_dialog(*mode, name, context, *focus, area, buf),
        }
    }
}

fn hint_line(hint: &str) -> Line<'_> {
    Line::from(Span::styled(
        hint,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM),
    ))
}

/// One labelled input row; only the focused field shows a cursor.
fn input_line<'a>(label: &'a str, field: &'a InputField, focused: bool, width: usize) -> Line<'a> {
    let label_style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input_style = Style::default().fg(Color::White);

    if !focused {
        return Line::from(vec![
            Span::styled(label, label_style),
            Span::styled(field.value.as_str(), input_style),
        ]);
    }

    let (before, rest) = field.value.split_at(field.cursor);
    let (cursor_char, after) = match rest.chars().next() {
        Some(ch) => rest.split_at(ch.len_utf8()),
        None => (" ", ""),
    };

    // Keep the cursor in view by trimming from the left.
    let budget = width.saturating_sub(label.len() + 2);
    let before_display = if before.chars().count() > budget {
        let skip = before.chars().count() - budget;
        let start = before
            .char_indices()
            .nth(skip)
            .map(|(i, _)| i)
            .unwrap_or(before.len());
        &before[start..]
    } else {
        before
    };

    let cursor_style = Style::default()
        .bg(Color::White)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);

    Line::from(vec![
        Span::styled(label, label_style),
        Span::styled(before_display, input_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, input_style),
    ])
}

fn render_input_dialog(
    mode: ModalMode,
    name: &InputField,
    context: &InputField,
    focus: ModalField,
    area: Rect,
    buf: &mut Buffer,
) {
    let dialog_width = 60u16.min(area.width.saturating_sub(4));
    let dialog_height = if mode.has_context() { 7 } else { 5 };
    let rect = DialogWidget::centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(format!(" {} ", mode.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let width = inner.width as usize;
    let name_line = input_line("Name: ", name, focus == ModalField::Name, width);
    buf.set_line(inner.x, inner.y + 1, &name_line, inner.width);

    if mode.has_context() && inner.height > 3 {
        let context_line = input_line("Context: ", context, focus == ModalField::Context, width);
        buf.set_line(inner.x, inner.y + 2, &context_line, inner.width);
    }

    let hint = if mode.has_context() {
        "[Enter] Confirm  [Tab] Next field  [Esc] Cancel"
    } else {
        "[Enter] Confirm  [Esc] Cancel"
    };
    if inner.height > 1 {
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint_line(hint), inner.width);
    }
}

fn render_confirm_dialog(name: &str, kind: NodeKind, area: Rect, buf: &mut Buffer) {
    let name_width = u16::try_from(name.chars().count()).unwrap_or(u16::MAX);
    let dialog_width = name_width
        .saturating_add(10)
        .max(44)
        .min(area.width.saturating_sub(4));
    let dialog_height = 6;
    let rect = DialogWidget::centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(format!(" {} ", ModalMode::ConfirmDelete.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let header = Line::from(Span::styled(
        format!("Delete this {}?", kind.label()),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ));
    buf.set_line(inner.x, inner.y, &header, inner.width);

    if inner.height > 2 {
        let line = Line::from(Span::styled(
            format!("  • {}", name),
            Style::default().fg(Color::White),
        ));
        buf.set_line(inner.x, inner.y + 1, &line, inner.width);
    }
    if kind == NodeKind::Directory && inner.height > 3 {
        let line = Line::from(Span::styled(
            "  Everything inside it is deleted too.",
            Style::default().fg(Color::Red),
        ));
        buf.set_line(inner.x, inner.y + 2, &line, inner.width);
    }

    buf.set_line(
        inner.x,
        inner.y + inner.height - 1,
        &hint_line("[y] Yes  [n/Esc] Cancel"),
        inner.width,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::{NodeKey, NodeRef};

    fn render(modal: &ModalCoordinator) -> String {
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(modal).render(area, &mut buf);
        buffer_to_string(&buf, area)
    }

    fn node(key: NodeKey, name: &str, summary: &str) -> NodeRef {
        NodeRef {
            key,
            name: name.to_string(),
            summary: summary.to_string(),
        }
    }

    #[test]
    fn test_create_file_dialog_renders() {
        let mut modal = ModalCoordinator::new();
        modal.open_create(NodeKind::File, None);
        for c in "test.txt".chars() {
            modal.focused_mut().unwrap().insert(c);
        }

        let content = render(&modal);
        assert!(content.contains("New File"));
        assert!(content.contains("Name: test.txt"));
        assert!(!content.contains("Context:"));
    }

    #[test]
    fn test_edit_directory_shows_context_field() {
        let mut modal = ModalCoordinator::new();
        modal.open_edit(node(NodeKey::Directory(4), "specs", "design notes"));

        let content = render(&modal);
        assert!(content.contains("Edit Directory"));
        assert!(content.contains("Name: specs"));
        assert!(content.contains("Context: design notes"));
        assert!(content.contains("[Tab] Next field"));
    }

    #[test]
    fn test_confirm_dialog_names_the_node() {
        let mut modal = ModalCoordinator::new();
        modal.open_delete(node(NodeKey::File(9), "old.md", ""));

        let content = render(&modal);
        assert!(content.contains("Confirm Delete"));
        assert!(content.contains("old.md"));
        assert!(content.contains("[y] Yes"));
        assert!(!content.contains("Everything inside"));
    }

    #[test]
    fn test_confirm_directory_warns_about_contents() {
        let mut modal = ModalCoordinator::new();
        modal.open_delete(node(NodeKey::Directory(2), "drafts", ""));

        let content = render(&modal);
        assert!(content.contains("Delete this directory?"));
        assert!(content.contains("Everything inside"));
    }

    #[test]
    fn test_confirm_dialog_with_huge_name() {
        let mut modal = ModalCoordinator::new();
        modal.open_delete(node(NodeKey::File(1), &"n".repeat(65_530), ""));

        let content = render(&modal);
        assert!(content.contains("Delete this file?"));
        assert!(content.contains("[y] Yes"));
    }

    #[test]
    fn test_cursor_on_multibyte_input() {
        let mut modal = ModalCoordinator::new();
        modal.open_create(NodeKind::File, None);
        let field = modal.focused_mut().unwrap();
        for c in "héllo".chars() {
            field.insert(c);
        }
        field.home();
        field.move_right();

        let content = render(&modal);
        assert!(content.contains("héllo"));
    }

    #[test]
    fn test_closed_modal_noop() {
        let modal = ModalCoordinator::new();
        assert!(render(&modal).trim().is_empty());
    }

    fn buffer_to_string(buf: &Buffer, area: Rect) -> String {
        let mut s = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                s.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            s.push('\n');
        }
        s
    }
}
