use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, Focus};
use crate::components::dialog::DialogWidget;
use crate::components::document::DocumentWidget;
use crate::components::menu::MenuWidget;
use crate::components::model_picker::ModelPickerWidget;
use crate::components::status_bar::{StatusBarWidget, DOCUMENT_HINTS, TREE_HINTS};
use crate::components::tree::TreeWidget;
use crate::tree::node::{self, NodeKey};

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);

    render_tree(app, frame, panes[0]);
    render_document(app, frame, panes[1]);
    render_status_bar(app, frame, rows[1]);

    if app.models.open {
        frame.render_widget(ModelPickerWidget::new(&app.models), area);
    }
    if app.modal.is_open() {
        frame.render_widget(DialogWidget::new(&app.modal), area);
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn render_tree(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Tree;
    let block = pane_block(" Workspace ".to_string(), focused);
    let inner = block.inner(area);

    // Keep the cursor visible before drawing.
    app.tree_state.update_scroll(inner.height as usize);

    let tree_widget = TreeWidget::new(&app.tree_state, app.use_icons)
        .focused(focused)
        .block(block);
    frame.render_widget(tree_widget, area);

    if app.tree_state.menu.is_some() {
        frame.render_widget(MenuWidget::new(&app.tree_state), inner);
    }
}

fn render_document(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Document;
    let block = pane_block(DocumentWidget::title(&app.editor), focused);
    let inner = block.inner(area);

    let footer = DocumentWidget::footer_height(&app.editor, inner.height);
    if let Some(doc) = app.editor.document.as_mut() {
        doc.buffer.visible_height = inner.height.saturating_sub(footer) as usize;
        doc.buffer.ensure_cursor_visible();
    }

    let widget = DocumentWidget::new(&app.editor)
        .focused(focused)
        .block(block);
    frame.render_widget(widget, area);
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let location = app
        .tree_state
        .cursor_node()
        .map(|item| {
            let mut parts: Vec<&str> = Vec::new();
            let mut key = item.key;
            while let Some(parent) = node::parent_of(&app.tree_state.roots, key) {
                parts.push(&parent.name);
                key = NodeKey::Directory(parent.id);
            }
            parts.reverse();
            parts.push(&item.name);
            parts.join("/")
        })
        .unwrap_or_default();

    let kind = app
        .tree_state
        .cursor_node()
        .map(|item| item.kind().label())
        .unwrap_or("empty");
    let session = if app.is_authenticated() {
        "signed in"
    } else {
        "signed out"
    };
    let model = app.models.selected().unwrap_or_else(|| "no model".into());
    let info = format!("{} | {} | {} ", kind, session, model);

    let hints = match app.focus {
        Focus::Tree => TREE_HINTS,
        Focus::Document => DOCUMENT_HINTS,
    };
    let mut widget = StatusBarWidget::new(&location, &info).key_hints(hints);
    if let Some((msg, _)) = &app.status_message {
        widget = widget.status_message(msg, msg.starts_with('⚠'));
    }
    frame.render_widget(widget, area);
}
