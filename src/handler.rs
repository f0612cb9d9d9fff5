use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Focus};
use crate::modal::ModalMode;
use crate::tree::node::NodeKind;

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    if app.modal.is_open() {
        handle_modal_key(app, key);
    } else if app.models.open {
        handle_model_key(app, key);
    } else if app.tree_state.menu.is_some() {
        handle_menu_key(app, key);
    } else if app.focus == Focus::Document {
        if app.editor.prompt.is_some() {
            handle_prompt_key(app, key);
        } else {
            handle_document_key(app, key);
        }
    } else {
        handle_tree_key(app, key);
    }
}

fn handle_tree_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => app.tree_state.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.tree_state.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.tree_state.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.tree_state.select_last(),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate_selected(),
        KeyCode::Char('m') => app.open_menu_on_cursor(),
        KeyCode::Char('n') => app.create_at_root(NodeKind::File),
        KeyCode::Char('N') => app.create_at_root(NodeKind::Directory),
        KeyCode::Char('e') => app.edit_cursor_node(),
        KeyCode::Char('d') => app.delete_cursor_node(),
        KeyCode::Char('R') => {
            app.request_resync();
            app.set_status_message("Refreshing…".into());
        }
        KeyCode::Char('L') => app.reload_credentials(),
        KeyCode::Char('M') => app.open_model_picker(),
        KeyCode::Tab => app.focus_document(),
        _ => {}
    }
}

fn handle_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.tree_state.menu_next(),
        KeyCode::Char('k') | KeyCode::Up => app.tree_state.menu_previous(),
        KeyCode::Enter => app.choose_menu_action(),
        KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('q') => app.tree_state.close_menu(),
        _ => {}
    }
}

fn handle_model_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.models.next(),
        KeyCode::Char('k') | KeyCode::Up => app.models.previous(),
        KeyCode::Enter => app.choose_model(),
        KeyCode::Char('R') => app.request_models(),
        KeyCode::Esc | KeyCode::Char('M') | KeyCode::Char('q') => app.models.close(),
        _ => {}
    }
}

fn handle_modal_key(app: &mut App, key: KeyEvent) {
    if app.modal.mode() == Some(ModalMode::ConfirmDelete) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_modal(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.decline_modal(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Enter => app.confirm_modal(),
        KeyCode::Esc => app.decline_modal(),
        KeyCode::Tab | KeyCode::BackTab => app.modal.toggle_focus(),
        code => {
            if let Some(field) = app.modal.focused_mut() {
                match code {
                    KeyCode::Char(c) => field.insert(c),
                    KeyCode::Backspace => field.backspace(),
                    KeyCode::Left => field.move_left(),
                    KeyCode::Right => field.move_right(),
                    KeyCode::Home => field.home(),
                    KeyCode::End => field.end(),
                    _ => {}
                }
            }
        }
    }
}

fn handle_prompt_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_prompt(),
        KeyCode::Esc => app.close_prompt(),
        code => {
            if let Some(field) = app.editor.prompt.as_mut() {
                match code {
                    KeyCode::Char(c) => field.insert(c),
                    KeyCode::Backspace => field.backspace(),
                    KeyCode::Left => field.move_left(),
                    KeyCode::Right => field.move_right(),
                    KeyCode::Home => field.home(),
                    KeyCode::End => field.end(),
                    _ => {}
                }
            }
        }
    }
}

fn handle_document_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('s') => app.save_document(),
            KeyCode::Char('g') => app.open_prompt(),
            KeyCode::Char('y') => app.apply_generated(),
            KeyCode::Char('n') => app.discard_generated(),
            _ => {}
        }
        return;
    }

    if matches!(key.code, KeyCode::Esc | KeyCode::Tab) {
        app.focus_tree();
        return;
    }

    let Some(doc) = app.editor.document.as_mut() else {
        app.focus_tree();
        return;
    };
    let buffer = &mut doc.buffer;
    match key.code {
        KeyCode::Char(c) => buffer.insert_char(c),
        KeyCode::Enter => buffer.insert_newline(),
        KeyCode::Backspace => buffer.delete_char_before(),
        KeyCode::Delete => buffer.delete_char_at(),
        KeyCode::Up => buffer.move_up(),
        KeyCode::Down => buffer.move_down(),
        KeyCode::Left => buffer.move_left(),
        KeyCode::Right => buffer.move_right(),
        KeyCode::Home => buffer.move_home(),
        KeyCode::End => buffer.move_end(),
        _ => {}
    }
}
