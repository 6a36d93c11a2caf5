use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, BLUR_STEP, OPACITY_STEP};
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch.
const WHEEL_STEP: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::StoreChanged => app.refresh(),
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_send_task().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    if key.code == KeyCode::Char('c') && ctrl {
        app.should_quit = true;
        return;
    }
    // The colour prompt takes every other key while open
    if app.focus == FocusPane::Color {
        handle_color(app, key);
        return;
    }

    // Global keys that work in any pane
    match key.code {
        KeyCode::Char('n') if ctrl => {
            app.new_conversation();
            return;
        }
        KeyCode::Char('t') if ctrl => {
            app.appearance.cycle_accent_color();
            return;
        }
        KeyCode::Char('b') if ctrl => {
            app.appearance.cycle_background();
            return;
        }
        KeyCode::Char('p') if ctrl => {
            app.open_color_prompt();
            return;
        }
        KeyCode::Up if alt => {
            app.adjust_blur(BLUR_STEP);
            return;
        }
        KeyCode::Down if alt => {
            app.adjust_blur(-BLUR_STEP);
            return;
        }
        KeyCode::Right if alt => {
            app.adjust_opacity(OPACITY_STEP);
            return;
        }
        KeyCode::Left if alt => {
            app.adjust_opacity(-OPACITY_STEP);
            return;
        }
        KeyCode::Char('u') if ctrl => {
            app.scroll_up(app.chat_height / 2);
            return;
        }
        KeyCode::Char('d') if ctrl => {
            app.scroll_down(app.chat_height / 2);
            return;
        }
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Input => FocusPane::Sidebar,
                FocusPane::Sidebar | FocusPane::Filter | FocusPane::Color => FocusPane::Input,
            };
            return;
        }
        _ => {}
    }

    match app.focus {
        FocusPane::Input => handle_input(app, key),
        FocusPane::Sidebar => handle_sidebar(app, key),
        FocusPane::Filter => handle_filter(app, key),
        FocusPane::Color => handle_color(app, key),
    }
}

fn handle_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if app.error().is_some() {
                app.dismiss_error();
            } else {
                app.focus = FocusPane::Sidebar;
            }
        }
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = app.input.chars().count(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_sidebar(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.sidebar_down(),
        KeyCode::Char('k') | KeyCode::Up => app.sidebar_up(),
        KeyCode::Char('n') => app.new_conversation(),
        KeyCode::Char('/') => app.focus = FocusPane::Filter,
        KeyCode::Enter | KeyCode::Char('i') => app.focus = FocusPane::Input,
        KeyCode::Esc => {
            if app.error().is_some() {
                app.dismiss_error();
            } else if !app.filter.is_empty() {
                app.set_filter(String::new());
            }
        }
        _ => {}
    }
}

fn handle_filter(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.set_filter(String::new());
            app.focus = FocusPane::Sidebar;
        }
        KeyCode::Enter => app.focus = FocusPane::Sidebar,
        KeyCode::Backspace => {
            let mut filter = app.filter.clone();
            filter.pop();
            app.set_filter(filter);
        }
        KeyCode::Char(c) => {
            let mut filter = app.filter.clone();
            filter.push(c);
            app.set_filter(filter);
        }
        _ => {}
    }
}

fn handle_color(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => app.close_color_prompt(),
        KeyCode::Enter => app.submit_color(),
        KeyCode::Backspace => app.pop_color_char(),
        KeyCode::Char(c)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && (c == '#' || c.is_ascii_hexdigit()) =>
        {
            app.push_color_char(c)
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_sidebar = app.sidebar_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.scroll_down(WHEEL_STEP);
            } else if in_sidebar {
                app.sidebar_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.scroll_up(WHEEL_STEP);
            } else if in_sidebar {
                app.sidebar_up();
            }
        }
        _ => {}
    }
}
