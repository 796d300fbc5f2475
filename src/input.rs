//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    /// Jump between the grid and the palette.
    SwitchArea,
    /// Pick up / drop / confirm.
    Select,
    /// Drop the dragged token back on the palette.
    Cancel,
    Submit,
    Retry,
    Collection,
    Quit,
    None,
}

/// Map key event to action. Supports both normal (arrows, enter) and vim (hjkl) keys.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => Action::Quit,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Tab | KeyCode::BackTab => Action::SwitchArea,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        KeyCode::Esc | KeyCode::Backspace => Action::Cancel,
        KeyCode::Char('s') | KeyCode::Char('S') => Action::Submit,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Retry,
        KeyCode::Char('c') | KeyCode::Char('C') => Action::Collection,
        _ => Action::None,
    }
}
