//! Input handling for the TUI.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

use super::app::Action;

/// Convert a crossterm key event to an Action.
///
/// While the new-scan form is open (`editing`), printable keys feed the
/// target field instead of triggering shortcuts.
pub fn handle_key_event(key: KeyEvent, editing: bool) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    if editing {
        return match key.code {
            KeyCode::Esc => Some(Action::Back),
            KeyCode::Enter => Some(Action::Select),
            KeyCode::Tab => Some(Action::ToggleMode),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Char(c) => Some(Action::Input(c)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Action::Select),
        KeyCode::Char('r') => Some(Action::Refresh),
        KeyCode::Char('h') => Some(Action::History),
        KeyCode::Char('n') => Some(Action::NewScan),
        KeyCode::Char('c') => Some(Action::CancelScan),
        KeyCode::F(5) => Some(Action::Refresh),
        _ => None,
    }
}

/// Convert a crossterm Event to an Action.
pub fn handle_event(event: Event, editing: bool) -> Option<Action> {
    match event {
        Event::Key(key) => handle_key_event(key, editing),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    #[test]
    fn shortcuts_work_outside_form() {
        let key = KeyEvent::from(KeyCode::Char('n'));
        assert_eq!(handle_key_event(key, false), Some(Action::NewScan));

        let key = KeyEvent::from(KeyCode::Char('c'));
        assert_eq!(handle_key_event(key, false), Some(Action::CancelScan));
    }

    #[test]
    fn printable_keys_feed_the_form() {
        let key = KeyEvent::from(KeyCode::Char('n'));
        assert_eq!(handle_key_event(key, true), Some(Action::Input('n')));

        let key = KeyEvent::from(KeyCode::Tab);
        assert_eq!(handle_key_event(key, true), Some(Action::ToggleMode));
    }

    #[test]
    fn ctrl_c_always_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key, true), Some(Action::Quit));
        assert_eq!(handle_key_event(key, false), Some(Action::Quit));
    }
}
