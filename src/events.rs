use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    Quit,
    Reset,
    NextField,
    MoveUp,
    MoveDown,
    ScrollUp,
    ScrollDown,
    AddItem,
    RemoveItem,
    InputChar(char),
    Backspace,
    Submit,
}

fn map_key_event(key_event: KeyEvent) -> AppEvent {
    if key_event.kind != KeyEventKind::Press {
        return AppEvent::Tick;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return match key_event.code {
            KeyCode::Char('c') => AppEvent::Quit,
            KeyCode::Char('n') => AppEvent::AddItem,
            KeyCode::Char('d') => AppEvent::RemoveItem,
            _ => AppEvent::Tick,
        };
    }

    match key_event.code {
        KeyCode::Esc => AppEvent::Reset,
        KeyCode::Tab => AppEvent::NextField,
        KeyCode::Up => AppEvent::MoveUp,
        KeyCode::Down => AppEvent::MoveDown,
        KeyCode::PageUp => AppEvent::ScrollUp,
        KeyCode::PageDown => AppEvent::ScrollDown,
        KeyCode::Enter => AppEvent::Submit,
        KeyCode::Backspace => AppEvent::Backspace,
        KeyCode::Char(c) => AppEvent::InputChar(c),
        _ => AppEvent::Tick,
    }
}

pub fn next_event() -> io::Result<AppEvent> {
    if event::poll(Duration::from_millis(16))?
        && let Event::Key(key_event) = event::read()?
        && key_event.kind == KeyEventKind::Press
    {
        return Ok(map_key_event(key_event));
    }

    Ok(AppEvent::Tick)
}
