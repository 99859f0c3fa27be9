//! Event Handling
//!
//! Handles keyboard and timer events for the TUI.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;

/// Actions that can be performed in the application
#[derive(Debug, Clone)]
pub enum AppAction {
    /// Quit the application
    Quit,
    /// Force quit
    ForceQuit,
    /// Submit current input (Enter key)
    Submit,
    /// Clear the session and start over (Ctrl+N)
    NewChat,
    /// Toggle help view
    ToggleHelp,
    /// Escape - dismiss notices
    Escape,
    /// Scroll up one line
    ScrollUp,
    /// Scroll down one line
    ScrollDown,
    /// Scroll up one page
    ScrollPageUp,
    /// Scroll down one page
    ScrollPageDown,
    /// Regular input character
    Input(KeyEvent),
    /// Timer tick for redraws
    Tick,
}

/// Event handler for the TUI
pub struct EventHandler {
    rx: mpsc::Receiver<AppAction>,
    _tx: mpsc::Sender<AppAction>,
}

impl EventHandler {
    /// Create a new event handler with specified tick rate
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel(100);
        let tx_clone = tx.clone();

        tokio::spawn(async move {
            let mut reader = crossterm::event::EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);

            loop {
                let tick = tick_interval.tick();
                let crossterm_event = reader.next().fuse();

                tokio::select! {
                    _ = tick => {
                        if tx_clone.send(AppAction::Tick).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(evt)) = crossterm_event => {
                        if let Some(action) = map_event(evt) {
                            if tx_clone.send(action).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self { rx, _tx: tx }
    }

    /// Wait for the next action
    pub async fn next(&mut self) -> Option<AppAction> {
        self.rx.recv().await
    }
}

/// Map a crossterm event to an app action
pub fn map_event(event: Event) -> Option<AppAction> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => map_key_event(key),
        _ => None,
    }
}

/// Map a key event to an app action
pub fn map_key_event(key: KeyEvent) -> Option<AppAction> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(AppAction::ForceQuit),
        (KeyModifiers::CONTROL, KeyCode::Char('q')) => Some(AppAction::Quit),
        (KeyModifiers::CONTROL, KeyCode::Char('n')) => Some(AppAction::NewChat),
        (KeyModifiers::CONTROL, KeyCode::Char('h')) => Some(AppAction::ToggleHelp),

        (KeyModifiers::NONE, code) | (KeyModifiers::SHIFT, code) => match code {
            KeyCode::Esc => Some(AppAction::Escape),
            KeyCode::Enter if key.modifiers == KeyModifiers::NONE => Some(AppAction::Submit),
            KeyCode::F(1) => Some(AppAction::ToggleHelp),

            KeyCode::Up => Some(AppAction::ScrollUp),
            KeyCode::Down => Some(AppAction::ScrollDown),
            KeyCode::PageUp => Some(AppAction::ScrollPageUp),
            KeyCode::PageDown => Some(AppAction::ScrollPageDown),

            // Shift+Enter and everything else goes to the input box
            _ => Some(AppAction::Input(key)),
        },

        _ => Some(AppAction::Input(key)),
    }
}
