//! Terminal User Interface Module
//!
//! The default front end: a chat over the research pipeline, built with Ratatui.
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            Альтернативная История России  gpt-4o  ●             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─ Ход исследования ──────────────────────────────────────┐   │
//! │  │ ✓ Подвопросы → ● Поиск 2/3 → ○ Анализ → ○ Готово         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │  ┌─ Сообщения ─────────────────────────────────────────────┐   │
//! │  │  answers, sub-questions, source links, saved charts      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │  ┌─ Вопрос ────────────────────────────────────────────────┐   │
//! │  │ > Задайте вопрос об альтернативной истории               │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │  [Enter] Отправить | [Ctrl+N] Новый чат | [Ctrl+Q] Выход | [F1] │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod event;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::{App, AppEvent, ChartOutcome, PipelineStage, View};
pub use event::{AppAction, EventHandler};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use tracing::{error, info};

/// Type alias for our terminal backend
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the TUI application
pub async fn run(config: crate::config::Config) -> anyhow::Result<()> {
    info!("Starting TUI mode");

    let mut terminal = init_terminal()?;
    let mut app = App::new(config);
    let mut events = EventHandler::new(std::time::Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {}", e);
    }

    result
}

/// Main application loop
async fn run_app(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> anyhow::Result<()> {
    loop {
        app.poll_events();
        terminal.draw(|frame| ui::render(frame, app))?;

        // Ticks arrive every 100ms, so this also paces redraws
        let Some(action) = events.next().await else {
            break;
        };

        match action {
            AppAction::Quit | AppAction::ForceQuit => break,
            action => app.handle_action(action).await,
        }

        if app.should_quit {
            break;
        }
    }

    info!("TUI exited normally");
    Ok(())
}
