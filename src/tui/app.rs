//! Application State
//!
//! Contains the main application state and logic for the TUI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use tui_textarea::TextArea;
use uuid::Uuid;

use crate::agents::{PipelineProgress, ResearchPipeline};
use crate::charts;
use crate::config::Config;
use crate::models::Message;
use crate::session::ChatSession;
use crate::tui::event::AppAction;

const INPUT_PLACEHOLDER: &str = "Задайте вопрос об альтернативной истории";

/// Research pipeline stage
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PipelineStage {
    /// Idle, waiting for input
    #[default]
    Idle,
    /// Generating sub-questions
    Subquestions,
    /// Searching one sub-question
    Searching {
        index: usize,
        total: usize,
        question: String,
    },
    /// Agent writing the answer
    Synthesizing,
    /// Turn complete
    Complete,
    /// Error occurred
    Error(String),
}

impl From<PipelineProgress> for PipelineStage {
    fn from(progress: PipelineProgress) -> Self {
        match progress {
            PipelineProgress::Subquestions => Self::Subquestions,
            PipelineProgress::Searching { index, total, question } => {
                Self::Searching { index, total, question }
            }
            PipelineProgress::Synthesizing => Self::Synthesizing,
        }
    }
}

/// Where a message's chart ended up
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Saved(PathBuf),
    /// Render error plus the request that caused it
    Failed { error: String, request: String },
}

/// Current view/screen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    #[default]
    Chat,
    Help,
}

/// Events from the spawned research turn
#[derive(Debug)]
pub enum AppEvent {
    /// Pipeline stage changed
    StageChanged(PipelineStage),
    /// Turn finished; carries a snapshot of the session log
    TurnFinished {
        messages: Vec<Message>,
        charts: Vec<(Uuid, ChartOutcome)>,
        error: Option<String>,
    },
}

/// Main application state
pub struct App {
    pub config: Config,

    // UI State
    pub view: View,
    pub should_quit: bool,

    // Chat State
    pub messages: Vec<Message>,
    pub charts: HashMap<Uuid, ChartOutcome>,
    pub pending_input: Option<String>,
    pub input: TextArea<'static>,
    /// Lines scrolled up from the bottom of the history
    pub scroll_offset: u16,
    pub notice: Option<String>,

    // Research State
    pub pipeline_stage: PipelineStage,
    pipeline: Arc<ResearchPipeline>,
    session: Arc<Mutex<ChatSession>>,

    // Async communication
    event_rx: mpsc::Receiver<AppEvent>,
    event_tx: mpsc::Sender<AppEvent>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let pipeline = ResearchPipeline::new(&config);
        Self::with_pipeline(config, pipeline)
    }

    pub fn with_pipeline(config: Config, pipeline: ResearchPipeline) -> Self {
        let (event_tx, event_rx) = mpsc::channel(100);

        let notice = if config.has_search_key() {
            None
        } else {
            Some("SERPAPI_API_KEY не задан: поиск будет возвращать текст ошибки.".to_string())
        };

        Self {
            config,
            view: View::Chat,
            should_quit: false,
            messages: Vec::new(),
            charts: HashMap::new(),
            pending_input: None,
            input: Self::new_input(),
            scroll_offset: 0,
            notice,
            pipeline_stage: PipelineStage::Idle,
            pipeline: Arc::new(pipeline),
            session: Arc::new(Mutex::new(ChatSession::new())),
            event_rx,
            event_tx,
        }
    }

    fn new_input() -> TextArea<'static> {
        let mut input = TextArea::default();
        input.set_cursor_line_style(ratatui::style::Style::default());
        input.set_placeholder_text(INPUT_PLACEHOLDER);
        input
    }

    /// A turn is running
    pub fn is_busy(&self) -> bool {
        self.pending_input.is_some()
    }

    /// Poll for async events
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::StageChanged(stage) => {
                self.pipeline_stage = stage;
            }
            AppEvent::TurnFinished { messages, charts, error } => {
                self.messages = messages;
                self.charts.extend(charts);
                self.pending_input = None;
                self.pipeline_stage = match error {
                    Some(e) => PipelineStage::Error(e),
                    None => PipelineStage::Complete,
                };
                self.scroll_offset = 0;
            }
        }
    }

    /// Handle a user action
    pub async fn handle_action(&mut self, action: AppAction) {
        if self.view == View::Help && !matches!(action, AppAction::Tick) {
            self.view = View::Chat;
            return;
        }

        match action {
            AppAction::Quit | AppAction::ForceQuit => {
                self.should_quit = true;
            }
            AppAction::Submit => self.submit_message(),
            AppAction::NewChat => self.new_chat().await,
            AppAction::ToggleHelp => {
                self.view = View::Help;
            }
            AppAction::Escape => {
                self.notice = None;
            }
            AppAction::ScrollUp => {
                self.scroll_offset = self.scroll_offset.saturating_add(1);
            }
            AppAction::ScrollDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
            AppAction::ScrollPageUp => {
                self.scroll_offset = self.scroll_offset.saturating_add(10);
            }
            AppAction::ScrollPageDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(10);
            }
            AppAction::Input(key_event) => {
                self.input.input(key_event);
            }
            AppAction::Tick => {}
        }
    }

    /// Start a new chat, unless a turn is still running
    async fn new_chat(&mut self) {
        if self.is_busy() {
            self.notice = Some("Дождитесь ответа, прежде чем начинать новый чат.".to_string());
            return;
        }
        self.session.lock().await.clear();
        self.messages.clear();
        self.charts.clear();
        self.pipeline_stage = PipelineStage::Idle;
        self.scroll_offset = 0;
        self.notice = Some("Начат новый чат.".to_string());
    }

    fn submit_message(&mut self) {
        let content = self.input.lines().join("\n").trim().to_string();
        if content.is_empty() {
            return;
        }

        if self.is_busy() {
            self.notice = Some("Предыдущий вопрос ещё обрабатывается. Подождите.".to_string());
            return;
        }

        self.input = Self::new_input();
        self.notice = None;
        self.pending_input = Some(content.clone());
        self.pipeline_stage = PipelineStage::Subquestions;
        self.scroll_offset = 0;

        let tx = self.event_tx.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let session = Arc::clone(&self.session);
        let chart_dir = self.config.charts.output_dir.clone();

        tokio::spawn(async move {
            Self::run_turn(content, pipeline, session, chart_dir, tx).await;
        });
    }

    /// One chat turn in the background
    async fn run_turn(
        input: String,
        pipeline: Arc<ResearchPipeline>,
        session: Arc<Mutex<ChatSession>>,
        chart_dir: PathBuf,
        tx: mpsc::Sender<AppEvent>,
    ) {
        let (result, messages) = {
            let mut session = session.lock().await;
            let progress_tx = tx.clone();
            let result = session
                .submit_with_progress(&pipeline, &input, |progress| {
                    if progress_tx.try_send(AppEvent::StageChanged(progress.into())).is_err() {
                        warn!("Progress event dropped");
                    }
                })
                .await
                .map(|reply| (reply.id(), reply.chart().cloned()));
            (result, session.messages().to_vec())
        };

        let (charts, error) = match result {
            Ok((id, Some(request))) => (vec![(id, save_chart_blocking(chart_dir, id, request).await)], None),
            Ok((_, None)) => (Vec::new(), None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };

        let event = AppEvent::TurnFinished {
            messages,
            charts,
            error,
        };
        if tx.send(event).await.is_err() {
            error!("TUI closed before the turn finished");
        }
    }
}

/// [`save_chart`] on the blocking pool
pub async fn save_chart_blocking(dir: PathBuf, id: Uuid, request: charts::ChartRequest) -> ChartOutcome {
    let source = request.source_text();
    tokio::task::spawn_blocking(move || save_chart(&dir, id, &request))
        .await
        .unwrap_or_else(|e| ChartOutcome::Failed {
            error: format!("chart task failed: {}", e),
            request: source,
        })
}

/// Render a chart request into `<dir>/<message id>.png`
pub fn save_chart(dir: &Path, id: Uuid, request: &charts::ChartRequest) -> ChartOutcome {
    let path = dir.join(format!("{}.png", id));
    match charts::save_png(request, &path) {
        Ok(_) => {
            info!(path = %path.display(), "Chart written");
            ChartOutcome::Saved(path)
        }
        Err(e) => ChartOutcome::Failed {
            error: e.to_string(),
            request: request.source_text(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedAdapter;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn test_app(adapter: ScriptedAdapter) -> App {
        let mut config = Config::for_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9/search");
        config.search.api_key = String::new();
        config.charts.output_dir = std::env::temp_dir().join(format!("alt-history-tui-{}", Uuid::new_v4()));
        let pipeline = ResearchPipeline::with_llm(&config, adapter.into_llm());
        App::with_pipeline(config, pipeline)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_action(AppAction::Input(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)))
                .await;
        }
    }

    async fn wait_for_turn(app: &mut App) {
        for _ in 0..200 {
            app.poll_events();
            if !app.is_busy() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("turn did not finish");
    }

    #[tokio::test]
    async fn test_turn_updates_history_and_saves_chart() {
        let adapter = ScriptedAdapter::new()
            .text("Подвопрос")
            .tool_call(
                crate::agents::prompts::CHART_TOOL,
                serde_json::json!({"script": "plt.plot([1,2,3])"}),
            )
            .text("Ответ");
        let mut app = test_app(adapter);
        let chart_dir = app.config.charts.output_dir.clone();

        type_text(&mut app, "Что если?").await;
        app.handle_action(AppAction::Submit).await;
        assert!(app.is_busy());
        assert_eq!(app.pending_input.as_deref(), Some("Что если?"));

        wait_for_turn(&mut app).await;

        assert_eq!(app.pipeline_stage, PipelineStage::Complete);
        assert_eq!(app.messages.len(), 2);
        let id = app.messages[1].id();
        match app.charts.get(&id) {
            Some(ChartOutcome::Saved(path)) => assert!(path.exists()),
            other => panic!("unexpected chart outcome: {other:?}"),
        }

        std::fs::remove_dir_all(chart_dir).ok();
    }

    #[tokio::test]
    async fn test_save_chart_blocking_writes_png_or_reports_request() {
        let dir = std::env::temp_dir().join(format!("alt-history-save-{}", Uuid::new_v4()));
        let id = Uuid::new_v4();

        let saved = save_chart_blocking(
            dir.clone(),
            id,
            charts::ChartRequest::Script { script: "plt.bar(['A', 'B'], [1, 2])".into() },
        )
        .await;
        assert_eq!(saved, ChartOutcome::Saved(dir.join(format!("{}.png", id))));

        let failed = save_chart_blocking(
            dir.clone(),
            Uuid::new_v4(),
            charts::ChartRequest::Script { script: "plt.plot([-1e308, 1e308])".into() },
        )
        .await;
        match failed {
            ChartOutcome::Failed { request, .. } => assert!(request.contains("1e308")),
            other => panic!("unexpected outcome: {other:?}"),
        }

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_second_submit_is_rejected_while_busy() {
        let mut app = test_app(ScriptedAdapter::new().text("q").text("a"));

        type_text(&mut app, "Первый").await;
        app.handle_action(AppAction::Submit).await;
        type_text(&mut app, "Второй").await;
        app.handle_action(AppAction::Submit).await;

        assert!(app.notice.as_deref().unwrap_or("").contains("ещё обрабатывается"));
        assert_eq!(app.input.lines().join(""), "Второй");

        wait_for_turn(&mut app).await;
        assert_eq!(app.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_turn_shows_error_stage() {
        let mut app = test_app(ScriptedAdapter::new().error("model unavailable"));

        type_text(&mut app, "Вопрос").await;
        app.handle_action(AppAction::Submit).await;
        wait_for_turn(&mut app).await;

        assert!(matches!(app.pipeline_stage, PipelineStage::Error(ref e) if e.contains("model unavailable")));
        assert_eq!(app.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_new_chat_clears_history() {
        let mut app = test_app(ScriptedAdapter::new().text("q").text("a"));
        type_text(&mut app, "Вопрос").await;
        app.handle_action(AppAction::Submit).await;
        wait_for_turn(&mut app).await;

        app.handle_action(AppAction::NewChat).await;
        assert!(app.messages.is_empty());
        assert_eq!(app.pipeline_stage, PipelineStage::Idle);
        assert!(app.session.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_help_closes_on_any_key() {
        let mut app = test_app(ScriptedAdapter::new());
        app.handle_action(AppAction::ToggleHelp).await;
        assert_eq!(app.view, View::Help);
        app.handle_action(AppAction::Tick).await;
        assert_eq!(app.view, View::Help);
        app.handle_action(AppAction::ScrollUp).await;
        assert_eq!(app.view, View::Chat);
        assert_eq!(app.scroll_offset, 0);
    }
}
