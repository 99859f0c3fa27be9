//! UI Rendering
//!
//! Main UI layout and rendering logic for the TUI.

use crate::models::{Message, Role};
use crate::search::serper::links_in;
use crate::tui::app::{App, ChartOutcome, PipelineStage, View};
use crate::tui::theme::{Icons, Theme};
use crate::tui::widgets;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const INDENT: &str = "  ";
/// Longest source result shown when a search returned no links
const MAX_RAW_RESULT: usize = 160;

/// Render the main UI
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(4), // Progress
            Constraint::Min(10),   // Messages
            Constraint::Length(4), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    widgets::render_progress(frame, chunks[1], &app.pipeline_stage);
    render_messages(frame, chunks[2], app);
    render_input(frame, chunks[3], app);
    render_status_bar(frame, chunks[4], app);

    if app.view == View::Help {
        render_help(frame);
    }
}

/// Header with a search key indicator
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let search_dot = if app.config.has_search_key() {
        Span::styled("●", Style::default().fg(Color::Green))
    } else {
        Span::styled("●", Style::default().fg(Color::Red))
    };

    let title = Paragraph::new(Line::from(vec![
        Span::styled("Альтернативная История России", Theme::title()),
        Span::styled(format!("  {}", app.config.llm.model), Theme::text_secondary()),
        Span::raw("  "),
        search_dot,
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_style(Theme::border()));

    frame.render_widget(title, area);
}

/// Render the message history, pinned to the bottom unless scrolled up
fn render_messages(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Сообщения ")
        .borders(Borders::ALL)
        .border_style(if app.view == View::Chat {
            Theme::border_focused()
        } else {
            Theme::border()
        });

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = history_lines(app, inner.width as usize);
    let overflow = (lines.len() as u16).saturating_sub(inner.height);
    let top = overflow.saturating_sub(app.scroll_offset);

    frame.render_widget(Paragraph::new(lines).scroll((top, 0)), inner);
}

fn history_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let max_width = width.saturating_sub(INDENT.len()).max(10);
    let mut lines = Vec::new();

    if app.messages.is_empty() && app.pending_input.is_none() {
        lines.push(Line::from(Span::styled("Добро пожаловать!", Theme::heading())));
        for text in [
            "Задайте вопрос об альтернативной истории, например: «Что было бы, если бы Наполеон победил в России?»",
            "Ассистент разобьёт его на вспомогательные вопросы, найдёт источники и напишет ответ со ссылками.",
            "Попросите график, и он будет сохранён в PNG-файл.",
        ] {
            push_wrapped(&mut lines, text, max_width, Theme::text_secondary());
        }
        return lines;
    }

    for message in &app.messages {
        push_message(&mut lines, message, app, max_width);
    }

    if let Some(pending) = &app.pending_input {
        lines.push(Line::from(Span::styled("Вы: ", Theme::user_message())));
        push_wrapped(&mut lines, pending, max_width, Theme::text());
        lines.push(Line::from(vec![
            Span::styled("Ассистент: ", Theme::assistant_message()),
            Span::styled(Icons::CURSOR, Theme::active()),
        ]));
    }

    lines
}

fn push_message(lines: &mut Vec<Line<'static>>, message: &Message, app: &App, max_width: usize) {
    let (prefix, style) = match message.role() {
        Role::User => ("Вы", Theme::user_message()),
        Role::Assistant => ("Ассистент", Theme::assistant_message()),
    };
    lines.push(Line::from(Span::styled(format!("{}: ", prefix), style)));

    for line in message.content().lines() {
        push_wrapped(lines, line, max_width, Theme::text());
    }

    if !message.subquestions().is_empty() {
        lines.push(Line::from(Span::styled(format!("{}Вспомогательные вопросы:", INDENT), Theme::text_secondary())));
        for question in message.subquestions() {
            push_wrapped(lines, &format!("{} {}", Icons::DOT, question), max_width, Theme::text_dim());
        }
    }

    if !message.sources().is_empty() {
        lines.push(Line::from(Span::styled(format!("{}Источники:", INDENT), Theme::text_secondary())));
        for source in message.sources() {
            let links = links_in(&source.result);
            if links.is_empty() {
                let text = truncate_string(&source.result, MAX_RAW_RESULT);
                push_wrapped(lines, &format!("{} {}", source.question, text), max_width, Theme::text_dim());
            } else {
                for link in links {
                    push_wrapped(lines, &format!("{} {}", Icons::DOT, link), max_width, Theme::link());
                }
            }
        }
    }

    match app.charts.get(&message.id()) {
        Some(ChartOutcome::Saved(path)) => {
            push_wrapped(lines, &format!("График сохранён: {}", path.display()), max_width, Theme::success());
        }
        Some(ChartOutcome::Failed { error, request }) => {
            push_wrapped(lines, &format!("Не удалось построить график: {}", error), max_width, Theme::error());
            for line in request.lines() {
                push_wrapped(lines, line, max_width, Theme::error());
            }
        }
        None => {}
    }

    lines.push(Line::from(""));
}

fn push_wrapped(lines: &mut Vec<Line<'static>>, text: &str, max_width: usize, style: Style) {
    if text.is_empty() {
        lines.push(Line::from(INDENT));
        return;
    }
    for chunk in wrap_line(text, max_width) {
        lines.push(Line::from(vec![Span::raw(INDENT), Span::styled(chunk, style)]));
    }
}

/// Split a line into chunks of at most `max_width` chars, preferring to break
/// after whitespace or punctuation
pub fn wrap_line(line: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut chunks = Vec::new();
    let mut remaining = line;

    while remaining.chars().count() > max_width {
        let mut break_byte = None;
        let mut hard_byte = remaining.len();
        for (seen, (idx, ch)) in remaining.char_indices().enumerate() {
            if seen == max_width {
                hard_byte = idx;
                break;
            }
            if idx > 0 && (ch.is_whitespace() || ch == ',' || ch == '.' || ch == ';') {
                break_byte = Some(idx + ch.len_utf8());
            }
        }

        let split_at = break_byte.unwrap_or(hard_byte);
        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk.trim_end().to_string());
        remaining = rest.trim_start();
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}

/// Render the input area
fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(if app.is_busy() { " Вопрос (идёт анализ...) " } else { " Вопрос " })
        .borders(Borders::ALL)
        .border_style(if app.view == View::Chat {
            Theme::border_focused()
        } else {
            Theme::border()
        });

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(&app.input, inner);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let status = if let Some(notice) = &app.notice {
        Span::styled(notice.clone(), Theme::warning())
    } else {
        match &app.pipeline_stage {
            PipelineStage::Idle => Span::styled("Готово к вопросу", Theme::text_secondary()),
            PipelineStage::Subquestions => Span::styled("Составляю вспомогательные вопросы...", Theme::active()),
            PipelineStage::Searching { index, total, .. } => {
                Span::styled(format!("Поиск ({}/{})", index + 1, total), Theme::active())
            }
            PipelineStage::Synthesizing => Span::styled("Анализирую исторические данные...", Theme::active()),
            PipelineStage::Complete => Span::styled("Ответ готов", Theme::complete()),
            PipelineStage::Error(e) => Span::styled(format!("Ошибка: {}", e), Theme::error()),
        }
    };

    let shortcuts = [
        ("[Enter]", " Отправить "),
        ("[Ctrl+N]", " Новый чат "),
        ("[Ctrl+Q]", " Выход "),
        ("[F1]", " Справка"),
    ];

    let mut spans = vec![status, Span::raw(" │ ")];
    for (key, desc) in shortcuts {
        spans.push(Span::styled(key, Theme::shortcut_key()));
        spans.push(Span::styled(desc, Theme::shortcut_desc()));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the help modal
fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let shortcut = |key: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("{:<13}", key), Theme::shortcut_key()),
            Span::styled(desc, Theme::text()),
        ])
    };

    let help_lines = vec![
        Line::from(Span::styled("Клавиши", Theme::heading())),
        Line::from(""),
        shortcut("Enter", "Отправить вопрос"),
        shortcut("Shift+Enter", "Новая строка"),
        shortcut("Ctrl+N", "Новый чат (очистить историю)"),
        shortcut("Ctrl+Q", "Выйти"),
        shortcut("Ctrl+C", "Выйти немедленно"),
        shortcut("↑/↓", "Прокрутка сообщений"),
        shortcut("PageUp/Down", "Прокрутка страницы"),
        shortcut("Esc", "Скрыть уведомление"),
        shortcut("F1 / Ctrl+H", "Эта справка"),
        Line::from(""),
        Line::from(Span::styled("Нажмите любую клавишу, чтобы закрыть", Theme::text_dim())),
    ];

    let paragraph = Paragraph::new(help_lines).block(
        Block::default()
            .title(" Справка ")
            .borders(Borders::ALL)
            .border_style(Theme::border_focused()),
    );

    frame.render_widget(paragraph, area);
}

/// Helper to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Truncate on a char boundary
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_wrap_line_prefers_word_breaks() {
        let chunks = wrap_line("Наполеон вошёл в Москву в сентябре 1812 года", 20);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        assert_eq!(chunks.join(" "), "Наполеон вошёл в Москву в сентябре 1812 года");
    }

    #[test]
    fn test_wrap_line_hard_splits_long_words() {
        let chunks = wrap_line("https://ru.wikipedia.org/wiki/Отечественная_война_1812_года", 16);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
        assert_eq!(wrap_line("", 10), vec![String::new()]);
    }

    #[test]
    fn test_truncate_string_is_char_safe() {
        assert_eq!(truncate_string("Бородино", 20), "Бородино");
        assert_eq!(truncate_string("Бородинское сражение", 8), "Бород...");
    }

    #[tokio::test]
    async fn test_render_smoke() {
        let config = crate::config::Config::for_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9/search");
        let app = App::new(config);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();

        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Альтернативная История России"));
        assert!(text.contains("Добро пожаловать!"));
    }
}
