//! Progress Widget
//!
//! Displays the research pipeline progress.

use crate::tui::app::PipelineStage;
use crate::tui::theme::{Icons, Theme};
use crate::tui::ui::truncate_string;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Render the progress indicator
pub fn render_progress(frame: &mut Frame, area: Rect, stage: &PipelineStage) {
    let block = Block::default()
        .title(" Ход исследования ")
        .borders(Borders::ALL)
        .border_style(Theme::border());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from(build_progress_line(stage))];

    let detail = match stage {
        PipelineStage::Idle => Some(Span::styled("Жду вопрос...", Theme::text_dim())),
        PipelineStage::Searching { question, .. } => Some(Span::styled(
            format!("  Query: {}", truncate_string(question, (inner.width as usize).saturating_sub(10))),
            Theme::text_secondary(),
        )),
        PipelineStage::Error(e) => Some(Span::styled(
            truncate_string(e, inner.width as usize),
            Theme::error(),
        )),
        _ => None,
    };
    lines.extend(detail.map(Line::from));

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Build the progress line with stage indicators
fn build_progress_line(stage: &PipelineStage) -> Vec<Span<'static>> {
    let searching = match stage {
        PipelineStage::Searching { index, total, .. } => format!("Поиск {}/{}", index + 1, total),
        _ => "Поиск".to_string(),
    };

    let stages = [
        ("Подвопросы".to_string(), StageState::of(stage, 0)),
        (searching, StageState::of(stage, 1)),
        ("Анализ".to_string(), StageState::of(stage, 2)),
        ("Готово".to_string(), StageState::of(stage, 3)),
    ];

    let mut spans = Vec::new();

    for (i, (name, state)) in stages.iter().enumerate() {
        let (icon, style) = match state {
            StageState::Complete => (Icons::COMPLETE, Theme::complete()),
            StageState::Active => (Icons::ACTIVE, Theme::active()),
            StageState::Pending => (Icons::PENDING, Theme::pending()),
            StageState::Error => (Icons::ERROR, Theme::error()),
        };

        spans.push(Span::styled(format!("{} ", icon), style));
        spans.push(Span::styled(name.clone(), style));

        if i < stages.len() - 1 {
            spans.push(Span::styled(format!(" {} ", Icons::ARROW), Theme::text_dim()));
        }
    }

    spans
}

/// State of a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq)]
enum StageState {
    Pending,
    Active,
    Complete,
    Error,
}

impl StageState {
    /// State of the stage at `position` (0 = sub-questions .. 3 = done)
    fn of(stage: &PipelineStage, position: usize) -> Self {
        let current = match stage {
            PipelineStage::Idle => return StageState::Pending,
            PipelineStage::Error(_) => return StageState::Error,
            PipelineStage::Subquestions => 0,
            PipelineStage::Searching { .. } => 1,
            PipelineStage::Synthesizing => 2,
            PipelineStage::Complete => return StageState::Complete,
        };

        if position < current {
            StageState::Complete
        } else if position == current {
            StageState::Active
        } else {
            StageState::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_states_follow_pipeline_order() {
        let searching = PipelineStage::Searching {
            index: 1,
            total: 3,
            question: "Бородино".to_string(),
        };
        assert_eq!(StageState::of(&searching, 0), StageState::Complete);
        assert_eq!(StageState::of(&searching, 1), StageState::Active);
        assert_eq!(StageState::of(&searching, 3), StageState::Pending);
        assert_eq!(StageState::of(&PipelineStage::Complete, 3), StageState::Complete);
        assert_eq!(StageState::of(&PipelineStage::Idle, 0), StageState::Pending);
    }

    #[test]
    fn test_progress_line_shows_search_count() {
        let spans = build_progress_line(&PipelineStage::Searching {
            index: 0,
            total: 2,
            question: "q".to_string(),
        });
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.contains("Поиск 1/2"));
    }
}
