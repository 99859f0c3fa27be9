//! Theme and Styling
//!
//! Colors and styles for the TUI: parchment tones with a crimson accent.

use ratatui::style::{Color, Modifier, Style};

/// Application theme
pub struct Theme;

impl Theme {
    /// Primary accent (crimson)
    pub const ACCENT: Color = Color::Rgb(220, 60, 60);

    pub const SUCCESS: Color = Color::Rgb(34, 197, 94);
    pub const WARNING: Color = Color::Rgb(251, 191, 36);
    pub const ERROR: Color = Color::Rgb(239, 68, 68);

    pub const TEXT_PRIMARY: Color = Color::Rgb(236, 228, 210);
    pub const TEXT_SECONDARY: Color = Color::Rgb(170, 160, 140);
    pub const TEXT_DIM: Color = Color::Rgb(96, 90, 80);

    pub const BORDER: Color = Color::Rgb(70, 62, 52);
    pub const BORDER_FOCUSED: Color = Color::Rgb(200, 160, 90);

    pub const USER: Color = Color::Rgb(200, 160, 90);
    pub const ASSISTANT: Color = Color::Rgb(220, 60, 60);
    pub const LINK: Color = Color::Rgb(96, 165, 250);

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::TEXT_DIM)
    }

    pub fn title() -> Style {
        Style::default().fg(Self::ACCENT).add_modifier(Modifier::BOLD)
    }

    pub fn heading() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::ERROR)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::BORDER_FOCUSED)
    }

    pub fn user_message() -> Style {
        Style::default().fg(Self::USER).add_modifier(Modifier::BOLD)
    }

    pub fn assistant_message() -> Style {
        Style::default()
            .fg(Self::ASSISTANT)
            .add_modifier(Modifier::BOLD)
    }

    /// Source links
    pub fn link() -> Style {
        Style::default()
            .fg(Self::LINK)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn shortcut_key() -> Style {
        Style::default().fg(Self::ACCENT).add_modifier(Modifier::BOLD)
    }

    pub fn shortcut_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Active/in-progress indicator
    pub fn active() -> Style {
        Style::default()
            .fg(Self::WARNING)
            .add_modifier(Modifier::BOLD)
    }

    pub fn complete() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    pub fn pending() -> Style {
        Style::default().fg(Self::TEXT_DIM)
    }
}

/// Progress stage icons
pub struct Icons;

impl Icons {
    pub const COMPLETE: &'static str = "✓";
    pub const ACTIVE: &'static str = "●";
    pub const PENDING: &'static str = "○";
    pub const ERROR: &'static str = "✗";
    pub const ARROW: &'static str = "→";
    pub const CURSOR: &'static str = "▌";
    pub const DOT: &'static str = "•";
}
