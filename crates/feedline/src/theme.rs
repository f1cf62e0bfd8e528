//! Styles for feed rows.

use ratatui::style::{Color, Modifier, Style};

/// Styleable parts of the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Body of a message sent from the viewer's device
    OwnMessage,
    /// Accent gutter for the viewer's own rows
    OwnAccent,
    /// Body of a message from any other device
    OtherMessage,
    /// Accent gutter for other devices' rows
    OtherAccent,
    /// Device label and timestamp line under each message
    Meta,
    /// Placeholder shown while the first snapshot is in flight
    LoadingState,
    /// Placeholder shown for an empty conversation
    EmptyState,
    /// One-frame highlight on freshly attached rows
    Entrance,
    /// File name on a file row
    FileName,
    /// Icon and size details on a file row
    FileMeta,
    /// Image preview still loading
    AssetPending,
    /// Image preview that failed to load
    AssetError,
    /// Markdown heading lines
    MarkdownHeading,
    /// Inline code spans
    InlineCode,
    /// Fenced code block lines
    CodeBlock,
}

/// Fixed style palette, supplied at construction
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
        }
    }
}

impl Theme {
    pub fn style(&self, component: Component) -> Style {
        match component {
            Component::OwnMessage => Style::default().fg(Color::White),
            Component::OwnAccent => Style::default().fg(Color::Green),
            Component::OtherMessage => Style::default().fg(Color::Gray),
            Component::OtherAccent => Style::default().fg(Color::Blue),
            Component::Meta => Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM),
            Component::LoadingState | Component::EmptyState => Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            Component::Entrance => Style::default().add_modifier(Modifier::BOLD),
            Component::FileName => Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            Component::FileMeta => Style::default().fg(Color::DarkGray),
            Component::AssetPending => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::DIM),
            Component::AssetError => Style::default().fg(Color::Red),
            Component::MarkdownHeading => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Component::InlineCode => Style::default().fg(Color::Yellow).bg(Color::Black),
            Component::CodeBlock => Style::default().fg(Color::Green).bg(Color::Black),
        }
    }
}
