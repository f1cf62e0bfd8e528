//! Default message renderer and its row widgets.

use ratatui::text::{Line, Span};
use tracing::{debug, warn};
use unicode_width::UnicodeWidthChar;

use crate::assets::AssetSlot;
use crate::error::Result;
use crate::feed::deferred::{DeferredOp, DeferredOpKind};
use crate::format::{file_icon, format_file_size, format_time};
use crate::model::{Message, MessageKind};
use crate::render::{FeedRenderable, MessageRenderer, Rendered, ViewerIdentity, markdown};
use crate::theme::{Component, Theme};

const GUTTER: &str = "▌ ";
const GUTTER_WIDTH: u16 = 2;

/// Fallback renderer used when the host supplies no strategy of its own
#[derive(Debug, Default)]
pub struct PlainRenderer;

impl MessageRenderer for PlainRenderer {
    fn render(&self, message: &Message, viewer: &ViewerIdentity) -> Result<Rendered> {
        let own = viewer.is_own(message);
        let device_label = if own { "you" } else { message.device_id.as_str() };
        let meta = format!("{device_label} · {}", format_time(message.timestamp));

        match message.kind {
            MessageKind::Text => {
                let body = message.content.clone().unwrap_or_default();
                Ok(Rendered {
                    widget: Box::new(TextWidget::new(body, own, meta)),
                    deferred: Vec::new(),
                })
            }
            MessageKind::File => {
                let name = message
                    .original_name
                    .clone()
                    .unwrap_or_else(|| "unnamed".to_string());
                let mut deferred = Vec::new();
                let mut slot = AssetSlot::None;
                if message.is_image() {
                    if let Some(key) = &message.asset_key {
                        deferred.push(DeferredOp {
                            id: message.id.clone(),
                            kind: DeferredOpKind::LoadAsset {
                                asset_key: key.clone(),
                            },
                        });
                        slot = AssetSlot::Pending;
                    } else {
                        warn!(
                            target: "feedline.render",
                            id = %message.id,
                            "image message carries no asset key"
                        );
                    }
                }
                Ok(Rendered {
                    widget: Box::new(FileWidget {
                        icon: file_icon(
                            message.mime_type.as_deref(),
                            message.original_name.as_deref(),
                        ),
                        name,
                        size_label: message.file_size.map(format_file_size).unwrap_or_default(),
                        own,
                        meta,
                        slot,
                        rendered: None,
                        last_width: 0,
                    }),
                    deferred,
                })
            }
            MessageKind::Unknown => {
                // No content, but the handle still exists so id accounting
                // over snapshots stays exact.
                debug!(target: "feedline.render", id = %message.id, "no renderer for message kind");
                Ok(Rendered {
                    widget: Box::new(EmptyWidget::default()),
                    deferred: Vec::new(),
                })
            }
        }
    }
}

/// Text message row with an optional markdown presentation toggle
pub struct TextWidget {
    body: String,
    own: bool,
    meta: String,
    markdown: bool,
    show_source: bool,
    rendered: Option<Vec<Line<'static>>>,
    last_width: u16,
}

impl TextWidget {
    pub fn new(body: String, own: bool, meta: String) -> Self {
        let markdown = markdown::has_markdown_syntax(&body);
        Self {
            body,
            own,
            meta,
            markdown,
            show_source: false,
            rendered: None,
            last_width: 0,
        }
    }
}

impl FeedRenderable for TextWidget {
    fn lines(&mut self, width: u16, theme: &Theme) -> &[Line<'static>] {
        if self.rendered.is_some() && self.last_width == width {
            return self.rendered.as_deref().unwrap();
        }

        let body_style = theme.style(body_component(self.own));
        let accent = theme.style(accent_component(self.own));
        let wrap_width = width.saturating_sub(GUTTER_WIDTH).max(1);

        let body_lines = if self.markdown && !self.show_source {
            markdown::render_lines(&self.body, theme, wrap_width, body_style)
        } else {
            textwrap::wrap(&self.body, usize::from(wrap_width))
                .into_iter()
                .map(|piece| Line::from(Span::styled(piece.into_owned(), body_style)))
                .collect()
        };

        let mut lines: Vec<Line<'static>> = body_lines
            .into_iter()
            .map(|line| with_gutter(line, accent))
            .collect();
        lines.push(meta_line(&self.meta, theme));

        self.rendered = Some(lines);
        self.last_width = width;
        self.rendered.as_deref().unwrap()
    }

    fn toggle_source(&mut self) -> bool {
        if !self.markdown {
            return false;
        }
        self.show_source = !self.show_source;
        self.rendered = None;
        true
    }
}

/// File message row; image files additionally show the asset slot state
pub struct FileWidget {
    icon: &'static str,
    name: String,
    size_label: String,
    own: bool,
    meta: String,
    slot: AssetSlot,
    rendered: Option<Vec<Line<'static>>>,
    last_width: u16,
}

impl FeedRenderable for FileWidget {
    fn lines(&mut self, width: u16, theme: &Theme) -> &[Line<'static>] {
        if self.rendered.is_some() && self.last_width == width {
            return self.rendered.as_deref().unwrap();
        }

        let accent = theme.style(accent_component(self.own));
        let name_width = usize::from(width.saturating_sub(GUTTER_WIDTH + 3).max(4));
        let mut lines = vec![
            with_gutter(
                Line::from(vec![
                    Span::raw(format!("{} ", self.icon)),
                    Span::styled(
                        truncate_to_width(&self.name, name_width),
                        theme.style(Component::FileName),
                    ),
                ]),
                accent,
            ),
            with_gutter(
                Line::from(Span::styled(
                    self.size_label.clone(),
                    theme.style(Component::FileMeta),
                )),
                accent,
            ),
        ];
        match &self.slot {
            AssetSlot::None => {}
            AssetSlot::Pending => lines.push(with_gutter(
                Line::from(Span::styled(
                    "loading image…".to_string(),
                    theme.style(Component::AssetPending),
                )),
                accent,
            )),
            AssetSlot::Loaded { bytes } => lines.push(with_gutter(
                Line::from(Span::styled(
                    format!("[image · {}]", format_file_size(*bytes as u64)),
                    theme.style(Component::FileMeta),
                )),
                accent,
            )),
            AssetSlot::Failed { reason } => lines.push(with_gutter(
                Line::from(Span::styled(
                    format!("image failed: {reason}"),
                    theme.style(Component::AssetError),
                )),
                accent,
            )),
        }
        lines.push(meta_line(&self.meta, theme));

        self.rendered = Some(lines);
        self.last_width = width;
        self.rendered.as_deref().unwrap()
    }

    fn set_asset(&mut self, slot: AssetSlot) {
        if self.slot != slot {
            self.slot = slot;
            self.rendered = None;
        }
    }

    fn asset(&self) -> AssetSlot {
        self.slot.clone()
    }
}

/// Zero-height row for messages the renderer has no content for
#[derive(Debug, Default)]
pub struct EmptyWidget {
    lines: Vec<Line<'static>>,
}

impl FeedRenderable for EmptyWidget {
    fn lines(&mut self, _width: u16, _theme: &Theme) -> &[Line<'static>] {
        &self.lines
    }
}

fn body_component(own: bool) -> Component {
    if own {
        Component::OwnMessage
    } else {
        Component::OtherMessage
    }
}

fn accent_component(own: bool) -> Component {
    if own {
        Component::OwnAccent
    } else {
        Component::OtherAccent
    }
}

fn with_gutter(line: Line<'static>, accent: ratatui::style::Style) -> Line<'static> {
    let mut spans = vec![Span::styled(GUTTER.to_string(), accent)];
    spans.extend(line.spans);
    Line::from(spans)
}

fn meta_line(meta: &str, theme: &Theme) -> Line<'static> {
    Line::from(Span::styled(
        format!("  {meta}"),
        theme.style(Component::Meta),
    ))
}

/// Cut a string to a display width, appending an ellipsis when shortened.
/// Text that already fits, including an exact fit, passes through intact.
fn truncate_to_width(text: &str, max_width: usize) -> String {
    let total: usize = text.chars().map(|ch| ch.width().unwrap_or(0)).sum();
    if total <= max_width {
        return text.to_string();
    }
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width.saturating_sub(1) {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}
