//! Attached rendered representation of one message.

use ratatui::text::Line;

use crate::assets::AssetSlot;
use crate::model::MessageId;
use crate::render::FeedRenderable;
use crate::theme::Theme;

/// Opaque reference to one message's rendered rows.
///
/// Created the first time an id appears in a processed snapshot, destroyed
/// when a later snapshot omits the id. Never recreated while cached;
/// presentation mutations happen in place.
pub struct Handle {
    id: MessageId,
    widget: Box<dyn FeedRenderable>,
    /// Key the renderer's load-asset op targets, kept for explicit retries
    asset_key: Option<String>,
    /// False until the batched entrance step has run for this row
    entered: bool,
}

impl Handle {
    pub fn new(id: MessageId, widget: Box<dyn FeedRenderable>) -> Self {
        Self {
            id,
            widget,
            asset_key: None,
            entered: false,
        }
    }

    /// Content-free handle; used for unknown kinds and renderer failures so
    /// id accounting stays exact.
    pub fn empty(id: MessageId) -> Self {
        Self::new(id, Box::new(crate::render::EmptyWidget::default()))
    }

    pub fn with_asset_key(mut self, asset_key: Option<String>) -> Self {
        self.asset_key = asset_key;
        self
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn asset_key(&self) -> Option<&str> {
        self.asset_key.as_deref()
    }

    pub fn entered(&self) -> bool {
        self.entered
    }

    pub(crate) fn mark_entered(&mut self) {
        self.entered = true;
    }

    pub fn lines(&mut self, width: u16, theme: &Theme) -> &[Line<'static>] {
        self.widget.lines(width, theme)
    }

    pub fn line_count(&mut self, width: u16, theme: &Theme) -> usize {
        self.widget.lines(width, theme).len()
    }

    pub fn toggle_source(&mut self) -> bool {
        self.widget.toggle_source()
    }

    pub fn set_asset(&mut self, slot: AssetSlot) {
        self.widget.set_asset(slot);
    }

    pub fn asset(&self) -> AssetSlot {
        self.widget.asset()
    }
}
