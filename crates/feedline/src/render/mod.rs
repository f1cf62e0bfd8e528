//! Renderer collaborator boundary.
//!
//! The reconciler never builds presentation itself: it hands each new
//! message to a [`MessageRenderer`] and attaches whatever comes back. The
//! renderer must be a pure function of `(message, viewer)`: same inputs,
//! same widget and deferred ops. [`PlainRenderer`] is the default fallback
//! implementation, resolved once at construction.

pub mod markdown;
mod plain;

pub use plain::{EmptyWidget, PlainRenderer};

use ratatui::text::Line;

use crate::assets::AssetSlot;
use crate::error::Result;
use crate::feed::deferred::DeferredOp;
use crate::model::Message;
use crate::theme::Theme;

/// Which device is looking at the feed; drives own/other attribution
#[derive(Debug, Clone)]
pub struct ViewerIdentity {
    device_id: String,
}

impl ViewerIdentity {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn is_own(&self, message: &Message) -> bool {
        message.device_id == self.device_id
    }
}

/// A rendered message row.
///
/// Implementations cache their formatted lines internally, keyed on width
/// and whatever presentation state they carry; presentation mutations
/// (source toggle, asset resolution) invalidate the cache in place and
/// never change the row's identity.
pub trait FeedRenderable: Send + Sync {
    /// Formatted rows at the given width
    fn lines(&mut self, width: u16, theme: &Theme) -> &[Line<'static>];

    /// Flip between raw and formatted presentation, if the row has one.
    /// Returns whether anything changed.
    fn toggle_source(&mut self) -> bool {
        false
    }

    /// Deliver the outcome of a load-asset op
    fn set_asset(&mut self, _slot: AssetSlot) {}

    /// Current asset presentation state
    fn asset(&self) -> AssetSlot {
        AssetSlot::None
    }
}

/// What a renderer hands back for one message
pub struct Rendered {
    pub widget: Box<dyn FeedRenderable>,
    pub deferred: Vec<DeferredOp>,
}

/// Builds the rendered representation of one message
pub trait MessageRenderer: Send + Sync {
    fn render(&self, message: &Message, viewer: &ViewerIdentity) -> Result<Rendered>;
}
