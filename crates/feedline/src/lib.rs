//! Incremental conversation-feed reconciliation for terminal UIs.
//!
//! The host owns fetching and the event loop; `feedline` owns the diffing.
//! Hand each complete snapshot to [`Reconciler::reconcile`], drive
//! [`Reconciler::tick`] with elapsed time between frames, and call
//! [`Reconciler::render`] once per frame. Handles for unchanged messages
//! are reused across snapshots, so steady-state reconciliation does no
//! rendering work at all.

pub mod assets;
pub mod error;
pub mod feed;
pub mod format;
pub mod model;
pub mod render;
pub mod theme;

pub use error::{Error, Result};
pub use feed::{ReconcileOptions, Reconciler};
pub use model::{Message, MessageId, MessageKind};
pub use render::{FeedRenderable, MessageRenderer, Rendered, ViewerIdentity};
pub use theme::Theme;
