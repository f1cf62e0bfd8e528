//! Incremental reconciliation of conversation snapshots.
//!
//! The host fetches complete snapshots and hands them to
//! [`Reconciler::reconcile`]; the reconciler diffs each snapshot against its
//! cache of attached handles and applies the minimal set of attachments and
//! evictions. Between snapshots the host drives [`Reconciler::tick`] with
//! elapsed wall time and [`Reconciler::render`] once per frame.

pub mod deferred;
mod handle;
mod scroll;
mod store;

pub use handle::Handle;
pub use scroll::{BOTTOM_SLACK_ROWS, RESTORE_RETRY_DELAY, ScrollAnchor};
pub use store::{HandleKey, MessageStore};

use std::collections::HashSet;
use std::time::Duration;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use tracing::{debug, trace, warn};

use crate::assets::{AssetFetcher, AssetSlot, NullAssetFetcher};
use crate::feed::deferred::{DeferredOp, DeferredOpKind, DeferredWorkScheduler};
use crate::model::{Message, MessageId};
use crate::render::{MessageRenderer, PlainRenderer, ViewerIdentity};
use crate::theme::{Component, Theme};

/// Per-call knobs for one reconciliation pass
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Scroll to the bottom even if the viewer had scrolled away
    pub force_scroll: bool,
}

/// What the viewport shows when there are no rows to paint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedPhase {
    /// No snapshot observed yet
    Loading,
    /// Latest snapshot was empty
    Empty,
    Content,
}

/// Owns the handle cache, the scroll anchor, and the deferred-work queue.
///
/// All mutation goes through `&mut self`, so a reconciliation pass can never
/// observe a half-applied previous pass.
pub struct Reconciler {
    store: MessageStore,
    anchor: ScrollAnchor,
    scheduler: DeferredWorkScheduler,
    renderer: Box<dyn MessageRenderer>,
    assets: Box<dyn AssetFetcher>,
    viewer: ViewerIdentity,
    theme: Theme,
    phase: FeedPhase,
}

impl Reconciler {
    pub fn new(viewer: ViewerIdentity) -> Self {
        Self {
            store: MessageStore::new(),
            anchor: ScrollAnchor::new(),
            scheduler: DeferredWorkScheduler::new(),
            renderer: Box::new(PlainRenderer),
            assets: Box::new(NullAssetFetcher),
            viewer,
            theme: Theme::default(),
            phase: FeedPhase::Loading,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn MessageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_asset_fetcher(mut self, assets: Box<dyn AssetFetcher>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Diff a complete snapshot against the cache: evict handles whose id
    /// the snapshot no longer carries, attach handles for ids seen for the
    /// first time, leave everything else untouched. Scroll position is
    /// captured before any mutation and restored afterwards.
    pub fn reconcile(&mut self, snapshot: &[Message], options: ReconcileOptions) {
        if snapshot.is_empty() {
            self.store.clear();
            self.anchor.reset();
            self.phase = FeedPhase::Empty;
            trace!(target: "feedline.feed", "empty snapshot; cache cleared");
            return;
        }

        let was_at_bottom = self.anchor.capture();

        // Leaving a placeholder phase starts from a clean cache
        if self.phase != FeedPhase::Content {
            self.store.clear();
            self.phase = FeedPhase::Content;
        }

        let snapshot_ids: HashSet<&str> = snapshot.iter().map(|m| m.id.as_str()).collect();
        let stale: Vec<MessageId> = self
            .store
            .ids()
            .filter(|id| !snapshot_ids.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &stale {
            self.store.delete(id);
            trace!(target: "feedline.feed", %id, "evicted stale handle");
        }

        let mut ops = Vec::new();
        let mut fresh = Vec::new();
        for message in snapshot {
            if self.store.has(&message.id) {
                continue;
            }
            let handle = match self.renderer.render(message, &self.viewer) {
                Ok(rendered) => {
                    let asset_key = rendered
                        .deferred
                        .iter()
                        .map(|op| match &op.kind {
                            DeferredOpKind::LoadAsset { asset_key } => asset_key.clone(),
                        })
                        .next();
                    ops.extend(rendered.deferred);
                    Handle::new(message.id.clone(), rendered.widget).with_asset_key(asset_key)
                }
                Err(err) => {
                    // One bad row must not take down the pass; attach an
                    // empty handle so id accounting stays exact.
                    warn!(
                        target: "feedline.feed",
                        id = %message.id,
                        error = %err,
                        "renderer failed; attaching empty row"
                    );
                    Handle::empty(message.id.clone())
                }
            };
            self.store.set(message.id.clone(), handle);
            fresh.push(message.id.clone());
        }

        debug!(
            target: "feedline.feed",
            attached = fresh.len(),
            evicted = stale.len(),
            total = self.store.len(),
            "snapshot reconciled"
        );

        self.scheduler.schedule(ops);
        self.scheduler.queue_entrance(fresh);
        self.anchor.restore(was_at_bottom || options.force_scroll);
    }

    /// Attach one known-new message without a full snapshot diff. A
    /// duplicate id is a no-op. Never forces a scroll.
    pub fn add_single(&mut self, message: &Message) {
        if self.store.has(&message.id) {
            trace!(target: "feedline.feed", id = %message.id, "duplicate add ignored");
            return;
        }
        let was_at_bottom = self.anchor.capture();
        self.phase = FeedPhase::Content;

        let handle = match self.renderer.render(message, &self.viewer) {
            Ok(rendered) => {
                let asset_key = rendered
                    .deferred
                    .iter()
                    .map(|op| match &op.kind {
                        DeferredOpKind::LoadAsset { asset_key } => asset_key.clone(),
                    })
                    .next();
                self.scheduler.schedule(rendered.deferred);
                Handle::new(message.id.clone(), rendered.widget).with_asset_key(asset_key)
            }
            Err(err) => {
                warn!(
                    target: "feedline.feed",
                    id = %message.id,
                    error = %err,
                    "renderer failed; attaching empty row"
                );
                Handle::empty(message.id.clone())
            }
        };
        self.store.set(message.id.clone(), handle);
        self.scheduler.queue_entrance(vec![message.id.clone()]);
        self.anchor.restore(was_at_bottom);
    }

    /// Detach one message by id. Unknown ids are silently ignored.
    pub fn remove_single(&mut self, id: &str) {
        if self.store.delete(id) && self.store.is_empty() {
            self.anchor.reset();
            self.phase = FeedPhase::Empty;
        }
    }

    /// Advance timers and run every deferred op that came due. An op whose
    /// target was evicted after scheduling is dropped without effect.
    pub fn tick(&mut self, elapsed: Duration) {
        self.anchor.tick(elapsed);
        for op in self.scheduler.advance(elapsed) {
            let Some(handle) = self.store.get_mut(&op.id) else {
                debug!(target: "feedline.feed", id = %op.id, "target detached before deferred op ran");
                continue;
            };
            match op.kind {
                DeferredOpKind::LoadAsset { asset_key } => match self.assets.fetch(&asset_key) {
                    Ok(payload) => {
                        handle.set_asset(AssetSlot::Loaded {
                            bytes: payload.bytes.len(),
                        });
                    }
                    Err(err) => {
                        warn!(
                            target: "feedline.feed",
                            id = %op.id,
                            key = %asset_key,
                            error = %err,
                            "asset fetch failed"
                        );
                        handle.set_asset(AssetSlot::Failed {
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }
    }

    /// Flip a row's raw/formatted presentation. Returns whether it changed.
    pub fn toggle_presentation(&mut self, id: &str) -> bool {
        self.store
            .get_mut(id)
            .is_some_and(Handle::toggle_source)
    }

    /// Re-queue the asset load for a row whose fetch failed
    pub fn retry_asset(&mut self, id: &str) -> bool {
        let Some(handle) = self.store.get_mut(id) else {
            return false;
        };
        if !matches!(handle.asset(), AssetSlot::Failed { .. }) {
            return false;
        }
        let Some(asset_key) = handle.asset_key().map(str::to_string) else {
            return false;
        };
        handle.set_asset(AssetSlot::Pending);
        self.scheduler.schedule(vec![DeferredOp {
            id: id.to_string(),
            kind: DeferredOpKind::LoadAsset { asset_key },
        }]);
        true
    }

    /// Paint the feed into `area`. Measures all rows at the current width,
    /// resolves any pending scroll target, then paints the visible slice.
    pub fn render(&mut self, f: &mut Frame, area: Rect) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        match self.phase {
            FeedPhase::Loading => {
                paint_placeholder(
                    f,
                    area,
                    "loading conversation…",
                    self.theme.style(Component::LoadingState),
                );
                return;
            }
            FeedPhase::Empty => {
                paint_placeholder(
                    f,
                    area,
                    "no messages yet",
                    self.theme.style(Component::EmptyState),
                );
                return;
            }
            FeedPhase::Content => {}
        }

        let width = area.width;
        let mut total = 0usize;
        for handle in self.store.iter_mut() {
            total += handle.line_count(width, &self.theme);
        }
        self.anchor.measure(total, area.height);

        let offset = self.anchor.offset();
        let entrance = self.theme.style(Component::Entrance);
        let bottom = area.y + area.height;
        let mut row = 0usize;
        let mut y = area.y;
        'rows: for handle in self.store.iter_mut() {
            let entered = handle.entered();
            for line in handle.lines(width, &self.theme) {
                if row < offset {
                    row += 1;
                    continue;
                }
                if y >= bottom {
                    break 'rows;
                }
                if entered {
                    f.buffer_mut().set_line(area.x, y, line, width);
                } else {
                    // Fresh rows paint entrance-styled for exactly one frame
                    let styled = line.clone().patch_style(entrance);
                    f.buffer_mut().set_line(area.x, y, &styled, width);
                }
                row += 1;
                y += 1;
            }
        }

        // One combined entrance step per frame, after painting
        for id in self.scheduler.take_entrance_batch() {
            if let Some(handle) = self.store.get_mut(&id) {
                handle.mark_entered();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.has(id)
    }

    /// Attached ids in paint order
    pub fn attached_ids(&self) -> Vec<MessageId> {
        self.store.ids().cloned().collect()
    }

    pub fn scroll_up(&mut self, rows: usize) -> bool {
        self.anchor.scroll_up(rows)
    }

    pub fn scroll_down(&mut self, rows: usize) -> bool {
        self.anchor.scroll_down(rows)
    }

    pub fn scroll_to_top(&mut self) {
        self.anchor.scroll_to_top();
    }

    pub fn is_at_bottom(&self) -> bool {
        self.anchor.is_at_bottom()
    }

    pub fn offset(&self) -> usize {
        self.anchor.offset()
    }

    #[cfg(test)]
    pub(crate) fn key_of(&self, id: &str) -> Option<HandleKey> {
        self.store.key_of(id)
    }
}

fn paint_placeholder(f: &mut Frame, area: Rect, text: &str, style: Style) {
    let line = Line::from(Span::styled(text.to_string(), style));
    let x = area.x + area.width.saturating_sub(line.width() as u16) / 2;
    let y = area.y + area.height / 2;
    f.buffer_mut().set_line(x, y, &line, area.width);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::assets::MemoryAssetFetcher;
    use crate::error::{Error, Result};
    use crate::render::Rendered;

    fn viewer() -> ViewerIdentity {
        ViewerIdentity::new("dev-a")
    }

    fn text(id: &str, content: &str) -> Message {
        Message::text(id, 1_700_000_000_000, "dev-a", content)
    }

    fn image(id: &str, key: &str) -> Message {
        Message::file(id, 1_700_000_000_000, "dev-a", "pic.png", "image/png", 4096, key)
    }

    fn draw(reconciler: &mut Reconciler, terminal: &mut Terminal<TestBackend>) {
        terminal
            .draw(|f| reconciler.render(f, f.area()))
            .unwrap();
    }

    fn buffer_rows(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer.cell((x, y)).map_or(" ", |c| c.symbol()))
                    .collect()
            })
            .collect()
    }

    /// Renderer that fails for one configured id and delegates the rest
    struct FailingRenderer {
        fail_id: String,
    }

    impl MessageRenderer for FailingRenderer {
        fn render(&self, message: &Message, viewer: &ViewerIdentity) -> Result<Rendered> {
            if message.id == self.fail_id {
                return Err(Error::Render {
                    id: message.id.clone(),
                    reason: "simulated failure".to_string(),
                });
            }
            PlainRenderer.render(message, viewer)
        }
    }

    #[test]
    fn test_surviving_id_keeps_its_handle() {
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(
            &[text("m-1", "one"), text("m-2", "two")],
            ReconcileOptions::default(),
        );
        let key = reconciler.key_of("m-2").unwrap();

        reconciler.reconcile(
            &[text("m-2", "two"), text("m-3", "three")],
            ReconcileOptions::default(),
        );
        assert_eq!(reconciler.key_of("m-2"), Some(key), "handle survived the diff");
        assert!(!reconciler.contains("m-1"));
        assert_eq!(reconciler.attached_ids(), vec!["m-2", "m-3"]);
    }

    #[test]
    fn test_attach_order_follows_snapshot_order() {
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(
            &[text("m-1", "a"), text("m-2", "b"), text("m-3", "c")],
            ReconcileOptions::default(),
        );
        assert_eq!(reconciler.attached_ids(), vec!["m-1", "m-2", "m-3"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut reconciler = Reconciler::new(viewer());
        let snapshot = [text("m-1", "a"), text("m-2", "b")];
        reconciler.reconcile(&snapshot, ReconcileOptions::default());
        let revision = reconciler.store.revision();

        reconciler.reconcile(&snapshot, ReconcileOptions::default());
        assert_eq!(reconciler.store.revision(), revision, "no mutations on a repeat");
        assert_eq!(reconciler.scheduler.pending(), 0);
    }

    #[test]
    fn test_empty_snapshot_clears_then_recovers() {
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(&[text("m-1", "a")], ReconcileOptions::default());
        reconciler.reconcile(&[], ReconcileOptions::default());
        assert!(reconciler.is_empty());

        reconciler.reconcile(&[text("m-2", "b")], ReconcileOptions::default());
        assert_eq!(reconciler.attached_ids(), vec!["m-2"]);
    }

    #[test]
    fn test_image_asset_resolves_after_settle_delay() {
        let mut fetcher = MemoryAssetFetcher::new();
        fetcher.insert("blob/pic", vec![0; 2048], Some("image/png"));
        let mut reconciler =
            Reconciler::new(viewer()).with_asset_fetcher(Box::new(fetcher));

        reconciler.reconcile(&[image("m-1", "blob/pic")], ReconcileOptions::default());
        assert_eq!(reconciler.scheduler.pending(), 1);
        assert_eq!(reconciler.store.get("m-1").unwrap().asset(), AssetSlot::Pending);

        reconciler.tick(Duration::from_millis(5));
        assert_eq!(reconciler.store.get("m-1").unwrap().asset(), AssetSlot::Pending);

        reconciler.tick(Duration::from_millis(5));
        assert_eq!(
            reconciler.store.get("m-1").unwrap().asset(),
            AssetSlot::Loaded { bytes: 2048 }
        );

        // A repeat of the same snapshot must not schedule another load
        reconciler.reconcile(&[image("m-1", "blob/pic")], ReconcileOptions::default());
        assert_eq!(reconciler.scheduler.pending(), 0);
    }

    #[test]
    fn test_eviction_cancels_outstanding_deferred_work() {
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(&[image("m-1", "blob/pic")], ReconcileOptions::default());
        assert_eq!(reconciler.scheduler.pending(), 1);

        reconciler.reconcile(&[], ReconcileOptions::default());
        reconciler.tick(Duration::from_millis(10));
        assert!(reconciler.is_empty());
        assert_eq!(reconciler.scheduler.pending(), 0);
    }

    #[test]
    fn test_failed_fetch_lands_in_the_slot_and_can_retry() {
        // Default NullAssetFetcher fails every fetch
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(&[image("m-1", "blob/pic")], ReconcileOptions::default());
        reconciler.tick(Duration::from_millis(10));
        assert!(matches!(
            reconciler.store.get("m-1").unwrap().asset(),
            AssetSlot::Failed { .. }
        ));

        assert!(reconciler.retry_asset("m-1"));
        assert_eq!(reconciler.store.get("m-1").unwrap().asset(), AssetSlot::Pending);
        assert_eq!(reconciler.scheduler.pending(), 1);

        // Retry is only offered for failed slots
        reconciler.tick(Duration::from_millis(10));
        assert!(matches!(
            reconciler.store.get("m-1").unwrap().asset(),
            AssetSlot::Failed { .. }
        ));
        assert!(!reconciler.retry_asset("m-missing"));
    }

    #[test]
    fn test_renderer_failure_attaches_empty_row() {
        let mut reconciler = Reconciler::new(viewer()).with_renderer(Box::new(FailingRenderer {
            fail_id: "m-2".to_string(),
        }));
        reconciler.reconcile(
            &[text("m-1", "a"), text("m-2", "b"), text("m-3", "c")],
            ReconcileOptions::default(),
        );

        assert_eq!(reconciler.attached_ids(), vec!["m-1", "m-2", "m-3"]);
        let handle = reconciler.store.get_mut("m-2").unwrap();
        assert!(handle.lines(40, &Theme::default()).is_empty());
    }

    #[test]
    fn test_unknown_kind_counts_toward_the_cache() {
        let mut unknown = text("m-2", "");
        unknown.kind = crate::model::MessageKind::Unknown;
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(&[text("m-1", "a"), unknown], ReconcileOptions::default());
        assert_eq!(reconciler.len(), 2);
    }

    #[test]
    fn test_add_and_remove_single() {
        let mut reconciler = Reconciler::new(viewer());
        reconciler.add_single(&text("m-1", "a"));
        assert_eq!(reconciler.len(), 1);

        let revision = reconciler.store.revision();
        reconciler.add_single(&text("m-1", "a"));
        assert_eq!(reconciler.store.revision(), revision, "duplicate add is a no-op");

        reconciler.remove_single("m-1");
        assert!(reconciler.is_empty());
        reconciler.remove_single("m-1");
    }

    #[test]
    fn test_placeholders_before_and_after_content() {
        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        let mut reconciler = Reconciler::new(viewer());

        draw(&mut reconciler, &mut terminal);
        let rows = buffer_rows(&terminal);
        assert!(rows.iter().any(|r| r.contains("loading conversation")));

        reconciler.reconcile(&[], ReconcileOptions::default());
        draw(&mut reconciler, &mut terminal);
        let rows = buffer_rows(&terminal);
        assert!(rows.iter().any(|r| r.contains("no messages yet")));
    }

    #[test]
    fn test_render_paints_rows_in_order() {
        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(
            &[text("m-1", "first words"), text("m-2", "second words")],
            ReconcileOptions::default(),
        );
        draw(&mut reconciler, &mut terminal);

        let rows = buffer_rows(&terminal);
        let first = rows.iter().position(|r| r.contains("first words")).unwrap();
        let second = rows.iter().position(|r| r.contains("second words")).unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_entrance_is_one_frame() {
        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(&[text("m-1", "hi")], ReconcileOptions::default());
        assert!(!reconciler.store.get("m-1").unwrap().entered());

        draw(&mut reconciler, &mut terminal);
        assert!(reconciler.store.get("m-1").unwrap().entered());
    }

    #[test]
    fn test_scroll_anchoring_across_reconciles() {
        // 40 two-row messages against a 10-row viewport
        let snapshot: Vec<Message> = (0..40).map(|i| text(&format!("m-{i}"), "x")).collect();
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        let mut reconciler = Reconciler::new(viewer());

        reconciler.reconcile(&snapshot, ReconcileOptions::default());
        draw(&mut reconciler, &mut terminal);
        assert_eq!(reconciler.offset(), 80 - 10, "initial load lands at the bottom");

        // Scrolled far enough away that the slack heuristic reads not-at-bottom
        reconciler.scroll_to_top();
        let mut grown = snapshot.clone();
        grown.push(text("m-40", "x"));
        reconciler.reconcile(&grown, ReconcileOptions::default());
        draw(&mut reconciler, &mut terminal);
        assert_eq!(reconciler.offset(), 0, "position preserved while reading history");

        reconciler.reconcile(&grown, ReconcileOptions { force_scroll: true });
        draw(&mut reconciler, &mut terminal);
        assert_eq!(reconciler.offset(), 82 - 10);
        assert!(reconciler.is_at_bottom());
    }

    #[test]
    fn test_add_single_never_moves_a_scrolled_away_viewer() {
        // 40 two-row messages against a 10-row viewport, so scrolling to
        // the top lands well outside the at-bottom slack band
        let snapshot: Vec<Message> = (0..40).map(|i| text(&format!("m-{i}"), "x")).collect();
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(&snapshot, ReconcileOptions::default());
        draw(&mut reconciler, &mut terminal);

        reconciler.scroll_to_top();
        reconciler.add_single(&text("m-40", "x"));
        draw(&mut reconciler, &mut terminal);
        assert_eq!(reconciler.offset(), 0, "single insert keeps the reading position");
        assert!(reconciler.contains("m-40"));
    }

    #[test]
    fn test_new_ids_append_even_when_snapshot_puts_them_first() {
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(
            &[text("m-1", "a"), text("m-2", "b")],
            ReconcileOptions::default(),
        );

        // m-0 precedes the cached ids in the snapshot; it still attaches
        // after them, never interleaved
        reconciler.reconcile(
            &[text("m-0", "z"), text("m-1", "a"), text("m-2", "b")],
            ReconcileOptions::default(),
        );
        assert_eq!(reconciler.attached_ids(), vec!["m-1", "m-2", "m-0"]);
    }

    #[test]
    fn test_toggle_presentation_reaches_the_row() {
        let mut reconciler = Reconciler::new(viewer());
        reconciler.reconcile(
            &[text("m-1", "plain"), text("m-2", "with **bold**")],
            ReconcileOptions::default(),
        );
        assert!(!reconciler.toggle_presentation("m-1"));
        assert!(reconciler.toggle_presentation("m-2"));
        assert!(!reconciler.toggle_presentation("m-missing"));
    }
}
