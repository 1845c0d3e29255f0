//! Viewer state: which pane has focus, which article is selected, and how far
//! its text is scrolled.
//!
//! # Focus
//!
//! Focus is either [`Focus::List`] or [`Focus::Content`]. The only transitions
//! are `List -> Content` on [`Action::FocusRight`] and `Content -> List` on
//! [`Action::FocusLeft`]; the reverse keys are no-ops. Movement actions act on
//! the focused pane:
//!
//! - in the list they change the selected article, restoring the scroll
//!   position that article was last left at
//! - in the content pane they scroll the selected article's text
//!
//! The selected article is laid out again whenever the store's revision, the
//! wrap width, or the selection changes.

use crate::clipboard::clipboard_text;
use crate::stats::TextStats;
use crate::store::ArticleStore;
use crate::ui::keys::Action;
use crate::ui::layout::{self, Row};
use crate::ui::scroll::ScrollState;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::ListState;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    List,
    Content,
}

impl Focus {
    pub fn label(self) -> &'static str {
        match self {
            Focus::List => "articles",
            Focus::Content => "reading",
        }
    }
}

/// Work the event loop must do on behalf of the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Put this text on the clipboard.
    Copy(String),
}

/// A one-line message in the footer, cleared by the next key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Screen areas for a given terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panes {
    pub list: Rect,
    pub content: Rect,
    pub footer: Rect,
}

impl Panes {
    /// Split the terminal: article list on the left half, text on the right,
    /// a one-row footer along the bottom.
    pub fn compute(area: Rect) -> Self {
        let [body, footer] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);
        let [list, content] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);
        Self { list, content, footer }
    }
}

/// Inner size of a bordered block.
fn inner(rect: Rect) -> (usize, usize) {
    (
        usize::from(rect.width.saturating_sub(2)),
        usize::from(rect.height.saturating_sub(2)),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LayoutKey {
    selected: usize,
    revision: u64,
    width: usize,
}

pub struct App {
    store: Arc<ArticleStore>,
    focus: Focus,
    selected: usize,
    /// Scroll offset last used for each article.
    saved_offsets: Vec<usize>,
    scroll: ScrollState,
    rows: Vec<Row>,
    laid_out: Option<LayoutKey>,
    stats: TextStats,
    list_state: ListState,
    list_height: usize,
    wrap_width: usize,
    width_cap: usize,
    show_stats: bool,
    notice: Option<Notice>,
    should_quit: bool,
}

impl App {
    pub fn new(store: Arc<ArticleStore>, width_cap: u16) -> Self {
        let saved_offsets = vec![0; store.len()];
        let mut list_state = ListState::default();
        if !store.is_empty() {
            list_state.select(Some(0));
        }
        Self {
            store,
            focus: Focus::default(),
            selected: 0,
            saved_offsets,
            scroll: ScrollState::new(0, 0),
            rows: Vec::new(),
            laid_out: None,
            stats: TextStats::default(),
            list_state,
            list_height: 0,
            wrap_width: usize::from(width_cap),
            width_cap: usize::from(width_cap),
            show_stats: false,
            notice: None,
            should_quit: false,
        }
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn show_stats(&self) -> bool {
        self.show_stats
    }

    pub fn stats(&self) -> &TextStats {
        &self.stats
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn list_state_mut(&mut self) -> &mut ListState {
        &mut self.list_state
    }

    /// Rows of the selected article currently inside the viewport.
    pub fn visible_rows(&self) -> &[Row] {
        self.rows.get(self.scroll.visible_range()).unwrap_or_default()
    }

    /// Recompute pane sizes for a `width` x `height` terminal.
    pub fn resize(&mut self, width: u16, height: u16) {
        let panes = Panes::compute(Rect::new(0, 0, width, height));
        let (content_width, content_height) = inner(panes.content);
        let (_, list_height) = inner(panes.list);
        self.list_height = list_height;
        self.wrap_width = content_width.min(self.width_cap);
        self.scroll.on_resize(content_height);
        self.sync_layout();
    }

    /// Lay out the selected article again if anything it depends on changed.
    pub fn sync_layout(&mut self) {
        let key = LayoutKey {
            selected: self.selected,
            revision: self.store.revision(),
            width: self.wrap_width,
        };
        if self.laid_out == Some(key) {
            return;
        }
        let Some(record) = self.store.record(self.selected) else {
            return;
        };
        self.rows = layout::layout(&record.display_text(), Style::default(), true, self.wrap_width);
        self.stats = TextStats::of(&record.body);
        self.scroll.on_content_change(self.rows.len());
        self.laid_out = Some(key);
    }

    fn select(&mut self, index: usize) {
        let Some(last) = self.store.len().checked_sub(1) else {
            return;
        };
        let index = index.min(last);
        if index == self.selected {
            return;
        }
        self.saved_offsets[self.selected] = self.scroll.offset();
        self.selected = index;
        self.list_state.select(Some(index));
        self.sync_layout();
        self.scroll.set_offset(self.saved_offsets[index]);
    }

    fn select_by(&mut self, delta: isize) {
        let target = if delta < 0 {
            self.selected.saturating_sub(delta.unsigned_abs())
        } else {
            self.selected.saturating_add(delta.unsigned_abs())
        };
        self.select(target);
    }

    fn list_half_page(&self) -> isize {
        isize::try_from((self.list_height / 2).max(1)).unwrap_or(isize::MAX)
    }

    fn list_page(&self) -> isize {
        isize::try_from(self.list_height.max(1)).unwrap_or(isize::MAX)
    }

    fn copy_text(&self) -> Option<String> {
        let record = self.store.record(self.selected)?;
        Some(clipboard_text(&layout::strip_markup(&record.display_text())))
    }

    /// Apply one action. Returns work the caller has to carry out.
    pub fn handle_action(&mut self, action: Action) -> Option<Command> {
        if !matches!(action, Action::Resize(..)) {
            self.notice = None;
        }

        match (self.focus, action) {
            (_, Action::Quit) => self.should_quit = true,
            (_, Action::Resize(width, height)) => self.resize(width, height),
            (_, Action::ToggleStats) => self.show_stats = !self.show_stats,
            (_, Action::Copy) => return self.copy_text().map(Command::Copy),

            (Focus::List, Action::FocusRight) => self.focus = Focus::Content,
            (Focus::Content, Action::FocusLeft) => self.focus = Focus::List,
            (_, Action::FocusLeft | Action::FocusRight) => {}

            (Focus::List, Action::LineDown) => self.select_by(1),
            (Focus::List, Action::LineUp) => self.select_by(-1),
            (Focus::List, Action::HalfPageDown) => self.select_by(self.list_half_page()),
            (Focus::List, Action::HalfPageUp) => self.select_by(-self.list_half_page()),
            (Focus::List, Action::PageDown) => self.select_by(self.list_page()),
            (Focus::List, Action::PageUp) => self.select_by(-self.list_page()),
            (Focus::List, Action::Top) => self.select(0),
            (Focus::List, Action::Bottom) => self.select(usize::MAX),

            (Focus::Content, Action::LineDown) => self.scroll.scroll_by(1),
            (Focus::Content, Action::LineUp) => self.scroll.scroll_by(-1),
            (Focus::Content, Action::HalfPageDown) => self.scroll.scroll_by(self.scroll.half_page()),
            (Focus::Content, Action::HalfPageUp) => self.scroll.scroll_by(-self.scroll.half_page()),
            (Focus::Content, Action::PageDown) => self.scroll.scroll_by(self.scroll.page()),
            (Focus::Content, Action::PageUp) => self.scroll.scroll_by(-self.scroll.page()),
            (Focus::Content, Action::Top) => self.scroll.scroll_to_top(),
            (Focus::Content, Action::Bottom) => self.scroll.scroll_to_bottom(),
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FetchResult;
    use crate::store::{aggregate, tests::descriptors};
    use tokio::sync::mpsc;

    fn long_body(paragraphs: usize) -> String {
        (0..paragraphs)
            .map(|i| format!("Paragraph {i} of the story."))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Store of `count` articles with long bodies at `loaded` indices.
    async fn store_with_bodies(count: usize, loaded: &[usize]) -> Arc<ArticleStore> {
        let store = Arc::new(ArticleStore::new(descriptors(count)));
        let (tx, rx) = mpsc::channel(count.max(1));
        for &i in loaded {
            tx.send(FetchResult::loaded(i, long_body(40))).await.unwrap();
        }
        drop(tx);
        aggregate(rx, Arc::clone(&store)).await;
        store
    }

    fn app(store: Arc<ArticleStore>) -> App {
        let mut app = App::new(store, 80);
        app.resize(100, 24);
        app
    }

    #[test]
    fn test_panes_split() {
        let panes = Panes::compute(Rect::new(0, 0, 100, 24));
        assert_eq!(panes.list, Rect::new(0, 0, 50, 23));
        assert_eq!(panes.content, Rect::new(50, 0, 50, 23));
        assert_eq!(panes.footer, Rect::new(0, 23, 100, 1));
    }

    #[tokio::test]
    async fn test_focus_transitions() {
        let mut app = app(store_with_bodies(3, &[]).await);
        assert_eq!(app.focus(), Focus::List);

        app.handle_action(Action::FocusLeft);
        assert_eq!(app.focus(), Focus::List);
        app.handle_action(Action::FocusRight);
        assert_eq!(app.focus(), Focus::Content);
        app.handle_action(Action::FocusRight);
        assert_eq!(app.focus(), Focus::Content);
        app.handle_action(Action::FocusLeft);
        assert_eq!(app.focus(), Focus::List);
    }

    #[tokio::test]
    async fn test_list_movement_changes_selection() {
        let mut app = app(store_with_bodies(5, &[]).await);
        app.handle_action(Action::LineDown);
        app.handle_action(Action::LineDown);
        assert_eq!(app.selected(), 2);
        app.handle_action(Action::Bottom);
        assert_eq!(app.selected(), 4);
        app.handle_action(Action::LineDown);
        assert_eq!(app.selected(), 4);
        app.handle_action(Action::Top);
        assert_eq!(app.selected(), 0);
        app.handle_action(Action::LineUp);
        assert_eq!(app.selected(), 0);
    }

    #[tokio::test]
    async fn test_content_movement_scrolls() {
        let mut app = app(store_with_bodies(2, &[0]).await);
        app.handle_action(Action::FocusRight);
        app.handle_action(Action::LineDown);
        app.handle_action(Action::LineDown);
        assert_eq!(app.scroll().offset(), 2);
        assert_eq!(app.selected(), 0);

        app.handle_action(Action::Bottom);
        assert_eq!(app.scroll().offset(), app.scroll().max_offset());
        assert!(app.scroll().max_offset() > 0);
        assert_eq!(app.visible_rows().len(), app.scroll().viewport_height());
    }

    #[tokio::test]
    async fn test_scroll_offset_is_kept_per_article() {
        let mut app = app(store_with_bodies(2, &[0, 1]).await);
        app.handle_action(Action::FocusRight);
        for _ in 0..5 {
            app.handle_action(Action::LineDown);
        }
        app.handle_action(Action::FocusLeft);
        app.handle_action(Action::LineDown);
        assert_eq!(app.selected(), 1);
        assert_eq!(app.scroll().offset(), 0);

        app.handle_action(Action::LineUp);
        assert_eq!(app.selected(), 0);
        assert_eq!(app.scroll().offset(), 5);
    }

    #[tokio::test]
    async fn test_new_body_is_laid_out_keeping_offset() {
        let store = Arc::new(ArticleStore::new(descriptors(1)));
        let mut app = app(Arc::clone(&store));
        assert!(app.visible_rows().iter().any(|r| r.iter().map(|c| c.ch).collect::<String>() == "Loading..."));

        let (tx, rx) = mpsc::channel(1);
        tx.send(FetchResult::loaded(0, long_body(40))).await.unwrap();
        drop(tx);
        aggregate(rx, store).await;

        app.sync_layout();
        app.handle_action(Action::FocusRight);
        app.handle_action(Action::PageDown);
        let offset = app.scroll().offset();
        assert!(offset > 0);
        app.sync_layout();
        assert_eq!(app.scroll().offset(), offset);
        assert!(app.stats().words > 0);
    }

    #[tokio::test]
    async fn test_resize_reclamps_offset() {
        let mut app = app(store_with_bodies(1, &[0]).await);
        app.handle_action(Action::FocusRight);
        app.handle_action(Action::Bottom);
        app.handle_action(Action::Resize(100, 200));
        assert_eq!(app.scroll().offset(), 0);
        assert!(app.scroll().offset() <= app.scroll().max_offset());
    }

    #[tokio::test]
    async fn test_copy_returns_plain_text() {
        let mut app = app(store_with_bodies(1, &[]).await);
        let command = app.handle_action(Action::Copy);
        assert_eq!(command, Some(Command::Copy("Story 0 Loading...".to_string())));
    }

    #[tokio::test]
    async fn test_notice_clears_on_next_key() {
        let mut app = app(store_with_bodies(1, &[]).await);
        app.notify(Notice::info("copied"));
        app.handle_action(Action::Resize(90, 20));
        assert!(app.notice().is_some());
        app.handle_action(Action::ToggleStats);
        assert!(app.notice().is_none());
        assert!(app.show_stats());
    }

    #[tokio::test]
    async fn test_quit() {
        let mut app = app(store_with_bodies(1, &[]).await);
        assert!(!app.should_quit());
        app.handle_action(Action::Quit);
        assert!(app.should_quit());
    }
}
