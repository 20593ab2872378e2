//! Appointment list state for a long-lived dashboard view.
//!
//! Several reads can be in flight at once (filter changes, searches, the
//! refetch after an action). Only the read started last is allowed to land.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::error::DashboardError;
use crate::gateway::AdminGateway;
use crate::models::{AppointmentFilter, AppointmentPage};
use crate::services::AppointmentAdminService;

/// Hands out increasing fetch tokens and remembers the latest.
#[derive(Debug, Default)]
pub struct FetchSequencer {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> FetchTicket {
        FetchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, filter: &AppointmentFilter) -> Result<AppointmentPage, DashboardError>;
}

/// Reads pages through the admin service with one user's token.
pub struct AdminPageSource {
    service: AppointmentAdminService,
    token: RwLock<String>,
}

impl AdminPageSource {
    pub fn new(service: AppointmentAdminService, token: impl Into<String>) -> Self {
        Self {
            service,
            token: RwLock::new(token.into()),
        }
    }

    /// Swaps in a refreshed token; later reads use it.
    pub async fn set_token(&self, token: &str) {
        let mut current = self.token.write().await;
        if *current != token {
            *current = token.to_string();
        }
    }
}

#[async_trait]
impl PageSource for AdminPageSource {
    async fn fetch_page(&self, filter: &AppointmentFilter) -> Result<AppointmentPage, DashboardError> {
        let token = self.token.read().await.clone();
        self.service.list(&token, filter).await
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardSnapshot {
    pub filter: AppointmentFilter,
    pub page: Option<AppointmentPage>,
    /// Set when the latest read failed; the previous page stays visible.
    pub last_error: Option<String>,
}

/// A board as returned over HTTP. `applied` is false when a newer read
/// superseded the one this request started.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub applied: bool,
    #[serde(flatten)]
    pub snapshot: BoardSnapshot,
}

pub struct AppointmentBoard {
    source: Arc<dyn PageSource>,
    sequencer: FetchSequencer,
    search_generation: AtomicU64,
    debounce: Duration,
    state: RwLock<BoardSnapshot>,
}

impl AppointmentBoard {
    pub fn new(source: Arc<dyn PageSource>, config: &AppConfig) -> Self {
        Self::with_debounce(source, Duration::from_millis(config.search_debounce_ms))
    }

    pub fn with_debounce(source: Arc<dyn PageSource>, debounce: Duration) -> Self {
        Self {
            source,
            sequencer: FetchSequencer::new(),
            search_generation: AtomicU64::new(0),
            debounce,
            state: RwLock::new(BoardSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        self.state.read().await.clone()
    }

    /// Re-reads the page for the current filter.
    ///
    /// `Ok(false)` means a newer read started meanwhile and this result was dropped.
    pub async fn refresh(&self) -> Result<bool, DashboardError> {
        let filter = self.state.read().await.filter.clone();
        self.load(filter).await
    }

    pub async fn set_filter(&self, filter: AppointmentFilter) -> Result<bool, DashboardError> {
        filter.validate()?;
        self.state.write().await.filter = filter.clone();
        self.load(filter).await
    }

    /// Debounced search. Only the last term typed within the window fetches.
    pub async fn search(&self, term: &str) -> Result<bool, DashboardError> {
        let generation = self.search_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.debounce).await;

        if self.search_generation.load(Ordering::SeqCst) != generation {
            debug!("Search '{}' superseded before the debounce elapsed", term);
            return Ok(false);
        }

        let filter = {
            let mut state = self.state.write().await;
            let term = term.trim();
            state.filter.search = (!term.is_empty()).then(|| term.to_string());
            state.filter.page = 1;
            state.filter.clone()
        };
        self.load(filter).await
    }

    /// Awaits a mutation, then refreshes the list from the backend.
    ///
    /// A failed refresh does not fail the action; it shows up in
    /// [`BoardSnapshot::last_error`].
    pub async fn run_action<F, T>(&self, action: F) -> Result<T, DashboardError>
    where
        F: Future<Output = Result<T, DashboardError>> + Send,
        T: Send,
    {
        let value = action.await?;
        if let Err(e) = self.refresh().await {
            warn!("Refresh after action failed: {}", e);
        }
        Ok(value)
    }

    async fn load(&self, filter: AppointmentFilter) -> Result<bool, DashboardError> {
        let ticket = self.sequencer.issue();
        let result = self.source.fetch_page(&filter).await;

        let mut state = self.state.write().await;
        if !self.sequencer.is_current(ticket) {
            debug!("Discarding stale page from fetch {}", ticket.value());
            return Ok(false);
        }

        match result {
            Ok(page) => {
                state.page = Some(page);
                state.last_error = None;
                Ok(true)
            }
            Err(e) => {
                warn!("Appointment list fetch failed: {}", e);
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

struct BoardEntry {
    source: Arc<AdminPageSource>,
    board: Arc<AppointmentBoard>,
}

/// One board per signed-in admin, so filter and search state outlive a
/// single request.
pub struct BoardRegistry {
    gateway: Arc<dyn AdminGateway>,
    debounce: Duration,
    boards: RwLock<HashMap<String, BoardEntry>>,
}

impl BoardRegistry {
    pub fn new(gateway: Arc<dyn AdminGateway>, config: &AppConfig) -> Self {
        Self::with_debounce(gateway, Duration::from_millis(config.search_debounce_ms))
    }

    pub fn with_debounce(gateway: Arc<dyn AdminGateway>, debounce: Duration) -> Self {
        Self {
            gateway,
            debounce,
            boards: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the user's board, creating it on first use. A newer token
    /// replaces the stored one without resetting the board.
    pub async fn board_for(&self, user_id: &str, token: &str) -> Arc<AppointmentBoard> {
        if let Some(entry) = self.boards.read().await.get(user_id) {
            entry.source.set_token(token).await;
            return entry.board.clone();
        }

        let mut boards = self.boards.write().await;
        let entry = boards.entry(user_id.to_string()).or_insert_with(|| {
            debug!("Creating appointment board for user {}", user_id);
            let source = Arc::new(AdminPageSource::new(
                AppointmentAdminService::new(self.gateway.clone()),
                token,
            ));
            let board = Arc::new(AppointmentBoard::with_debounce(source.clone(), self.debounce));
            BoardEntry { source, board }
        });
        entry.source.set_token(token).await;
        entry.board.clone()
    }

    pub async fn len(&self) -> usize {
        self.boards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockAdminGateway;
    use crate::models::PageInfo;
    use assert_matches::assert_matches;
    use reconciliation_cell::wire::AppointmentPageRecord;
    use std::sync::atomic::AtomicUsize;

    /// Answers after a delay keyed on the search term; the page's `total`
    /// echoes the term length so tests can tell results apart.
    #[derive(Default)]
    struct DelayedSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for DelayedSource {
        async fn fetch_page(&self, filter: &AppointmentFilter) -> Result<AppointmentPage, DashboardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let term = filter.search.clone().unwrap_or_default();

            let delay = if term.starts_with("slow") { 300 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if term == "fail" {
                return Err(DashboardError::Validation("backend unavailable".into()));
            }
            Ok(AppointmentPage {
                pagination: PageInfo {
                    total: term.len() as i64,
                    ..PageInfo::default()
                },
                ..AppointmentPage::default()
            })
        }
    }

    fn filter(search: &str) -> AppointmentFilter {
        AppointmentFilter {
            search: Some(search.to_string()),
            ..AppointmentFilter::default()
        }
    }

    fn board(source: Arc<DelayedSource>) -> AppointmentBoard {
        AppointmentBoard::with_debounce(source, Duration::from_millis(500))
    }

    #[test]
    fn test_sequencer_only_latest_is_current() {
        let sequencer = FetchSequencer::new();
        let first = sequencer.issue();
        let second = sequencer.issue();

        assert!(second.value() > first.value());
        assert!(!sequencer.is_current(first));
        assert!(sequencer.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_from_earlier_fetch_is_discarded() {
        let board = board(Arc::new(DelayedSource::default()));

        let (slow, fast) = tokio::join!(board.set_filter(filter("slow-term")), board.set_filter(filter("ab")));

        assert_eq!(slow.unwrap(), false);
        assert_eq!(fast.unwrap(), true);
        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.page.unwrap().pagination.total, 2);
        assert_eq!(snapshot.filter.search.as_deref(), Some("ab"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_fetch_wins_when_it_finishes_last() {
        let board = board(Arc::new(DelayedSource::default()));

        let (fast, slow) = tokio::join!(board.set_filter(filter("ab")), board.set_filter(filter("slow")));

        assert_eq!(fast.unwrap(), false);
        assert_eq!(slow.unwrap(), true);
        assert_eq!(board.snapshot().await.page.unwrap().pagination.total, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_is_debounced() {
        let source = Arc::new(DelayedSource::default());
        let board = board(source.clone());

        let (first, second) = tokio::join!(board.search("a"), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            board.search("abc").await
        });

        assert_eq!(first.unwrap(), false);
        assert_eq!(second.unwrap(), true);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(board.snapshot().await.filter.search.as_deref(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_keeps_previous_page() {
        let board = board(Arc::new(DelayedSource::default()));
        board.set_filter(filter("abc")).await.unwrap();

        let result = board.set_filter(filter("fail")).await;
        assert_matches!(result, Err(DashboardError::Validation(_)));

        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.page.unwrap().pagination.total, 3);
        assert!(snapshot.last_error.unwrap().contains("backend unavailable"));

        // Retrying with a good filter clears the banner.
        board.set_filter(filter("ab")).await.unwrap();
        assert!(board.snapshot().await.last_error.is_none());
    }

    #[tokio::test]
    async fn test_registry_keeps_one_board_per_user() {
        let mut gateway = MockAdminGateway::new();
        gateway
            .expect_list_appointments()
            .withf(|token, _| token == "fresh-token")
            .times(1)
            .returning(|_, _| Ok(AppointmentPageRecord::default()));

        let registry = BoardRegistry::with_debounce(Arc::new(gateway), Duration::from_millis(500));
        let first = registry.board_for("admin-1", "old-token").await;
        let again = registry.board_for("admin-1", "fresh-token").await;
        let other = registry.board_for("admin-2", "other-token").await;

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len().await, 2);

        // The stored source now reads with the newer token.
        assert!(first.refresh().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_then_refresh() {
        let source = Arc::new(DelayedSource::default());
        let board = board(source.clone());

        let value = board.run_action(async { Ok::<_, DashboardError>(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let failed = board
            .run_action(async { Err::<(), _>(DashboardError::Conflict("unpaid".into())) })
            .await;
        assert_matches!(failed, Err(DashboardError::Conflict(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
