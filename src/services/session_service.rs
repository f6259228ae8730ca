// src/services/session_service.rs

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use chrono::Utc;
use tokio::{sync::Mutex, task::JoinHandle};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::LeaderboardView,
        question::Question,
        session::{QuizSession, SelectOptionRequest, SessionPhase, SubmitAnswerRequest},
        view::{LeaderboardPanel, LeaderboardResponse, SessionView, Stage},
    },
    services::{
        presenter,
        quiz::{self, TimerRules, Transition},
        ranking,
        score_store::ScoreStore,
    },
};

type SessionHandle = Arc<Mutex<QuizSession>>;

struct Entry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// Live sessions keyed by id. Each session has its own lock so one pass
/// finishes (store write included) before the next starts; sessions never
/// wait on each other.
///
/// Sessions nobody has looked up for `idle_ttl` are dropped, on every insert
/// and by the background sweeper.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        SessionRegistry {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    pub fn insert(&self, session: QuizSession) -> Result<(), AppError> {
        let now = Instant::now();
        let mut map = self.write()?;
        evict_from(&mut map, now, self.idle_ttl);
        map.insert(
            session.id,
            Entry {
                handle: Arc::new(Mutex::new(session)),
                last_seen: now,
            },
        );
        Ok(())
    }

    /// Looks a session up and marks it as seen.
    pub fn get(&self, id: Uuid) -> Result<SessionHandle, AppError> {
        let mut map = self.write()?;
        let entry = map
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        entry.last_seen = Instant::now();
        Ok(Arc::clone(&entry.handle))
    }

    /// Drops sessions idle for longer than the TTL as of `now`. Returns how
    /// many were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        match self.inner.write() {
            Ok(mut map) => evict_from(&mut map, now, self.idle_ttl),
            Err(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Entry>>, AppError> {
        self.inner
            .write()
            .map_err(|_| AppError::InternalServerError("session registry poisoned".to_string()))
    }
}

fn evict_from(map: &mut HashMap<Uuid, Entry>, now: Instant, idle_ttl: Duration) -> usize {
    let before = map.len();
    map.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= idle_ttl);
    before - map.len()
}

/// Runs render passes: reconcile the timer, apply the player's action,
/// persist any attempt record, then build the view.
#[derive(Clone)]
pub struct QuizService {
    questions: Arc<[Question]>,
    store: Arc<dyn ScoreStore>,
    sessions: SessionRegistry,
    rules: TimerRules,
    refresh_interval_ms: u64,
}

/// What happened during one pass, beyond the session itself.
#[derive(Default)]
struct PassOutcome {
    transition: Option<Transition>,
    notices: Vec<String>,
}

impl QuizService {
    pub fn new(
        questions: Arc<[Question]>,
        store: Arc<dyn ScoreStore>,
        rules: TimerRules,
        refresh_interval_ms: u64,
        session_idle: Duration,
    ) -> Self {
        QuizService {
            questions,
            store,
            sessions: SessionRegistry::new(session_idle),
            rules,
            refresh_interval_ms,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Periodically drops idle sessions. Runs until the runtime shuts down.
    pub fn spawn_session_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = sessions.evict_idle(Instant::now());
                if removed > 0 {
                    tracing::info!("Dropped {} idle sessions, {} live", removed, sessions.len());
                }
            }
        })
    }

    /// Creates a session and starts it for `player_name`.
    pub async fn create_session(&self, player_name: &str) -> Result<SessionView, AppError> {
        let now = Utc::now();
        let session = quiz::start(
            QuizSession::new(Uuid::new_v4()),
            player_name,
            &self.questions,
            &mut rand::rng(),
        )?;
        let session = quiz::touch(session, now);

        tracing::info!(
            "Session {} started for '{}' with {} questions",
            session.id,
            session.player_name,
            session.total_questions()
        );

        let view = self.view(&session, PassOutcome::default()).await;
        self.sessions.insert(session)?;
        Ok(view)
    }

    /// Starts a session that is back in `NotStarted` after a restart.
    pub async fn start_session(&self, id: Uuid, player_name: &str) -> Result<SessionView, AppError> {
        let handle = self.sessions.get(id)?;
        let mut guard = handle.lock().await;

        let session = quiz::start(guard.clone(), player_name, &self.questions, &mut rand::rng())?;
        *guard = quiz::touch(session, Utc::now());

        tracing::info!("Session {} restarted for '{}'", id, guard.player_name);
        Ok(self.view(&guard, PassOutcome::default()).await)
    }

    /// The idempotent recompute-and-render pass clients poll.
    pub async fn render(&self, id: Uuid) -> Result<SessionView, AppError> {
        let handle = self.sessions.get(id)?;
        let mut guard = handle.lock().await;

        let (session, outcome) = self.reconcile(guard.clone()).await;
        *guard = session;
        Ok(self.view(&guard, outcome).await)
    }

    pub async fn select(&self, id: Uuid, req: SelectOptionRequest) -> Result<SessionView, AppError> {
        let handle = self.sessions.get(id)?;
        let mut guard = handle.lock().await;

        let (session, outcome) = self.reconcile(guard.clone()).await;
        if outcome.transition.is_some() {
            // The question this selection was meant for is gone.
            *guard = session;
            return Ok(self.view(&guard, outcome).await);
        }

        ensure_current(&session, req.question_index)?;
        *guard = quiz::select(session, &req.option, Utc::now(), self.rules)?;
        Ok(self.view(&guard, outcome).await)
    }

    pub async fn submit(&self, id: Uuid, req: SubmitAnswerRequest) -> Result<SessionView, AppError> {
        let handle = self.sessions.get(id)?;
        let mut guard = handle.lock().await;

        let (session, outcome) = self.reconcile(guard.clone()).await;
        if outcome.transition.is_some() {
            *guard = session;
            return Ok(self.view(&guard, outcome).await);
        }

        ensure_current(&session, req.question_index)?;
        let now = Utc::now();
        let session = match req.option.as_deref() {
            Some(option) => quiz::select(session, option, now, self.rules)?,
            None => session,
        };

        let (session, transition) = quiz::submit(session, now, self.rules)?;
        let mut outcome = PassOutcome::default();
        if let Some(notice) = self.persist(&transition).await {
            outcome.notices.push(notice);
        }
        outcome.transition = Some(transition);

        // The next question is on screen as soon as this response renders.
        *guard = quiz::touch(session, now);
        Ok(self.view(&guard, outcome).await)
    }

    /// Discards the run. Previously written attempt records stay in the store.
    pub async fn restart(&self, id: Uuid) -> Result<SessionView, AppError> {
        let handle = self.sessions.get(id)?;
        let mut guard = handle.lock().await;

        *guard = quiz::restart(guard.clone())?;
        tracing::info!("Session {} reset", id);
        Ok(self.view(&guard, PassOutcome::default()).await)
    }

    /// Top 5 plus the player's rank. Store failures degrade to an empty board.
    pub async fn leaderboard(&self, player_name: Option<&str>) -> LeaderboardResponse {
        let (view, notice) = self.load_leaderboard(player_name.unwrap_or_default()).await;
        LeaderboardResponse {
            panel: presenter::leaderboard_panel(&view, &[]),
            notices: notice.into_iter().collect(),
        }
    }

    /// Expires the current question if due, persists the attempt, and marks
    /// whatever question is now current as displayed.
    async fn reconcile(&self, session: QuizSession) -> (QuizSession, PassOutcome) {
        let now = Utc::now();
        let mut outcome = PassOutcome::default();

        let (session, transition) = quiz::expire_if_due(session, now, self.rules);
        if let Some(transition) = transition {
            if let Some(notice) = self.persist(&transition).await {
                outcome.notices.push(notice);
            }
            outcome.transition = Some(transition);
        }

        (quiz::touch(session, now), outcome)
    }

    /// Best-effort write; the session advances whether or not it lands.
    async fn persist(&self, transition: &Transition) -> Option<String> {
        match self.store.append(&transition.record).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Failed to save score for '{}': {}", transition.record.name, e);
                Some(e.to_string())
            }
        }
    }

    async fn load_leaderboard(&self, player_name: &str) -> (LeaderboardView, Option<String>) {
        match self.store.read_all().await {
            Ok(records) => (ranking::rank(&records, player_name), None),
            Err(e) => {
                tracing::warn!("Leaderboard unavailable: {}", e);
                (LeaderboardView::default(), Some(e.to_string()))
            }
        }
    }

    async fn view(&self, session: &QuizSession, mut outcome: PassOutcome) -> SessionView {
        let phase = session.phase();

        let (stage, leaderboard) = match phase {
            SessionPhase::NotStarted => (Stage::NotStarted, None),
            SessionPhase::InProgress { index } => {
                let (board, notice) = self.load_leaderboard(&session.player_name).await;
                outcome.notices.extend(notice);

                let remaining = quiz::remaining_secs(session, index, Utc::now(), self.rules);
                let stage = match presenter::question_view(session) {
                    Some(question) => Stage::InProgress {
                        question,
                        timer: presenter::timer_view(remaining, self.rules),
                    },
                    None => Stage::NotStarted,
                };
                (stage, Some(board_panel(&board, session)))
            }
            SessionPhase::Completed => {
                let (board, notice) = self.load_leaderboard(&session.player_name).await;
                outcome.notices.extend(notice);

                let summary = presenter::summary_view(session, board.player_rank);
                (
                    Stage::Completed { summary },
                    Some(board_panel(&board, session)),
                )
            }
        };

        SessionView {
            session_id: session.id,
            player_name: session.player_name.clone(),
            score: session.score,
            answered: session.current_index,
            total_questions: session.total_questions(),
            stage,
            feedback: outcome.transition.as_ref().map(presenter::feedback_view),
            leaderboard,
            notices: outcome.notices,
            refresh_interval_ms: self.refresh_interval_ms,
        }
    }
}

fn board_panel(board: &LeaderboardView, session: &QuizSession) -> LeaderboardPanel {
    presenter::leaderboard_panel(board, &session.colors)
}

/// Rejects actions aimed at a question the session has already left.
fn ensure_current(session: &QuizSession, expected: Option<usize>) -> Result<(), AppError> {
    match expected {
        Some(index) if index != session.current_index => Err(AppError::Conflict(format!(
            "question {} is no longer current",
            index
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::view::Outcome, services::score_store::MemoryStore};

    fn questions(n: usize) -> Arc<[Question]> {
        (0..n)
            .map(|i| Question {
                prompt: format!("Question {}", i),
                options: vec!["A".to_string(), "B".to_string()],
                answer: "A".to_string(),
            })
            .collect::<Vec<_>>()
            .into()
    }

    const IDLE_SECS: u64 = 60;

    fn service(n: usize, store: Arc<MemoryStore>) -> QuizService {
        QuizService::new(
            questions(n),
            store,
            TimerRules::default(),
            5000,
            Duration::from_secs(IDLE_SECS),
        )
    }

    fn submit_option(option: &str) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            option: Some(option.to_string()),
            question_index: None,
        }
    }

    #[tokio::test]
    async fn blank_name_is_rejected_without_creating_a_session() {
        let svc = service(2, Arc::new(MemoryStore::default()));
        let err = svc.create_session("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(svc.sessions().is_empty());
    }

    #[tokio::test]
    async fn every_advance_writes_a_cumulative_row() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(3, store.clone());
        let id = svc.create_session("Ada").await.unwrap().session_id;

        svc.submit(id, submit_option("A")).await.unwrap();
        svc.submit(id, submit_option("B")).await.unwrap();
        let view = svc.submit(id, SubmitAnswerRequest::default()).await.unwrap();

        assert!(matches!(view.stage, Stage::Completed { .. }));
        let rows = store.read_all().await.unwrap();
        let totals: Vec<_> = rows.iter().map(|r| (r.score, r.total)).collect();
        assert_eq!(totals, vec![(1, 1), (1, 2), (1, 3)]);
        assert_eq!(rows[2].percentage, 33.33);
    }

    #[tokio::test]
    async fn failed_write_still_advances_with_a_notice() {
        let store = Arc::new(MemoryStore::default());
        store.set_fail_writes(true);
        let svc = service(2, store.clone());
        let id = svc.create_session("Ada").await.unwrap().session_id;

        let view = svc.submit(id, submit_option("A")).await.unwrap();

        assert_eq!(view.answered, 1);
        assert_eq!(view.score, 1);
        assert_eq!(view.notices.len(), 1);
        assert_eq!(view.feedback.unwrap().outcome, Outcome::Correct);
    }

    #[tokio::test]
    async fn failed_read_renders_an_empty_leaderboard() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(2, store.clone());
        let id = svc.create_session("Ada").await.unwrap().session_id;
        svc.submit(id, submit_option("A")).await.unwrap();

        store.set_fail_reads(true);
        let view = svc.render(id).await.unwrap();

        let board = view.leaderboard.unwrap();
        assert!(board.rows.is_empty());
        assert_eq!(board.player_rank, None);
        assert!(!view.notices.is_empty());
    }

    #[tokio::test]
    async fn stale_question_index_is_a_conflict() {
        let svc = service(3, Arc::new(MemoryStore::default()));
        let id = svc.create_session("Ada").await.unwrap().session_id;
        svc.submit(id, SubmitAnswerRequest::default()).await.unwrap();

        let err = svc
            .select(
                id,
                SelectOptionRequest {
                    option: "A".to_string(),
                    question_index: Some(0),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn restart_keeps_store_rows_and_allows_a_new_run() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(1, store.clone());
        let id = svc.create_session("Ada").await.unwrap().session_id;
        svc.submit(id, submit_option("A")).await.unwrap();

        let view = svc.restart(id).await.unwrap();
        assert!(matches!(view.stage, Stage::NotStarted));
        assert_eq!(view.answered, 0);
        assert_eq!(view.score, 0);
        assert_eq!(view.total_questions, 0);
        assert_eq!(store.read_all().await.unwrap().len(), 1);

        let view = svc.start_session(id, "Ada").await.unwrap();
        assert!(matches!(view.stage, Stage::InProgress { .. }));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let svc = service(1, Arc::new(MemoryStore::default()));
        assert!(matches!(
            svc.render(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let svc = service(2, Arc::new(MemoryStore::default()));
        let idle = svc.create_session("Ada").await.unwrap().session_id;

        let later = Instant::now() + Duration::from_secs(IDLE_SECS + 1);
        assert_eq!(svc.sessions().evict_idle(later), 1);
        assert!(svc.sessions().is_empty());
        assert!(matches!(svc.render(idle).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn recently_used_sessions_survive_a_sweep() {
        let svc = service(2, Arc::new(MemoryStore::default()));
        let id = svc.create_session("Ada").await.unwrap().session_id;
        svc.render(id).await.unwrap();

        assert_eq!(svc.sessions().evict_idle(Instant::now()), 0);
        assert_eq!(svc.sessions().len(), 1);
    }

    #[tokio::test]
    async fn creating_sessions_does_not_grow_past_live_ones() {
        let svc = QuizService::new(
            questions(1),
            Arc::new(MemoryStore::default()),
            TimerRules::default(),
            5000,
            Duration::ZERO,
        );
        for _ in 0..200 {
            svc.create_session("Ada").await.unwrap();
            // Every earlier session is already past a zero TTL.
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(svc.sessions().len(), 1);
    }

    #[tokio::test]
    async fn standalone_leaderboard_ranks_the_player() {
        let store = Arc::new(MemoryStore::with_records(vec![
            crate::models::attempt::AttemptRecord::new("A", 4, 5),
            crate::models::attempt::AttemptRecord::new("B", 5, 5),
        ]));
        let svc = service(1, store);
        let response = svc.leaderboard(Some("A")).await;
        assert_eq!(response.panel.rows[0].name, "B");
        assert_eq!(response.panel.player_rank, Some(2));
        assert!(response.notices.is_empty());
    }
}
