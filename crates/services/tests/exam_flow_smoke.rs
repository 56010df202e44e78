use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use exam_core::gate::GateFailure;
use exam_core::model::{
    Level, PartConstraint, PartContent, PartSpec, ScorerFeedback, ScorerOutput, SessionId,
    SessionPhase, Skill,
};
use exam_core::time::fixed_clock;
use services::{
    ClockDriver, ExamFlowService, ManualClock, NextPart, ScorerError, Scorer, StaticPartProvider,
    SubmitError, TickClock, TickOutcome,
};
use storage::repository::{DraftRecord, DraftRepository, InMemoryDraftStore, StorageError};

//
// ─── TEST DOUBLES ──────────────────────────────────────────────────────────────
//

struct OkScorer;

#[async_trait]
impl Scorer for OkScorer {
    async fn score(
        &self,
        _artifacts: &[PartContent],
        _skill: Skill,
        _level: Level,
    ) -> Result<ScorerOutput, ScorerError> {
        let mut scores = BTreeMap::new();
        scores.insert("overall".to_owned(), 7.5);
        Ok(ScorerOutput {
            scores,
            feedback: ScorerFeedback {
                strengths: vec!["good range".into()],
                improvements: vec!["check articles".into()],
            },
            transcript: None,
        })
    }
}

struct FailingScorer;

#[async_trait]
impl Scorer for FailingScorer {
    async fn score(
        &self,
        _artifacts: &[PartContent],
        _skill: Skill,
        _level: Level,
    ) -> Result<ScorerOutput, ScorerError> {
        Err(ScorerError::Disabled)
    }
}

/// Records every save so tests can assert on autosave behavior.
#[derive(Clone, Default)]
struct RecordingDraftStore {
    inner: InMemoryDraftStore,
    saves: Arc<Mutex<Vec<DraftRecord>>>,
}

impl RecordingDraftStore {
    fn saves(&self) -> Vec<DraftRecord> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl DraftRepository for RecordingDraftStore {
    async fn save(&self, record: &DraftRecord) -> Result<(), StorageError> {
        self.saves.lock().unwrap().push(record.clone());
        self.inner.save(record).await
    }

    async fn load(
        &self,
        session_id: &SessionId,
        part_index: u32,
    ) -> Result<Option<DraftRecord>, StorageError> {
        self.inner.load(session_id, part_index).await
    }

    async fn clear(&self, session_id: &SessionId) -> Result<(), StorageError> {
        self.inner.clear(session_id).await
    }
}

/// Fails the first `fail_count` saves, then delegates.
#[derive(Clone)]
struct FlakyDraftStore {
    inner: InMemoryDraftStore,
    failures_left: Arc<AtomicUsize>,
}

impl FlakyDraftStore {
    fn failing(fail_count: usize) -> Self {
        Self {
            inner: InMemoryDraftStore::new(),
            failures_left: Arc::new(AtomicUsize::new(fail_count)),
        }
    }
}

#[async_trait]
impl DraftRepository for FlakyDraftStore {
    async fn save(&self, record: &DraftRecord) -> Result<(), StorageError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StorageError::Connection("disk briefly away".into()));
        }
        self.inner.save(record).await
    }

    async fn load(
        &self,
        session_id: &SessionId,
        part_index: u32,
    ) -> Result<Option<DraftRecord>, StorageError> {
        self.inner.load(session_id, part_index).await
    }

    async fn clear(&self, session_id: &SessionId) -> Result<(), StorageError> {
        self.inner.clear(session_id).await
    }
}

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

fn writing_parts(min_words: &[u32]) -> Vec<PartSpec> {
    min_words
        .iter()
        .enumerate()
        .map(|(i, min)| {
            PartSpec::new(
                format!("task-{}", i + 1),
                format!("Writing task {}", i + 1),
                PartConstraint::Writing {
                    min_words: *min,
                    max_words: None,
                },
                1800,
            )
            .unwrap()
        })
        .collect()
}

fn speaking_parts(budgets: &[u32]) -> Vec<PartSpec> {
    budgets
        .iter()
        .enumerate()
        .map(|(i, budget)| {
            PartSpec::new(
                format!("part-{}", i + 1),
                format!("Speaking part {}", i + 1),
                PartConstraint::Speaking {
                    response_time_seconds: *budget / 2,
                },
                *budget,
            )
            .unwrap()
        })
        .collect()
}

fn words(n: u32) -> String {
    vec!["word"; n as usize].join(" ")
}

fn writing_provider(min_words: &[u32], level: Level) -> Arc<StaticPartProvider> {
    let mut provider = StaticPartProvider::new();
    provider.insert(Skill::Writing, level, writing_parts(min_words));
    Arc::new(provider)
}

//
// ─── SCENARIOS ─────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn writing_flow_submits_ordered_artifacts() {
    let provider = writing_provider(&[120, 250], Level::B2);
    let drafts = Arc::new(InMemoryDraftStore::new());
    let flow = ExamFlowService::new(provider, drafts.clone(), Arc::new(OkScorer))
        .with_clock(fixed_clock());

    let mut session = flow.start_session(Skill::Writing, Level::B2).await.unwrap();
    assert!(!session.auto_advance());

    session
        .on_content_changed(PartContent::text(words(130)))
        .unwrap();
    let transition = flow.stop_current_part(&mut session).await.unwrap().unwrap();
    assert_eq!(transition.next, NextPart::AwaitingStart(1));

    session.start_part(1).unwrap();
    session
        .on_content_changed(PartContent::text(words(260)))
        .unwrap();
    flow.stop_current_part(&mut session).await.unwrap();
    assert_eq!(session.phase(), SessionPhase::AllPartsComplete);

    let result = flow.submit(&mut session).await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Submitted);
    assert_eq!(result.per_part_artifacts().len(), 2);
    assert_eq!(
        result.per_part_artifacts()[0].as_text(),
        Some(words(130).as_str())
    );
    assert_eq!(
        result.per_part_artifacts()[1].as_text(),
        Some(words(260).as_str())
    );
    assert_eq!(result.scorer_output().scores["overall"], 7.5);

    // Drafts are cleared after a successful submission.
    assert!(drafts.load(session.id(), 0).await.unwrap().is_none());
    assert!(drafts.load(session.id(), 1).await.unwrap().is_none());
}

#[tokio::test]
async fn gate_failure_reports_the_short_part_and_stays_editable() {
    let provider = writing_provider(&[120, 250], Level::B2);
    let flow = ExamFlowService::new(
        provider,
        Arc::new(InMemoryDraftStore::new()),
        Arc::new(OkScorer),
    )
    .with_clock(fixed_clock());

    let mut session = flow.start_session(Skill::Writing, Level::B2).await.unwrap();
    session
        .on_content_changed(PartContent::text(words(130)))
        .unwrap();
    flow.stop_current_part(&mut session).await.unwrap();
    session.start_part(1).unwrap();
    session
        .on_content_changed(PartContent::text(words(249)))
        .unwrap();
    flow.stop_current_part(&mut session).await.unwrap();

    let err = flow.submit(&mut session).await.unwrap_err();
    match err {
        SubmitError::Gate { part_index, reason } => {
            assert_eq!(part_index, 1);
            assert_eq!(reason, GateFailure::InsufficientWords);
        }
        other => panic!("expected gate failure, got {other:?}"),
    }
    assert_eq!(session.phase(), SessionPhase::AllPartsComplete);

    // Still editable: redo, refill, and submit successfully.
    flow.redo_part(&mut session, 1).await.unwrap();
    session.start_part(1).unwrap();
    session
        .on_content_changed(PartContent::text(words(250)))
        .unwrap();
    flow.stop_current_part(&mut session).await.unwrap();
    flow.submit(&mut session).await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Submitted);
}

#[tokio::test]
async fn scorer_failure_reverts_without_losing_artifacts() {
    let provider = writing_provider(&[10], Level::B1);
    let drafts = Arc::new(InMemoryDraftStore::new());
    let failing_flow = ExamFlowService::new(provider.clone(), drafts.clone(), Arc::new(FailingScorer))
        .with_clock(fixed_clock());

    let mut session = failing_flow
        .start_session(Skill::Writing, Level::B1)
        .await
        .unwrap();
    session
        .on_content_changed(PartContent::text(words(12)))
        .unwrap();
    failing_flow.stop_current_part(&mut session).await.unwrap();

    let before = session.artifacts();
    let err = failing_flow.submit(&mut session).await.unwrap_err();
    assert!(matches!(err, SubmitError::Scorer(_)));
    assert_eq!(session.phase(), SessionPhase::AllPartsComplete);
    assert_eq!(session.artifacts(), before);

    // Retry against a healthy scorer without re-entering content.
    let healthy_flow = ExamFlowService::new(provider, drafts, Arc::new(OkScorer))
        .with_clock(fixed_clock());
    healthy_flow.submit(&mut session).await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Submitted);
}

#[tokio::test]
async fn speaking_full_test_auto_advances_through_all_parts() {
    let budgets = [180, 240, 300];
    let mut provider = StaticPartProvider::new();
    provider.insert(Skill::Speaking, Level::B1, speaking_parts(&budgets));
    let flow = ExamFlowService::new(
        Arc::new(provider),
        Arc::new(InMemoryDraftStore::new()),
        Arc::new(OkScorer),
    )
    .with_clock(fixed_clock());

    let mut session = flow.start_session(Skill::Speaking, Level::B1).await.unwrap();
    assert!(session.auto_advance());

    for (index, budget) in budgets.iter().enumerate() {
        session
            .on_content_changed(PartContent::recording(
                format!("blob:rec-{index}"),
                budget / 2,
            ))
            .unwrap();
        for tick in 1..=*budget {
            let outcome = flow.handle_tick(&mut session).await;
            if tick == *budget {
                assert!(matches!(outcome, TickOutcome::PartCompleted(_)));
            }
        }
    }

    assert_eq!(session.phase(), SessionPhase::AllPartsComplete);
    let result = flow.submit(&mut session).await.unwrap();
    assert_eq!(result.per_part_artifacts().len(), 3);
    assert_eq!(result.total_elapsed_seconds(), 720);
}

#[tokio::test]
async fn autosave_saves_identical_payloads_without_duplicating_parts() {
    let provider = writing_provider(&[10], Level::A2);
    let store = RecordingDraftStore::default();
    let flow = ExamFlowService::new(provider, Arc::new(store.clone()), Arc::new(OkScorer))
        .with_clock(fixed_clock());

    let mut session = flow.start_session(Skill::Writing, Level::A2).await.unwrap();
    session
        .on_content_changed(PartContent::text("the same draft"))
        .unwrap();

    for _ in 0..20 {
        flow.handle_tick(&mut session).await;
    }

    let saves = store.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[0], saves[1]);
    assert_eq!(saves[0].part_index, 0);
    assert_eq!(saves[0].content.as_text(), Some("the same draft"));
}

#[tokio::test]
async fn failed_transition_save_is_retried_on_the_next_autosave() {
    let provider = writing_provider(&[5, 5], Level::B1);
    let store = FlakyDraftStore::failing(1);
    let flow = ExamFlowService::new(provider, Arc::new(store.clone()), Arc::new(OkScorer))
        .with_clock(fixed_clock());

    let mut session = flow.start_session(Skill::Writing, Level::B1).await.unwrap();
    session
        .on_content_changed(PartContent::text(words(6)))
        .unwrap();

    // The transition save fails; the flow keeps going.
    flow.stop_current_part(&mut session).await.unwrap();
    assert!(store.inner.load(session.id(), 0).await.unwrap().is_none());

    session.start_part(1).unwrap();
    for _ in 0..10 {
        flow.handle_tick(&mut session).await;
    }

    // The autosave tick retried the completed part and saved the active one.
    let recovered = store.inner.load(session.id(), 0).await.unwrap().unwrap();
    assert_eq!(recovered.content.as_text(), Some(words(6).as_str()));
    assert!(store.inner.load(session.id(), 1).await.unwrap().is_some());
}

#[tokio::test]
async fn manual_clock_drives_a_session_through_every_expiry() {
    let budgets = [2, 3];
    let mut provider = StaticPartProvider::new();
    provider.insert(Skill::Speaking, Level::B1, speaking_parts(&budgets));
    let drafts = Arc::new(InMemoryDraftStore::new());
    let flow = ExamFlowService::new(Arc::new(provider), drafts.clone(), Arc::new(OkScorer))
        .with_clock(fixed_clock());

    let mut session = flow.start_session(Skill::Speaking, Level::B1).await.unwrap();
    session
        .on_content_changed(PartContent::recording("blob:rec-0", 1))
        .unwrap();

    let clock = ManualClock::new();
    let driver = ClockDriver::start(&clock);
    clock.advance(5);
    driver.run(&flow, &mut session).await;

    assert_eq!(session.phase(), SessionPhase::AllPartsComplete);
    assert_eq!(session.part_state(0).unwrap().elapsed_seconds(), 2);
    assert_eq!(session.part_state(1).unwrap().elapsed_seconds(), 3);

    // The expiry transitions persisted both parts before the run ended.
    assert!(drafts.load(session.id(), 0).await.unwrap().is_some());
    assert!(drafts.load(session.id(), 1).await.unwrap().is_some());

    // The run stopped the clock; a restart hands out a live subscription.
    let mut fresh = clock.start();
    clock.advance(1);
    assert!(fresh.try_recv().is_ok());
}

#[tokio::test]
async fn session_resumes_from_persisted_drafts() {
    let provider = writing_provider(&[120, 250], Level::B2);
    let drafts = Arc::new(InMemoryDraftStore::new());
    let flow = ExamFlowService::new(provider, drafts, Arc::new(OkScorer))
        .with_clock(fixed_clock());

    let first = {
        let mut session = flow.start_session(Skill::Writing, Level::B2).await.unwrap();
        session
            .on_content_changed(PartContent::text(words(130)))
            .unwrap();
        flow.stop_current_part(&mut session).await.unwrap();
        session.start_part(1).unwrap();
        session
            .on_content_changed(PartContent::text("an unfinished second task"))
            .unwrap();
        for _ in 0..10 {
            flow.handle_tick(&mut session).await;
        }
        session.id().clone()
    };

    let resumed = flow.resume_session(first).await.unwrap();
    assert_eq!(resumed.phase(), SessionPhase::InProgress);
    assert!(resumed.part_state(0).unwrap().completed());
    assert_eq!(
        resumed.part_state(0).unwrap().content().as_text(),
        Some(words(130).as_str())
    );
    assert_eq!(resumed.active_part(), Some(1));
    assert_eq!(
        resumed.part_state(1).unwrap().content().as_text(),
        Some("an unfinished second task")
    );
}
