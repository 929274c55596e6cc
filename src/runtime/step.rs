//! Durable-step facility
//!
//! Executors perform side effects only through [`StepFacility::run`]. A step's
//! successful result is recorded under its step id; when the run is invoked
//! again (a retry after a transient failure, or a resume) the recorded value
//! is returned and the work is not repeated. Failed steps are not recorded.
//!
//! [`StepJournal`] keeps the records for the lifetime of one run and
//! [`JournaledSteps`] is the view handed to a single invocation of it.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

/// Unit of work wrapped by a step
pub type StepWork<'a> = Pin<Box<dyn Future<Output = EngineResult<Value>> + Send + 'a>>;

/// Memoized step primitives consumed by executors and the orchestrator
#[async_trait]
pub trait StepFacility: Send + Sync {
    /// Run `work` once per step id; on replay return its recorded result.
    async fn run<'a>(&'a self, name: &'a str, work: StepWork<'a>) -> EngineResult<Value>;

    /// Suspend for `duration`; a replayed sleep returns immediately.
    async fn sleep(&self, name: &str, duration: Duration) -> EngineResult<()>;
}

/// Typed wrapper over [`StepFacility::run`]
///
/// The value crosses the step boundary as JSON, exactly as it is recorded, so
/// a first run and a replay hand back the same thing.
pub async fn run_step<'a, T, F>(step: &'a dyn StepFacility, name: &'a str, work: F) -> EngineResult<T>
where
    T: Serialize + DeserializeOwned + Send,
    F: Future<Output = EngineResult<T>> + Send + 'a,
{
    let recorded = step
        .run(
            name,
            Box::pin(async move {
                let value = work.await?;
                serde_json::to_value(value).map_err(|e| EngineError::StepReplay {
                    step_id: name.to_string(),
                    reason: e.to_string(),
                })
            }),
        )
        .await?;

    serde_json::from_value(recorded).map_err(|e| EngineError::StepReplay {
        step_id: name.to_string(),
        reason: e.to_string(),
    })
}

/// Recorded step results for one run, shared by all of its invocations
#[derive(Debug, Default)]
pub struct StepJournal {
    records: Mutex<HashMap<String, Value>>,
}

impl StepJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, step_id: &str) -> Option<Value> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(step_id)
            .cloned()
    }

    fn record(&self, step_id: String, value: Value) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(step_id, value);
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a step id has a recorded result
    pub fn contains(&self, step_id: &str) -> bool {
        self.get(step_id).is_some()
    }
}

/// Step facility for one invocation of a run
///
/// Step ids are derived from names: the first `run("http-request", ..)` of an
/// invocation uses `http-request`, the next one `http-request:1`, and so on.
/// Since a run executes its steps in a deterministic order, every invocation
/// derives the same ids and lines up with the journal.
#[derive(Debug)]
pub struct JournaledSteps {
    journal: Arc<StepJournal>,
    occurrences: Mutex<HashMap<String, usize>>,
    executed: AtomicUsize,
    replayed: AtomicUsize,
}

impl JournaledSteps {
    pub fn new(journal: Arc<StepJournal>) -> Self {
        Self {
            journal,
            occurrences: Mutex::new(HashMap::new()),
            executed: AtomicUsize::new(0),
            replayed: AtomicUsize::new(0),
        }
    }

    /// Steps whose work actually ran during this invocation
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    /// Steps answered from the journal during this invocation
    pub fn replayed(&self) -> usize {
        self.replayed.load(Ordering::SeqCst)
    }

    fn next_step_id(&self, name: &str) -> String {
        let mut occurrences = self
            .occurrences
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let seen = occurrences.entry(name.to_string()).or_insert(0);
        let step_id = match *seen {
            0 => name.to_string(),
            n => format!("{name}:{n}"),
        };
        *seen += 1;
        step_id
    }
}

#[async_trait]
impl StepFacility for JournaledSteps {
    async fn run<'a>(&'a self, name: &'a str, work: StepWork<'a>) -> EngineResult<Value> {
        let step_id = self.next_step_id(name);

        if let Some(recorded) = self.journal.get(&step_id) {
            tracing::debug!("⏪ Replaying recorded step '{}'", step_id);
            self.replayed.fetch_add(1, Ordering::SeqCst);
            return Ok(recorded);
        }

        tracing::debug!("▶️ Running step '{}'", step_id);
        self.executed.fetch_add(1, Ordering::SeqCst);
        let value = work.await?;
        self.journal.record(step_id, value.clone());
        Ok(value)
    }

    async fn sleep(&self, name: &str, duration: Duration) -> EngineResult<()> {
        let step_id = self.next_step_id(name);

        if self.journal.contains(&step_id) {
            self.replayed.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }

        tracing::debug!("💤 Sleeping {:?} in step '{}'", duration, step_id);
        self.executed.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(duration).await;
        self.journal.record(step_id, Value::Null);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn recorded_step_is_not_repeated_on_replay() {
        let journal = Arc::new(StepJournal::new());
        let side_effects = Arc::new(AtomicUsize::new(0));

        for attempt in 0..2 {
            let steps = JournaledSteps::new(Arc::clone(&journal));
            let counter = Arc::clone(&side_effects);
            let value: u32 = run_step(&steps, "charge-card", async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            })
            .await
            .unwrap();

            assert_eq!(value, 42);
            assert_eq!(steps.executed(), if attempt == 0 { 1 } else { 0 });
            assert_eq!(steps.replayed(), if attempt == 0 { 0 } else { 1 });
        }

        assert_eq!(side_effects.load(Ordering::SeqCst), 1);
        assert_eq!(journal.len(), 1);
    }

    #[tokio::test]
    async fn repeated_names_get_distinct_ids() {
        let journal = Arc::new(StepJournal::new());
        let steps = JournaledSteps::new(Arc::clone(&journal));

        for i in 0..3 {
            let value = steps
                .run("http-request", Box::pin(async move { Ok::<_, EngineError>(json!(i)) }))
                .await
                .unwrap();
            assert_eq!(value, json!(i));
        }

        assert!(journal.contains("http-request"));
        assert!(journal.contains("http-request:1"));
        assert!(journal.contains("http-request:2"));

        // A second invocation derives the same ids and gets the same values back.
        let replay = JournaledSteps::new(Arc::clone(&journal));
        for i in 0..3 {
            let value = replay
                .run("http-request", Box::pin(async { Ok::<_, EngineError>(json!("fresh")) }))
                .await
                .unwrap();
            assert_eq!(value, json!(i));
        }
        assert_eq!(replay.executed(), 0);
    }

    #[tokio::test]
    async fn failed_steps_are_not_recorded() {
        let journal = Arc::new(StepJournal::new());
        let steps = JournaledSteps::new(Arc::clone(&journal));

        let err = steps
            .run(
                "flaky",
                Box::pin(async { Err::<Value, _>(EngineError::Storage("connection reset".into())) }),
            )
            .await
            .unwrap_err();
        assert!(err.is_retriable());
        assert!(journal.is_empty());

        let retry = JournaledSteps::new(Arc::clone(&journal));
        let value = retry
            .run("flaky", Box::pin(async { Ok::<_, EngineError>(json!("ok")) }))
            .await
            .unwrap();
        assert_eq!(value, json!("ok"));
        assert_eq!(retry.executed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_skipped_on_replay() {
        let journal = Arc::new(StepJournal::new());

        let first = JournaledSteps::new(Arc::clone(&journal));
        first.sleep("cool-down", Duration::from_secs(60)).await.unwrap();
        assert_eq!(first.executed(), 1);

        let second = JournaledSteps::new(Arc::clone(&journal));
        let started = tokio::time::Instant::now();
        second.sleep("cool-down", Duration::from_secs(60)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(second.replayed(), 1);
    }

    #[tokio::test]
    async fn replay_with_wrong_shape_is_reported() {
        let journal = Arc::new(StepJournal::new());
        let steps = JournaledSteps::new(Arc::clone(&journal));
        steps
            .run("prepare", Box::pin(async { Ok::<_, EngineError>(json!("not a number")) }))
            .await
            .unwrap();

        let replay = JournaledSteps::new(Arc::clone(&journal));
        let result: EngineResult<u64> = run_step(&replay, "prepare", async { Ok(1) }).await;
        assert!(matches!(result, Err(EngineError::StepReplay { .. })));
    }
}
