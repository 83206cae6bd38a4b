//! Polling asynchronous tasks until they settle

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::MgmtClient;
use crate::error::Result;
use crate::task::{ShowTasksResponse, TaskDetail, TaskStatus};

/// Anything that can report task status
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn show_tasks(&self, task_ids: &[String]) -> Result<ShowTasksResponse>;
}

#[async_trait]
impl TaskSource for MgmtClient {
    async fn show_tasks(&self, task_ids: &[String]) -> Result<ShowTasksResponse> {
        MgmtClient::show_tasks(self, task_ids).await
    }
}

/// Fixed-interval polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Wait before every status query
    pub interval: Duration,
    /// Give up once this much time has passed since polling started
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Result of a polling round
#[derive(Debug, Clone, Default)]
pub struct PollOutcome {
    /// Tasks that reported `succeeded`
    pub finished: Vec<TaskDetail>,
    /// Tasks that stopped with any status other than `succeeded`
    pub non_success: Vec<TaskDetail>,
    /// Tasks still `in progress` when polling stopped
    pub unfinished_ids: Vec<String>,
    pub timed_out: bool,
    pub cancelled: bool,
    /// Number of status queries made
    pub rounds: u32,
}

impl PollOutcome {
    /// Check if every task reached a terminal status
    pub fn is_settled(&self) -> bool {
        self.unfinished_ids.is_empty() && !self.timed_out && !self.cancelled
    }

    pub fn non_success_count(&self) -> usize {
        self.non_success.len()
    }

    /// Decoded output of finished tasks that produced any, as `(task id, text)`
    pub fn messages(&self) -> Vec<(String, String)> {
        self.finished
            .iter()
            .filter_map(|t| t.response_message().map(|m| (t.task_id.clone(), m)))
            .collect()
    }

    fn absorb(&mut self, tasks: Vec<TaskDetail>) {
        self.finished.clear();
        self.non_success.clear();
        self.unfinished_ids.clear();

        for task in tasks {
            match task.status {
                TaskStatus::Succeeded => self.finished.push(task),
                TaskStatus::InProgress => self.unfinished_ids.push(task.task_id),
                TaskStatus::Other(_) => self.non_success.push(task),
            }
        }
    }
}

/// Query `task_ids` every `options.interval` until none is in progress
///
/// Stops early on timeout or cancellation; both are reported in the
/// outcome rather than as errors. Query failures are returned.
pub async fn poll_until_done<S>(
    source: &S,
    task_ids: &[String],
    options: &PollOptions,
    cancel: &CancellationToken,
) -> Result<PollOutcome>
where
    S: TaskSource + ?Sized,
{
    let mut outcome = PollOutcome {
        unfinished_ids: task_ids.to_vec(),
        ..Default::default()
    };
    if task_ids.is_empty() {
        return Ok(outcome);
    }

    let started = Instant::now();
    loop {
        debug!("Waiting for tasks to finish: {:?}", outcome.unfinished_ids);

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Task polling cancelled after {} round(s)", outcome.rounds);
                outcome.cancelled = true;
                return Ok(outcome);
            }
            _ = tokio::time::sleep(options.interval) => {}
        }

        let response = source.show_tasks(task_ids).await?;
        outcome.rounds += 1;
        info!(round = outcome.rounds, "Tasks by status: {:?}", response.tasks_by_status());

        outcome.absorb(response.tasks);

        if outcome.unfinished_ids.is_empty() {
            info!("All tasks finished");
            break;
        }

        if started.elapsed() > options.timeout {
            warn!(
                "Timed out after {:?} waiting for tasks, abandoning {:?}",
                options.timeout, outcome.unfinished_ids
            );
            outcome.timed_out = true;
            break;
        }
    }

    if outcome.non_success_count() > 0 {
        warn!(
            "{} task(s) ended without success",
            outcome.non_success_count()
        );
    }

    Ok(outcome)
}

impl MgmtClient {
    /// Poll tasks created by this client until they settle
    pub async fn poll_until_done(
        &self,
        task_ids: &[String],
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        poll_until_done(self, task_ids, options, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MgmtError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted rounds; the last round repeats forever
    struct ScriptedSource {
        rounds: Mutex<VecDeque<Vec<(&'static str, &'static str, &'static str)>>>,
        last: Mutex<Vec<(&'static str, &'static str, &'static str)>>,
        calls: Mutex<u32>,
        fail: bool,
    }

    impl ScriptedSource {
        fn new(rounds: Vec<Vec<(&'static str, &'static str, &'static str)>>) -> Self {
            Self {
                rounds: Mutex::new(rounds.into()),
                last: Mutex::new(Vec::new()),
                calls: Mutex::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new())
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TaskSource for ScriptedSource {
        async fn show_tasks(&self, _task_ids: &[String]) -> Result<ShowTasksResponse> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(MgmtError::Api {
                    method: "show-task".to_string(),
                    status: 500,
                    body: "down".to_string(),
                });
            }

            let round = {
                let mut rounds = self.rounds.lock().unwrap();
                let mut last = self.last.lock().unwrap();
                if let Some(next) = rounds.pop_front() {
                    *last = next;
                }
                last.clone()
            };

            let tasks = round
                .into_iter()
                .map(|(id, status, message)| {
                    serde_json::from_value(serde_json::json!({
                        "task-id": id,
                        "status": status,
                        "task-details": [{"responseMessage": message}]
                    }))
                    .unwrap()
                })
                .collect();
            Ok(ShowTasksResponse { tasks })
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_all_succeed() {
        let source = ScriptedSource::new(vec![
            vec![("1", "in progress", ""), ("2", "succeeded", "b2s=")],
            vec![("1", "succeeded", "aGVsbG8gZ2F0ZXdheQo="), ("2", "succeeded", "b2s=")],
        ]);

        let outcome = poll_until_done(
            &source,
            &ids(&["1", "2"]),
            &PollOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(outcome.is_settled());
        assert_eq!(outcome.rounds, 2);
        assert_eq!(source.calls(), 2);
        assert_eq!(outcome.finished.len(), 2);
        assert_eq!(
            outcome.messages(),
            vec![
                ("1".to_string(), "hello gateway\n".to_string()),
                ("2".to_string(), "ok".to_string())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_within_timeout_plus_interval() {
        let source = ScriptedSource::new(vec![vec![("1", "in progress", "")]]);
        let options = PollOptions::default();

        let started = Instant::now();
        let outcome = poll_until_done(&source, &ids(&["1"]), &options, &CancellationToken::new())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(outcome.timed_out);
        assert!(!outcome.is_settled());
        assert_eq!(outcome.unfinished_ids, vec!["1"]);
        assert!(elapsed > options.timeout);
        assert!(elapsed <= options.timeout + options.interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_status_ends_polling_without_success() {
        let source = ScriptedSource::new(vec![vec![
            ("1", "failed", "ZXJy"),
            ("2", "succeeded", ""),
        ]]);

        let outcome = poll_until_done(
            &source,
            &ids(&["1", "2"]),
            &PollOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.rounds, 1);
        assert!(outcome.unfinished_ids.is_empty());
        assert_eq!(outcome.finished.len(), 1);
        assert_eq!(outcome.finished[0].task_id, "2");
        assert_eq!(outcome.non_success_count(), 1);
        assert_eq!(outcome.non_success[0].task_id, "1");
        // Neither task has a message to report: "2" is empty, "1" is not a success
        assert!(outcome.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tasks_means_no_queries() {
        let source = ScriptedSource::new(vec![]);
        let outcome = poll_until_done(&source, &[], &PollOptions::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(source.calls(), 0);
        assert_eq!(outcome.rounds, 0);
        assert!(outcome.is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_query() {
        let source = ScriptedSource::new(vec![vec![("1", "in progress", "")]]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = poll_until_done(&source, &ids(&["1"]), &PollOptions::default(), &cancel)
            .await
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(source.calls(), 0);
        assert_eq!(outcome.unfinished_ids, vec!["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_failure_is_propagated() {
        let source = ScriptedSource::failing();
        let err = poll_until_done(
            &source,
            &ids(&["1"]),
            &PollOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(source.calls(), 1);
    }
}
