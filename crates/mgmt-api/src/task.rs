//! Task model and status queries

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::client::MgmtClient;
use crate::error::{MgmtError, Result};

const SHOW_TASK: &str = "show-task";

/// Status of a server-side task
///
/// The status space is open; only `in progress` and `succeeded` carry
/// meaning for polling. Everything else is terminal without success.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    InProgress,
    Succeeded,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "in progress",
            Self::Succeeded => "succeeded",
            Self::Other(s) => s,
        }
    }

    /// Check if the task has stopped running
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "in progress" => Self::InProgress,
            "succeeded" => Self::Succeeded,
            _ => Self::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-target detail of a task
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTargetDetail {
    #[serde(default)]
    pub gateway_name: String,
    #[serde(default)]
    pub status_code: String,
    #[serde(default)]
    pub status_description: String,
    /// Base64-encoded script output
    #[serde(default, alias = "response-message")]
    pub response_message: String,
    #[serde(default, alias = "response-error")]
    pub response_error: String,
}

/// A task as reported by `show-task`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaskDetail {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress_percentage: u32,
    #[serde(default)]
    pub task_details: Vec<TaskTargetDetail>,
}

impl TaskDetail {
    /// Decoded output of the first target's script run
    ///
    /// Empty or undecodable payloads yield `None`.
    pub fn response_message(&self) -> Option<String> {
        let encoded = self.task_details.first()?.response_message.trim();
        if encoded.is_empty() {
            return None;
        }
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Response of `show-task`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowTasksResponse {
    #[serde(default)]
    pub tasks: Vec<TaskDetail>,
}

impl ShowTasksResponse {
    pub fn tasks_by_status(&self) -> BTreeMap<String, usize> {
        tasks_by_status(&self.tasks)
    }

    /// Ids of tasks still in progress
    pub fn unfinished_ids(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .map(|t| t.task_id.clone())
            .collect()
    }
}

/// Count tasks per status string
pub fn tasks_by_status(tasks: &[TaskDetail]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for task in tasks {
        *counts.entry(task.status.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

#[derive(Serialize)]
struct ShowTaskRequest<'a> {
    #[serde(rename = "task-id")]
    task_ids: &'a [String],
    #[serde(rename = "details-level")]
    details_level: &'static str,
}

impl MgmtClient {
    /// Query the current state of the given tasks
    pub async fn show_tasks(&self, task_ids: &[String]) -> Result<ShowTasksResponse> {
        let request = ShowTaskRequest {
            task_ids,
            details_level: "full",
        };
        let body = self.call_authenticated(SHOW_TASK, &request, None).await?;
        serde_json::from_str(&body).map_err(|e| MgmtError::decode(SHOW_TASK, e))
    }
}
