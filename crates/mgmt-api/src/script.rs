//! One-time remote script execution

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::MgmtClient;
use crate::error::{MgmtError, Result};

const RUN_SCRIPT: &str = "run-script";

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct RunScriptRequest<'a> {
    script: &'a str,
    targets: &'a [String],
    script_name: &'a str,
    script_type: &'static str,
}

/// A task created for one script target
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptTask {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub task_id: String,
}

/// Tasks created by a `run-script` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RunScriptResponse {
    #[serde(default)]
    pub tasks: Vec<ScriptTask>,
}

impl RunScriptResponse {
    /// Ids of all created tasks, in response order
    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.task_id.clone()).collect()
    }
}

impl MgmtClient {
    /// Run a one-time script on the given targets
    ///
    /// An empty target list is sent as-is; what it does is up to the server.
    pub async fn run_script(
        &self,
        script: &str,
        script_name: &str,
        targets: &[String],
    ) -> Result<RunScriptResponse> {
        let request = RunScriptRequest {
            script,
            targets,
            script_name,
            script_type: "one time",
        };

        let body = self.call_authenticated(RUN_SCRIPT, &request, None).await?;
        let response: RunScriptResponse =
            serde_json::from_str(&body).map_err(|e| MgmtError::decode(RUN_SCRIPT, e))?;

        info!(
            "Script '{}' submitted to {} target(s), {} task(s) created",
            script_name,
            targets.len(),
            response.tasks.len()
        );

        Ok(response)
    }
}
