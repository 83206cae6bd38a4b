//! Management API client
//!
//! This crate talks to the security gateway management API:
//! - Session handling (login, logout, token expiry)
//! - Gateway and feed lookups
//! - Remote script runs and task polling
//! - Feed refresh ("kick") scripts

mod client;
mod directory;
mod error;
mod feed;
mod poller;
mod script;
mod session;
mod task;

#[cfg(test)]
mod testing;

pub use client::{web_api_url, MgmtClient, MgmtConfig, SID_HEADER};
pub use directory::{NamedObject, ObjectsPage, PAGE_LIMIT};
pub use error::{MgmtError, Result};
pub use feed::{
    kick_script, kick_script_name, FeedKicker, CATALOG_REPORT_NAME, CATALOG_REPORT_SCRIPT, KICK_LOG,
};
pub use poller::{poll_until_done, PollOptions, PollOutcome, TaskSource};
pub use script::{RunScriptResponse, ScriptTask};
pub use session::{LoginResponse, Session, EXPIRY_MARGIN_SECS, SESSION_NAME, SESSION_TIMEOUT_SECS};
pub use task::{tasks_by_status, ShowTasksResponse, TaskDetail, TaskStatus, TaskTargetDetail};
