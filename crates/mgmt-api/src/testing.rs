//! Shared helpers for tests against a mocked management server

use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;

use crate::client::{MgmtClient, MgmtConfig};

pub(crate) fn client_for(server: &MockServer) -> MgmtClient {
    MgmtClient::new(MgmtConfig::with_base_url(server.url("/web_api/"), "test-key")).unwrap()
}

pub(crate) async fn mock_login<'a>(server: &'a MockServer, sid: &str, timeout: i64) -> Mock<'a> {
    let body = json!({"sid": sid, "session-timeout": timeout});
    server
        .mock_async(|when, then| {
            when.method(POST).path("/web_api/login");
            then.status(200).json_body(body);
        })
        .await
}
