//! Gateway and feed name lookups

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::MgmtClient;
use crate::error::{MgmtError, Result};

const SHOW_SIMPLE_GATEWAYS: &str = "show-simple-gateways";
const SHOW_NETWORK_FEEDS: &str = "show-network-feeds";

/// Page size requested from listing methods
pub const PAGE_LIMIT: u32 = 500;

#[derive(Serialize)]
struct ListRequest {
    limit: u32,
    #[serde(rename = "details-level")]
    details_level: &'static str,
}

/// A named object as returned by the listing methods
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedObject {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
}

/// One page of a listing method's result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectsPage {
    #[serde(default)]
    pub objects: Vec<NamedObject>,
    #[serde(default)]
    pub from: u32,
    #[serde(default)]
    pub to: u32,
    #[serde(default)]
    pub total: u32,
}

impl ObjectsPage {
    /// Project the page to object names
    pub fn names(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.name.clone()).collect()
    }
}

impl MgmtClient {
    /// Names of all managed gateways
    pub async fn list_gateway_names(&self) -> Result<Vec<String>> {
        self.list_object_names(SHOW_SIMPLE_GATEWAYS).await
    }

    /// Names of all network feed objects
    pub async fn list_feed_names(&self) -> Result<Vec<String>> {
        self.list_object_names(SHOW_NETWORK_FEEDS).await
    }

    async fn list_object_names(&self, method: &str) -> Result<Vec<String>> {
        let request = ListRequest {
            limit: PAGE_LIMIT,
            details_level: "standard",
        };
        let body = self.call_authenticated(method, &request, None).await?;
        let page: ObjectsPage =
            serde_json::from_str(&body).map_err(|e| MgmtError::decode(method, e))?;

        if page.total as usize > page.objects.len() {
            debug!(
                "'{}' returned {} of {} objects",
                method,
                page.objects.len(),
                page.total
            );
        }

        Ok(page.names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_for, mock_login};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_gateway_names() {
        let server = MockServer::start_async().await;
        mock_login(&server, "sid-1", 3600).await;
        let gateways = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/web_api/show-simple-gateways")
                    .header("x-chkp-sid", "sid-1")
                    .json_body(json!({"limit": 500, "details-level": "standard"}));
                then.status(200).json_body(json!({
                    "objects": [
                        {"uid": "1", "name": "gw1", "type": "simple-gateway"},
                        {"uid": "2", "name": "gw2", "type": "simple-gateway"}
                    ],
                    "from": 1, "to": 2, "total": 2
                }));
            })
            .await;

        let client = client_for(&server);
        let names = client.list_gateway_names().await.unwrap();

        assert_eq!(names, vec!["gw1".to_string(), "gw2".to_string()]);
        gateways.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_list_feed_names_empty_is_valid() {
        let server = MockServer::start_async().await;
        mock_login(&server, "sid-1", 3600).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/web_api/show-network-feeds");
                then.status(200).json_body(json!({"objects": [], "total": 0}));
            })
            .await;

        let client = client_for(&server);
        assert!(client.list_feed_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_feed_names_decode_error() {
        let server = MockServer::start_async().await;
        mock_login(&server, "sid-1", 3600).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/web_api/show-network-feeds");
                then.status(200).body("not json");
            })
            .await;

        let client = client_for(&server);
        let err = client.list_feed_names().await.unwrap_err();
        assert!(matches!(err, MgmtError::Decode { ref method, .. } if method == "show-network-feeds"));
    }

    #[tokio::test]
    async fn test_listing_shares_one_login() {
        let server = MockServer::start_async().await;
        let login = mock_login(&server, "sid-1", 3600).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/web_api/show-simple-gateways");
                then.status(200).json_body(json!({"objects": [{"name": "gw1"}]}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/web_api/show-network-feeds");
                then.status(200).json_body(json!({"objects": [{"name": "feedA"}]}));
            })
            .await;

        let client = client_for(&server);
        assert_eq!(client.list_gateway_names().await.unwrap(), vec!["gw1"]);
        assert_eq!(client.list_feed_names().await.unwrap(), vec!["feedA"]);
        login.assert_hits_async(1).await;
    }
}
