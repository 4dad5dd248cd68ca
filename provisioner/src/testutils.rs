use crate::config::{Endpoints, Secret, Settings};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";
pub const COPY_PATH: &str = "/v1.0/sites/site-1/drives/drive-1/items/template-1/copy";
pub const SEARCH_PATH_REGEX: &str = r"^/v1\.0/sites/site-1/drives/drive-1/root/search\(q='.*'\)$";
pub const UPDATE_PATH_REGEX: &str =
    r"^/v1\.0/sites/site-1/drives/drive-1/items/[^/]+/workbook/worksheets/Sheet1/range\(address='A1:B3'\)$";

pub fn test_settings() -> Settings {
    Settings {
        tenant_id: "tenant-1".into(),
        client_id: "client-1".into(),
        client_secret: Secret::new("client-secret"),
        api_secret: Secret::new("shared-secret"),
        site_id: "site-1".into(),
        drive_id: "drive-1".into(),
        source_file_id: "template-1".into(),
        worksheet_name: "Sheet1".into(),
    }
}

/// Points both the login and the Graph base URL at the mock server.
pub fn graph_endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        login_url: Url::parse(&server.uri()).unwrap(),
        graph_url: Url::parse(&format!("{}/v1.0", server.uri())).unwrap(),
        scope: "https://graph.microsoft.com/.default".into(),
    }
}

pub async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "token-abc"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_copy(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(COPY_PATH))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Search that finds the copy under `item_id`, or never finds it when `None`.
pub async fn mount_search(server: &MockServer, item_id: Option<&str>, expected_calls: u64) {
    let body = match item_id {
        Some(id) => json!({ "value": [{ "id": id }] }),
        None => json!({ "value": [] }),
    };

    Mock::given(method("GET"))
        .and(path_regex(SEARCH_PATH_REGEX))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_update(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("PATCH"))
        .and(path_regex(UPDATE_PATH_REGEX))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}
