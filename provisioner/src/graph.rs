use crate::config::{Endpoints, Settings};
use crate::errors::{ProvisionError, Stage};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Cell block written into the new workbook, one label/value row per field.
pub const UPDATE_RANGE: &str = "A1:B3";

/// Bearer token from the client-credentials exchange. Lives for one request.
pub struct AccessToken(String);

impl AccessToken {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Serialize)]
struct ParentReference<'a> {
    #[serde(rename = "driveId")]
    drive_id: &'a str,
}

#[derive(Serialize)]
struct CopyRequest<'a> {
    name: &'a str,
    #[serde(rename = "parentReference")]
    parent_reference: ParentReference<'a>,
}

#[derive(Deserialize)]
struct DriveItem {
    id: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<DriveItem>,
}

#[derive(Serialize)]
struct RangeUpdate<'a> {
    values: &'a [[&'a str; 2]],
}

/// Client for the identity provider and the drive/workbook endpoints of the
/// Graph API. Every method issues exactly one request.
#[derive(Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    endpoints: Endpoints,
    settings: Arc<Settings>,
}

impl GraphClient {
    pub fn new(endpoints: Endpoints, settings: Arc<Settings>) -> Self {
        GraphClient {
            client: reqwest::Client::new(),
            endpoints,
            settings,
        }
    }

    pub async fn acquire_token(&self) -> Result<AccessToken, ProvisionError> {
        let url = endpoint(
            &self.endpoints.login_url,
            &[self.settings.tenant_id.as_str(), "oauth2", "v2.0", "token"],
        )?;

        let form = [
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.expose()),
            ("scope", self.endpoints.scope.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProvisionError::Auth(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| ProvisionError::Auth(e.to_string()))?;

        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(TokenResponse {
                access_token: Some(token),
            }) if !token.is_empty() => Ok(AccessToken(token)),
            _ => Err(ProvisionError::Auth(body)),
        }
    }

    /// Starts copying the template workbook under `name`. The copy completes
    /// asynchronously on the remote side.
    pub async fn copy_template(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> Result<(), ProvisionError> {
        let url = self.drive_url(&["items", self.settings.source_file_id.as_str(), "copy"])?;

        let request = CopyRequest {
            name,
            parent_reference: ParentReference {
                drive_id: &self.settings.drive_id,
            },
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(token.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|source| ProvisionError::Transport {
                stage: Stage::Copying,
                source,
            })?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(ProvisionError::Copy {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// Searches the drive for `name` and returns the id of the first match.
    /// `Ok(None)` means the item is not visible yet.
    pub async fn find_by_name(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> Result<Option<String>, ProvisionError> {
        let query = format!("search(q='{}')", name.replace('\'', "''"));
        let url = self.drive_url(&["root", query.as_str()])?;

        let transport = |source| ProvisionError::Transport {
            stage: Stage::PollingForCopy,
            source,
        };

        let response = self
            .client
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        let search = response.json::<SearchResponse>().await.map_err(transport)?;

        Ok(search
            .value
            .into_iter()
            .next()
            .and_then(|item| item.id)
            .filter(|id| !id.is_empty()))
    }

    pub async fn update_range(
        &self,
        token: &AccessToken,
        file_id: &str,
        values: &[[&str; 2]],
    ) -> Result<(), ProvisionError> {
        let range = format!("range(address='{UPDATE_RANGE}')");
        let url = self.drive_url(&[
            "items",
            file_id,
            "workbook",
            "worksheets",
            self.settings.worksheet_name.as_str(),
            range.as_str(),
        ])?;

        let response = self
            .client
            .patch(url)
            .bearer_auth(token.as_str())
            .json(&RangeUpdate { values })
            .send()
            .await
            .map_err(|source| ProvisionError::Transport {
                stage: Stage::Updating,
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ProvisionError::Update {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    fn drive_url(&self, tail: &[&str]) -> Result<Url, ProvisionError> {
        let mut segments = vec![
            "sites",
            self.settings.site_id.as_str(),
            "drives",
            self.settings.drive_id.as_str(),
        ];
        segments.extend_from_slice(tail);
        endpoint(&self.endpoints.graph_url, &segments)
    }
}

/// Appends `segments` to the path of `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ProvisionError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ProvisionError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
