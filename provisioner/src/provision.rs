use crate::config::Polling;
use crate::errors::ProvisionError;
use crate::graph::{AccessToken, GraphClient};
use crate::metrics_defs::{DURATION, FAILURES, POLL_ATTEMPTS};
use chrono::{DateTime, Utc};
use std::time::Instant;
use tokio::time::sleep;

pub const FILE_PREFIX: &str = "UserData_";

/// The three values written into the new workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserFields {
    fn rows(&self) -> [[&str; 2]; 3] {
        [
            ["FirstName", self.first_name.as_str()],
            ["LastName", self.last_name.as_str()],
            ["Email", self.email.as_str()],
        ]
    }
}

/// A workbook that was copied from the template and filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub name: String,
    pub id: String,
}

/// `UserData_<first>_<last>_<YYYYmmddHHMMSS>.xlsx`
pub fn new_file_name(first_name: &str, last_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{FILE_PREFIX}{first_name}_{last_name}_{}.xlsx",
        now.format("%Y%m%d%H%M%S")
    )
}

/// Drives token exchange, template copy, copy polling and range update for a
/// single request. Holds no per-request state, so one instance serves all
/// requests.
#[derive(Clone)]
pub struct Provisioner {
    graph: GraphClient,
    polling: Polling,
}

impl Provisioner {
    pub fn new(graph: GraphClient, polling: Polling) -> Self {
        Provisioner { graph, polling }
    }

    pub async fn provision(&self, fields: &UserFields) -> Result<NewFile, ProvisionError> {
        let started = Instant::now();
        let result = self.run_steps(fields).await;

        match &result {
            Ok(file) => {
                metrics::histogram!(DURATION.name).record(started.elapsed().as_secs_f64());
                tracing::info!(file_name = %file.name, file_id = %file.id, "Workbook provisioned");
            }
            Err(e) => {
                let stage = e.stage().map(|s| s.as_str()).unwrap_or("setup");
                metrics::counter!(FAILURES.name, "stage" => stage).increment(1);
                tracing::error!(stage, error = %e, "Provisioning failed");
            }
        }

        result
    }

    async fn run_steps(&self, fields: &UserFields) -> Result<NewFile, ProvisionError> {
        let token = self.graph.acquire_token().await?;

        let name = new_file_name(&fields.first_name, &fields.last_name, Utc::now());
        self.graph.copy_template(&token, &name).await?;
        tracing::debug!(file_name = %name, "Copy accepted");

        let id = self.wait_for_copy(&token, &name).await?;

        self.graph.update_range(&token, &id, &fields.rows()).await?;

        Ok(NewFile { name, id })
    }

    /// Searches for `name` until it shows up, sleeping before every attempt.
    /// A failed search counts as a miss.
    async fn wait_for_copy(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> Result<String, ProvisionError> {
        let max_attempts = self.polling.max_attempts;

        for attempt in 1..=max_attempts {
            sleep(self.polling.interval()).await;

            match self.graph.find_by_name(token, name).await {
                Ok(Some(id)) => {
                    metrics::histogram!(POLL_ATTEMPTS.name).record(attempt as f64);
                    return Ok(id);
                }
                Ok(None) => {
                    tracing::debug!(file_name = %name, attempt, "Copy not visible yet");
                }
                Err(e) => {
                    tracing::warn!(file_name = %name, attempt, error = %e, "Search failed");
                }
            }
        }

        metrics::histogram!(POLL_ATTEMPTS.name).record(max_attempts as f64);
        Err(ProvisionError::CopyTimeout {
            attempts: max_attempts,
        })
    }
}
