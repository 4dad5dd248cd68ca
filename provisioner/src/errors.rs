use std::fmt;

/// Orchestration stage a request is in.
///
/// `Validating`, `Succeeded` and `Failed` are not represented here: validation
/// never reaches the remote API, and the terminal states are the `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticating,
    Copying,
    PollingForCopy,
    Updating,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::Authenticating => "authenticating",
            Stage::Copying => "copying",
            Stage::PollingForCopy => "polling_for_copy",
            Stage::Updating => "updating",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while provisioning a workbook
#[derive(thiserror::Error, Debug)]
pub enum ProvisionError {
    /// The token endpoint did not hand out an access token. Carries the raw
    /// provider response.
    #[error("Failed to get access token: {0}")]
    Auth(String),

    #[error("Failed to copy file. HTTP Code: {status}, Response: {body}")]
    Copy { status: u16, body: String },

    #[error("Could not find copied file after {attempts} attempts")]
    CopyTimeout { attempts: u32 },

    #[error("Failed to update Excel file. HTTP Code: {status}, Response: {body}")]
    Update { status: u16, body: String },

    #[error("request failed while {stage}: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ProvisionError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ProvisionError::Auth(_) => Some(Stage::Authenticating),
            ProvisionError::Copy { .. } => Some(Stage::Copying),
            ProvisionError::CopyTimeout { .. } => Some(Stage::PollingForCopy),
            ProvisionError::Update { .. } => Some(Stage::Updating),
            ProvisionError::Transport { stage, .. } => Some(*stage),
            ProvisionError::InvalidUrl(_) => None,
        }
    }
}
