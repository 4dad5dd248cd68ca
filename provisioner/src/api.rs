use crate::config::Secret;
use crate::errors::ProvisionError;
use crate::metrics_defs::REQUESTS;
use crate::provision::{NewFile, Provisioner, UserFields};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use subtle::ConstantTimeEq;

const REQUIRED_FIELDS: [&str; 3] = ["FirstName", "LastName", "Email"];

#[derive(Clone)]
pub struct AppState {
    provisioner: Arc<Provisioner>,
    api_secret: Secret,
}

impl AppState {
    pub fn new(provisioner: Provisioner, api_secret: Secret) -> Self {
        AppState {
            provisioner: Arc::new(provisioner),
            api_secret,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handler))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    success: bool,
    message: &'static str,
    file_name: String,
    file_id: String,
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl From<NewFile> for ApiResponse {
    fn from(file: NewFile) -> Self {
        ApiResponse {
            success: true,
            message: "Excel file created and updated successfully",
            file_name: file.name,
            file_id: file.id,
        }
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Invalid secret token")]
    InvalidSecret,
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Server error: {0}")]
    Provision(#[from] ProvisionError),
}

impl ApiError {
    fn outcome(&self) -> &'static str {
        match self {
            ApiError::MethodNotAllowed => "method_not_allowed",
            ApiError::InvalidSecret => "invalid_secret",
            ApiError::MissingFields(_) => "missing_fields",
            ApiError::Provision(_) => "server_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::InvalidSecret => StatusCode::UNAUTHORIZED,
            ApiError::MissingFields(_) => StatusCode::BAD_REQUEST,
            ApiError::Provision(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ApiErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

async fn health() -> &'static str {
    "ok\n"
}

async fn handler(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let result = handle(&state, &method, &body).await;

    let outcome = match &result {
        Ok(_) => "success",
        // Orchestration failures are logged where they happen
        Err(e @ ApiError::Provision(_)) => e.outcome(),
        Err(e) => {
            tracing::warn!(%method, error = %e, "Rejected request");
            e.outcome()
        }
    };
    metrics::counter!(REQUESTS.name, "outcome" => outcome).increment(1);

    result
}

async fn handle(
    state: &AppState,
    method: &Method,
    body: &[u8],
) -> Result<ApiResponse, ApiError> {
    if *method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let fields = parse_request(body, &state.api_secret)?;
    let file = state.provisioner.provision(&fields).await?;

    Ok(file.into())
}

/// Checks the shared secret first, then the required fields. A body that is
/// not a JSON object is treated as carrying no secret.
fn parse_request(body: &[u8], api_secret: &Secret) -> Result<UserFields, ApiError> {
    let input = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let presented = input.get("secret").and_then(Value::as_str);
    let authorized = presented.is_some_and(|secret| {
        secret
            .as_bytes()
            .ct_eq(api_secret.expose().as_bytes())
            .into()
    });
    if !authorized {
        return Err(ApiError::InvalidSecret);
    }

    let field = |key: &str| input.get(key).and_then(Value::as_str).map(str::to_owned);

    match (field("FirstName"), field("LastName"), field("Email")) {
        (Some(first_name), Some(last_name), Some(email)) => Ok(UserFields {
            first_name,
            last_name,
            email,
        }),
        _ => {
            let missing = REQUIRED_FIELDS
                .into_iter()
                .filter(|key| field(key).is_none())
                .collect();
            Err(ApiError::MissingFields(missing))
        }
    }
}
