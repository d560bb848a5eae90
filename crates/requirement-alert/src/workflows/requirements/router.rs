use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::{debug, error};

use super::domain::RequirementSubmission;
use super::service::{IntakeError, RequirementIntakeService};
use crate::notify::Notifier;
use crate::store::RecordStore;

pub const SUBMITTED_MESSAGE: &str = "Requirement submitted & emails sent";
pub const INVALID_MESSAGE: &str = "Invalid requirement";
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Router builder exposing the requirement intake endpoint.
pub fn requirement_router<S, N>(service: Arc<RequirementIntakeService<S, N>>) -> Router
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/requests", post(submit_handler::<S, N>))
        .with_state(service)
}

pub(crate) async fn submit_handler<S, N>(
    State(service): State<Arc<RequirementIntakeService<S, N>>>,
    payload: Result<Json<RequirementSubmission>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
{
    let submission = match payload {
        Ok(Json(submission)) => submission,
        Err(rejection) => {
            debug!(error = %rejection, "requirement body rejected");
            let payload = json!({
                "success": false,
                "message": INVALID_MESSAGE,
                "errors": { "body": "Request body must be a JSON requirement" },
            });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    // SMTP delivery blocks, so the workflow runs off the async executor.
    let result = tokio::task::spawn_blocking(move || service.submit(submission)).await;

    match result {
        Ok(Ok(outcome)) => {
            let payload = json!({
                "success": true,
                "message": SUBMITTED_MESSAGE,
                "notifiedCount": outcome.notified,
                "failedCount": outcome.failed,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(Err(IntakeError::Invalid(err))) => {
            let payload = json!({
                "success": false,
                "message": INVALID_MESSAGE,
                "errors": err.fields,
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        Ok(Err(other)) => {
            error!(stage = %other.stage(), error = %other, "requirement intake failed");
            server_error()
        }
        Err(join_error) => {
            error!(error = %join_error, "requirement intake task aborted");
            server_error()
        }
    }
}

fn server_error() -> Response {
    let payload = json!({
        "success": false,
        "message": SERVER_ERROR_MESSAGE,
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
