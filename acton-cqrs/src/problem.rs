//! Problem responses for classified failures
//!
//! [`classify`] is the total, deterministic mapping from a [`Failure`] to the
//! wire shape returned to callers:
//!
//! | Failure      | Status | Extra                          |
//! |--------------|--------|--------------------------------|
//! | Validation   | 400    | `errors`: field -> messages    |
//! | NotFound     | 404    | resource identity in `detail`  |
//! | Unauthorized | 401    |                                |
//! | Conflict     | 409    | `errors`: conflicting field    |
//! | Internal     | 500    | cause withheld                 |
//!
//! Responses are served as `application/problem+json`.

use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::failure::{Failure, FailureKind};

/// Media type of every problem response
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Wire-level shape of a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemResponse {
    /// HTTP status code
    pub status: u16,
    /// Machine-readable title, e.g. `not_found`
    pub title: String,
    /// Human-readable detail
    pub detail: String,
    /// Field-level messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ProblemResponse {
    fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            status: kind.status_code().as_u16(),
            title: kind.to_string(),
            detail: detail.into(),
            errors: None,
        }
    }

    #[must_use]
    fn with_errors(mut self, errors: BTreeMap<String, Vec<String>>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// The status code as a [`StatusCode`]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Classify a failure into its problem response
pub fn classify(failure: &Failure) -> ProblemResponse {
    let kind = failure.kind();
    match failure {
        Failure::Validation(validation) => ProblemResponse::new(
            kind,
            format!(
                "{} validation error(s) occurred",
                validation.error_count()
            ),
        )
        .with_errors(validation.errors().clone()),

        Failure::NotFound { resource, id } => {
            ProblemResponse::new(kind, format!("{resource} with id '{id}' was not found"))
        }

        // Don't tell the caller why
        Failure::Unauthorized => {
            ProblemResponse::new(kind, "Authentication is required to access this resource")
        }

        Failure::Conflict { message, field } => {
            let problem = ProblemResponse::new(kind, message.clone());
            match field {
                Some(field) => {
                    problem.with_errors(BTreeMap::from([(field.clone(), vec![message.clone()])]))
                }
                None => problem,
            }
        }

        Failure::Internal(_) => ProblemResponse::new(kind, "An internal error occurred"),
    }
}

impl From<&Failure> for ProblemResponse {
    fn from(failure: &Failure) -> Self {
        classify(failure)
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        response
    }
}
