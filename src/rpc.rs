//! HTTP surface for the remote procedures.
//!
//! Queries are `GET /api/trpc/<name>?input=<json>`, mutations are
//! `POST /api/trpc/<name>` with the JSON input as the body. Adding `?batch=1`
//! lets the path carry a comma-separated list of names, with inputs keyed by
//! call index (`{"0": ..., "1": ...}`), answered with an array of envelopes.

use super::{
    config::BATCH_MAX,
    models::AppState,
    procedures::{Call, InputError, Kind, Procedure, Procedures, UnknownProcedure},
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    BadRequest(#[from] InputError),
    #[error(transparent)]
    NotFound(#[from] UnknownProcedure),
    #[error("{name} does not accept {method}")]
    MethodNotSupported { name: &'static str, method: &'static str },
    #[error("internal server error")]
    Internal(anyhow::Error),
}

impl RpcError {
    pub fn code(&self) -> &'static str {
        match self {
            RpcError::BadRequest(_) => "BAD_REQUEST",
            RpcError::NotFound(_) => "NOT_FOUND",
            RpcError::MethodNotSupported { .. } => "METHOD_NOT_SUPPORTED",
            RpcError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::MethodNotSupported { .. } => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            RpcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON-RPC 2.0 style numeric code
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            RpcError::BadRequest(_) => -32600,
            RpcError::NotFound(_) => -32004,
            RpcError::MethodNotSupported { .. } => -32005,
            RpcError::Internal(_) => -32603,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ResultBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: i32,
    pub data: ErrorData,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub code: String,
    pub http_status: u16,
    pub path: String,
}

fn envelope(
    path: &str,
    result: Result<Option<Value>, RpcError>,
) -> (StatusCode, Envelope) {
    match result {
        Ok(data) => (
            StatusCode::OK,
            Envelope {
                result: Some(ResultBody { data }),
                error: None,
            },
        ),
        Err(err) => {
            if let RpcError::Internal(source) = &err {
                tracing::error!(path, error = ?source, "procedure failed");
            } else {
                tracing::debug!(path, %err, "procedure rejected");
            }
            let status = err.status();
            (
                status,
                Envelope {
                    result: None,
                    error: Some(ErrorBody {
                        message: err.to_string(),
                        code: err.json_rpc_code(),
                        data: ErrorData {
                            code: err.code().to_string(),
                            http_status: status.as_u16(),
                            path: path.to_string(),
                        },
                    }),
                },
            )
        }
    }
}

fn respond(path: &str, result: Result<Option<Value>, RpcError>) -> Response {
    let (status, body) = envelope(path, result);
    (status, Json(body)).into_response()
}

async fn call<P: Procedures>(
    procedures: &P,
    method: Kind,
    name: &str,
    input: Option<Value>,
) -> Result<Option<Value>, RpcError> {
    let procedure: Procedure = name.parse()?;
    if procedure.kind() != method {
        return Err(RpcError::MethodNotSupported {
            name: procedure.name(),
            method: match method {
                Kind::Query => "GET",
                Kind::Mutation => "POST",
            },
        });
    }
    Call::parse(procedure, input)?
        .run(procedures)
        .await
        .map_err(RpcError::Internal)
}

fn malformed(message: impl Into<String>) -> RpcError {
    RpcError::BadRequest(InputError::Malformed(message.into()))
}

pub async fn dispatch<P: Procedures>(
    procedures: &P,
    method: Kind,
    path: &str,
    batch: bool,
    input: Result<Option<Value>, serde_json::Error>,
) -> Response {
    let input = match input {
        Ok(input) => input,
        Err(e) => return respond(path, Err(malformed(e.to_string()))),
    };
    if !batch {
        return respond(path, call(procedures, method, path, input).await);
    }

    let names: Vec<&str> = path.split(',').collect();
    if names.len() > BATCH_MAX {
        return respond(
            path,
            Err(malformed(format!(
                "batch of {} calls exceeds the limit of {BATCH_MAX}",
                names.len()
            ))),
        );
    }
    let mut inputs = match input {
        None => Map::new(),
        Some(Value::Object(inputs)) => inputs,
        Some(_) => {
            return respond(
                path,
                Err(malformed("batch input must be an object keyed by call index")),
            )
        }
    };

    let mut statuses = Vec::with_capacity(names.len());
    let mut bodies = Vec::with_capacity(names.len());
    for (i, name) in names.into_iter().enumerate() {
        let input = inputs.remove(&i.to_string());
        let (status, body) =
            envelope(name, call(procedures, method, name, input).await);
        statuses.push(status);
        bodies.push(body);
    }
    let status = match statuses.split_first() {
        Some((first, rest)) if rest.iter().all(|s| s == first) => *first,
        _ => StatusCode::MULTI_STATUS,
    };

    (status, Json(bodies)).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct RpcParams {
    batch: Option<String>,
    input: Option<String>,
}

impl RpcParams {
    fn is_batch(&self) -> bool {
        matches!(self.batch.as_deref(), Some("1") | Some("true"))
    }
}

pub async fn query(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<RpcParams>,
) -> Response {
    let input = params
        .input
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose();
    dispatch(&state, Kind::Query, &path, params.is_batch(), input).await
}

pub async fn mutation(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<RpcParams>,
    body: Bytes,
) -> Response {
    let input = if body.is_empty() {
        Ok(None)
    } else {
        serde_json::from_slice::<Value>(&body).map(Some)
    };
    dispatch(&state, Kind::Mutation, &path, params.is_batch(), input).await
}
