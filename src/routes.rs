//! HTTP routes for reading the chain and submitting heartbeat measurements.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chain::validate_chain;
use crate::error::{ApiError, ApiResult, INTERNAL_ERROR_BODY};
use crate::ledger::AppendStatus;
use crate::AppState;

/// POST body. `BPM` and `value` are accepted as aliases for `bpm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(alias = "BPM", alias = "value")]
    pub bpm: i64,
}

/// Serialize `payload` as pretty JSON with `code`; 500 if that fails.
pub fn respond_with_json<T: Serialize + ?Sized>(code: StatusCode, payload: &T) -> Response {
    match serde_json::to_string_pretty(payload) {
        Ok(body) => (code, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!(error = %e, "response serialization failed");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
        }
    }
}

/// GET /
pub async fn get_chain(State(state): State<AppState>) -> Response {
    let chain = state.ledger.read();
    respond_with_json(StatusCode::OK, chain.as_slice())
}

/// POST /
pub async fn write_block(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let measurement: Measurement = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "undecodable measurement");
        ApiError::BadRequest(body.to_vec())
    })?;

    let echo = || {
        serde_json::to_string_pretty(&measurement).unwrap_or_else(|_| INTERNAL_ERROR_BODY.into())
    };

    let outcome = state.ledger.try_append(measurement.bpm).map_err(|e| {
        error!(error = %e, bpm = measurement.bpm, "failed to build block");
        ApiError::Internal(echo())
    })?;

    match &outcome.status {
        AppendStatus::Rejected(e) => {
            error!(error = %e, bpm = measurement.bpm, "block failed validation");
            return Err(ApiError::Internal(echo()));
        }
        AppendStatus::Superseded => {
            // Still reported as created; the block is not canonical.
            warn!(index = outcome.block.index, "append lost fork resolution");
        }
        AppendStatus::Committed => {
            info!(index = outcome.block.index, bpm = outcome.block.value, "block appended");
        }
    }

    Ok(respond_with_json(StatusCode::CREATED, &outcome.block))
}

/// GET /validate: audit every link and hash; returns { ok, length, errors[] }
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResp {
    pub ok: bool,
    pub length: usize,
    pub errors: Vec<String>,
}

pub async fn validate(State(state): State<AppState>) -> Json<ValidateResp> {
    let chain = state.ledger.read();
    let errors: Vec<String> = validate_chain(&chain).iter().map(ToString::to_string).collect();

    Json(ValidateResp {
        ok: errors.is_empty(),
        length: chain.len(),
        errors,
    })
}

/// GET /health: liveness plus the current chain height.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResp {
    pub status: String,
    pub length: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResp> {
    Json(HealthResp {
        status: "ok".into(),
        length: state.ledger.len(),
    })
}

/// GET /version: package name and version, plus `GIT_SHA` if set at build time.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResp {
    pub name: String,
    pub version: String,
    pub git_sha: Option<String>,
}

pub async fn version() -> Json<VersionResp> {
    Json(VersionResp {
        name: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
        git_sha: option_env!("GIT_SHA").map(Into::into),
    })
}
