//! HTTP handlers for the dashboard read API and the control panel.

use crate::engine::EngineCommand;
use crate::metrics::data::{ActuationError, ActuationResult, CoreControlState, ProcessRecord};
use crate::metrics::view::ChannelView;
use crate::metrics::{DashboardView, SystemSnapshot};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{error, warn};

/// Body of a control request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ControlRequest<T> {
    pub value: T,
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let view = state.current_view();
    Json(json!({
        "status": "ok",
        "service": "vortex",
        "version": env!("CARGO_PKG_VERSION"),
        "lifecycle": view.lifecycle,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Static machine identity.
pub async fn get_system(State(state): State<AppState>) -> Json<SystemSnapshot> {
    Json(state.identity.as_ref().clone())
}

/// Latest published dashboard view.
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.current_view().as_ref().clone())
}

/// One channel's series, e.g. `/api/channels/cpu.core0`.
pub async fn get_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChannelView>, StatusCode> {
    state
        .current_view()
        .channel(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Latest process list. 404 when the process domain is disabled.
pub async fn get_processes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProcessRecord>>, StatusCode> {
    state
        .current_view()
        .processes
        .clone()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Last requested multiplier and voltage per physical core.
pub async fn get_cores(State(state): State<AppState>) -> Json<Vec<CoreControlState>> {
    Json(state.current_view().cores.clone())
}

pub async fn set_multiplier(
    State(state): State<AppState>,
    Path(core): Path<i32>,
    Json(request): Json<ControlRequest<i32>>,
) -> Result<(StatusCode, Json<ActuationResult>), StatusCode> {
    let (reply, response) = oneshot::channel();
    let command = EngineCommand::SetMultiplier {
        core,
        value: request.value,
        reply,
    };
    dispatch(&state, command, response).await
}

pub async fn set_voltage(
    State(state): State<AppState>,
    Path(core): Path<i32>,
    Json(request): Json<ControlRequest<f64>>,
) -> Result<(StatusCode, Json<ActuationResult>), StatusCode> {
    let (reply, response) = oneshot::channel();
    let command = EngineCommand::SetVoltage {
        core,
        value: request.value,
        reply,
    };
    dispatch(&state, command, response).await
}

async fn dispatch(
    state: &AppState,
    command: EngineCommand,
    response: oneshot::Receiver<ActuationResult>,
) -> Result<(StatusCode, Json<ActuationResult>), StatusCode> {
    if state.commands.send(command).await.is_err() {
        error!("Engine loop is not running, dropping actuation request");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    match response.await {
        Ok(result) => Ok((actuation_status(&result), Json(result))),
        Err(_) => {
            warn!("Engine loop stopped before answering actuation request");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// HTTP status for an actuation outcome.
pub fn actuation_status(result: &ActuationResult) -> StatusCode {
    match &result.error {
        None => StatusCode::OK,
        Some(err) if err.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ActuationError::LibraryUnavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Some(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::ControlValue;

    #[test]
    fn test_actuation_status_mapping() {
        let requested = ControlValue::Multiplier(40);
        assert_eq!(
            actuation_status(&ActuationResult::applied(0, requested)),
            StatusCode::OK
        );
        assert_eq!(
            actuation_status(&ActuationResult::failed(
                9,
                requested,
                ActuationError::CoreOutOfRange { core: 9, cores: 4 }
            )),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            actuation_status(&ActuationResult::failed(
                0,
                requested,
                ActuationError::LibraryUnavailable {
                    reason: "missing".into()
                }
            )),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            actuation_status(&ActuationResult::failed(
                0,
                requested,
                ActuationError::CallFailed {
                    message: "boom".into()
                }
            )),
            StatusCode::BAD_GATEWAY
        );
    }
}
