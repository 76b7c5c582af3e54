//! `/toilets` handlers.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::error::ApiError;
use super::AppState;
use crate::model::{NewPin, Pin, PinPatch, ViewportRect};
use crate::repository::BatchStatus;
use crate::store::SpatialStore;

#[derive(Serialize)]
struct BatchFailure {
    index: usize,
    message: String,
}

#[derive(Serialize)]
struct BatchResponse {
    created: Vec<Pin>,
    failed: Vec<BatchFailure>,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Pull the named parameters out of a query string as numbers.
///
/// Missing names are reported together; unparsable values one at a time.
fn numeric_params<const N: usize>(
    params: &HashMap<String, String>,
    names: [&str; N],
) -> Result<[f64; N], ApiError> {
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| params.get(*name).map_or(true, |v| v.trim().is_empty()))
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Missing required query parameters: {}",
            missing.join(", ")
        )));
    }

    let mut values = [0.0; N];
    for (slot, name) in values.iter_mut().zip(names) {
        let raw = params[name].trim();
        *slot = raw
            .parse::<f64>()
            .map_err(|_| ApiError::bad_request(format!("{} must be a number, got {:?}", name, raw)))?;
    }
    Ok(values)
}

/// `GET /toilets`
pub(super) async fn list<S: SpatialStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Pin>>, ApiError> {
    let pins = state.repo.list()?;
    if pins.is_empty() {
        return Err(ApiError::not_found("No toilets found"));
    }
    Ok(Json(pins))
}

/// `GET /toilets/:id`
pub(super) async fn get_one<S: SpatialStore + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Pin>, ApiError> {
    state
        .repo
        .get(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Toilet {} not found", id)))
}

/// `POST /toilets`
pub(super) async fn create<S: SpatialStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewPin>, JsonRejection>,
) -> Result<(StatusCode, Json<Pin>), ApiError> {
    let pin = state.repo.create(body(payload)?)?;
    Ok((StatusCode::CREATED, Json(pin)))
}

/// `POST /toilets/batch`: 201 all created, 207 partial, 422 none.
pub(super) async fn create_batch<S: SpatialStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<Vec<NewPin>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let outcome = state.repo.create_batch(body(payload)?);

    let status = match outcome.status() {
        BatchStatus::AllSucceeded => StatusCode::CREATED,
        BatchStatus::PartialFailure => StatusCode::MULTI_STATUS,
        BatchStatus::AllFailed => StatusCode::UNPROCESSABLE_ENTITY,
    };
    let response = BatchResponse {
        created: outcome.created().cloned().collect(),
        failed: outcome
            .failures()
            .map(|(index, err)| BatchFailure {
                index,
                message: err.to_string(),
            })
            .collect(),
    };
    Ok((status, Json(response)).into_response())
}

/// `PATCH /toilets/:id`
pub(super) async fn update<S: SpatialStore + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<PinPatch>, JsonRejection>,
) -> Result<Json<Pin>, ApiError> {
    let patch = body(payload)?;
    if patch.is_empty() {
        return Err(ApiError::bad_request("Patch must set name or location"));
    }
    state
        .repo
        .update(&id, patch)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Toilet {} not found", id)))
}

/// `DELETE /toilets/:id`
pub(super) async fn remove<S: SpatialStore + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Pin>, ApiError> {
    state
        .repo
        .delete(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Toilet {} not found", id)))
}

/// `GET /toilets/nearby?swLong&swLat&neLong&neLat`
pub(super) async fn nearby<S: SpatialStore + 'static>(
    State(state): State<AppState<S>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Pin>>, ApiError> {
    let [sw_lon, sw_lat, ne_lon, ne_lat] =
        numeric_params(&params, ["swLong", "swLat", "neLong", "neLat"])?;
    let rect = ViewportRect::new(sw_lon, sw_lat, ne_lon, ne_lat);

    let pins = state.query.find_in_viewport(&rect)?;
    if pins.is_empty() {
        return Err(ApiError::not_found("No toilets found in this area"));
    }
    Ok(Json(pins))
}

/// `GET /toilets/near?long&lat&radius`
pub(super) async fn near<S: SpatialStore + 'static>(
    State(state): State<AppState<S>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Pin>>, ApiError> {
    let [lon, lat, radius] = numeric_params(&params, ["long", "lat", "radius"])?;

    let pins = state.query.find_near(lon, lat, radius)?;
    if pins.is_empty() {
        return Err(ApiError::not_found("No toilets found within radius"));
    }
    Ok(Json(pins))
}
