// ABOUTME: Site settings API handlers: public read and privileged partial save.
// ABOUTME: Saves merge only the fields present in the request; reads fall back to defaults.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use blogd_core::{Settings, SettingsPatch};

use crate::app_state::SharedState;
use crate::envelope::{ApiResult, Envelope};

/// GET /api/v1/settings - Stored settings, or defaults before the first save.
pub async fn get_settings(State(state): State<SharedState>) -> ApiResult<Settings> {
    Ok(Envelope::success(state.store.settings().load()?))
}

/// POST /api/v1/settings - Merge the given fields into the stored settings.
pub async fn save_settings(
    State(state): State<SharedState>,
    payload: Result<Json<SettingsPatch>, JsonRejection>,
) -> ApiResult<Settings> {
    let Json(patch) = payload?;
    Ok(Envelope::success(state.store.settings().save(patch)?))
}
