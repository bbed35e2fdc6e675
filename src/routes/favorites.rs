// The favorite toggle mutation. The AuthenticatedUser extractor rejects
// anonymous visitors before this handler runs, so no API call is ever made
// for them; the global Unauthorized response sends them to the login page.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;

use crate::{
    cache::{CachedPayload, QueryKey},
    error::{AppError, AppResult},
    favorites::{invalidate_after_favorite_mutation, FavoriteAction, ToggleState},
    session::AuthenticatedUser,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    /// Page to return to after the mutation; set by the form that rendered
    /// the toggle control.
    pub next: Option<String>,
}

// POST /favorites/:id/toggle
pub async fn toggle_favorite(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(vehicle_id): Path<i64>,
    Form(form): Form<ToggleForm>,
) -> AppResult<impl IntoResponse> {
    let back = form.next.unwrap_or_else(|| "/vehicles".to_owned());

    // Current confirmed status, through the cache like any other read
    let key = QueryKey::favorite_check(&user.token, vehicle_id);
    let api = Arc::clone(&app_state.api);
    let token = user.token.clone();
    let payload = app_state
        .cache
        .get_or_fetch(key, move || async move {
            api.check_favorite(&token, vehicle_id)
                .await
                .map(CachedPayload::FavoriteStatus)
        })
        .await?;
    let is_favorite = payload
        .as_favorite_status()
        .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("cached payload has an unexpected shape")))?;

    let Some((in_flight, action)) = ToggleState::Known(is_favorite).begin_toggle() else {
        // Status was known, so this cannot happen; bounce back regardless
        return Ok(Redirect::to(&back));
    };

    let result = match action {
        FavoriteAction::Add => {
            tracing::info!(vehicle_id, "Adding favorite");
            app_state.api.add_favorite(&user.token, vehicle_id).await
        }
        FavoriteAction::Remove => {
            tracing::info!(vehicle_id, "Removing favorite");
            app_state.api.remove_favorite(&user.token, vehicle_id).await
        }
    };
    if let Err(e) = result {
        tracing::warn!(vehicle_id, state = ?in_flight.fail(), "Favorite mutation failed");
        return Err(e.into());
    }
    tracing::debug!(vehicle_id, state = ?in_flight.complete(), "Favorite mutation confirmed");

    // The confirmed status is never written into the cache locally: mark the
    // related keys stale and let the next read recompute truth from the
    // server.
    invalidate_after_favorite_mutation(&app_state.cache, vehicle_id).await;

    Ok(Redirect::to(&back))
}
