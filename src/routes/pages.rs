// Handlers for the browsing pages. Every remote read goes through the query
// cache, so concurrent requests for the same data coalesce onto one API call
// and pages served within the staleness window never hit the network.

use std::collections::HashMap;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
};

use crate::{
    cache::{CachedPayload, QueryKey},
    error::{AppError, AppResult},
    filters::VehicleFilters,
    models::{Pagination, User, Vehicle},
    session::{AuthenticatedUser, SessionToken},
    AppState,
};

pub(crate) fn render<T: Template>(template: T) -> AppResult<Html<String>> {
    match template.render() {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            tracing::error!("Failed to render template: {}", e);
            Err(AppError::InternalServerError(anyhow::Error::new(e)))
        }
    }
}

fn payload_mismatch() -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("cached payload has an unexpected shape"))
}

/// Filter-panel values echoed back into the form inputs. Absent fields render
/// as empty strings so the panel reflects exactly what the address bar holds.
pub struct FilterForm {
    pub search: String,
    pub brand: String,
    pub model: String,
    pub city: String,
    pub fuel_type: String,
    pub transmission: String,
    pub min_price: String,
    pub max_price: String,
    pub min_year: String,
    pub max_year: String,
    pub min_mileage: String,
    pub max_mileage: String,
}

impl From<&VehicleFilters> for FilterForm {
    fn from(filters: &VehicleFilters) -> Self {
        fn text(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }
        fn number<N: ToString>(value: &Option<N>) -> String {
            value.as_ref().map(N::to_string).unwrap_or_default()
        }
        FilterForm {
            search: text(&filters.search),
            brand: text(&filters.brand),
            model: text(&filters.model),
            city: text(&filters.city),
            fuel_type: text(&filters.fuel_type),
            transmission: text(&filters.transmission),
            min_price: number(&filters.min_price),
            max_price: number(&filters.max_price),
            min_year: number(&filters.min_year),
            max_year: number(&filters.max_year),
            min_mileage: number(&filters.min_mileage),
            max_mileage: number(&filters.max_mileage),
        }
    }
}

pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

/// Pagination hrefs re-serialize the canonical filter state, so pages stay
/// shareable and paging never loses a filter.
fn page_links(
    filters: &VehicleFilters,
    pagination: &Pagination,
) -> (Vec<PageLink>, Option<String>, Option<String>) {
    let current = pagination.current_page;
    let last = pagination.last_page.max(1);
    let href = |page: u32| format!("/vehicles{}", filters.with_page(page).to_query_string());

    // Window of up to five pages around the current one
    let start = current.saturating_sub(2).max(1);
    let end = (start + 4).min(last);
    let pages = (start..=end)
        .map(|number| PageLink {
            number,
            href: href(number),
            current: number == current,
        })
        .collect();

    let prev = (current > 1).then(|| href(current - 1));
    let next = (current < last).then(|| href(current + 1));
    (pages, prev, next)
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    featured: Vec<Vehicle>,
}

#[derive(Template)]
#[template(path = "vehicles.html")]
struct VehiclesTemplate {
    total: u64,
    vehicles: Vec<Vehicle>,
    form: FilterForm,
    pages: Vec<PageLink>,
    prev_href: Option<String>,
    next_href: Option<String>,
}

#[derive(Template)]
#[template(path = "vehicle_detail.html")]
struct VehicleDetailTemplate {
    vehicle: Vehicle,
    /// Anonymous visitors see a login link instead of the toggle.
    logged_in: bool,
    is_favorite: bool,
    /// Where the toggle mutation sends the browser back to.
    next: String,
}

#[derive(Template)]
#[template(path = "favorites.html")]
struct FavoritesTemplate {
    user: User,
    favorites: Vec<Vehicle>,
}

// GET / - landing page with the curated featured vehicles
pub async fn home(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let api = Arc::clone(&app_state.api);
    let payload = app_state
        .cache
        .get_or_fetch(QueryKey::featured(), move || async move {
            api.featured_vehicles().await.map(CachedPayload::Vehicles)
        })
        .await?;
    let featured = payload.as_vehicles().ok_or_else(payload_mismatch)?.to_vec();
    render(HomeTemplate { featured })
}

// GET /vehicles - filterable, paginated listing
pub async fn vehicles(
    State(app_state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<impl IntoResponse> {
    let filters = VehicleFilters::from_query_map(&params);
    let per_page = app_state.settings.per_page;

    let api = Arc::clone(&app_state.api);
    let fetch_filters = filters.clone();
    let payload = app_state
        .cache
        .get_or_fetch(QueryKey::vehicles(&filters, per_page), move || async move {
            let (vehicles, pagination) = api.list_vehicles(&fetch_filters, per_page).await?;
            Ok(CachedPayload::VehiclePage { vehicles, pagination })
        })
        .await?;
    let (vehicles, pagination) = payload.as_vehicle_page().ok_or_else(payload_mismatch)?;
    tracing::debug!(total = pagination.total, page = pagination.current_page, "Rendering vehicle listing");

    let (pages, prev_href, next_href) = page_links(&filters, pagination);
    render(VehiclesTemplate {
        total: pagination.total,
        vehicles: vehicles.to_vec(),
        form: FilterForm::from(&filters),
        pages,
        prev_href,
        next_href,
    })
}

// GET /vehicles/:id - detail page; favorite status is only looked up when a
// session exists, so anonymous visits never touch the favorites endpoints.
pub async fn vehicle_detail(
    State(app_state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let api = Arc::clone(&app_state.api);
    let payload = app_state
        .cache
        .get_or_fetch(QueryKey::vehicle(id), move || async move {
            api.get_vehicle(id).await.map(CachedPayload::Vehicle)
        })
        .await?;
    let vehicle = payload.as_vehicle().ok_or_else(payload_mismatch)?.clone();

    let favorite = match token {
        Some(token) => {
            let key = QueryKey::favorite_check(&token, id);
            let api = Arc::clone(&app_state.api);
            let payload = app_state
                .cache
                .get_or_fetch(key, move || async move {
                    api.check_favorite(&token, id)
                        .await
                        .map(CachedPayload::FavoriteStatus)
                })
                .await?;
            Some(payload.as_favorite_status().ok_or_else(payload_mismatch)?)
        }
        None => None,
    };

    render(VehicleDetailTemplate {
        next: format!("/vehicles/{}", vehicle.id),
        logged_in: favorite.is_some(),
        is_favorite: favorite.unwrap_or(false),
        vehicle,
    })
}

// GET /favorites - requires a session; anonymous visitors are redirected to
// the login page by the extractor before anything runs.
pub async fn favorites_page(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let profile = app_state.api.current_user(&user.token).await?;

    let key = QueryKey::favorites(&user.token);
    let api = Arc::clone(&app_state.api);
    let token = user.token.clone();
    let payload = app_state
        .cache
        .get_or_fetch(key, move || async move {
            api.favorites(&token).await.map(CachedPayload::Vehicles)
        })
        .await?;
    let favorites = payload.as_vehicles().ok_or_else(payload_mismatch)?.to_vec();

    render(FavoritesTemplate {
        user: profile,
        favorites,
    })
}
