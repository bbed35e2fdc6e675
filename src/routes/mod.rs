// Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

mod auth;
mod favorites;
mod pages;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        // Browsing pages
        .route("/", get(pages::home))
        .route("/vehicles", get(pages::vehicles))
        .route("/vehicles/:id", get(pages::vehicle_detail))
        // Favorites (pages and the toggle mutation)
        .route("/favorites", get(pages::favorites_page))
        .route("/favorites/:id/toggle", post(favorites::toggle_favorite))
        // Session lifecycle
        .route("/login", get(auth::login_page).post(auth::handle_login))
        .route("/register", get(auth::register_page).post(auth::handle_register))
        .route("/logout", post(auth::handle_logout))
        .with_state(app_state)
}
