// Error taxonomy and the conversions that turn failures into HTTP responses.
// A 401 from the remote API is handled here, globally: the persisted token is
// cleared and the browser is sent to the login page, no matter which handler
// triggered the call.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::session;

/// Failures surfaced by the marketplace API client. Clone so a single result
/// can be fanned out to every caller coalesced onto one in-flight request.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ApiError {
    /// Transport-level failure; the detail is logged, not shown.
    #[error("Erro ao conectar com o servidor")]
    Network(String),
    /// The API answered with success:false and a human-readable message.
    #[error("{0}")]
    Api(String),
    #[error("Sessão expirada")]
    Unauthorized,
    #[error("Recurso não encontrado")]
    NotFound,
}

#[derive(Debug)]
pub enum AppError {
    Api(ApiError),
    InternalServerError(anyhow::Error),
}

impl From<ApiError> for AppError {
    fn from(error: ApiError) -> Self {
        AppError::Api(error)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::InternalServerError(error)
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    message: String,
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Api(ApiError::Unauthorized) => {
                tracing::warn!("Remote API rejected the session; clearing token and redirecting to login");
                // add(), not remove(): a jar built here holds no request
                // cookies, and remove() only emits Set-Cookie for cookies it
                // saw on the request.
                let jar = CookieJar::new().add(session::removal_cookie());
                (jar, Redirect::to("/login")).into_response()
            }
            AppError::Api(ApiError::NotFound) => match (NotFoundTemplate {}).render() {
                Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
                Err(e) => {
                    tracing::error!("Failed to render not-found template: {}", e);
                    (StatusCode::NOT_FOUND, "Recurso não encontrado".to_owned()).into_response()
                }
            },
            AppError::Api(error) => {
                // Network failure or success:false from the API: surface the
                // message with a manual retry, never retry automatically.
                tracing::error!("Marketplace API error: {:?}", error);
                let template = ErrorTemplate {
                    message: error.to_string(),
                };
                match template.render() {
                    Ok(html) => (StatusCode::BAD_GATEWAY, Html(html)).into_response(),
                    Err(e) => {
                        tracing::error!("Failed to render error template: {}", e);
                        (StatusCode::BAD_GATEWAY, error.to_string()).into_response()
                    }
                }
            }
            AppError::InternalServerError(e) => {
                tracing::error!("Internal server error: {:?}", e);
                // Don't expose internal details to the client
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_owned()).into_response()
            }
        }
    }
}

// Define a custom Result type using our AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_clears_token_and_redirects_to_login() {
        let response = AppError::Api(ApiError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok()),
            Some("/login")
        );
        let set_cookie = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>();
        // Exactly one removal cookie for the persisted credential, with the
        // value blanked out
        assert_eq!(set_cookie.len(), 1);
        assert!(set_cookie[0].starts_with("auth_token=;"));
        assert!(set_cookie[0].contains("Max-Age=0"));
    }

    #[test]
    fn not_found_is_a_terminal_page() {
        let response = AppError::Api(ApiError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
