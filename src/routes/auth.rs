// Session lifecycle handlers. Login and register persist the bearer token
// issued by the marketplace API in the auth cookie; logout tells the API,
// then clears the cookie either way. Failed credentials re-render the form
// with the API's message instead of going through the global 401 handling,
// which is reserved for expired sessions.

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;

use super::pages::render;
use crate::{
    error::{ApiError, AppResult},
    models::{LoginForm, RegisterForm, RegisterRequest},
    session::{self, SessionToken},
    AppState,
};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    error: Option<String>,
}

// GET /login
pub async fn login_page() -> AppResult<impl IntoResponse> {
    render(LoginTemplate { error: None })
}

// GET /register
pub async fn register_page() -> AppResult<impl IntoResponse> {
    render(RegisterTemplate { error: None })
}

// POST /login
pub async fn handle_login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    match app_state.api.login(&form.email, &form.password).await {
        Ok(payload) => {
            tracing::info!("Session opened for user {}", payload.user.id);
            let jar = jar.add(session::session_cookie(&payload.token));
            Ok((jar, Redirect::to("/")).into_response())
        }
        // A 401 here means wrong credentials, not an expired session
        Err(ApiError::Unauthorized) => {
            let body = render(LoginTemplate {
                error: Some("Email ou palavra-passe incorretos".to_owned()),
            })?;
            Ok((StatusCode::UNAUTHORIZED, body).into_response())
        }
        Err(ApiError::Api(message)) => {
            let body = render(LoginTemplate {
                error: Some(message),
            })?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, body).into_response())
        }
        Err(other) => Err(other.into()),
    }
}

// POST /register
pub async fn handle_register(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if form.password != form.password_confirmation {
        let body = render(RegisterTemplate {
            error: Some("As palavras-passe não coincidem".to_owned()),
        })?;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, body).into_response());
    }

    let request = RegisterRequest {
        name: form.name,
        email: form.email,
        password: form.password,
        password_confirmation: form.password_confirmation,
    };
    match app_state.api.register(&request).await {
        Ok(payload) => {
            tracing::info!("Account created for user {}", payload.user.id);
            // Registration logs the new user straight in
            let jar = jar.add(session::session_cookie(&payload.token));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(ApiError::Api(message)) => {
            let body = render(RegisterTemplate {
                error: Some(message),
            })?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, body).into_response())
        }
        Err(other) => Err(other.into()),
    }
}

// POST /logout
pub async fn handle_logout(
    State(app_state): State<AppState>,
    SessionToken(token): SessionToken,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    if let Some(token) = token {
        // Best effort: the cookie is cleared even if the API call fails
        if let Err(e) = app_state.api.logout(&token).await {
            tracing::warn!("Logout call to the marketplace API failed: {:?}", e);
        }
    }
    let jar = jar.add(session::removal_cookie());
    Ok((jar, Redirect::to("/")))
}
