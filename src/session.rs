// Session handling: the bearer token issued by the marketplace API is
// persisted in an HttpOnly cookie and hydrated into extractors per request.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::error::{ApiError, AppError};

pub const AUTH_COOKIE: &str = "auth_token";

/// Cookie persisting a freshly issued token.
pub fn session_cookie(token: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE, token.to_owned());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie
}

/// Removal cookie clearing the persisted token (logout or 401). Built as a
/// full removal cookie (empty value, Max-Age=0) so adding it to any jar
/// emits the Set-Cookie header, including jars with no request cookies.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// The session token when one exists. Never rejects; pages that work for
/// anonymous visitors use this.
pub struct SessionToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state).await?;
        Ok(SessionToken(
            jar.get(AUTH_COOKIE).map(|cookie| cookie.value().to_owned()),
        ))
    }
}

/// Requires a session. Rejecting produces the global Unauthorized response,
/// so protected handlers never run (and never call the API) for anonymous
/// visitors; they are redirected to the login page instead.
pub struct AuthenticatedUser {
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        match token {
            Some(token) => Ok(AuthenticatedUser { token }),
            None => {
                tracing::debug!("Anonymous visitor hit a protected route");
                Err(AppError::Api(ApiError::Unauthorized))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn missing_cookie_rejects_before_any_api_call() {
        let request = Request::builder()
            .uri("/favorites/42/toggle")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let result = AuthenticatedUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(
            result,
            Err(AppError::Api(ApiError::Unauthorized))
        ));
    }

    #[test]
    fn removal_cookie_expires_the_persisted_token() {
        let cookie = removal_cookie();
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.value(), "");
        let serialized = cookie.to_string();
        assert!(serialized.contains("Max-Age=0"));
        assert!(serialized.contains("Path=/"));
    }

    #[tokio::test]
    async fn cookie_hydrates_the_session_token() {
        let request = Request::builder()
            .uri("/favorites")
            .header("cookie", "auth_token=tok-123")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let SessionToken(token) = SessionToken::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(token.as_deref(), Some("tok-123"));
    }
}
