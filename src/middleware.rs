//! Bearer Authentication Middleware (IA-2, AC-3)
//!
//! Axum middleware that resolves the caller identity from the
//! `Authorization: Bearer` header. This is the contract the routing layer
//! consumes: handlers behind the middleware receive the resolved
//! [`CurrentUser`] as a request extension and never see raw tokens.
//!
//! # Usage
//!
//! ```ignore
//! use axum::{middleware, routing::get, Extension, Router};
//! use portcullis::middleware::{require_auth, CurrentUser};
//!
//! async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> String {
//!     user.email
//! }
//!
//! let app = Router::new()
//!     .route("/users/me", get(me))
//!     .layer(middleware::from_fn_with_state(authenticator.clone(), require_auth));
//! ```

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::authenticator::Authenticator;
use crate::error::AuthError;
use crate::store::User;

/// The authenticated caller, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Require a valid access token on the request.
///
/// Missing, malformed, expired, or wrong-class tokens all produce the same
/// 401 `invalid_token` response; inactive accounts produce 401
/// `account_blocked`.
pub async fn require_auth(
    State(auth): State<Authenticator>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&req) {
        Some(token) => token.to_string(),
        None => return AuthError::InvalidToken.into_response(),
    };

    match auth.identify(&token).await {
        Ok(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        Err(error) => error.into_response(),
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}
