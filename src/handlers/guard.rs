use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::error::IdentityError;
use crate::models::Account;
use crate::server::app_state::AppState;

/// Bearer token from the `Authorization` header
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Extractor for protected routes: the bearer must be the account's
/// active session token.
pub struct AuthenticatedAccount {
    pub account: Account,
    pub token: String,
}

impl FromRequest for AuthenticatedAccount {
    type Error = IdentityError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or_else(|| IdentityError::unauthorized("Not authorized"))?;
            let state =
                state.ok_or_else(|| IdentityError::internal("Application state is not configured"))?;
            let account = state.sessions.authenticate(&token).await?;
            Ok(Self { account, token })
        })
    }
}
