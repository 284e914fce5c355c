use actix_multipart::Multipart;
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures::TryStreamExt;
use serde_json::json;
use tracing::{debug, info};

use crate::config::constants::AVATAR_FORM_FIELD;
use crate::error::{IdentityError, Result};
use crate::handlers::guard::AuthenticatedAccount;
use crate::models::{Credentials, ImageUpload, NewAccount, ResendRequest, TierUpdate};
use crate::server::app_state::AppState;
use crate::services::NotificationOutcome;
use crate::utils::response::{ok_data, success};
use crate::utils::validator;

const RATE_LIMITED: &str = "Too many registrations from this address, please try again later";

/// Mount the account routes under `/api/users`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                IdentityError::validation(err.to_string()).into()
            }))
            .route("", web::patch().to(update_subscription))
            .route("/", web::patch().to(update_subscription))
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/current", web::get().to(current))
            .route("/verify", web::post().to(resend_verification))
            .route("/verify/{token}", web::get().to(verify))
            .route("/avatar", web::patch().to(update_avatar))
            .route("/avatars", web::patch().to(update_avatar)),
    );
}

fn client_key(req: &HttpRequest) -> String {
    let info = req.connection_info();
    info.realip_remote_addr().unwrap_or("unknown").to_string()
}

/// POST /api/users/signup
pub async fn signup(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<NewAccount>,
) -> Result<HttpResponse> {
    validator::validate_signup(&body)?;

    let client = client_key(&req);
    if !state.signup_limiter.check(&client) {
        return Err(IdentityError::RateLimit(RATE_LIMITED.to_string()));
    }

    let report = state.verification.signup(body.into_inner()).await?;
    if let NotificationOutcome::Failed(reason) = &report.notification {
        debug!("Signup for {} completed without email: {}", report.account.id, reason);
    }
    success(StatusCode::CREATED, "user", &report.account)
}

/// POST /api/users/login
pub async fn login(state: web::Data<AppState>, body: web::Json<Credentials>) -> Result<HttpResponse> {
    validator::validate_credentials(&body)?;
    let token = state.sessions.login(&body.email, &body.password).await?;
    success(StatusCode::OK, "user", &json!({ "token": token }))
}

/// POST /api/users/logout
pub async fn logout(state: web::Data<AppState>, auth: AuthenticatedAccount) -> Result<HttpResponse> {
    state.sessions.logout(&auth.account.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/users/current
pub async fn current(state: web::Data<AppState>, auth: AuthenticatedAccount) -> Result<HttpResponse> {
    let account = state.lifecycle.current(&auth.token).await?;
    success(StatusCode::OK, "user", &account)
}

/// PATCH /api/users
pub async fn update_subscription(
    state: web::Data<AppState>,
    body: web::Json<TierUpdate>,
    auth: AuthenticatedAccount,
) -> Result<HttpResponse> {
    let summary = state
        .lifecycle
        .update_subscription(&auth.account.id, body.into_inner())
        .await?;
    success(StatusCode::OK, "user", &summary)
}

/// GET /api/users/verify/{token}
pub async fn verify(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    state.verification.verify(&path.into_inner()).await?;
    ok_data(&json!({ "message": "Verification is successful" }))
}

/// POST /api/users/verify
pub async fn resend_verification(
    state: web::Data<AppState>,
    body: web::Json<ResendRequest>,
) -> Result<HttpResponse> {
    validator::validate_resend(&body)?;
    if let NotificationOutcome::Failed(reason) =
        state.verification.resend_verification(&body.email).await?
    {
        debug!("Resend for {} completed without email: {}", body.email, reason);
    }
    ok_data(&json!({ "message": "Verification email resubmitted!" }))
}

/// PATCH /api/users/avatar (also mounted at /avatars)
pub async fn update_avatar(
    state: web::Data<AppState>,
    auth: AuthenticatedAccount,
    payload: Multipart,
) -> Result<HttpResponse> {
    let image = read_avatar_field(payload, state.avatars.max_bytes()).await?;
    let url = state.avatars.upload_avatar(&auth.account.id, image).await?;
    info!("Account {} uploaded a new avatar", auth.account.id);
    ok_data(&json!({ "avatarURL": url }))
}

fn multipart_error(err: actix_multipart::MultipartError) -> IdentityError {
    IdentityError::validation(format!("Invalid multipart payload: {}", err))
}

/// Read the `avatar` image part, skipping any other fields
async fn read_avatar_field(mut payload: Multipart, max_bytes: usize) -> Result<ImageUpload> {
    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        if field.name() != AVATAR_FORM_FIELD {
            while field.try_next().await.map_err(multipart_error)?.is_some() {}
            continue;
        }

        let content_type = match field.content_type() {
            Some(mime) if mime.type_().as_str() == "image" => mime.essence_str().to_string(),
            _ => return Err(IdentityError::validation("Avatar must be an image")),
        };

        let mut bytes = BytesMut::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(IdentityError::validation(format!(
                    "Avatar image exceeds {} bytes",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(ImageUpload::new(bytes.freeze(), content_type));
    }

    Err(IdentityError::validation(format!(
        "Missing multipart field: {}",
        AVATAR_FORM_FIELD
    )))
}
