use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::auth::{AuthError, Result};
use crate::config::constants::VERIFICATION_TOKEN_BYTES;
use crate::config::settings::TokenConfig;

type HmacSha256 = Hmac<Sha256>;

/// generate email verification token
pub fn generate_verification_token() -> String {
    let mut buffer = [0u8; VERIFICATION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buffer);
    hex::encode(buffer)
}

/// Short prefix of a token that is safe to log
pub fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(10)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Session token payload: the account identity and its validity window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates HS256-signed bearer tokens (JWT compact form)
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            secret: config.signing_secret.as_bytes().to_vec(),
            ttl: Duration::hours(config.expiry_hours),
        }
    }

    /// Issue a token for the account identity, valid from now
    pub fn issue(&self, identity: &str) -> Result<String> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &str, issued_at: DateTime<Utc>) -> Result<String> {
        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let claims = SessionClaims {
            id: identity.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).map_err(encode_error)?);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).map_err(encode_error)?);
        let signing_input = format!("{}.{}", header, payload);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes())?);

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Validate signature and expiry, returning the embedded identity
    pub fn validate(&self, token: &str) -> Result<String> {
        self.validate_at(token, Utc::now()).map(|claims| claims.id)
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims> {
        let mut parts = token.split('.');
        let (header, payload, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(AuthError::InvalidToken("Malformed token".to_string())),
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken("Malformed signature".to_string()))?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken("Invalid signature".to_string()))?;

        let header: Header = decode_segment(header)?;
        if header.alg != "HS256" {
            return Err(AuthError::InvalidToken(format!("Unsupported algorithm {}", header.alg)));
        }

        let claims: SessionClaims = decode_segment(payload)?;
        if claims.exp <= now.timestamp() {
            debug!("Token expired for account {}", claims.id);
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256> {
        <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn sign(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn encode_error(e: serde_json::Error) -> AuthError {
    AuthError::Signing(e.to_string())
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken("Malformed segment".to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::InvalidToken("Malformed segment".to_string()))
}
