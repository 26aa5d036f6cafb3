//! Authentication module

use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use pressroom_common::types::{AccessTokenId, ProfileId, UserRole};
use pressroom_common::{Error, Result};
use pressroom_core::{
    CampaignManager, ContentGenerator, PostPublisher, SiteConfigState, SmtpTester, UploadService,
};
use pressroom_storage::models::AccessToken;
use pressroom_storage::repository::{
    AccessTokenRepository, ContactRepository, PostRepository, ProfileRepository,
    ProviderKeyRepository, SiteSettingsRepository, SmtpConfigRepository,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{api_error, error_response, ApiError, ApiResult};
use crate::handlers::health::HealthProbe;
use crate::metrics::Metrics;

/// Prefix carried by every issued access token
const TOKEN_MARKER: &str = "pr_";

/// Length of the lookup prefix stored next to the hash
const PREFIX_LEN: usize = 8;

/// Application state shared across handlers
pub struct AppState {
    pub campaigns: Arc<CampaignManager>,
    pub contacts: Arc<dyn ContactRepository>,
    pub smtp_configs: Arc<dyn SmtpConfigRepository>,
    pub smtp_tester: SmtpTester,
    pub posts: Arc<dyn PostRepository>,
    pub publisher: PostPublisher,
    pub generator: ContentGenerator,
    pub provider_keys: Arc<dyn ProviderKeyRepository>,
    pub settings: Arc<dyn SiteSettingsRepository>,
    pub site: Arc<SiteConfigState>,
    pub uploads: UploadService,
    pub profiles: Arc<dyn ProfileRepository>,
    pub tokens: Arc<dyn AccessTokenRepository>,
    pub health: Arc<dyn HealthProbe>,
    pub metrics: Metrics,
}

/// Authenticated context extracted from an access token
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Profile the token belongs to
    pub profile_id: ProfileId,
    /// Role of that profile at request time
    pub role: UserRole,
    /// Token ID for audit logging
    pub token_id: AccessTokenId,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Extract the access token from request headers
pub fn extract_api_key(req: &Request) -> Option<&str> {
    if let Some(auth) = req.headers().get("authorization") {
        if let Ok(auth_str) = auth.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim());
            }
        }
    }

    if let Some(key) = req.headers().get("x-api-key") {
        if let Ok(key_str) = key.to_str() {
            return Some(key_str.trim());
        }
    }

    None
}

fn extract_key_prefix(token: &str) -> Option<&str> {
    token.get(..PREFIX_LEN)
}

fn hash_api_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a token against a stored hash.
///
/// Argon2 hashes (`$argon2...`) are checked with Argon2; anything else is
/// treated as a SHA-256 hex digest.
fn verify_api_key(token: &str, stored_hash: &str) -> bool {
    if stored_hash.starts_with("$argon2") {
        return PasswordHash::new(stored_hash)
            .ok()
            .and_then(|parsed_hash| {
                Argon2::default()
                    .verify_password(token.as_bytes(), &parsed_hash)
                    .ok()
            })
            .is_some();
    }

    hash_api_key(token) == stored_hash
}

/// A freshly generated token. `secret` is only ever shown once.
pub struct GeneratedToken {
    pub secret: String,
    pub prefix: String,
    pub hash: String,
}

/// Generate a random token together with its lookup prefix and Argon2 hash
pub fn generate_token() -> Result<GeneratedToken> {
    let secret = format!(
        "{}{}{}",
        TOKEN_MARKER,
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("Failed to hash token: {}", e)))?
        .to_string();

    Ok(GeneratedToken {
        prefix: secret[..PREFIX_LEN].to_string(),
        secret,
        hash,
    })
}

/// Store a new token for `profile_id` and return the plain secret
pub async fn issue_token(
    tokens: &dyn AccessTokenRepository,
    profile_id: ProfileId,
    name: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<String> {
    let generated = generate_token()?;
    tokens
        .create(profile_id, name, &generated.hash, &generated.prefix, expires_at)
        .await?;
    Ok(generated.secret)
}

fn unauthorized(message: &str) -> ApiError {
    error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
}

/// Validate a token against the store
async fn validate_access_token(state: &AppState, token: &str) -> ApiResult<AccessToken> {
    let prefix = extract_key_prefix(token).ok_or_else(|| {
        warn!("Access token too short");
        unauthorized("Invalid access token")
    })?;

    let candidates = state.tokens.find_by_prefix(prefix).await.map_err(|e| {
        error!("Database error while looking up access token: {}", e);
        api_error(e)
    })?;

    if candidates.is_empty() {
        warn!("No access token found with prefix: {}", prefix);
        return Err(unauthorized("Invalid access token"));
    }

    for candidate in candidates {
        if verify_api_key(token, &candidate.token_hash) {
            if candidate.is_expired() {
                warn!("Access token {} has expired", candidate.id);
                return Err(unauthorized("Access token has expired"));
            }

            // Fire and forget; auth does not depend on it
            let tokens = state.tokens.clone();
            let token_id = candidate.id;
            tokio::spawn(async move {
                if let Err(e) = tokens.update_last_used(token_id).await {
                    error!("Failed to update access token last_used_at: {}", e);
                }
            });

            return Ok(candidate);
        }
    }

    warn!("Access token hash mismatch for prefix: {}", prefix);
    Err(unauthorized("Invalid access token"))
}

/// Authentication middleware. Only admins and editors get past it.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let token = extract_api_key(&request).ok_or_else(|| {
        warn!("Missing access token in request to {}", request.uri().path());
        unauthorized("Missing access token")
    })?;

    let access_token = validate_access_token(&state, token).await?;

    let profile = state
        .profiles
        .get(access_token.profile_id)
        .await
        .map_err(api_error)?
        .ok_or_else(|| {
            warn!("Access token {} has no profile", access_token.id);
            unauthorized("Invalid access token")
        })?;

    let role = profile.role();
    if !role.can_manage_content() {
        warn!(profile_id = %profile.id, role = %role, "Back office access denied");
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Back office access requires an admin or editor role",
        ));
    }

    debug!(profile_id = %profile.id, token_id = %access_token.id, "Request authenticated");

    request.extensions_mut().insert(AuthContext {
        profile_id: profile.id,
        role,
        token_id: access_token.id,
    });

    Ok(next.run(request).await)
}

/// Reject non-admin callers
pub fn require_admin(auth: &AuthContext) -> ApiResult<()> {
    if !auth.is_admin() {
        warn!(profile_id = %auth.profile_id, role = %auth.role, "Admin access denied");
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "This operation requires the admin role",
        ));
    }
    Ok(())
}
