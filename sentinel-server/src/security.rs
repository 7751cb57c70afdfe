// Token issuing, password hashing and the bearer-token middleware

use crate::error::ApiError;
use crate::http::ApiState;
use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sentinel_core::Role;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;

/// JWT claims for authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<u64> {
        self.sub.parse().ok()
    }

    /// Fails with `403 Access denied` unless `allowed` holds for the role.
    pub fn require(&self, allowed: impl Fn(&Role) -> bool) -> Result<(), ApiError> {
        if allowed(&self.role) {
            Ok(())
        } else {
            Err(ApiError::access_denied())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),
    #[error("Token verification failed: {0}")]
    TokenVerification(String),
}

/// Issues and verifies HS256 tokens
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl TokenManager {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// A random 256-bit secret, hex encoded.
    pub fn random_secret() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    pub fn generate_token(&self, user_id: u64, role: Role) -> Result<String, SecurityError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: now + self.ttl_secs as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SecurityError::TokenGeneration(e.to_string()))
    }

    /// Verify and decode a JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, SecurityError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| SecurityError::TokenVerification(e.to_string()))
    }
}

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Salted PBKDF2-HMAC-SHA256. Hashes are stored as
/// `<iterations>$<hex salt>$<hex hash>`.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = derive(password, &salt, self.iterations);
        format!("{}${}${}", self.iterations, hex::encode(salt), hex::encode(hash))
    }

    /// Checks `password` against a stored hash. Malformed hashes never match.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.splitn(3, '$');
        let (Some(iterations), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };
        let (Ok(iterations), Ok(salt), Ok(expected)) =
            (iterations.parse::<u32>(), hex::decode(salt), hex::decode(expected))
        else {
            return false;
        };
        if iterations == 0 || expected.len() != HASH_LEN {
            return false;
        }

        let actual = derive(password, &salt, iterations);
        // constant time
        actual.iter().zip(expected.iter()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(request: &Request) -> Option<&str> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Requires a valid bearer token and attaches its [`Claims`] to the request.
/// No token is `403`, a bad or expired one is `401`.
pub async fn auth_middleware(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or_else(|| ApiError::Forbidden("No token provided".to_string()))?;

    if token.len() > 4096 || token.chars().any(|c| c.is_control()) {
        warn!("Rejected malformed authentication token");
        return Err(ApiError::Unauthorized("Invalid token".to_string()));
    }

    match state.token_manager.verify_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(e) => {
            warn!("Invalid authentication token: {}", e);
            Err(ApiError::Unauthorized("Invalid token".to_string()))
        }
    }
}
