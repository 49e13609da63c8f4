//! Authentication service implementation
//!
//! This service handles password hashing, credential checks, JWT issuance and
//! decoding, and the capability model used to guard API operations.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::AuthConfig;
use crate::database::repositories::UserRepository;
use crate::models::user::{Role, User};
use crate::utils::errors::{MenuError, Result};
use crate::utils::logging::log_auth_event;

const HASH_SCHEME: &str = "sha256";
const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

/// Hash a password as `sha256$<salt>$<digest>` with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let salt = hex::encode(rand::random::<[u8; 16]>());
    let digest = salted_digest(&salt, password);
    format!("{HASH_SCHEME}${salt}${digest}")
}

/// Check a password against a stored hash in constant time
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(HASH_SCHEME), Some(salt), Some(expected)) => {
            let actual = salted_digest(salt, password);
            actual.as_bytes().ct_eq(expected.as_bytes()).into()
        }
        _ => false,
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub is_staff: bool,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// The authenticated caller of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub is_staff: bool,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role(),
            is_staff: user.is_staff,
        }
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employe
    }
}

impl TryFrom<Claims> for Principal {
    type Error = MenuError;

    fn try_from(claims: Claims) -> Result<Self> {
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| MenuError::Unauthorized("Token contained no recognizable user identification".to_string()))?;

        Ok(Self {
            user_id,
            username: claims.username,
            role: claims.role,
            is_staff: claims.is_staff,
        })
    }
}

/// What a caller needs to perform an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Public,
    Authenticated,
    Staff,
    StaffOrEmployee,
}

impl Capability {
    pub fn allows(self, principal: &Principal) -> bool {
        match self {
            Capability::Public | Capability::Authenticated => true,
            Capability::Staff => principal.is_staff,
            Capability::StaffOrEmployee => principal.is_staff || principal.is_employee(),
        }
    }

    /// 401 for anonymous callers of protected operations, 403 for callers lacking the capability
    pub fn check(self, principal: Option<&Principal>) -> Result<()> {
        match (self, principal) {
            (Capability::Public, _) => Ok(()),
            (_, None) => Err(MenuError::Unauthorized(
                "Authentication credentials were not provided.".to_string(),
            )),
            (capability, Some(principal)) if capability.allows(principal) => Ok(()),
            (_, Some(_)) => Err(MenuError::PermissionDenied(
                "You do not have permission to perform this action.".to_string(),
            )),
        }
    }
}

/// Signs and verifies HS256 tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    pub fn issue(&self, principal: &Principal, token_type: TokenType) -> Result<String> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let now = Utc::now();
        let claims = Claims {
            sub: principal.user_id.to_string(),
            username: principal.username.clone(),
            role: principal.role,
            is_staff: principal.is_staff,
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    pub fn issue_pair(&self, principal: &Principal) -> Result<TokenPair> {
        Ok(TokenPair {
            refresh: self.issue(principal, TokenType::Refresh)?,
            access: self.issue(principal, TokenType::Access)?,
        })
    }

    /// Decode a token, rejecting expired tokens and tokens of the wrong type
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;

        if claims.token_type != expected {
            return Err(MenuError::Unauthorized("Token has wrong type".to_string()));
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// Authentication service for credential checks and token management
#[derive(Clone, Debug)]
pub struct AuthService {
    tokens: TokenIssuer,
    user_repository: UserRepository,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(config: &AuthConfig, user_repository: UserRepository) -> Self {
        Self {
            tokens: TokenIssuer::new(config),
            user_repository,
        }
    }

    /// Exchange username and password for a token pair
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        debug!(username = %username, "Attempting login");

        let user = match self.user_repository.find_by_username(username).await? {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                log_auth_event(username, "login", false);
                return Err(MenuError::Unauthorized(BAD_CREDENTIALS.to_string()));
            }
        };

        let pair = self.tokens.issue_pair(&Principal::from_user(&user))?;
        log_auth_event(username, "login", true);
        Ok(pair)
    }

    /// Issue a new access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let principal = Principal::try_from(self.tokens.decode(refresh_token, TokenType::Refresh)?)?;

        // Pick up role changes and reject tokens of deleted accounts
        let user = self
            .user_repository
            .find_by_id(principal.user_id)
            .await?
            .ok_or_else(|| MenuError::Unauthorized("User not found".to_string()))?;

        let access = self.tokens.issue(&Principal::from_user(&user), TokenType::Access)?;
        log_auth_event(&user.username, "refresh", true);
        Ok(access)
    }

    /// Resolve the caller of a bearer access token
    pub fn authenticate(&self, access_token: &str) -> Result<Principal> {
        Principal::try_from(self.tokens.decode(access_token, TokenType::Access)?)
    }
}
