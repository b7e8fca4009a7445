use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::dangerous::insecure_decode;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use restaurant_auth_api::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Refresh token lifetime: 30 days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("{0} token secret is not configured")]
    MissingSecret(TokenKind),
    #[error("Token generation failed: {0}")]
    GenerationFailed(jsonwebtoken::errors::Error),
    #[error("Token expired")]
    Expired,
    #[error("Token is invalid")]
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Who a token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    /// Set on refresh tokens only, so two sessions opened within the same
    /// second still get distinct tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Signing secrets, loaded once from configuration.
#[derive(Clone)]
pub struct TokenSecrets {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSecrets")
            .field("access", &"***")
            .field("refresh", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
            refresh: Duration::days(REFRESH_TOKEN_TTL_DAYS),
        }
    }
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl SigningKeys {
    fn new(kind: TokenKind, secret: &str, lifetime: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret(kind));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        })
    }
}

/// Mints and checks the two token kinds. Pure: no I/O, no shared state.
#[derive(Clone)]
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl TokenService {
    pub fn new(secrets: &TokenSecrets) -> Result<Self, TokenError> {
        Self::with_lifetimes(secrets, TokenLifetimes::default())
    }

    pub fn with_lifetimes(
        secrets: &TokenSecrets,
        lifetimes: TokenLifetimes,
    ) -> Result<Self, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            access: SigningKeys::new(TokenKind::Access, &secrets.access, lifetimes.access)?,
            refresh: SigningKeys::new(TokenKind::Refresh, &secrets.refresh, lifetimes.refresh)?,
            validation,
        })
    }

    pub fn refresh_lifetime(&self) -> Duration {
        self.refresh.lifetime
    }

    pub fn issue_access_token(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue_access_token_at(identity, Utc::now())
    }

    pub fn issue_refresh_token(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue_refresh_token_at(identity, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        Self::sign(&self.access, identity, now, None)
    }

    pub fn issue_refresh_token_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        Self::sign(&self.refresh, identity, now, Some(Uuid::new_v4().to_string()))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(&self.access, token)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(&self.refresh, token)
    }

    /// Reads the claims without checking the signature or expiry.
    ///
    /// Only ever used to find which credential record to check a token
    /// against; never to authorize anything.
    pub fn decode_unverified(token: &str) -> Option<Claims> {
        insecure_decode::<Claims>(token).ok().map(|data| data.claims)
    }

    fn sign(
        keys: &SigningKeys,
        identity: &Identity,
        now: DateTime<Utc>,
        jti: Option<String>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            email: identity.email.clone(),
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + keys.lifetime).timestamp(),
            jti,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(TokenError::GenerationFailed)
    }

    fn verify(&self, keys: &SigningKeys, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
