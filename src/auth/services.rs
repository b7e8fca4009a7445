// src/auth/services.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::jwt::{Identity, TokenError, TokenService};
use crate::auth::password::PasswordHasher;
use crate::auth::token_hash::TokenHasher;
use crate::auth::validation::validate_credentials;
use crate::db::CredentialStore;
use crate::db::models::user::User;
use crate::error::AppError;

/// Tokens handed out by a successful login.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Result of exchanging a refresh token. `refresh_token` is only set when
/// rotation is enabled.
#[derive(Debug, Clone)]
pub struct RefreshedSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Login, logout and refresh over the credential store.
///
/// Per record the session is either `NoSession` (no stored hash) or `Active`.
/// Login moves any state to `Active`, overwriting the previous session;
/// logout and failed refreshes move it back to `NoSession`.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    passwords: Arc<dyn PasswordHasher>,
    token_hasher: TokenHasher,
    rotate_refresh_tokens: bool,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        passwords: Arc<dyn PasswordHasher>,
        token_hasher: TokenHasher,
    ) -> Self {
        Self {
            store,
            tokens,
            passwords,
            token_hasher,
            rotate_refresh_tokens: false,
        }
    }

    /// Also mint a new refresh token on every refresh, invalidating the old one.
    #[must_use]
    pub fn with_rotation(mut self, rotate_refresh_tokens: bool) -> Self {
        self.rotate_refresh_tokens = rotate_refresh_tokens;
        self
    }

    /// Connexion d'un utilisateur
    ///
    /// Exactly one store write on success, none on failure. The refresh token
    /// hash is persisted before any token is returned.
    pub fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        let email = validate_credentials(email, password)?;

        let user = self
            .store
            .find_by_email(&email)?
            .ok_or_else(|| AppError::not_found("No user found."))?;

        if !self.passwords.verify(password, &user.password_hash)? {
            tracing::warn!(email = %user.email, "login rejected: invalid password");
            return Err(AppError::InvalidCredential);
        }

        let identity = Identity {
            email: user.email.clone(),
            role: user.role,
        };
        let access_token = self.tokens.issue_access_token(&identity)?;
        let (refresh_token, expires_at) = self.mint_refresh_token(&identity)?;

        self.store.set_refresh_token(
            &user.email,
            &self.token_hasher.hash(&refresh_token),
            expires_at,
        )?;

        tracing::info!(email = %user.email, role = %user.role, "session opened");

        Ok(IssuedSession {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Déconnexion: invalide le refresh token stocké
    ///
    /// `identity` comes from a verified access token. Idempotent.
    pub fn logout(&self, identity: &Identity) -> Result<(), AppError> {
        self.store.clear_refresh_token(&identity.email)?;
        tracing::info!(email = %identity.email, "session closed");
        Ok(())
    }

    /// Exchanges the presented refresh token for a new access token.
    ///
    /// The token must be the one whose hash is currently stored: a token
    /// replaced by a later login fails even when its signature and expiry
    /// are fine. Every write made here is conditional on the hash read at the
    /// start, so a login committing in between is never undone.
    pub fn refresh(&self, presented: Option<&str>) -> Result<RefreshedSession, AppError> {
        let token = presented
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthenticated("No refresh token found."))?;

        let claims = TokenService::decode_unverified(token).ok_or(AppError::InvalidToken)?;

        let user = self
            .store
            .find_by_email(&claims.email)?
            .ok_or(AppError::InvalidToken)?;

        let Some(stored_hash) = user.refresh_token_hash.as_deref() else {
            return Err(AppError::InvalidToken);
        };

        if !self.token_hasher.verify(token, stored_hash) {
            // Only a token we actually signed may end the current session;
            // anyone can forge an unsigned token naming this email.
            if matches!(
                self.tokens.verify_refresh_token(token),
                Ok(_) | Err(TokenError::Expired)
            ) {
                let revoked = self.store.clear_refresh_token_if(&user.email, stored_hash)?;
                tracing::warn!(email = %user.email, revoked, "stale refresh token replayed");
            }
            return Err(AppError::InvalidToken);
        }

        if user
            .refresh_token_expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now())
        {
            self.store.clear_refresh_token_if(&user.email, stored_hash)?;
            return Err(AppError::TokenExpired);
        }

        let verified = match self.tokens.verify_refresh_token(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                self.store.clear_refresh_token_if(&user.email, stored_hash)?;
                return Err(AppError::TokenExpired);
            }
            Err(err) => {
                tracing::warn!(email = %user.email, error = %err, "refresh token failed verification");
                return Err(AppError::InvalidToken);
            }
        };

        let identity = verified.identity();
        let access_token = self.tokens.issue_access_token(&identity)?;

        let refresh_token = if self.rotate_refresh_tokens {
            let (rotated, expires_at) = self.mint_refresh_token(&identity)?;
            let swapped = self.store.replace_refresh_token(
                &identity.email,
                stored_hash,
                &self.token_hasher.hash(&rotated),
                expires_at,
            )?;
            // Une connexion ou une rotation concurrente a déjà remplacé ce token
            if !swapped {
                return Err(AppError::InvalidToken);
            }
            Some(rotated)
        } else {
            None
        };

        tracing::debug!(email = %identity.email, rotated = refresh_token.is_some(), "access token refreshed");

        Ok(RefreshedSession {
            access_token,
            refresh_token,
        })
    }

    /// Issues a refresh token and reads back its embedded expiry.
    fn mint_refresh_token(&self, identity: &Identity) -> Result<(String, DateTime<Utc>), AppError> {
        let token = self.tokens.issue_refresh_token(identity)?;
        let expires_at = TokenService::decode_unverified(&token)
            .and_then(|claims| claims.expires_at())
            .ok_or_else(|| AppError::internal("issued refresh token carries no expiry"))?;
        Ok((token, expires_at))
    }
}
