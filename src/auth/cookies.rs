//! Cookie service: set/clear the httpOnly auth cookies.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::auth::jwt::REFRESH_TOKEN_TTL_DAYS;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Attributes shared by both auth cookies.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
    /// Both cookies live as long as the refresh token, so an expired access
    /// token is still presented and answered with `TOKEN_EXPIRED`.
    pub max_age: Duration,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: false,
            same_site: SameSite::Lax,
            max_age: Duration::days(REFRESH_TOKEN_TTL_DAYS),
        }
    }
}

impl CookiePolicy {
    pub fn new(secure: bool, same_site: SameSite, max_age: chrono::Duration) -> Self {
        Self {
            secure,
            same_site,
            max_age: Duration::seconds(max_age.num_seconds()),
        }
    }

    /// Build a httpOnly cookie for the access token.
    pub fn access_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(ACCESS_COOKIE, token.to_string(), self.max_age)
    }

    /// Build a httpOnly cookie for the refresh token.
    pub fn refresh_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(REFRESH_COOKIE, token.to_string(), self.max_age)
    }

    /// Build expired cookie to clear the access token.
    pub fn clear_access_cookie(&self) -> Cookie<'static> {
        self.build(ACCESS_COOKIE, String::new(), Duration::ZERO)
    }

    /// Build expired cookie to clear the refresh token.
    pub fn clear_refresh_cookie(&self) -> Cookie<'static> {
        self.build(REFRESH_COOKIE, String::new(), Duration::ZERO)
    }

    fn build(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .path("/")
            .max_age(max_age)
            .build()
    }
}
