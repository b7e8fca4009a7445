use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Serialize;

/// Successful JSON response, optionally carrying cookie changes.
///
/// # Examples
///
/// ```rust,ignore
/// use crate::response::AppResponse;
///
/// // Simple response
/// AppResponse::ok(session)
///
/// // Response that also sets or clears cookies
/// AppResponse::ok(body).with_cookies(jar.add(cookie))
///
/// // Created response
/// AppResponse::created(new_user)
/// ```
pub struct AppResponse<T> {
    status: StatusCode,
    data: T,
    cookies: Option<CookieJar>,
}

impl<T> AppResponse<T>
where
    T: Serialize,
{
    fn new(status: StatusCode, data: T) -> Self {
        Self {
            status,
            data,
            cookies: None,
        }
    }

    /// 200 OK with data
    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, data)
    }

    /// 201 Created with data
    pub fn created(data: T) -> Self {
        Self::new(StatusCode::CREATED, data)
    }

    /// Adds the `Set-Cookie` headers produced by `jar`
    pub fn with_cookies(mut self, jar: CookieJar) -> Self {
        self.cookies = Some(jar);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T> IntoResponse for AppResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let body = (self.status, Json(self.data));
        match self.cookies {
            Some(jar) => (jar, body).into_response(),
            None => body.into_response(),
        }
    }
}
