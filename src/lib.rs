//! Authentication core of the restaurant back-office: token issuance, hashed
//! refresh-token storage, cookie transport, role-gated routes and the client
//! side single-flight refresh.

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod response;
