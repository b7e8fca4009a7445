pub mod accounts;
pub mod cookies;
pub mod extractors;
pub mod gate;
pub mod jwt;
pub mod password;
pub mod services;
pub mod token_hash;
pub mod validation;
