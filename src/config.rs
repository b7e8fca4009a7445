use anyhow::{Context, Result};
use axum_extra::extract::cookie::SameSite;
use std::env;
use std::str::FromStr;

use crate::auth::jwt::TokenSecrets;
use crate::auth::password::DEFAULT_PASSWORD_COST;

/// Longueur minimale des secrets en production
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Détecte automatiquement l'environnement
    pub fn detect() -> Self {
        // Méthode 1: Vérifier si on est dans AWS Lambda
        if is_lambda() {
            return Self::Production;
        }

        // Méthode 2: Vérifier la variable APP_ENV
        match env::var("APP_ENV").as_deref() {
            Ok("production" | "prod") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// True when running inside AWS Lambda.
pub fn is_lambda() -> bool {
    env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// `None` in development selects the in-memory credential store.
    pub database_url: Option<String>,
    pub db_pool_size: u32,
    pub token_secrets: TokenSecrets,
    pub frontend_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub cookie_same_site: SameSite,
    pub bcrypt_cost: u32,
    pub rotate_refresh_tokens: bool,
}

impl Config {
    /// Charge la configuration depuis les variables d'environnement
    /// avec détection automatique de l'environnement
    pub fn from_env() -> Result<Self> {
        let environment = Environment::detect();

        tracing::info!(
            "🌍 Environment detected: {}",
            environment.as_str().to_uppercase()
        );

        // Charger le fichier .env approprié
        Self::load_env_file(&environment);

        let config = Self::from_lookup(environment, |key| env::var(key).ok())?;

        tracing::info!("✅ Configuration loaded successfully");
        match &config.database_url {
            Some(url) => tracing::debug!("   Database: {}", Self::mask_credentials(url)),
            None => tracing::warn!("   DATABASE_URL not set, using in-memory credential store"),
        }
        tracing::debug!("   Frontend: {}", config.frontend_url);
        tracing::debug!("   Server: {}:{}", config.server_host, config.server_port);

        Ok(config)
    }

    /// Builds the configuration from any key lookup.
    fn from_lookup(
        environment: Environment,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        if database_url.is_none() && environment.is_production() {
            anyhow::bail!(
                "DATABASE_URL must be set in production! \
                 Configure it in Lambda environment variables."
            );
        }

        let token_secrets = Self::get_token_secrets(&environment, &lookup)?;

        let cookie_same_site = match lookup("COOKIE_SAME_SITE") {
            Some(value) => parse_same_site(&value)?,
            None => SameSite::Lax,
        };

        Ok(Self {
            database_url,
            db_pool_size: parse_or("DB_POOL_SIZE", &lookup, 5)?,
            token_secrets,
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or("SERVER_PORT", &lookup, 8081)?,
            cookie_same_site,
            bcrypt_cost: parse_or("BCRYPT_COST", &lookup, DEFAULT_PASSWORD_COST)?,
            rotate_refresh_tokens: parse_or("ROTATE_REFRESH_TOKENS", &lookup, false)?,
            environment,
        })
    }

    /// Charge le bon fichier .env selon l'environnement
    fn load_env_file(environment: &Environment) {
        // En production (Lambda), les variables sont déjà injectées
        if environment.is_production() {
            tracing::info!("📦 Production mode: using injected environment variables");
            return;
        }

        tracing::info!("📦 Development mode: loading .env file");
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("   Loaded: {}", path.display()),
            Err(_) => tracing::warn!("   .env file not found, using environment variables"),
        }
    }

    /// Récupère les deux secrets de signature, obligatoires dans tous les cas
    fn get_token_secrets(
        environment: &Environment,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<TokenSecrets> {
        let access = lookup("ACCESS_TOKEN_KEY")
            .filter(|s| !s.is_empty())
            .context("ACCESS_TOKEN_KEY is required")?;
        let refresh = lookup("REFRESH_TOKEN_KEY")
            .filter(|s| !s.is_empty())
            .context("REFRESH_TOKEN_KEY is required")?;

        if access == refresh {
            anyhow::bail!("ACCESS_TOKEN_KEY and REFRESH_TOKEN_KEY must differ");
        }

        // Valider la longueur des secrets en production
        if environment.is_production() {
            for (name, secret) in [("ACCESS_TOKEN_KEY", &access), ("REFRESH_TOKEN_KEY", &refresh)] {
                if secret.len() < MIN_PRODUCTION_SECRET_LEN {
                    anyhow::bail!(
                        "{name} must be at least {MIN_PRODUCTION_SECRET_LEN} characters in production (current: {})",
                        secret.len()
                    );
                }
            }
        }

        Ok(TokenSecrets { access, refresh })
    }

    /// Masque les credentials dans les logs
    fn mask_credentials(url: &str) -> String {
        if let Some(at_pos) = url.find('@')
            && let Some(scheme_end) = url.find("://")
        {
            let scheme = &url[..scheme_end + 3];
            let after_at = &url[at_pos..];
            return format!("{scheme}***:***{after_at}");
        }
        url.to_string()
    }

    /// Retourne true si on est en mode production
    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}: invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}

fn parse_same_site(value: &str) -> Result<SameSite> {
    match value.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" => Ok(SameSite::None),
        other => anyhow::bail!("COOKIE_SAME_SITE: expected lax, strict or none, got {other:?}"),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        environment: Environment::Development,
        database_url: None,
        db_pool_size: 1,
        token_secrets: TokenSecrets {
            access: "access_secret_for_router_tests".to_string(),
            refresh: "refresh_secret_for_router_tests".to_string(),
        },
        frontend_url: "http://localhost:5173".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        cookie_same_site: SameSite::Lax,
        bcrypt_cost: 4,
        rotate_refresh_tokens: false,
    }
}
