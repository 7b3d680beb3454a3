use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub minio: MinIOConfig,
    pub classifier: ClassifierConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Settings for validating access tokens issued by the identity provider
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub jwt_leeway: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// MinIO/S3 storage configuration for report images
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Public endpoint used when building image URLs (defaults to endpoint)
    pub public_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
    /// Prefix under which report images are written (e.g., "reports")
    pub image_prefix: String,
}

/// External image classifier settings.
///
/// Per-attempt timeout, attempt count and backoff together bound how long a
/// submission can wait on the classifier before degrading to `unknown`.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// OpenAI-compatible chat completions endpoint
    pub api_url: String,
    pub api_key: String,
    pub model_name: String,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_total_wait: Duration,
}

/// Points ledger retry and reconciliation settings
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Attempts made while the submission request is still in flight
    pub inline_attempts: u32,
    pub inline_backoff: Duration,
    pub reconcile_interval: Duration,
    pub reconcile_batch_size: i64,
    pub reconcile_concurrency: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            minio: MinIOConfig::from_env()?,
            classifier: ClassifierConfig::from_env()?,
            ledger: LedgerConfig::from_env()?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: env_or("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: env_or("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: env_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl AuthConfig {
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET environment variable is required".to_string())?;

        if jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters".to_string());
        }

        let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "wastewise-identity".to_string());
        let audience = env::var("JWT_AUDIENCE").unwrap_or_else(|_| "wastewise-core".to_string());
        let jwt_leeway_secs = env_or("JWT_LEEWAY", Self::DEFAULT_JWT_LEEWAY_SECS)?;

        Ok(Self {
            jwt_secret,
            issuer,
            audience,
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Wastewise API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Waste report submission and classification API".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl MinIOConfig {
    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());
        let public_endpoint =
            env::var("MINIO_PUBLIC_ENDPOINT").unwrap_or_else(|_| endpoint.clone());

        Ok(Self {
            endpoint,
            public_endpoint,
            access_key: env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
            secret_key: env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
            bucket: env::var("MINIO_BUCKET").unwrap_or_else(|_| "wastewise-reports".to_string()),
            region: env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            image_prefix: env::var("MINIO_IMAGE_PREFIX").unwrap_or_else(|_| "reports".to_string()),
        })
    }
}

impl ClassifierConfig {
    const DEFAULT_API_URL: &'static str = "https://api.openai.com/v1/chat/completions";
    const DEFAULT_MODEL_NAME: &'static str = "gpt-4o-mini";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
    const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
    const DEFAULT_MAX_BACKOFF_MS: u64 = 4_000;
    const DEFAULT_MAX_TOTAL_WAIT_SECS: u64 = 45;

    pub fn from_env() -> Result<Self, String> {
        let api_key = env::var("CLASSIFIER_API_KEY")
            .map_err(|_| "CLASSIFIER_API_KEY environment variable is required".to_string())?;

        let max_attempts: u32 = env_or("CLASSIFIER_MAX_ATTEMPTS", Self::DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err("CLASSIFIER_MAX_ATTEMPTS must be at least 1".to_string());
        }

        Ok(Self {
            api_url: env::var("CLASSIFIER_API_URL")
                .unwrap_or_else(|_| Self::DEFAULT_API_URL.to_string()),
            api_key,
            model_name: env::var("CLASSIFIER_MODEL")
                .unwrap_or_else(|_| Self::DEFAULT_MODEL_NAME.to_string()),
            request_timeout: Duration::from_secs(env_or(
                "CLASSIFIER_TIMEOUT_SECS",
                Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            max_attempts,
            initial_backoff: Duration::from_millis(env_or(
                "CLASSIFIER_INITIAL_BACKOFF_MS",
                Self::DEFAULT_INITIAL_BACKOFF_MS,
            )?),
            max_backoff: Duration::from_millis(env_or(
                "CLASSIFIER_MAX_BACKOFF_MS",
                Self::DEFAULT_MAX_BACKOFF_MS,
            )?),
            max_total_wait: Duration::from_secs(env_or(
                "CLASSIFIER_MAX_TOTAL_WAIT_SECS",
                Self::DEFAULT_MAX_TOTAL_WAIT_SECS,
            )?),
        })
    }

    /// Backoff to wait before the given retry (1-based), doubling and capped
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl LedgerConfig {
    const DEFAULT_INLINE_ATTEMPTS: u32 = 3;
    const DEFAULT_INLINE_BACKOFF_MS: u64 = 100;
    const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 30;
    const DEFAULT_RECONCILE_BATCH_SIZE: i64 = 50;
    const DEFAULT_RECONCILE_CONCURRENCY: usize = 4;

    pub fn from_env() -> Result<Self, String> {
        let config = Self {
            inline_attempts: env_or("LEDGER_INLINE_ATTEMPTS", Self::DEFAULT_INLINE_ATTEMPTS)?
                .max(1),
            inline_backoff: Duration::from_millis(env_or(
                "LEDGER_INLINE_BACKOFF_MS",
                Self::DEFAULT_INLINE_BACKOFF_MS,
            )?),
            reconcile_interval: Duration::from_secs(env_or(
                "LEDGER_RECONCILE_INTERVAL_SECS",
                Self::DEFAULT_RECONCILE_INTERVAL_SECS,
            )?),
            reconcile_batch_size: env_or(
                "LEDGER_RECONCILE_BATCH_SIZE",
                Self::DEFAULT_RECONCILE_BATCH_SIZE,
            )?,
            reconcile_concurrency: env_or(
                "LEDGER_RECONCILE_CONCURRENCY",
                Self::DEFAULT_RECONCILE_CONCURRENCY,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the reconciler cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.reconcile_interval.is_zero() {
            return Err("LEDGER_RECONCILE_INTERVAL_SECS must be at least 1".to_string());
        }
        if self.reconcile_batch_size < 1 {
            return Err("LEDGER_RECONCILE_BATCH_SIZE must be at least 1".to_string());
        }
        if self.reconcile_concurrency == 0 {
            return Err("LEDGER_RECONCILE_CONCURRENCY must be at least 1".to_string());
        }
        Ok(())
    }
}
