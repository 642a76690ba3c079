use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use mime::Mime;

use crate::esocial::coordinator::SubmissionPolicy;
use crate::esocial::service::AttachmentPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub esocial: EsocialConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            esocial: EsocialConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

const DEFAULT_ANEXO_TIPOS: &str = "application/pdf,image/jpeg,image/png";

/// Submission and attachment policy dials for the eSocial engine.
///
/// Defaults follow the homologation environment: short backoff, a handful of
/// retries, and the document types the government portal accepts.
#[derive(Debug, Clone)]
pub struct EsocialConfig {
    pub max_tentativas_envio: u32,
    pub timeout_envio_ms: u64,
    pub backoff_base_ms: u64,
    pub anexo_tamanho_maximo: u64,
    pub anexo_tipos_permitidos: Vec<Mime>,
}

impl EsocialConfig {
    fn load() -> Result<Self, ConfigError> {
        let max_tentativas_envio = parse_setting("ESOCIAL_MAX_TENTATIVAS", 3u32)?;
        let timeout_envio_ms = parse_setting("ESOCIAL_TIMEOUT_MS", 5_000u64)?;
        let backoff_base_ms = parse_setting("ESOCIAL_BACKOFF_MS", 250u64)?;
        let anexo_tamanho_maximo = parse_setting("ESOCIAL_ANEXO_MAX_BYTES", 5 * 1024 * 1024u64)?;

        let tipos = env::var("ESOCIAL_ANEXO_TIPOS").unwrap_or_else(|_| DEFAULT_ANEXO_TIPOS.to_string());
        let mut anexo_tipos_permitidos = Vec::new();
        for entrada in tipos.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let mime = entrada.parse::<Mime>().map_err(|_| ConfigError::InvalidSetting {
                key: "ESOCIAL_ANEXO_TIPOS",
            })?;
            anexo_tipos_permitidos.push(mime);
        }

        Ok(Self {
            max_tentativas_envio,
            timeout_envio_ms,
            backoff_base_ms,
            anexo_tamanho_maximo,
            anexo_tipos_permitidos,
        })
    }

    pub fn politica_envio(&self) -> SubmissionPolicy {
        SubmissionPolicy {
            max_tentativas: self.max_tentativas_envio.max(1),
            timeout: Duration::from_millis(self.timeout_envio_ms),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    pub fn politica_anexos(&self) -> AttachmentPolicy {
        AttachmentPolicy {
            tamanho_maximo: self.anexo_tamanho_maximo,
            tipos_permitidos: self.anexo_tipos_permitidos.clone(),
        }
    }
}

fn parse_setting<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidSetting { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSetting { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSetting { key } => {
                write!(f, "{key} holds a value the service cannot parse")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
