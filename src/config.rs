use chrono_tz::Tz;
use std::env;
use std::fmt;
use thiserror::Error;

const DEFAULT_DATAVERSE_URI: &str = "https://defra-nutrientmitigation-dev.crm11.dynamics.com/";
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_SUBMISSION_SCHEDULE: &str = "0 59 23 * * *";
const DEFAULT_JOB_TIMEZONE: &str = "Europe/London";
const DEFAULT_MONGO_DATABASE: &str = "nms-backend-alpha";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_lowercase().as_str() {
            "fatal" | "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            "silent" => Ok(Self::Off),
            _ => Err(ConfigError::InvalidValue {
                name: "LOG_LEVEL",
                expected: "one of fatal, error, warn, info, debug, trace, silent",
                value: raw.to_string(),
            }),
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Off => "off",
        }
    }
}

#[derive(Clone)]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_level: LogLevel,
    pub service_name: String,
    pub dataverse_uri: String,
    pub authority_host: String,
    pub azure: Option<AzureCredentials>,
    pub proxy: Option<String>,
    pub logic_app_url: Option<String>,
    /// Document store connection; the in-memory store is used when unset.
    pub mongo_uri: Option<String>,
    pub mongo_database: String,
    pub submission_schedule: String,
    pub job_timezone: Tz,
    pub jobs_enabled: bool,
}

impl AppConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let port_raw = or("PORT", "3001");
        let port = port_raw
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                expected: "a valid port number",
                value: port_raw.clone(),
            })?;

        let log_level = LogLevel::parse(&or("LOG_LEVEL", "info"))?;

        let jobs_raw = or("JOBS_ENABLED", "true");
        let jobs_enabled = match jobs_raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                return Err(ConfigError::InvalidValue {
                    name: "JOBS_ENABLED",
                    expected: "true or false",
                    value: jobs_raw,
                });
            }
        };

        let timezone_raw = or("JOB_TIMEZONE", DEFAULT_JOB_TIMEZONE);
        let job_timezone = timezone_raw
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "JOB_TIMEZONE",
                expected: "an IANA time zone name",
                value: timezone_raw.clone(),
            })?;

        let azure = match (
            var("AZ_TENANT_ID"),
            var("AZ_CLIENT_ID"),
            var("AZ_CLIENT_SECRET"),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Some(AzureCredentials {
                tenant_id,
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let dataverse_uri = format!(
            "{}/",
            or("DATAVERSE_URI", DEFAULT_DATAVERSE_URI).trim_end_matches('/')
        );

        Ok(Self {
            host: or("APP_HOST", "0.0.0.0"),
            port,
            log_level,
            service_name: or("SERVICE_NAME", "nms-backend-alpha"),
            dataverse_uri,
            authority_host: or("AZ_AUTHORITY_HOST", DEFAULT_AUTHORITY_HOST),
            azure,
            proxy: var("CDP_HTTPS_PROXY").or_else(|| var("CDP_HTTP_PROXY")),
            logic_app_url: var("LOGIC_APP_URL"),
            mongo_uri: var("MONGO_URI"),
            mongo_database: or("MONGO_DATABASE", DEFAULT_MONGO_DATABASE),
            submission_schedule: or("SUBMISSION_JOB_SCHEDULE", DEFAULT_SUBMISSION_SCHEDULE),
            job_timezone,
            jobs_enabled,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("service_name", &self.service_name)
            .field("dataverse_uri", &self.dataverse_uri)
            .field("authority_host", &self.authority_host)
            .field(
                "azure_client_id",
                &self.azure.as_ref().map(|azure| azure.client_id.as_str()),
            )
            .field("azure_client_secret", &self.azure.as_ref().map(|_| "<redacted>"))
            .field("proxy", &self.proxy.as_ref().map(|_| "<set>"))
            .field("logic_app_url", &self.logic_app_url.as_ref().map(|_| "<set>"))
            .field("mongo_uri", &self.mongo_uri.as_ref().map(|_| "<set>"))
            .field("mongo_database", &self.mongo_database)
            .field("submission_schedule", &self.submission_schedule)
            .field("job_timezone", &self.job_timezone)
            .field("jobs_enabled", &self.jobs_enabled)
            .finish()
    }
}
