use super::parsing::{
    env_flag, env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment,
    parse_positive_usize, parse_u16, parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    ApiSettings, BootstrapSettings, ConfigError, CorsSettings, DatabaseSettings, ImportSettings,
    RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings, SessionSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("SCHOOL_HOST", "0.0.0.0");
        let port = env_or_default("SCHOOL_PORT", "8000");

        let environment =
            parse_environment(env_optional("SCHOOL_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("SCHOOL_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "SchoolHub API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let (secret_key, secret_key_generated) = match env_optional("SECRET_KEY") {
            Some(value) => (value, false),
            None => (load_or_create_secret_key(), true),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cookie_name = env_or_default("SESSION_COOKIE_NAME", "session");
        let cookie_secure = env_flag("SESSION_COOKIE_SECURE");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "schoolhub");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "schoolhub_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections = parse_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "20"),
        )?;

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let max_rows =
            parse_positive_usize("IMPORT_MAX_ROWS", env_or_default("IMPORT_MAX_ROWS", "5000"))?;
        let max_duration_seconds = parse_u64(
            "IMPORT_MAX_DURATION_SECONDS",
            env_or_default("IMPORT_MAX_DURATION_SECONDS", "300"),
        )?;
        let event_buffer =
            parse_positive_usize("IMPORT_EVENT_BUFFER", env_or_default("IMPORT_EVENT_BUFFER", "64"))?;

        let first_school_name = env_or_default("FIRST_SCHOOL_NAME", "مدرسه نمونه");
        let first_principal_username = env_or_default("FIRST_PRINCIPAL_USERNAME", "principal");
        let first_principal_password = env_or_default("FIRST_PRINCIPAL_PASSWORD", "");

        let log_level = env_or_default("SCHOOL_LOG_LEVEL", "info");
        let json = env_flag("SCHOOL_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings {
                secret_key,
                secret_key_generated,
                access_token_expire_minutes,
                algorithm,
            },
            session: SessionSettings { cookie_name, cookie_secure },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            import: ImportSettings {
                max_upload_size_mb,
                max_rows,
                max_duration_seconds,
                event_buffer,
            },
            bootstrap: BootstrapSettings {
                first_school_name,
                first_principal_username,
                first_principal_password,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn import(&self) -> &ImportSettings {
        &self.import
    }

    pub(crate) fn bootstrap(&self) -> &BootstrapSettings {
        &self.bootstrap
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.import.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: "0".to_string(),
            });
        }

        if self.import.max_duration_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "IMPORT_MAX_DURATION_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.session.cookie_name.contains([';', '=', ' ', ',']) {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_COOKIE_NAME",
                value: self.session.cookie_name.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.security.secret_key_generated {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }
        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        Ok(())
    }
}
