use super::parsing::{
    env_flag, env_number, env_optional, env_or_default, parse_cors_origins, parse_environment,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, RedisSettings,
    RenderSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAMBANK_HOST", "0.0.0.0");
        let port = env_or_default("EXAMBANK_PORT", "8000");

        let environment = parse_environment(
            env_optional("EXAMBANK_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_flag("EXAMBANK_STRICT_CONFIG") || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Exambank API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = env_number("ACCESS_TOKEN_EXPIRE_MINUTES", "10080")?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = env_number("POSTGRES_PORT", "5432")?;
        let postgres_user = env_or_default("POSTGRES_USER", "exambank");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "exambank_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections = env_number("DATABASE_MAX_CONNECTIONS", "20")?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = env_number("REDIS_PORT", "6379")?;
        let redis_db = env_number("REDIS_DB", "0")?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let queue_name = env_or_default("RENDER_QUEUE_NAME", "exambank:render");
        let poll_initial_ms = env_number("RENDER_POLL_INITIAL_MS", "100")?;
        let poll_max_wait_seconds = env_number("RENDER_POLL_MAX_WAIT_SECONDS", "30")?;

        let first_admin_email =
            env_or_default("FIRST_ADMIN_EMAIL", "admin@example.com").to_lowercase();
        let first_admin_password = env_or_default("FIRST_ADMIN_PASSWORD", "");

        let log_level = env_or_default("EXAMBANK_LOG_LEVEL", "info");
        let json = env_flag("EXAMBANK_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
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
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            render: RenderSettings { queue_name, poll_initial_ms, poll_max_wait_seconds },
            admin: AdminSettings { first_admin_email, first_admin_password },
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

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn render(&self) -> &RenderSettings {
        &self.render
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if self.render.poll_initial_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RENDER_POLL_INITIAL_MS",
                value: "0".to_string(),
            });
        }

        if self.render.poll_max_wait_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RENDER_POLL_MAX_WAIT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.render.queue_name.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "RENDER_QUEUE_NAME",
                value: self.render.queue_name.clone(),
            });
        }

        if !self.admin.first_admin_email.contains('@') {
            return Err(ConfigError::InvalidValue {
                field: "FIRST_ADMIN_EMAIL",
                value: self.admin.first_admin_email.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_admin_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
        }

        Ok(())
    }
}
