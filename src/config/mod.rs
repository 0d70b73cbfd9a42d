use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(f, "Invalid value {:?} for {}", value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: Option<String>,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub max_connections: u32,
    pub disable_tls: bool,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub shutdown_timeout: Duration,
    pub request_timeout: Duration,
    pub db: DbConfig,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            api_host: text("APIHOST", "0.0.0.0:3000"),
            shutdown_timeout: Duration::from_secs(parse(&lookup, "SHUTDOWNTIMEOUT", 20)?),
            request_timeout: Duration::from_secs(parse(&lookup, "REQUEST_TIMEOUT", 10)?),
            db: DbConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
                user: text("DBUSER", "postgres"),
                password: text("DBPASSWORD", "postgres"),
                host: text("DBHOST", "localhost"),
                port: parse(&lookup, "DBPORT", 5432)?,
                name: text("DBNAME", "postgres"),
                max_connections: parse(&lookup, "DBMAXOPENCONNS", 10)?,
                disable_tls: parse(&lookup, "DBDISABLETLS", true)?,
                run_migrations: parse(&lookup, "RUN_MIGRATIONS", true)?,
            },
        })
    }
}

impl DbConfig {
    /// `DATABASE_URL` wins; otherwise the URL is assembled from the parts.
    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        let mut url = format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        );
        if self.disable_tls {
            url.push_str("?sslmode=disable");
        }
        url
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
