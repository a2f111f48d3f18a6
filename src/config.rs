use thiserror::Error;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value `{value}`")]
    Invalid { var: &'static str, value: String },
    #[error("SESSION_SECRET must be at least 32 bytes (run generate-secret)")]
    WeakSecret,
}

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub acl_model: String,
    pub acl_policy: String,
    pub port: u16,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));

        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        let port = match lookup("PORT") {
            None => 8080,
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value })?,
        };
        let secure_cookies = match lookup("COOKIE_SECURE").as_deref() {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "COOKIE_SECURE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            session_secret,
            acl_model: lookup("ACL_MODEL").unwrap_or_else(|| "acl/model.conf".to_string()),
            acl_policy: lookup("ACL_POLICY").unwrap_or_else(|| "acl/policy.csv".to_string()),
            port,
            secure_cookies,
        })
    }
}
