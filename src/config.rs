use std::{
    env, fmt,
    path::{Path, PathBuf},
};

use tokio::fs;
use tracing::{info, warn};

use crate::{
    aws::sts::FederationRequest,
    constants::{
        self, DEFAULT_DURATION_SECONDS, DEFAULT_SESSION_NAME, ENV_CACHE_FILE, ENV_DEFAULT_REGION,
        ENV_DURATION, ENV_PROVIDER_ID, ENV_ROLE_ARN, ENV_SESSION_NAME,
        ENV_WEB_IDENTITY_TOKEN_FILE,
    },
    error::{Error, Result},
};

/// Settings for one run, resolved once at startup
#[derive(Clone)]
pub struct Config {
    pub role_arn: String,
    pub region: String,
    pub web_identity_token: String,
    pub session_name: String,
    pub duration_seconds: i32,
    pub provider_id: Option<String>,
    pub cache_file: PathBuf,
}

impl Config {
    /// Resolve the configuration from the process environment
    pub async fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok(), constants::home_dir()).await
    }

    /// Resolve the configuration from `lookup`, using `home` for the default cache path
    pub async fn from_lookup<F>(lookup: F, home: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let role_arn = require(&lookup, ENV_ROLE_ARN)?;
        let region = require(&lookup, ENV_DEFAULT_REGION)?;
        let token_file = PathBuf::from(require(&lookup, ENV_WEB_IDENTITY_TOKEN_FILE)?);

        let cache_file = match non_empty(&lookup, ENV_CACHE_FILE) {
            Some(path) => PathBuf::from(path),
            None => constants::default_cache_path(home).ok_or(Error::HomeDirectory)?,
        };

        let web_identity_token = read_token(&token_file).await?;

        Ok(Self {
            role_arn,
            region,
            web_identity_token,
            session_name: non_empty(&lookup, ENV_SESSION_NAME)
                .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            duration_seconds: parse_duration(lookup(ENV_DURATION).as_deref()),
            provider_id: non_empty(&lookup, ENV_PROVIDER_ID),
            cache_file,
        })
    }

    pub fn federation_request(&self) -> FederationRequest<'_> {
        FederationRequest {
            role_arn: &self.role_arn,
            web_identity_token: &self.web_identity_token,
            session_name: &self.session_name,
            duration_seconds: self.duration_seconds,
            provider_id: self.provider_id.as_deref(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("role_arn", &self.role_arn)
            .field("region", &self.region)
            .field("session_name", &self.session_name)
            .field("duration_seconds", &self.duration_seconds)
            .field("provider_id", &self.provider_id)
            .field("cache_file", &self.cache_file)
            .finish_non_exhaustive()
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.is_empty())
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, name).ok_or(Error::MissingVariable(name))
}

async fn read_token(path: &Path) -> Result<String> {
    let bytes = fs::read(path).await.map_err(|source| Error::TokenFile {
        var: ENV_WEB_IDENTITY_TOKEN_FILE,
        path: path.to_path_buf(),
        source,
    })?;

    String::from_utf8(bytes).map_err(|_| Error::TokenEncoding {
        var: ENV_WEB_IDENTITY_TOKEN_FILE,
        path: path.to_path_buf(),
    })
}

/// Parse the requested session duration, falling back to the default
pub fn parse_duration(raw: Option<&str>) -> i32 {
    let Some(raw) = raw else {
        return DEFAULT_DURATION_SECONDS;
    };

    match raw.parse::<i32>() {
        Ok(seconds) if seconds > 0 => seconds,
        _ => {
            warn!("Invalid value for {} {}", ENV_DURATION, raw);
            info!(
                "Falling back to default duration {}",
                DEFAULT_DURATION_SECONDS
            );
            DEFAULT_DURATION_SECONDS
        }
    }
}
