use std::{path::PathBuf, time::Duration};

/// Region used for the STS call (mandatory)
pub const ENV_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";

/// Role ARN to assume (mandatory)
pub const ENV_ROLE_ARN: &str = "AWS_ROLE_ARN";

/// Path of the file holding the web identity token (mandatory)
pub const ENV_WEB_IDENTITY_TOKEN_FILE: &str = "AWS_WEB_IDENTITY_TOKEN_FILE";

/// Session name passed to STS
pub const ENV_SESSION_NAME: &str = "AWS_WEB_IDENTITY_SESSION_NAME";

/// Requested session duration in seconds
pub const ENV_DURATION: &str = "AWS_WEB_IDENTITY_DURATION";

/// Identity provider id, only needed for OAuth 2.0 providers
pub const ENV_PROVIDER_ID: &str = "AWS_WEB_IDENTITY_PROVIDER_ID";

/// Override for the credential cache file location
pub const ENV_CACHE_FILE: &str = "AWS_WEB_IDENTITY_CREDENTIAL_PROCESS_CACHE_FILE";

/// Log level for this helper
pub const ENV_LOG_LEVEL: &str = "AWS_WEB_IDENTITY_CREDENTIAL_PROCESS_LOG_LEVEL";

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// Cache file name inside the AWS configuration directory
pub const CACHE_FILE_NAME: &str = ".webIdentityCredentialProcess.json";

/// Session name used when none is configured
pub const DEFAULT_SESSION_NAME: &str = "webIdentityCredentialProcess";

/// Session duration used when none (or an invalid one) is configured
pub const DEFAULT_DURATION_SECONDS: i32 = 3600;

/// Cached credentials closer than this to expiry are refreshed
pub const SAFETY_MARGIN: Duration = Duration::from_secs(600);

/// Ceiling for the STS call
pub const FEDERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Version of the credential_process document format
pub const CREDENTIAL_DOCUMENT_VERSION: u8 = 1;

/// Get the default credential cache path: ~/.aws/.webIdentityCredentialProcess.json
pub fn default_cache_path(home: Option<PathBuf>) -> Option<PathBuf> {
    home.map(|home| home.join(AWS_CONFIG_DIR_NAME).join(CACHE_FILE_NAME))
}

/// Resolve the current user's home directory
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}
