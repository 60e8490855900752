use std::io;

use chrono::Utc;
use clap::{ArgAction, Parser};
use tracing::debug;

use crate::{config::Config, error::Result, process::CredentialProcess};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "web-identity-credential-process",
    version,
    about = "AWS credential_process helper for web identity tokens",
    long_about = "Exchanges the token in AWS_WEB_IDENTITY_TOKEN_FILE for temporary credentials \
                  of AWS_ROLE_ARN, caches them and prints them in credential_process format."
)]
pub struct Cli {
    #[arg(short = 'v', long, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        debug!("Starting webIdentityCredentialProcess");

        let config = Config::from_env().await?;
        debug!(?config, "Resolved configuration");

        let process = CredentialProcess::from_config(config).await;
        process.run(Utc::now(), &mut io::stdout().lock()).await?;

        debug!("Stopping webIdentityCredentialProcess");
        Ok(())
    }
}
