use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, retry::RetryConfig, timeout::TimeoutConfig};
use aws_sdk_sts::Client as StsClient;
use aws_smithy_types::{DateTime as SmithyDateTime, error::display::DisplayErrorContext};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::CredentialDocument;
use crate::{
    constants::FEDERATION_TIMEOUT,
    error::{Error, Result},
};

/// Parameters of a single AssumeRoleWithWebIdentity call
#[derive(Clone, Copy)]
pub struct FederationRequest<'a> {
    pub role_arn: &'a str,
    pub web_identity_token: &'a str,
    pub session_name: &'a str,
    pub duration_seconds: i32,
    pub provider_id: Option<&'a str>,
}

/// Exchanges a web identity token for temporary credentials
#[async_trait]
pub trait FetchCredentials: Send + Sync {
    async fn fetch_credentials(&self, request: FederationRequest<'_>)
    -> Result<CredentialDocument>;
}

/// STS-backed federation client
#[derive(Debug, Clone)]
pub struct StsFederation {
    client: StsClient,
}

impl StsFederation {
    /// Build an STS client for `region`
    ///
    /// AssumeRoleWithWebIdentity is unsigned, so no credentials provider is attached.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(FEDERATION_TIMEOUT)
                    .build(),
            )
            .retry_config(RetryConfig::disabled())
            .no_credentials()
            .load()
            .await;

        Self {
            client: StsClient::new(&config),
        }
    }
}

#[async_trait]
impl FetchCredentials for StsFederation {
    async fn fetch_credentials(
        &self,
        request: FederationRequest<'_>,
    ) -> Result<CredentialDocument> {
        info!("Calling AWS STS AssumeRoleWithWebIdentity");
        debug!("Role ARN: {}", request.role_arn);
        debug!("Session name: {}", request.session_name);
        debug!("Duration: {} seconds", request.duration_seconds);

        let response = self
            .client
            .assume_role_with_web_identity()
            .role_arn(request.role_arn)
            .role_session_name(request.session_name)
            .web_identity_token(request.web_identity_token)
            .duration_seconds(request.duration_seconds)
            .set_provider_id(request.provider_id.map(str::to_string))
            .send()
            .await
            .map_err(|e| Error::Federation(DisplayErrorContext(&e).to_string()))?;

        let sts_creds = response
            .credentials()
            .ok_or_else(|| Error::Federation("AWS STS returned no credentials".to_string()))?;

        let credentials = CredentialDocument::new(
            sts_creds.access_key_id(),
            sts_creds.secret_access_key(),
            sts_creds.session_token(),
            to_utc(sts_creds.expiration())?,
        );

        info!("Successfully obtained AWS credentials");
        Ok(credentials)
    }
}

fn to_utc(expiration: &SmithyDateTime) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos()).ok_or_else(|| {
        Error::Federation(format!(
            "AWS STS returned an out of range expiration: {}s",
            expiration.secs()
        ))
    })
}
