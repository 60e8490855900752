use std::io::Write;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    aws::{
        CredentialDocument,
        credentials::{self, Cache},
        sts::{FetchCredentials, StsFederation},
    },
    config::Config,
    error::{Error, Result},
};

/// Cache-or-refresh flow behind a single `credential_process` invocation
pub struct CredentialProcess<F> {
    config: Config,
    cache: Cache,
    federation: F,
}

impl CredentialProcess<StsFederation> {
    pub async fn from_config(config: Config) -> Self {
        let federation = StsFederation::new(&config.region).await;
        Self::new(config, federation)
    }
}

impl<F: FetchCredentials> CredentialProcess<F> {
    pub fn new(config: Config, federation: F) -> Self {
        let cache = Cache::new(config.cache_file.clone());
        Self {
            config,
            cache,
            federation,
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Return the cached document if it is still usable at `now`, otherwise fetch and cache a new one
    pub async fn get_credential_response(&self, now: DateTime<Utc>) -> Result<CredentialDocument> {
        if let Some(cached) = self.cache.load().await {
            if !cached.is_complete() {
                info!("Cached credentials are incomplete, will get new credentials.");
            } else if self.cache.is_valid(&cached, now) {
                debug!("Using cached credentials");
                return Ok(cached);
            } else {
                let remaining_seconds =
                    credentials::remaining(&cached, now).map(|left| left.num_seconds());
                info!(
                    remaining_seconds,
                    "Remaining seconds to expiry is too small, will get new credentials."
                );
            }
        }

        let fresh = self
            .federation
            .fetch_credentials(self.config.federation_request())
            .await?;

        if let Err(e) = self.cache.store(&fresh).await {
            warn!("{}", e);
        }

        Ok(fresh)
    }

    /// Write the credential document to `out`, then persist it
    pub async fn run<W: Write>(&self, now: DateTime<Utc>, out: &mut W) -> Result<()> {
        let credentials = self.get_credential_response(now).await?;

        let json = serde_json::to_string(&credentials)?;
        writeln!(out, "{json}").map_err(Error::Stdout)?;
        out.flush().map_err(Error::Stdout)?;

        if let Err(e) = self.cache.store(&credentials).await {
            warn!("{}", e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::sts::FederationRequest;
    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use std::{
        path::PathBuf,
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
    };
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn doc(key: &str, expires_in: i64) -> CredentialDocument {
        CredentialDocument::new(
            key,
            "secret",
            "session",
            now() + TimeDelta::seconds(expires_in),
        )
    }

    #[derive(Default)]
    struct FakeFederation {
        calls: AtomicU32,
        last_request: Mutex<Option<(String, String, i32, Option<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl FetchCredentials for FakeFederation {
        async fn fetch_credentials(
            &self,
            request: FederationRequest<'_>,
        ) -> Result<CredentialDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some((
                request.role_arn.to_string(),
                request.session_name.to_string(),
                request.duration_seconds,
                request.provider_id.map(str::to_string),
            ));
            if self.fail {
                return Err(Error::Federation("AccessDenied".to_string()));
            }
            Ok(doc("ASIAFRESH", 3600))
        }
    }

    fn config(cache_file: PathBuf) -> Config {
        Config {
            role_arn: "arn:aws:iam::123456789012:role/app".to_string(),
            region: "eu-west-1".to_string(),
            web_identity_token: "token".to_string(),
            session_name: "session".to_string(),
            duration_seconds: 1800,
            provider_id: None,
            cache_file,
        }
    }

    fn process(dir: &TempDir, federation: FakeFederation) -> CredentialProcess<FakeFederation> {
        CredentialProcess::new(config(dir.path().join("creds.json")), federation)
    }

    #[tokio::test]
    async fn test_cache_absent_fetches_and_stores() {
        let dir = TempDir::new().unwrap();
        let process = process(&dir, FakeFederation::default());

        let credentials = process.get_credential_response(now()).await.unwrap();

        assert_eq!(credentials, doc("ASIAFRESH", 3600));
        assert_eq!(process.federation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            process.federation.last_request.lock().unwrap().clone(),
            Some((
                "arn:aws:iam::123456789012:role/app".to_string(),
                "session".to_string(),
                1800,
                None
            ))
        );
        assert_eq!(process.cache().load().await, Some(credentials));
    }

    #[tokio::test]
    async fn test_valid_cache_skips_federation() {
        let dir = TempDir::new().unwrap();
        let process = process(&dir, FakeFederation::default());
        let cached = doc("ASIACACHED", 7200);
        process.cache().store(&cached).await.unwrap();

        let credentials = process.get_credential_response(now()).await.unwrap();

        assert_eq!(credentials, cached);
        assert_eq!(process.federation.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_within_margin_refreshes() {
        let dir = TempDir::new().unwrap();
        let process = process(&dir, FakeFederation::default());
        process.cache().store(&doc("ASIAOLD", 100)).await.unwrap();

        let credentials = process.get_credential_response(now()).await.unwrap();

        assert_eq!(credentials.access_key_id.as_deref(), Some("ASIAFRESH"));
        assert_eq!(process.federation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(process.cache().load().await, Some(credentials));
    }

    #[tokio::test]
    async fn test_corrupt_cache_refreshes() {
        let dir = TempDir::new().unwrap();
        let process = process(&dir, FakeFederation::default());
        std::fs::write(process.cache().path(), "garbage").unwrap();

        let credentials = process.get_credential_response(now()).await.unwrap();

        assert_eq!(credentials.access_key_id.as_deref(), Some("ASIAFRESH"));
        assert_eq!(process.federation.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_incomplete_cache_refreshes() {
        let dir = TempDir::new().unwrap();
        let process = process(&dir, FakeFederation::default());
        let mut partial = doc("ASIAPARTIAL", 7200);
        partial.secret_access_key = None;
        process.cache().store(&partial).await.unwrap();

        process.get_credential_response(now()).await.unwrap();

        assert_eq!(process.federation.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_federation_failure_is_returned() {
        let dir = TempDir::new().unwrap();
        let process = process(
            &dir,
            FakeFederation {
                fail: true,
                ..Default::default()
            },
        );

        let err = process.get_credential_response(now()).await.unwrap_err();

        assert!(matches!(err, Error::Federation(_)));
        assert_eq!(process.cache().load().await, None);
    }

    #[tokio::test]
    async fn test_store_failure_still_returns_credentials() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let process = process(&dir, FakeFederation::default())
            .with_cache(Cache::new(blocker.join("creds.json")));

        let credentials = process.get_credential_response(now()).await.unwrap();

        assert_eq!(credentials.access_key_id.as_deref(), Some("ASIAFRESH"));
    }

    #[tokio::test]
    async fn test_run_prints_document() {
        let dir = TempDir::new().unwrap();
        let process = process(&dir, FakeFederation::default());
        let cached = doc("ASIACACHED", 7200);
        process.cache().store(&cached).await.unwrap();

        let mut out = Vec::new();
        process.run(now(), &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed, format!("{}\n", serde_json::to_string(&cached).unwrap()));
        assert_eq!(process.federation.calls.load(Ordering::SeqCst), 0);
    }

    async fn assert_run_refreshes(process: &CredentialProcess<FakeFederation>) {
        let mut out = Vec::new();
        process.run(now(), &mut out).await.unwrap();

        let fresh = serde_json::to_string(&doc("ASIAFRESH", 3600)).unwrap();
        assert_eq!(process.federation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(String::from_utf8(out).unwrap(), format!("{fresh}\n"));
        assert_eq!(
            std::fs::read_to_string(process.cache().path()).unwrap(),
            fresh
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(process.cache().path())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_run_without_cache_fetches_prints_and_stores() {
        let dir = TempDir::new().unwrap();
        let process = process(&dir, FakeFederation::default());
        assert!(!process.cache().path().exists());

        assert_run_refreshes(&process).await;
    }

    #[tokio::test]
    async fn test_run_with_expiring_cache_fetches_prints_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let process = process(&dir, FakeFederation::default());
        process.cache().store(&doc("ASIAOLD", 100)).await.unwrap();

        assert_run_refreshes(&process).await;
    }

    #[tokio::test]
    async fn test_run_prints_nothing_on_failure() {
        let dir = TempDir::new().unwrap();
        let process = process(
            &dir,
            FakeFederation {
                fail: true,
                ..Default::default()
            },
        );

        let mut out = Vec::new();
        assert!(process.run(now(), &mut out).await.is_err());
        assert!(out.is_empty());
    }
}
