use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

use super::CredentialDocument;
use crate::{
    constants::SAFETY_MARGIN,
    error::{Result, cache_write_error},
};

/// File-backed cache for a single credential document
#[derive(Debug, Clone)]
pub struct Cache {
    path: PathBuf,
    safety_margin: Duration,
}

impl Cache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            safety_margin: SAFETY_MARGIN,
        }
    }

    pub fn with_safety_margin(mut self, safety_margin: Duration) -> Self {
        self.safety_margin = safety_margin;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Option<CredentialDocument> {
        load(&self.path).await
    }

    pub fn is_valid(&self, doc: &CredentialDocument, now: DateTime<Utc>) -> bool {
        is_valid(doc, now, self.safety_margin)
    }

    pub async fn store(&self, doc: &CredentialDocument) -> Result<()> {
        store(&self.path, doc).await
    }
}

/// Load a cached document; a missing or unparsable file yields `None`
pub async fn load(path: &Path) -> Option<CredentialDocument> {
    let contents = match fs::read(path).await {
        Ok(contents) => contents,
        Err(e) => {
            debug!("No usable credential cache at {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_slice(&contents) {
        Ok(doc) => Some(doc),
        Err(e) => {
            info!(
                "Ignoring unparsable credential cache {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Time left until `doc` expires, if it carries an expiration
pub fn remaining(doc: &CredentialDocument, now: DateTime<Utc>) -> Option<TimeDelta> {
    doc.expiration.map(|expiration| expiration - now)
}

/// True iff the document expires strictly more than `safety_margin` after `now`
pub fn is_valid(doc: &CredentialDocument, now: DateTime<Utc>, safety_margin: Duration) -> bool {
    let Ok(margin) = TimeDelta::from_std(safety_margin) else {
        return false;
    };

    remaining(doc, now).is_some_and(|left| left > margin)
}

/// Persist `doc` to `path` readable by the owner only
pub async fn store(path: &Path, doc: &CredentialDocument) -> Result<()> {
    let json = serde_json::to_vec(doc)?;

    // Existing directories keep their mode
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(parent)
            .await
            .map_err(|e| cache_write_error(parent, e))?;
    }

    // Secrets only ever land in an owner-only sibling, renamed over `path` once complete
    let staging = staging_path(path);
    if let Err(e) = write_owner_only(&staging, &json).await {
        let _ = fs::remove_file(&staging).await;
        return Err(cache_write_error(&staging, e));
    }
    if let Err(e) = fs::rename(&staging, path).await {
        let _ = fs::remove_file(&staging).await;
        return Err(cache_write_error(path, e));
    }

    debug!("Credentials cached at {}", path.display());
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

async fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;

    // `mode` only applies on creation; a leftover staging file is tightened before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = file.metadata().await?.permissions();
        if permissions.mode() & 0o777 != 0o600 {
            permissions.set_mode(0o600);
            file.set_permissions(permissions).await?;
        }
    }

    file.write_all(contents).await?;
    file.sync_all().await
}
