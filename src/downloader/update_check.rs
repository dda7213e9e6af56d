// Weekly yt-dlp version check against the latest GitHub release
//
// The timestamp file is read then rewritten with no locking; two
// concurrent runs may both check.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use super::errors::DownloadError;
use super::tools::installed_version;

pub const CHECK_INTERVAL: Duration = Duration::days(7);

pub const LATEST_RELEASE_URL: &str = "https://api.github.com/repos/yt-dlp/yt-dlp/releases/latest";

/// Source of the current time
pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Persistence for the last check time
pub trait StampStore {
    fn last_check(&self) -> Option<OffsetDateTime>;
    fn record(&self, at: OffsetDateTime) -> io::Result<()>;
}

/// RFC 3339 timestamp in a plain text file
pub struct FileStampStore {
    path: PathBuf,
}

impl FileStampStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<cache dir>/vidgrab/last_update_check`
    pub fn default_location() -> Option<Self> {
        dirs::cache_dir().map(|d| Self::new(d.join("vidgrab").join("last_update_check")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StampStore for FileStampStore {
    fn last_check(&self) -> Option<OffsetDateTime> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        match OffsetDateTime::parse(text.trim(), &Rfc3339) {
            Ok(at) => Some(at),
            Err(e) => {
                tracing::debug!("Ignoring unreadable timestamp in {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn record(&self, at: OffsetDateTime) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = at
            .format(&Rfc3339)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, text)
    }
}

/// Never checked, a week has passed, or the stamp is in the future
pub fn is_due(clock: &dyn Clock, store: &dyn StampStore) -> bool {
    match store.last_check() {
        None => true,
        Some(last) => {
            let elapsed = clock.now() - last;
            elapsed >= CHECK_INTERVAL || elapsed.is_negative()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate(String),
    Outdated { installed: String, latest: String },
}

/// Compare version strings such as `2024.08.06` (a leading `v` is ignored)
pub fn compare(installed: &str, latest: &str) -> UpdateStatus {
    let clean = |v: &str| v.trim().trim_start_matches('v').to_string();
    let (installed, latest) = (clean(installed), clean(latest));
    if installed == latest {
        UpdateStatus::UpToDate(installed)
    } else {
        UpdateStatus::Outdated { installed, latest }
    }
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Tag of the latest yt-dlp release
pub async fn latest_release(client: &reqwest::Client) -> Result<String, DownloadError> {
    let release: Release = client
        .get(LATEST_RELEASE_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(release.tag_name)
}

pub struct UpdateChecker<C: Clock, S: StampStore> {
    clock: C,
    store: S,
    program: String,
    proxy: Option<String>,
}

impl<C: Clock, S: StampStore> UpdateChecker<C, S> {
    pub fn new(clock: C, store: S, program: impl Into<String>) -> Self {
        Self {
            clock,
            store,
            program: program.into(),
            proxy: None,
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Check if due. Failures are logged and swallowed.
    pub async fn run(&self) -> Option<UpdateStatus> {
        if !is_due(&self.clock, &self.store) {
            tracing::debug!("Update check not due yet");
            return None;
        }

        if let Err(e) = self.store.record(self.clock.now()) {
            tracing::debug!("Could not record update check time: {}", e);
        }

        match self.check().await {
            Ok(status) => {
                if let UpdateStatus::Outdated { installed, latest } = &status {
                    tracing::warn!(
                        "yt-dlp {} is out of date (latest is {}). Run `yt-dlp -U` to update.",
                        installed,
                        latest
                    );
                } else {
                    tracing::debug!("yt-dlp is up to date");
                }
                Some(status)
            }
            Err(e) => {
                tracing::debug!("Update check failed: {}", e);
                None
            }
        }
    }

    async fn check(&self) -> Result<UpdateStatus, DownloadError> {
        let installed = installed_version(&self.program).await?;

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("vidgrab/", env!("CARGO_PKG_VERSION")))
            .timeout(StdDuration::from_secs(10));
        if let Some(proxy) = self.proxy.as_deref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let client = builder.build()?;

        let latest = latest_release(&client).await?;
        Ok(compare(&installed, &latest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use time::macros::datetime;

    struct FixedClock(OffsetDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    #[derive(Default)]
    struct MemoryStore(Mutex<Option<OffsetDateTime>>);

    impl StampStore for MemoryStore {
        fn last_check(&self) -> Option<OffsetDateTime> {
            *self.0.lock().unwrap()
        }

        fn record(&self, at: OffsetDateTime) -> io::Result<()> {
            *self.0.lock().unwrap() = Some(at);
            Ok(())
        }
    }

    const NOW: OffsetDateTime = datetime!(2024-06-15 12:00 UTC);

    #[test]
    fn test_due_when_never_checked() {
        assert!(is_due(&FixedClock(NOW), &MemoryStore::default()));
    }

    #[test]
    fn test_not_due_within_a_week() {
        let store = MemoryStore::default();
        store.record(NOW - Duration::days(6)).unwrap();
        assert!(!is_due(&FixedClock(NOW), &store));
    }

    #[test]
    fn test_due_after_a_week() {
        let store = MemoryStore::default();
        store.record(NOW - Duration::days(7)).unwrap();
        assert!(is_due(&FixedClock(NOW), &store));
    }

    #[test]
    fn test_future_stamp_is_due() {
        let store = MemoryStore::default();
        store.record(NOW + Duration::hours(1)).unwrap();
        assert!(is_due(&FixedClock(NOW), &store));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStampStore::new(dir.path().join("cache").join("last_update_check"));
        assert!(store.last_check().is_none());

        store.record(NOW).unwrap();
        assert_eq!(store.last_check(), Some(NOW));

        std::fs::write(store.path(), "garbage").unwrap();
        assert!(store.last_check().is_none());
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(
            compare("2024.08.06\n", "2024.08.06"),
            UpdateStatus::UpToDate("2024.08.06".to_string())
        );
        assert_eq!(
            compare("2024.05.27", "v2024.08.06"),
            UpdateStatus::Outdated {
                installed: "2024.05.27".to_string(),
                latest: "2024.08.06".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_run_skips_when_not_due() {
        let store = MemoryStore::default();
        store.record(NOW - Duration::days(1)).unwrap();
        let checker = UpdateChecker::new(FixedClock(NOW), store, "/nonexistent/yt-dlp");
        assert!(checker.run().await.is_none());
    }

    #[tokio::test]
    async fn test_run_records_even_on_failure() {
        let checker = UpdateChecker::new(FixedClock(NOW), MemoryStore::default(), "/nonexistent/yt-dlp");
        assert!(checker.run().await.is_none());
        assert_eq!(checker.store.last_check(), Some(NOW));
    }
}
