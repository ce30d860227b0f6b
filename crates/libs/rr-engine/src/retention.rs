//! Age-based removal of report artifacts.
//!
//! Only artifact directories under the reports root are considered. The
//! raw-result pool and the project ledgers are left alone, so the index may
//! keep pointing at removed artifacts.

use std::{
    fs,
    path::Path,
    time::{Duration, SystemTime},
};

use tracing::{debug, info, warn};

use crate::prelude::*;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Remove artifact directories last modified more than `days_to_keep` days ago.
///
/// Returns how many directories were removed.
pub fn cleanup_artifacts(reports_dir: &Path, days_to_keep: u32) -> Result<usize> {
    let max_age = Duration::from_secs(u64::from(days_to_keep) * SECONDS_PER_DAY);
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    cleanup_artifacts_before(reports_dir, cutoff)
}

/// Remove artifact directories last modified before `cutoff`.
pub fn cleanup_artifacts_before(reports_dir: &Path, cutoff: SystemTime) -> Result<usize> {
    let entries = match fs::read_dir(reports_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("Reports root {} doesn't exist", reports_dir.display());
            return Ok(0);
        }
        Err(err) => return Err(err.into()),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Failed to read entry of {} - {err}", reports_dir.display());
                continue;
            }
        };
        let path = entry.path();
        let modified = match entry.metadata().and_then(|meta| {
            if meta.is_dir() {
                meta.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(err) => {
                warn!("Failed to inspect {} - {err}", path.display());
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                debug!("Removed expired artifact {}", path.display());
                removed += 1;
            }
            Err(err) => warn!("Failed to remove {} - {err}", path.display()),
        }
    }

    info!("Retention removed {removed} artifact(s) from {}", reports_dir.display());
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::fs::{File, FileTimes};

    use super::*;

    fn age(path: &Path, days: u64) -> std::io::Result<()> {
        let modified = SystemTime::now() - Duration::from_secs(days * SECONDS_PER_DAY);
        File::open(path)?.set_times(FileTimes::new().set_modified(modified))
    }

    #[test]
    fn only_expired_directories_are_removed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let reports = dir.path();
        for (name, days) in [("ten", 10), ("three", 3), ("eight", 8)] {
            fs::create_dir(reports.join(name))?;
            fs::write(reports.join(name).join("index.html"), "report")?;
            age(&reports.join(name), days)?;
        }
        fs::write(reports.join("stray.html"), "not an artifact")?;
        age(&reports.join("stray.html"), 30)?;

        assert_eq!(cleanup_artifacts(reports, 7)?, 2);
        assert!(!reports.join("ten").exists());
        assert!(!reports.join("eight").exists());
        assert!(reports.join("three").join("index.html").exists());
        assert!(reports.join("stray.html").exists());
        Ok(())
    }

    #[test]
    fn missing_reports_root_removes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert_eq!(cleanup_artifacts(&dir.path().join("reports"), 7)?, 0);
        Ok(())
    }

    #[test]
    fn zero_days_removes_everything_older_than_now() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("recent"))?;
        age(&dir.path().join("recent"), 1)?;

        let cutoff = SystemTime::now();
        assert_eq!(cleanup_artifacts_before(dir.path(), cutoff)?, 1);
        Ok(())
    }
}
