use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("manimator")
}

pub fn get_jobs_dir(root: &Path) -> PathBuf {
    root.join("jobs")
}

/// Where the subtitles of a finished video are copied next to it
pub fn get_subtitle_output_path(video_path: &Path) -> PathBuf {
    video_path.with_extension("ass")
}

/// Scratch directory for one job. Removed on drop unless kept.
#[derive(Debug)]
pub struct JobDir {
    id: Uuid,
    path: PathBuf,
    keep: bool,
}

impl JobDir {
    pub async fn create(root: &Path, keep: bool) -> Result<Self> {
        let id = Uuid::new_v4();
        let path = get_jobs_dir(root).join(id.to_string());
        tokio::fs::create_dir_all(&path).await?;
        debug!(path = %path.display(), "Created job directory");
        Ok(Self { id, path, keep })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for JobDir {
    fn drop(&mut self) {
        if self.keep {
            debug!(path = %self.path.display(), "Keeping job directory");
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Error removing job directory");
        }
    }
}
