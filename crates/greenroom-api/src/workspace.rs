//! On-disk layout of job uploads.
//!
//! Every job owns `<jobs_dir>/<job_id>/`. Uploads are stored as
//! `source_video.<ext>` and `background.<ext>`, keeping the extension the
//! client sent so the prober can tell videos from stills. Renders are written
//! into the same directory.

use std::io;
use std::path::{Path, PathBuf};

use greenroom_models::JobId;
use tokio::fs;

/// Which upload slot a file fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Source,
    Background,
}

impl UploadKind {
    /// File stem used on disk.
    pub fn stem(&self) -> &'static str {
        match self {
            UploadKind::Source => "source_video",
            UploadKind::Background => "background",
        }
    }
}

/// Root of all job directories.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by a job.
    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.root.join(job_id.as_str())
    }

    /// Create the job directory.
    pub async fn create_job_dir(&self, job_id: &JobId) -> io::Result<PathBuf> {
        let dir = self.job_dir(job_id);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Remove a job directory and everything in it.
    pub async fn remove_job_dir(&self, job_id: &JobId) -> io::Result<()> {
        match fs::remove_dir_all(self.job_dir(job_id)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Write an upload into its slot, keeping the client's file extension.
    pub async fn save_upload(
        &self,
        job_id: &JobId,
        kind: UploadKind,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> io::Result<PathBuf> {
        let dir = self.create_job_dir(job_id).await?;
        let path = dir.join(upload_file_name(kind, file_name));
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Locate a previously saved upload.
    pub async fn find_upload(&self, job_id: &JobId, kind: UploadKind) -> io::Result<Option<PathBuf>> {
        let mut entries = match fs::read_dir(self.job_dir(job_id)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut matches = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(kind.stem()) && path.is_file() {
                matches.push(path);
            }
        }
        matches.sort();
        Ok(matches.into_iter().next())
    }
}

/// On-disk name for an upload. Extensions are reduced to ASCII alphanumerics.
fn upload_file_name(kind: UploadKind, file_name: Option<&str>) -> String {
    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ext.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty());

    match extension {
        Some(ext) => format!("{}.{}", kind.stem(), ext),
        None => kind.stem().to_string(),
    }
}
