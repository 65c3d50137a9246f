//! Job lifecycle operations behind the HTTP and WebSocket handlers.
//!
//! Every request is validated here before anything is queued: settings are
//! checked once, uploads are located on disk and the composition plan is
//! built as a dry run so impossible compositions fail with a 400 instead of
//! a failed job.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use greenroom_media::{build_plan, MediaProber, PreviewRenderer};
use greenroom_models::{CompositionSettings, Job, JobId, RenderMode};
use greenroom_queue::{JobStore, RenderTask, TaskQueue};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::workspace::{JobWorkspace, UploadKind};

pub const SOURCE_REQUIRED: &str = "A source video file is always required.";
pub const BACKGROUND_REQUIRED: &str = "A background file is required for non-transparent exports.";
pub const SOURCE_UNREADABLE: &str = "Could not read source video properties.";
pub const JOB_NOT_UPLOADED: &str = "Job not found. Please upload files first.";
pub const JOB_NOT_FOUND: &str = "Job not found";
pub const RESULT_NOT_READY: &str = "Job not found or not completed";

/// A file received in a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Everything the upload form carried.
#[derive(Debug, Clone, Default)]
pub struct JobUpload {
    pub is_transparent: bool,
    pub source: Option<UploadedFile>,
    pub background: Option<UploadedFile>,
    pub settings: Option<CompositionSettings>,
}

/// Response body of a successful upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedJob {
    pub job_id: JobId,
    pub source_duration: f64,
    pub source_width: u32,
    pub source_height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_height: Option<u32>,
}

/// Job operations shared by all handlers.
#[derive(Clone)]
pub struct JobService {
    store: JobStore,
    queue: TaskQueue,
    prober: MediaProber,
    previews: Arc<PreviewRenderer>,
    workspace: JobWorkspace,
}

impl JobService {
    pub fn new(
        store: JobStore,
        queue: TaskQueue,
        prober: MediaProber,
        previews: PreviewRenderer,
        workspace: JobWorkspace,
    ) -> Self {
        Self {
            store,
            queue,
            prober,
            previews: Arc::new(previews),
            workspace,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn workspace(&self) -> &JobWorkspace {
        &self.workspace
    }

    /// Store the uploads, probe them and register an `uploaded` job.
    pub async fn create_job(&self, upload: JobUpload) -> ApiResult<CreatedJob> {
        let source = upload
            .source
            .ok_or_else(|| ApiError::bad_request(SOURCE_REQUIRED))?;
        if !upload.is_transparent && upload.background.is_none() {
            return Err(ApiError::bad_request(BACKGROUND_REQUIRED));
        }

        let job_id = JobId::new();
        let source_path = self
            .workspace
            .save_upload(&job_id, UploadKind::Source, source.file_name.as_deref(), &source.bytes)
            .await?;

        let source_properties = match self.prober.probe(&source_path).await {
            Ok(props) if props.has_dimensions() => props,
            Ok(_) => {
                warn!(job_id = %job_id, "Source probe returned no frame size");
                self.workspace.remove_job_dir(&job_id).await?;
                return Err(ApiError::internal(SOURCE_UNREADABLE));
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Source probe failed");
                self.workspace.remove_job_dir(&job_id).await?;
                return Err(ApiError::internal(SOURCE_UNREADABLE));
            }
        };

        let mut background_properties = None;
        if let Some(background) = upload.background {
            let background_path = self
                .workspace
                .save_upload(
                    &job_id,
                    UploadKind::Background,
                    background.file_name.as_deref(),
                    &background.bytes,
                )
                .await?;

            match self.prober.probe(&background_path).await {
                Ok(props) if props.has_dimensions() => background_properties = Some(props),
                Ok(_) => warn!(job_id = %job_id, "Background probe returned no frame size"),
                Err(e) => warn!(job_id = %job_id, error = %e, "Could not read background properties"),
            }
        }

        let mut job = Job::with_id(job_id.clone(), source_properties, background_properties);
        job.settings = upload.settings;
        self.store.create(job).await?;

        info!(
            job_id = %job_id,
            width = source_properties.width,
            height = source_properties.height,
            duration = source_properties.duration,
            has_background = background_properties.is_some(),
            "Job uploaded"
        );
        metrics::record_job_created();

        Ok(CreatedJob {
            job_id,
            source_duration: source_properties.duration,
            source_width: source_properties.width,
            source_height: source_properties.height,
            background_width: background_properties.map(|p| p.width),
            background_height: background_properties.map(|p| p.height),
        })
    }

    /// Validate settings and queue an export or preview render.
    pub async fn request_render(
        &self,
        job_id: &JobId,
        settings: CompositionSettings,
        mode: RenderMode,
    ) -> ApiResult<()> {
        let job = self.uploaded_job(job_id).await?;
        let settings = settings.validated()?;

        // Dry run: reject compositions the worker could never plan.
        build_plan(
            &settings,
            &job.source_properties,
            job.background_properties.as_ref(),
            mode,
        )
        .map_err(|e| ApiError::validation(e.public_message()))?;

        let source_path = self.source_path(job_id).await?;
        let background_path = if settings.transparent {
            None
        } else {
            let path = self
                .workspace
                .find_upload(job_id, UploadKind::Background)
                .await?
                .ok_or_else(|| ApiError::validation(BACKGROUND_REQUIRED))?;
            Some(path)
        };

        let task = RenderTask::new(job_id.clone(), source_path, settings.clone(), mode)
            .with_background(background_path)
            .with_output_dir(self.workspace.job_dir(job_id));

        self.store
            .update(job_id, |job| job.enqueue(settings, mode))
            .await?;
        if let Err(e) = self.queue.enqueue(task) {
            self.store
                .update(job_id, |job| job.fail("Failed to queue job."))
                .await?;
            return Err(e.into());
        }

        info!(job_id = %job_id, mode = %mode, depth = self.queue.depth(), "Render queued");
        metrics::record_job_enqueued(mode.as_str());
        Ok(())
    }

    /// Current snapshot of a job.
    pub async fn get_status(&self, job_id: &JobId) -> ApiResult<Job> {
        if !job_id.is_well_formed() {
            return Err(ApiError::not_found(JOB_NOT_FOUND));
        }
        self.store.get(job_id).await.map_err(|e| {
            if e.is_not_found() {
                ApiError::not_found(JOB_NOT_FOUND)
            } else {
                e.into()
            }
        })
    }

    /// Path of the finished export or preview render.
    pub async fn fetch_result(&self, job_id: &JobId) -> ApiResult<PathBuf> {
        let job = self
            .get_status(job_id)
            .await
            .map_err(|_| ApiError::not_found(RESULT_NOT_READY))?;

        match job.result_path() {
            Some(path) if path.is_file() => Ok(path.clone()),
            _ => Err(ApiError::not_found(RESULT_NOT_READY)),
        }
    }

    /// Render one preview still for an interactive session.
    pub async fn render_preview_frame(
        &self,
        job_id: &JobId,
        settings: CompositionSettings,
    ) -> ApiResult<String> {
        let job = self.get_status(job_id).await?;
        let settings = settings.validated()?;
        let source_path = self.source_path(job_id).await?;

        let image = self
            .previews
            .render(&source_path, &job.source_properties, &settings)
            .await?;
        Ok(image)
    }

    /// The job, or the 404 clients see before they have uploaded anything.
    pub async fn uploaded_job(&self, job_id: &JobId) -> ApiResult<Job> {
        if !job_id.is_well_formed() {
            return Err(ApiError::not_found(JOB_NOT_UPLOADED));
        }
        self.store
            .get(job_id)
            .await
            .map_err(|_| ApiError::not_found(JOB_NOT_UPLOADED))
    }

    async fn source_path(&self, job_id: &JobId) -> ApiResult<PathBuf> {
        self.workspace
            .find_upload(job_id, UploadKind::Source)
            .await?
            .ok_or_else(|| ApiError::internal("Source file missing on server."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenroom_media::testing::{ScriptedEngine, ScriptedRun};
    use greenroom_models::{JobStatus, MediaProperties};
    use greenroom_queue::{task_queue, TaskReceiver};

    struct Fixture {
        service: JobService,
        receiver: TaskReceiver,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let (queue, receiver) = task_queue();
        let engine = Arc::new(ScriptedEngine::new(ScriptedRun::success()));
        let service = JobService::new(
            JobStore::new(),
            queue,
            MediaProber::new("ffprobe"),
            PreviewRenderer::new(engine, 10),
            JobWorkspace::new(dir.path()),
        );
        Fixture {
            service,
            receiver,
            _dir: dir,
        }
    }

    async fn seed(service: &JobService, background: bool) -> JobId {
        let id = JobId::new();
        service
            .workspace()
            .save_upload(&id, UploadKind::Source, Some("a.mp4"), b"src")
            .await
            .unwrap();
        let background_properties = if background {
            service
                .workspace()
                .save_upload(&id, UploadKind::Background, Some("bg.png"), b"bg")
                .await
                .unwrap();
            Some(MediaProperties::still(1920, 1080))
        } else {
            None
        };
        let job = Job::with_id(id.clone(), MediaProperties::new(1280, 720, 10.0), background_properties);
        service.store().create(job).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_upload_requires_source() {
        let f = fixture();
        let err = f.service.create_job(JobUpload::default()).await.unwrap_err();
        assert_eq!(err.to_string(), SOURCE_REQUIRED);
    }

    #[tokio::test]
    async fn test_opaque_upload_requires_background() {
        let f = fixture();
        let upload = JobUpload {
            source: Some(UploadedFile {
                file_name: Some("a.mp4".to_string()),
                bytes: Bytes::from_static(b"x"),
            }),
            ..JobUpload::default()
        };
        let err = f.service.create_job(upload).await.unwrap_err();
        assert_eq!(err.to_string(), BACKGROUND_REQUIRED);
    }

    #[tokio::test]
    async fn test_export_is_queued() {
        let mut f = fixture();
        let id = seed(&f.service, true).await;

        f.service
            .request_render(&id, CompositionSettings::default(), RenderMode::Export)
            .await
            .unwrap();

        let job = f.service.get_status(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);

        let task = f.receiver.recv().await.unwrap();
        assert_eq!(task.job_id, id);
        assert!(task.background_path.is_some());
        assert_eq!(task.output_dir, f.service.workspace().job_dir(&id));
    }

    #[tokio::test]
    async fn test_transparent_preview_has_no_background() {
        let mut f = fixture();
        let id = seed(&f.service, true).await;
        let settings = CompositionSettings {
            transparent: true,
            ..CompositionSettings::default()
        };

        f.service
            .request_render(&id, settings, RenderMode::Preview)
            .await
            .unwrap();

        assert_eq!(
            f.service.get_status(&id).await.unwrap().status,
            JobStatus::PreviewQueued
        );
        assert!(f.receiver.recv().await.unwrap().background_path.is_none());
    }

    #[tokio::test]
    async fn test_opaque_export_without_background_is_rejected() {
        let f = fixture();
        let id = seed(&f.service, false).await;

        let err = f
            .service
            .request_render(&id, CompositionSettings::default(), RenderMode::Export)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(
            f.service.get_status(&id).await.unwrap().status,
            JobStatus::Uploaded
        );
    }

    #[tokio::test]
    async fn test_invalid_settings_are_rejected() {
        let f = fixture();
        let id = seed(&f.service, true).await;
        let settings = CompositionSettings {
            similarity: 3.0,
            ..CompositionSettings::default()
        };

        let err = f
            .service
            .request_render(&id, settings, RenderMode::Export)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let f = fixture();
        let err = f
            .service
            .request_render(&JobId::new(), CompositionSettings::default(), RenderMode::Export)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), JOB_NOT_UPLOADED);

        let err = f.service.get_status(&JobId::from("../x")).await.unwrap_err();
        assert_eq!(err.to_string(), JOB_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_result_only_after_completion() {
        let f = fixture();
        let id = seed(&f.service, true).await;
        assert!(f.service.fetch_result(&id).await.is_err());

        let output = f.service.workspace().job_dir(&id).join("output.mp4");
        tokio::fs::write(&output, b"rendered").await.unwrap();
        let path = output.clone();
        f.service
            .store()
            .update(&id, move |job| job.complete(RenderMode::Export, path))
            .await
            .unwrap();

        assert_eq!(f.service.fetch_result(&id).await.unwrap(), output);
    }

    #[tokio::test]
    async fn test_preview_frame() {
        let f = fixture();
        let id = seed(&f.service, false).await;

        let image = f
            .service
            .render_preview_frame(&id, CompositionSettings::default())
            .await
            .unwrap();
        assert!(image.starts_with("data:image/png;base64,"));
    }
}
