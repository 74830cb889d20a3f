//! Per-job handler.
//!
//! Validates the job input, delegates to the pipeline, and maps the outcome
//! to a response. A failed job produces a structured error response; it never
//! terminates the serving process.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use facelift_models::{Job, JobResponse};

use crate::error::WorkerResult;
use crate::pipeline::VideoPipeline;

/// Seam between the handler and the pipeline.
#[async_trait]
pub trait Enhance: Send + Sync {
    /// Enhance the video at `url` and return the uploaded output URL.
    async fn enhance(&self, url: &str) -> WorkerResult<String>;
}

#[async_trait]
impl Enhance for VideoPipeline {
    async fn enhance(&self, url: &str) -> WorkerResult<String> {
        VideoPipeline::enhance(self, url).await
    }
}

/// Handles one job at a time on behalf of the job server.
#[derive(Clone)]
pub struct JobHandler {
    pipeline: Arc<dyn Enhance>,
}

impl JobHandler {
    /// Create a handler over the given pipeline.
    pub fn new(pipeline: Arc<dyn Enhance>) -> Self {
        Self { pipeline }
    }

    /// Process one job and build its response.
    pub async fn handle(&self, job: &Job) -> JobResponse {
        let url = match job.input_video_url() {
            Some(url) => url.to_string(),
            None => return JobResponse::missing_input_url(),
        };

        info!(job_id = %job.id, "Handling enhancement job");

        match self.pipeline.enhance(&url).await {
            Ok(output_url) => {
                info!(job_id = %job.id, "Job completed: {}", output_url);
                JobResponse::success(output_url)
            }
            Err(e) => {
                error!(job_id = %job.id, "Job failed: {}", e);
                JobResponse::failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use facelift_models::MISSING_INPUT_URL;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pipeline stub that records invocations.
    struct FakePipeline {
        calls: AtomicUsize,
        result: Result<String, String>,
    }

    impl FakePipeline {
        fn ok(url: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: Ok(url.to_string()),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: Err(msg.to_string()),
            }
        }
    }

    #[async_trait]
    impl Enhance for FakePipeline {
        async fn enhance(&self, _url: &str) -> WorkerResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(url) => Ok(url.clone()),
                Err(msg) => Err(WorkerError::processing_failed(msg.clone())),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_url_is_validation_error_without_side_effects() {
        let pipeline = Arc::new(FakePipeline::ok("unused"));
        let handler = JobHandler::new(Arc::clone(&pipeline) as Arc<dyn Enhance>);

        let job: Job = serde_json::from_str(r#"{"input": {}}"#).unwrap();
        let response = handler.handle(&job).await;

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            format!(r#"{{"error":"{}"}}"#, MISSING_INPUT_URL)
        );
        assert_eq!(
            pipeline.calls.load(Ordering::SeqCst),
            0,
            "no download may be attempted for invalid input"
        );
    }

    #[tokio::test]
    async fn test_success_response() {
        let pipeline = Arc::new(FakePipeline::ok("https://bucket/out.mp4"));
        let handler = JobHandler::new(Arc::clone(&pipeline) as Arc<dyn Enhance>);

        let job = Job::from_url("https://example.com/in.mp4");
        let response = handler.handle(&job).await;

        assert_eq!(response, JobResponse::success("https://bucket/out.mp4"));
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pipeline_error_becomes_structured_response() {
        let pipeline = Arc::new(FakePipeline::failing("encoder exited with status 1"));
        let handler = JobHandler::new(pipeline as Arc<dyn Enhance>);

        let job = Job::from_url("https://example.com/in.mp4");
        let response = handler.handle(&job).await;

        match response {
            JobResponse::Failure { error } => {
                assert!(error.contains("encoder exited with status 1"))
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
