//! Job request and response types.
//!
//! The job server delivers jobs as an opaque mapping of named inputs. The
//! only field the handler requires is `input_video_url`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Validation message returned when a job arrives without a video URL.
pub const MISSING_INPUT_URL: &str = "'input_video_url' is required in job input.";

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of work submitted to the serving process.
///
/// Consumed once by the handler and discarded after the response is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Job ID assigned by the job server (generated when absent).
    #[serde(default)]
    pub id: JobId,

    /// Named job inputs. Only `input_video_url` is interpreted here.
    #[serde(default)]
    pub input: HashMap<String, Value>,
}

impl Job {
    /// Build a job from a single video URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        let mut input = HashMap::new();
        input.insert("input_video_url".to_string(), Value::String(url.into()));
        Self {
            id: JobId::new(),
            input,
        }
    }

    /// Extract the required `input_video_url` field, if present and a string.
    pub fn input_video_url(&self) -> Option<&str> {
        self.input.get("input_video_url").and_then(Value::as_str)
    }
}

/// Response returned to the job server.
///
/// Exactly one of the two variants is ever populated, mirroring the
/// result/error pair contract used throughout the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResponse {
    /// Successful run: URL of the uploaded enhanced video.
    Success { output_video_url: String },
    /// Failed run: human-readable cause.
    Failure { error: String },
}

impl JobResponse {
    /// Build a success response.
    pub fn success(url: impl Into<String>) -> Self {
        Self::Success {
            output_video_url: url.into(),
        }
    }

    /// Build a failure response.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Build the validation failure for a missing video URL.
    pub fn missing_input_url() -> Self {
        Self::failure(MISSING_INPUT_URL)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
