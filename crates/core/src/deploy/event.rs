//! Pipeline job event parsing.

use serde::Deserialize;
use serde_json::Value;

use crate::blob::{ArtifactCredentials, ObjectLocation};

/// Top-level key of a pipeline job event.
pub const JOB_KEY: &str = "CodePipeline.job";

/// What a deployment job hands to the deployer.
#[derive(Debug, Clone)]
pub struct JobInput {
    pub job_id: String,
    pub credentials: ArtifactCredentials,
    /// The pointer object produced by the upstream pipeline stage.
    pub location: ObjectLocation,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "CodePipeline.job")]
    job: RawJob,
}

#[derive(Deserialize)]
struct RawJob {
    id: String,
    data: RawJobData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJobData {
    artifact_credentials: ArtifactCredentials,
    input_artifacts: Vec<RawInputArtifact>,
}

#[derive(Deserialize)]
struct RawInputArtifact {
    location: RawArtifactLocation,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifactLocation {
    s3_location: RawS3Location,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawS3Location {
    bucket_name: String,
    object_key: String,
}

/// Extracts the job id, the one field needed to report anything at all.
pub fn extract_job_id(event: &Value) -> Option<&str> {
    event
        .get(JOB_KEY)?
        .get("id")?
        .as_str()
        .filter(|id| !id.trim().is_empty())
}

/// Parses the full job input. The first input artifact is the pointer.
pub fn parse_job_input(event: &Value) -> Result<JobInput, String> {
    let raw = RawEvent::deserialize(event).map_err(|e| format!("malformed job event: {}", e))?;

    let artifact = raw
        .job
        .data
        .input_artifacts
        .into_iter()
        .next()
        .ok_or_else(|| "job has no input artifacts".to_string())?;
    let s3 = artifact.location.s3_location;

    Ok(JobInput {
        job_id: raw.job.id,
        credentials: raw.job.data.artifact_credentials,
        location: ObjectLocation::new(s3.bucket_name, s3.object_key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::job_event;

    #[test]
    fn test_parse_job_input() {
        let event = job_event("job-1", "artifacts", "deploy/input.json");

        let input = parse_job_input(&event).unwrap();

        assert_eq!(input.job_id, "job-1");
        assert_eq!(input.location, ObjectLocation::new("artifacts", "deploy/input.json"));
        assert_eq!(input.credentials.access_key_id, "AKIDJOB");
    }

    #[test]
    fn test_extract_job_id_without_data() {
        let event = serde_json::json!({ "CodePipeline.job": { "id": "job-7" } });

        assert_eq!(extract_job_id(&event), Some("job-7"));
        assert!(parse_job_input(&event).is_err());
    }

    #[test]
    fn test_extract_job_id_missing() {
        assert_eq!(extract_job_id(&serde_json::json!({})), None);
        assert_eq!(
            extract_job_id(&serde_json::json!({ "CodePipeline.job": { "id": 7 } })),
            None
        );
        assert_eq!(
            extract_job_id(&serde_json::json!({ "CodePipeline.job": { "id": "" } })),
            None
        );
    }

    #[test]
    fn test_no_input_artifacts() {
        let mut event = job_event("job-1", "artifacts", "input.json");
        event[JOB_KEY]["data"]["inputArtifacts"] = serde_json::json!([]);

        let err = parse_job_input(&event).unwrap_err();

        assert_eq!(err, "job has no input artifacts");
    }
}
