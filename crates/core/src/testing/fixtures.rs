//! Test fixtures and helper functions.

use serde_json::{json, Value};

use crate::config::{Config, DeploymentConfig};

/// A pipeline job event pointing at `bucket/key`, with credentials that
/// never expire.
pub fn job_event(job_id: &str, bucket: &str, key: &str) -> Value {
    json!({
        "CodePipeline.job": {
            "id": job_id,
            "accountId": "111111111111",
            "data": {
                "actionConfiguration": { "configuration": { "FunctionName": "deploy" } },
                "inputArtifacts": [{
                    "name": "ApprovedModel",
                    "revision": null,
                    "location": {
                        "type": "S3",
                        "s3Location": { "bucketName": bucket, "objectKey": key }
                    }
                }],
                "outputArtifacts": [],
                "artifactCredentials": {
                    "accessKeyId": "AKIDJOB",
                    "secretAccessKey": "job-secret",
                    "sessionToken": "job-session"
                }
            }
        }
    })
}

/// A model package state change notification.
pub fn approval_event(model_family: &str, model_reference: &str, status: &str) -> Value {
    json!({
        "version": "0",
        "id": "4a1b2c3d-0000-0000-0000-000000000000",
        "source": "aws.sagemaker",
        "detail-type": "SageMaker Model Package State Change",
        "time": "2024-03-01T12:00:00Z",
        "detail": {
            "ModelPackageGroupName": model_family,
            "ModelPackageArn": model_reference,
            "ModelApprovalStatus": status,
            "ModelPackageVersion": 3
        }
    })
}

/// Deployment settings with the default endpoint shape.
pub fn deployment_config() -> DeploymentConfig {
    test_config().deployment
}

/// A complete configuration pointing at local placeholder services.
pub fn test_config() -> Config {
    let toml = r#"
[deployment]
execution_role = "arn:role/model-exec"
convergence_timeout_secs = 5
poll_interval_ms = 10

[control_plane]
url = "http://127.0.0.1:9400"

[coordinator]
url = "http://127.0.0.1:9500"
"#;
    crate::config::load_config_from_str(toml).expect("test config is valid")
}
