use docugen_core::SocialUploads;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /api/upload-to-social`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadRequest {
    pub generation_id: String,
    #[serde(default)]
    pub platforms: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub generation_id: String,
    /// Platform name → `{status, message, url?, video_id?}`.
    #[schema(value_type = Object)]
    pub results: SocialUploads,
}
