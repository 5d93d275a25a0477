use docugen_core::{GenerationRecord, GenerationRequest, DEFAULT_ASPECT_RATIOS};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ServerError;

/// Body of `POST /api/generate-video`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateVideoRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub niche: String,
    /// Defaults to all three formats when omitted.
    #[serde(default)]
    pub aspect_ratios: Option<Vec<String>>,
    #[serde(default)]
    pub social_platforms: Option<Vec<String>>,
}

impl TryFrom<GenerateVideoRequest> for GenerationRequest {
    type Error = ServerError;

    fn try_from(req: GenerateVideoRequest) -> Result<Self, Self::Error> {
        if req.topic.trim().is_empty() || req.niche.trim().is_empty() {
            return Err(ServerError::BadRequest("Topic and niche are required".into()));
        }
        Ok(GenerationRequest {
            topic: req.topic,
            niche: req.niche,
            aspect_ratios: req
                .aspect_ratios
                .unwrap_or_else(|| DEFAULT_ASPECT_RATIOS.iter().map(|r| r.to_string()).collect()),
            social_platforms: req.social_platforms.unwrap_or_default(),
        })
    }
}

/// Body of `GET /api/generations`.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationList {
    /// Newest first.
    #[schema(value_type = Vec<Object>)]
    pub generations: Vec<GenerationRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Generations still running in the background.
    pub in_flight: usize,
}
