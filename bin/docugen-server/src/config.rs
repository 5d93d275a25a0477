//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

use docugen_core::social::SocialCredentials;

/// Runtime configuration for docugen-server.
///
/// Every field has a default so the server starts without any environment
/// variables set; generations fail at the script stage until the text and
/// speech keys are provided.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Where voiceovers, videos and intermediates are written.
    pub media_dir: PathBuf,

    /// Inbound `X-API-Key` value; checking is off when unset.
    pub api_key: Option<String>,

    /// Comma-separated allowed CORS origins; any origin when unset.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_docs: bool,

    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,

    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: String,

    /// Stock photos; placeholders are used when unset.
    pub pexels_api_key: Option<String>,

    pub social: SocialCredentials,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("DOCUGEN_BIND", "0.0.0.0:8000"),
            log_level: env_or("DOCUGEN_LOG", "info"),
            log_json: parse_bool("DOCUGEN_LOG_JSON", false),
            media_dir: env_opt("DOCUGEN_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            api_key: env_opt("DOCUGEN_API_KEY"),
            cors_allowed_origins: env_opt("DOCUGEN_CORS_ORIGINS"),
            enable_docs: parse_bool("DOCUGEN_ENABLE_DOCS", true),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env_or("DOCUGEN_OPENAI_MODEL", docugen_core::providers::openai::DEFAULT_MODEL),
            openai_base_url: env_or("OPENAI_BASE_URL", docugen_core::providers::openai::DEFAULT_BASE_URL),
            elevenlabs_api_key: env_opt("ELEVENLABS_API_KEY"),
            elevenlabs_voice_id: env_or(
                "ELEVENLABS_VOICE_ID",
                docugen_core::providers::elevenlabs::DEFAULT_VOICE_ID,
            ),
            pexels_api_key: env_opt("PEXELS_API_KEY"),
            social: SocialCredentials {
                youtube_api_key: env_opt("YOUTUBE_API_KEY"),
                tiktok_access_token: env_opt("TIKTOK_ACCESS_TOKEN"),
                facebook_access_token: env_opt("FACEBOOK_ACCESS_TOKEN"),
                instagram_access_token: env_opt("INSTAGRAM_ACCESS_TOKEN"),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            media_dir: std::env::temp_dir(),
            api_key: None,
            cors_allowed_origins: None,
            enable_docs: true,
            openai_api_key: None,
            openai_model: docugen_core::providers::openai::DEFAULT_MODEL.to_owned(),
            openai_base_url: docugen_core::providers::openai::DEFAULT_BASE_URL.to_owned(),
            elevenlabs_api_key: None,
            elevenlabs_voice_id: docugen_core::providers::elevenlabs::DEFAULT_VOICE_ID.to_owned(),
            pexels_api_key: None,
            social: SocialCredentials::default(),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Unset and blank values both count as missing.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
