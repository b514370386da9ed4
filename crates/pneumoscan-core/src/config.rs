//! Configuration module
//!
//! Client configuration is read from environment variables (with `.env` support),
//! covering the remote service URLs, authentication and the upload preprocessing knobs.

use std::env;
use std::time::Duration;

// Common constants
const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_HEATMAP_URL: &str = "http://localhost:8001";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const PREPROCESS_THRESHOLD_BYTES: usize = 1024 * 1024;
const PREPROCESS_MAX_EDGE: u32 = 800;
const PREPROCESS_JPEG_QUALITY: u8 = 80;
const PREPROCESS_DECODE_TIMEOUT_MS: u64 = 10_000;

/// Which classification endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyzeEndpoint {
    #[default]
    Standard,
    Optimized,
}

impl AnalyzeEndpoint {
    pub fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(AnalyzeEndpoint::Standard),
            "optimized" => Ok(AnalyzeEndpoint::Optimized),
            _ => Err(anyhow::anyhow!("Invalid analyze endpoint: {}", s)),
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            AnalyzeEndpoint::Standard => "/api/analyze",
            AnalyzeEndpoint::Optimized => "/api/analyze-optimized",
        }
    }
}

/// Which heat-map endpoint version to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeatmapVersion {
    #[default]
    V1,
    V2,
}

impl HeatmapVersion {
    pub fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.trim().to_lowercase().as_str() {
            "v1" | "1" => Ok(HeatmapVersion::V1),
            "v2" | "2" => Ok(HeatmapVersion::V2),
            _ => Err(anyhow::anyhow!("Invalid heat-map version: {}", s)),
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            HeatmapVersion::V1 => "/eigencam",
            HeatmapVersion::V2 => "/v2/eigencam",
        }
    }
}

/// How the API key is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `X-API-Key: {key}`
    #[default]
    XApiKey,
    /// `Authorization: Bearer {key}`
    Bearer,
}

impl AuthScheme {
    pub fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.trim().to_lowercase().as_str() {
            "x-api-key" | "api-key" => Ok(AuthScheme::XApiKey),
            "bearer" => Ok(AuthScheme::Bearer),
            _ => Err(anyhow::anyhow!("Invalid auth scheme: {}", s)),
        }
    }
}

/// Upload preprocessing configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreprocessSettings {
    /// Files at or below this size are uploaded untouched
    pub size_threshold_bytes: usize,
    /// Cap applied to the longer edge
    pub max_edge: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Upper bound for decode + resize + encode
    pub decode_timeout: Duration,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            size_threshold_bytes: PREPROCESS_THRESHOLD_BYTES,
            max_edge: PREPROCESS_MAX_EDGE,
            jpeg_quality: PREPROCESS_JPEG_QUALITY,
            decode_timeout: Duration::from_millis(PREPROCESS_DECODE_TIMEOUT_MS),
        }
    }
}

impl PreprocessSettings {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_edge == 0 {
            return Err(anyhow::anyhow!("PREPROCESS_MAX_EDGE must be greater than 0"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow::anyhow!(
                "PREPROCESS_JPEG_QUALITY must be between 1 and 100"
            ));
        }
        if self.decode_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "PREPROCESS_DECODE_TIMEOUT_MS must be greater than 0"
            ));
        }
        Ok(())
    }
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub heatmap_url: String,
    pub api_key: Option<String>,
    pub auth_scheme: AuthScheme,
    pub request_timeout: Duration,
    pub analyze_endpoint: AnalyzeEndpoint,
    pub heatmap_version: HeatmapVersion,
    pub preprocess: PreprocessSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            heatmap_url: DEFAULT_HEATMAP_URL.to_string(),
            api_key: None,
            auth_scheme: AuthScheme::default(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            analyze_endpoint: AnalyzeEndpoint::default(),
            heatmap_version: HeatmapVersion::default(),
            preprocess: PreprocessSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Load from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset or empty keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let api_url = var("PNEUMOSCAN_API_URL")
            .or_else(|| var("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let heatmap_url =
            var("PNEUMOSCAN_HEATMAP_URL").unwrap_or_else(|| DEFAULT_HEATMAP_URL.to_string());

        let auth_scheme = match var("PNEUMOSCAN_AUTH_SCHEME") {
            Some(s) => AuthScheme::parse(&s)?,
            None => AuthScheme::default(),
        };

        let analyze_endpoint = match var("PNEUMOSCAN_ANALYZE_ENDPOINT") {
            Some(s) => AnalyzeEndpoint::parse(&s)?,
            None => AnalyzeEndpoint::default(),
        };

        let heatmap_version = match var("PNEUMOSCAN_HEATMAP_VERSION") {
            Some(s) => HeatmapVersion::parse(&s)?,
            None => HeatmapVersion::default(),
        };

        let request_timeout_secs: u64 = var("PNEUMOSCAN_REQUEST_TIMEOUT_SECS")
            .map(|s| s.trim().parse())
            .transpose()
            .map_err(|_| anyhow::anyhow!("PNEUMOSCAN_REQUEST_TIMEOUT_SECS must be a valid number"))?
            .unwrap_or(REQUEST_TIMEOUT_SECS);

        let preprocess = PreprocessSettings {
            size_threshold_bytes: var("PREPROCESS_THRESHOLD_BYTES")
                .map(|s| s.trim().parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("PREPROCESS_THRESHOLD_BYTES must be a valid number"))?
                .unwrap_or(PREPROCESS_THRESHOLD_BYTES),
            max_edge: var("PREPROCESS_MAX_EDGE")
                .map(|s| s.trim().parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("PREPROCESS_MAX_EDGE must be a valid number"))?
                .unwrap_or(PREPROCESS_MAX_EDGE),
            jpeg_quality: var("PREPROCESS_JPEG_QUALITY")
                .map(|s| s.trim().parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("PREPROCESS_JPEG_QUALITY must be a valid number"))?
                .unwrap_or(PREPROCESS_JPEG_QUALITY),
            decode_timeout: Duration::from_millis(
                var("PREPROCESS_DECODE_TIMEOUT_MS")
                    .map(|s| s.trim().parse())
                    .transpose()
                    .map_err(|_| {
                        anyhow::anyhow!("PREPROCESS_DECODE_TIMEOUT_MS must be a valid number")
                    })?
                    .unwrap_or(PREPROCESS_DECODE_TIMEOUT_MS),
            ),
        };

        let config = ClientConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            heatmap_url: heatmap_url.trim_end_matches('/').to_string(),
            api_key: var("PNEUMOSCAN_API_KEY"),
            auth_scheme,
            request_timeout: Duration::from_secs(request_timeout_secs),
            analyze_endpoint,
            heatmap_version,
            preprocess,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (name, url) in [
            ("PNEUMOSCAN_API_URL", &self.api_url),
            ("PNEUMOSCAN_HEATMAP_URL", &self.heatmap_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!(
                    "{} must be an http:// or https:// URL, got '{}'",
                    name,
                    url
                ));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "PNEUMOSCAN_REQUEST_TIMEOUT_SECS must be greater than 0"
            ));
        }

        self.preprocess.validate()
    }
}
