use crate::error::{GlossaError, GlossaResult};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_BAILIAN_API_URL: &str = "https://dashscope.aliyuncs.com";

/// Backend credentials and endpoints, read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_url: String,
    pub bailian_api_key: Option<String>,
    pub bailian_app_id: Option<String>,
    pub bailian_api_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_url: DEFAULT_GEMINI_API_URL.to_string(),
            bailian_api_key: None,
            bailian_app_id: None,
            bailian_api_url: DEFAULT_BAILIAN_API_URL.to_string(),
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_api_url: get("GEMINI_API_URL").unwrap_or(defaults.gemini_api_url),
            bailian_api_key: get("BAILIAN_API_KEY"),
            bailian_app_id: get("BAILIAN_APP_ID"),
            bailian_api_url: get("BAILIAN_API_URL").unwrap_or(defaults.bailian_api_url),
        }
    }

    pub fn require_gemini_key(&self) -> GlossaResult<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            GlossaError::Config(
                "Gemini API key not configured (set GEMINI_API_KEY or API_KEY)".to_string(),
            )
        })
    }

    pub fn require_bailian(&self) -> GlossaResult<(&str, &str)> {
        match (self.bailian_api_key.as_deref(), self.bailian_app_id.as_deref()) {
            (Some(key), Some(app_id)) => Ok((key, app_id)),
            _ => Err(GlossaError::Config(
                "Bailian credentials not configured (set BAILIAN_API_KEY and BAILIAN_APP_ID)"
                    .to_string(),
            )),
        }
    }
}
