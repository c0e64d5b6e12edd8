use std::env;

pub const GENERATION_API_BASE: &str = "https://api.anthropic.com";
pub const GENERATION_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const GENERATION_MAX_TOKENS: u32 = 1024;
pub const LOGO_API_BASE: &str = "https://logo.clearbit.com";
pub const CUTOUT_API_BASE: &str = "https://api.remove.bg";

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: GENERATION_API_BASE.to_string(),
            api_key: None,
            model: GENERATION_MODEL.to_string(),
            max_tokens: GENERATION_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogoConfig {
    pub api_base: String,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            api_base: LOGO_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CutoutConfig {
    pub api_base: String,
    pub api_key: Option<String>,
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            api_base: CUTOUT_API_BASE.to_string(),
            api_key: None,
        }
    }
}

/// Endpoints and credentials for the three external services. The engine
/// itself never reads the environment; everything reaches it through this
/// struct.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub generation: GenerationConfig,
    pub logo: LogoConfig,
    pub cutout: CutoutConfig,
}

impl ServiceConfig {
    /// Reads endpoint overrides and credentials from the environment.
    /// Empty values count as unset; base urls lose trailing slashes.
    pub fn from_env() -> Self {
        Self {
            generation: GenerationConfig {
                api_base: base_from_env("ANTHROPIC_API_BASE", GENERATION_API_BASE),
                api_key: non_empty_env("ANTHROPIC_API_KEY"),
                ..GenerationConfig::default()
            },
            logo: LogoConfig {
                api_base: base_from_env("LOGO_API_BASE", LOGO_API_BASE),
            },
            cutout: CutoutConfig {
                api_base: base_from_env("REMOVE_BG_API_BASE", CUTOUT_API_BASE),
                api_key: non_empty_env("REMOVE_BG_API_KEY"),
            },
        }
    }
}

fn base_from_env(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
