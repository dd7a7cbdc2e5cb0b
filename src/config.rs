//! Configuration for the generation service, read from the environment

use serde::{Deserialize, Serialize};
use log::{debug, error};

/// Primary variable holding the service credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Fallback variable name kept for older setups
pub const LEGACY_API_KEY_ENV: &str = "VITE_OPENAI_API_KEY";

pub const API_BASE_ENV: &str = "VOICE_PERSONA_API_BASE";

pub const TIMEOUT_ENV: &str = "VOICE_PERSONA_TIMEOUT_SECS";

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Generation service configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig
{   /// Secret credential sent as a bearer token
    pub api_key: String
  , /// API base URL
    pub api_base: String
  , /// Request timeout in seconds, handed to the HTTP client
    pub timeout_secs: Option<u64>
}

impl std::fmt::Debug for ServiceConfig
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.debug_struct("ServiceConfig")
          .field("api_key", &"<redacted>")
          .field("api_base", &self.api_base)
          .field("timeout_secs", &self.timeout_secs)
          .finish()
    }
}

impl ServiceConfig
{   /// Build a config with defaults around a known key
    pub fn new(api_key: String) -> Self
    {   ServiceConfig
        {   api_key
          , api_base: DEFAULT_API_BASE.to_string()
          , timeout_secs: None
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, crate::error::Error>
    {   Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F)
      -> Result<Self, crate::error::Error>
    where F: Fn(&str) -> Option<String>
    {   let non_blank = |name: &str| {
          lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        };

        let api_key = non_blank(API_KEY_ENV)
          .or_else(|| non_blank(LEGACY_API_KEY_ENV))
          .ok_or_else(|| {
            error!("{} is not set", API_KEY_ENV);
            crate::error::Error::MissingApiKey(
              API_KEY_ENV.to_string()
            )
          })?;

        let api_base = non_blank(API_BASE_ENV)
          .map(|b| b.trim_end_matches('/').to_string())
          .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let timeout_secs = match non_blank(TIMEOUT_ENV)
        {   Some(raw) => Some(raw.parse::<u64>().map_err(|e| {
              error!("Bad {}: {}", TIMEOUT_ENV, e);
              crate::error::Error::InvalidConfiguration(
                format!("{}={:?}: {}", TIMEOUT_ENV, raw, e)
              )
            })?)
          , None => None
        };

        let config = ServiceConfig
        {   api_key
          , api_base
          , timeout_secs
        };
        debug!("Loaded {:?}", config);
        Ok(config)
    }
}
