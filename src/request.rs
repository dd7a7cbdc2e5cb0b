//! Request types sent to the generation service

use serde::{Deserialize, Serialize};

/// Model used for persona attribute completion
pub const TEXT_MODEL: &str = "gpt-3.5-turbo";

/// Model used for profile picture generation
pub const IMAGE_MODEL: &str = "dall-e-2";

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: Role
  , pub content: String
}

impl ChatMessage
{   pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: Role::System
          , content: content.into()
        }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: Role::User
          , content: content.into()
        }
    }
}

/// Sampling parameters, fixed for every request in this system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams
{   pub temperature: f32
  , pub max_tokens: u32
  , pub top_p: f32
  , pub frequency_penalty: f32
  , pub presence_penalty: f32
}

impl SamplingParams
{   pub const FIXED: SamplingParams = SamplingParams
    {   temperature: 0.7
      , max_tokens: 1000
      , top_p: 1.0
      , frequency_penalty: 0.0
      , presence_penalty: 0.0
    };
}

impl Default for SamplingParams
{   fn default() -> Self
    {   SamplingParams::FIXED
    }
}

/// Output resolution accepted by the image endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize
{   #[serde(rename = "256x256")]
    Small
  , #[serde(rename = "512x512")]
    Medium
  , #[serde(rename = "1024x1024")]
    Large
}

impl ImageSize
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   ImageSize::Small => "256x256"
          , ImageSize::Medium => "512x512"
          , ImageSize::Large => "1024x1024"
        }
    }
}

/// Which service mode a request targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GenerationTarget
{   TextCompletion
  , Image
    {   count: u8
      , size: ImageSize
    }
}

/// One compiled call to the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub sampling: SamplingParams
  , pub target: GenerationTarget
}

impl GenerationRequest
{   fn content_for(&self, role: Role) -> Option<&str>
    {   self.messages
          .iter()
          .find(|m| m.role == role)
          .map(|m| m.content.as_str())
    }

    /// Content of the system instruction, if any
    pub fn system_content(&self) -> Option<&str>
    {   self.content_for(Role::System)
    }

    /// Content of the first user message, if any
    pub fn user_content(&self) -> Option<&str>
    {   self.content_for(Role::User)
    }
}
