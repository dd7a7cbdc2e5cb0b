use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use log::{debug, trace, error};

use crate::request::{ChatMessage, GenerationRequest, GenerationTarget};

/// Longest prompt the image endpoint accepts
pub const IMAGE_PROMPT_MAX_CHARS: usize = 1000;

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , pub max_tokens: u32
  , pub top_p: f32
  , pub frequency_penalty: f32
  , pub presence_penalty: f32
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse
{   pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChatMessage
  , pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationRequest
{   pub model: String
  , pub prompt: String
  , pub n: u8
  , pub size: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationResponse
{   pub data: Vec<ImageData>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageData
{   #[serde(default)]
    pub url: Option<String>
}

/// Body for the chat completions endpoint
pub fn chat_body(request: &GenerationRequest) -> ChatCompletionRequest
{   ChatCompletionRequest
    {   model: request.model.clone()
      , messages: request.messages.clone()
      , temperature: request.sampling.temperature
      , max_tokens: request.sampling.max_tokens
      , top_p: request.sampling.top_p
      , frequency_penalty: request.sampling.frequency_penalty
      , presence_penalty: request.sampling.presence_penalty
    }
}

/// Body for the image generations endpoint.
/// The endpoint takes one prompt, so message contents are joined.
pub fn image_body(request: &GenerationRequest)
  -> Result<ImageGenerationRequest, crate::error::Error>
{   let (count, size) = match request.target
    {   GenerationTarget::Image { count, size } => (count, size)
      , GenerationTarget::TextCompletion => {
          return Err(crate::error::Error::InvalidConfiguration(
            "Image body requested for a text completion".to_string()
          ));
        }
    };

    let joined = request.messages
      .iter()
      .map(|m| m.content.as_str())
      .collect::<Vec<_>>()
      .join("\n\n");
    let prompt: String = joined
      .chars()
      .take(IMAGE_PROMPT_MAX_CHARS)
      .collect();

    Ok(ImageGenerationRequest
    {   model: request.model.clone()
      , prompt
      , n: count
      , size: size.as_str().to_string()
    })
}

fn first_choice_text(response: ChatCompletionResponse)
  -> Result<String, crate::error::Error>
{   response.choices
      .into_iter()
      .next()
      .map(|c| {
        trace!("Finish reason: {:?}", c.finish_reason);
        c.message.content
      })
      .ok_or_else(|| {
        error!("No choices in response");
        crate::error::Error::NoChoicesInResponse
      })
}

fn first_image_url(response: ImageGenerationResponse)
  -> Result<String, crate::error::Error>
{   response.data
      .into_iter()
      .find_map(|d| d.url.filter(|u| !u.is_empty()))
      .ok_or_else(|| {
        error!("No image url in response");
        crate::error::Error::NoImageInResponse
      })
}

fn http_error(e: reqwest::Error) -> crate::error::Error
{   if e.is_timeout()
    {   error!("Request timed out: {}", e);
        crate::error::Error::Timeout
    } else
    {   error!("HTTP error: {}", e);
        crate::error::Error::HttpError(e.to_string())
    }
}

// ===== OpenAI Client =====

/// Generation service client for the OpenAI HTTP API
pub struct OpenAiClient
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl OpenAiClient
{   pub fn new(config: &crate::config::ServiceConfig)
      -> Result<Self, crate::error::Error>
    {   debug!("Creating OpenAiClient for {}", config.api_base);
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(|e| {
          error!("Failed to build HTTP client: {}", e);
          crate::error::Error::HttpError(e.to_string())
        })?;

        Ok(OpenAiClient
        {   api_key: config.api_key.clone()
          , api_base: config.api_base.clone()
          , http_client
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B)
      -> Result<R, crate::error::Error>
    where B: Serialize
        , R: DeserializeOwned
    {   let response = self.http_client
          .post(format!("{}/{}", self.api_base, path))
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("Content-Type", "application/json")
          .json(body)
          .send()
          .await
          .map_err(http_error)?;

        let status = response.status();
        trace!("OpenAI {} response status: {}", path, status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("OpenAI API error: {} {}", status, error_text);
            return Err(crate::error::Error::ApiError(
              format!("{}: {}", status, error_text)
            ));
        }

        response.json().await.map_err(|e| {
          error!("Parse error: {}", e);
          crate::error::Error::ParseError(e.to_string())
        })
    }

    async fn handle_completion(
      &self
    , request: GenerationRequest
    ) -> Result<String, crate::error::Error>
    {   debug!("Handling completion for: {}", request.model);
        let body = chat_body(&request);
        trace!("Completion request: {:?}", body);
        let response: ChatCompletionResponse
          = self.post_json("chat/completions", &body).await?;
        first_choice_text(response)
    }

    async fn handle_image(
      &self
    , request: GenerationRequest
    ) -> Result<String, crate::error::Error>
    {   debug!("Handling image generation for: {}", request.model);
        let body = image_body(&request)?;
        trace!("Image request: {:?}", body);
        let response: ImageGenerationResponse
          = self.post_json("images/generations", &body).await?;
        first_image_url(response)
    }
}

impl super::GenerationService for OpenAiClient
{   fn complete(
      &self
    , request: GenerationRequest
    ) -> impl Future<Output = Result<String, crate::error::Error>> + Send
    {   self.handle_completion(request)
    }

    fn generate_image(
      &self
    , request: GenerationRequest
    ) -> impl Future<Output = Result<String, crate::error::Error>> + Send
    {   self.handle_image(request)
    }
}
