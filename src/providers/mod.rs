//! Generation service implementations

use std::future::Future;

pub mod openai;

// Re-export for convenience
pub use openai::OpenAiClient;

/// Boundary to the text and image generation service.
///
/// Calls take owned requests so they can run on spawned tasks.
pub trait GenerationService: Send + Sync + 'static
{   /// Run a text completion, returning the raw response text
    fn complete(
      &self
    , request: crate::request::GenerationRequest
    ) -> impl Future<Output = Result<String, crate::error::Error>> + Send;

    /// Run an image generation, returning the first result url
    fn generate_image(
      &self
    , request: crate::request::GenerationRequest
    ) -> impl Future<Output = Result<String, crate::error::Error>> + Send;
}
