use std::fmt;

/// Fixed text shown to the user whenever a generation stage fails
pub const GENERATION_FAILED_MESSAGE: &str
  = "Something is going wrong, Please try again.";

/// Custom error type for voice persona operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing from the environment
    MissingApiKey(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// HTTP request error
    HttpError(String)
  , /// API returned an error response
    ApiError(String)
  , /// Failed to parse API response
    ParseError(String)
  , /// Response JSON does not match the persona schema
    SchemaMismatch(String)
  , /// No choices in completion response
    NoChoicesInResponse
  , /// No image url in image response
    NoImageInResponse
  , /// Recognition engine cannot listen continuously
    UnsupportedPlatform
  , /// Recognition engine control failed
    RecognizerError(String)
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

impl Error
{   /// Message suitable for display in place of the raw detail
    pub fn user_message(&self) -> String
    {   match self
        {   Error::UnsupportedPlatform => {
              "This platform does not support speech recognition."
                .to_string()
            }
          , Error::MissingApiKey(var) => {
              format!("Missing API key, please set {}.", var)
            }
          , _ => GENERATION_FAILED_MESSAGE.to_string()
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(var) => {
              write!(f, "Missing API key: {} is not set", var)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::SchemaMismatch(msg) => {
              write!(f, "Persona schema mismatch: {}", msg)
            }
          , Error::NoChoicesInResponse => {
              write!(f, "API response contained no choices")
            }
          , Error::NoImageInResponse => {
              write!(f, "API response contained no image url")
            }
          , Error::UnsupportedPlatform => {
              write!(f,
                "Recognition engine lacks continuous listening"
              )
            }
          , Error::RecognizerError(msg) => {
              write!(f, "Recognizer error: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
