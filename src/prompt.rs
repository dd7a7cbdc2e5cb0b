//! Compiles profile inputs into generation requests.
//!
//! Both compilers are pure: the same input always yields the same request.

use serde::Serialize;

use crate::request::{
  ChatMessage, GenerationRequest, GenerationTarget, ImageSize,
  SamplingParams, IMAGE_MODEL, TEXT_MODEL,
};

/// Input fields sent to the persona completion, in wire order
pub const PERSONA_INPUT_FIELDS: &[&str] = &["preferences", "interests"];

/// Output fields expected back, in `PersonaAttributes` order
pub const PERSONA_OUTPUT_FIELDS: &[&str] = &[
  "full_name"
, "age"
, "interests_tags"
, "works_at"
, "top_5_professions"
, "job_title"
, "country"
, "city"
, "skin_color"
, "hair_color"
, "eye_color"
, "hair_length_cm"
, "height_cm"
, "hair_style"
, "gender"
];

pub const IMAGE_INSTRUCTION: &str
  = "The text is a json object which describes the persona of the person \
     for generating a profile picture consistent with the supplied persona JSON";

pub const IMAGE_SIZE: ImageSize = ImageSize::Small;

#[derive(Serialize)]
struct PersonaInput<'a>
{   preferences: &'a str
  , interests: &'a [String]
}

/// System instruction naming the input and output contract
pub fn persona_instruction() -> String
{   format!(
      "The text is a json object with {} to describe a persona to generate.\n\
       The answer is a json with the properties: {}",
      PERSONA_INPUT_FIELDS.join(", "),
      PERSONA_OUTPUT_FIELDS.join(", ")
    )
}

/// Request for the persona attributes of the given profile inputs
pub fn compile_persona_request(profile: &crate::profile::Profile)
  -> Result<GenerationRequest, crate::error::Error>
{   let input = PersonaInput
    {   preferences: &profile.preferences
      , interests: &profile.interests
    };
    let user_content = serde_json::to_string(&input).map_err(|e| {
      crate::error::Error::ParseError(e.to_string())
    })?;

    Ok(GenerationRequest
    {   model: TEXT_MODEL.to_string()
      , messages: vec![
          ChatMessage::system(persona_instruction())
        , ChatMessage::user(user_content)
        ]
      , sampling: SamplingParams::FIXED
      , target: GenerationTarget::TextCompletion
    })
}

/// Request for a profile picture of an already serialized persona
pub fn compile_image_request(persona_json: &str) -> GenerationRequest
{   GenerationRequest
    {   model: IMAGE_MODEL.to_string()
      , messages: vec![
          ChatMessage::system(IMAGE_INSTRUCTION)
        , ChatMessage::user(persona_json)
        ]
      , sampling: SamplingParams::FIXED
      , target: GenerationTarget::Image
        {   count: 1
          , size: IMAGE_SIZE
        }
    }
}
