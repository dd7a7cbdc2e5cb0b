//! Profile state read by the display layer

use serde::{Deserialize, Serialize};
use log::debug;

/// Generated descriptive attributes of a persona.
///
/// Field order is the response schema order and is kept when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonaAttributes
{   pub full_name: String
  , pub age: u32
  , pub interests_tags: Vec<String>
  , pub works_at: String
  , pub top_5_professions: Vec<String>
  , pub job_title: String
  , pub country: String
  , pub city: String
  , pub skin_color: String
  , pub hair_color: String
  , pub eye_color: String
  , pub hair_length_cm: u32
  , pub height_cm: u32
  , pub hair_style: String
  , pub gender: String
}

impl PersonaAttributes
{   /// Parse a service response into a persona.
    /// Missing or unknown fields are a schema mismatch.
    pub fn from_response_text(text: &str)
      -> Result<Self, crate::error::Error>
    {   serde_json::from_str(text.trim()).map_err(|e| {
          crate::error::Error::SchemaMismatch(e.to_string())
        })
    }
}

impl Default for PersonaAttributes
{   /// Placeholder shown before anything has been generated
    fn default() -> Self
    {   PersonaAttributes
        {   full_name: "string".to_string()
          , age: 0
          , interests_tags: vec![]
          , works_at: "company name".to_string()
          , top_5_professions: vec![]
          , job_title: "string".to_string()
          , country: "string".to_string()
          , city: "string".to_string()
          , skin_color: "#rrggbb".to_string()
          , hair_color: "#rrggbb".to_string()
          , eye_color: "#rrggbb".to_string()
          , hair_length_cm: 0
          , height_cm: 0
          , hair_style: "string".to_string()
          , gender: "string".to_string()
        }
    }
}

/// The currently displayed persona and its generation inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile
{   /// Image URL, empty until generated
    pub photo: String
  , pub preferences: String
  , pub interests: Vec<String>
  , pub persona: PersonaAttributes
}

impl Profile
{   /// New value carrying fresh generation inputs
    pub fn with_inputs(
      &self
    , preferences: String
    , interests: Vec<String>
    ) -> Profile
    {   Profile
        {   preferences
          , interests
          , ..self.clone()
        }
    }

    /// New value with the persona replaced wholesale
    pub fn with_persona(&self, persona: PersonaAttributes) -> Profile
    {   Profile
        {   persona
          , ..self.clone()
        }
    }

    /// New value with the photo replaced
    pub fn with_photo(&self, photo: String) -> Profile
    {   Profile
        {   photo
          , ..self.clone()
        }
    }

    pub fn has_photo(&self) -> bool
    {   !self.photo.is_empty()
    }
}

/// Single mutable container for the profile, message and loading flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileState
{   profile: Profile
  , message: String
  , loading: bool
}

impl ProfileState
{   pub fn new() -> Self
    {   ProfileState::default()
    }

    pub fn profile(&self) -> &Profile
    {   &self.profile
    }

    pub fn message(&self) -> &str
    {   &self.message
    }

    pub fn loading(&self) -> bool
    {   self.loading
    }

    /// Swap in a complete new profile value
    pub fn replace(&mut self, profile: Profile)
    {   debug!("Replacing profile");
        self.profile = profile;
    }

    /// Restore the placeholder profile and clear the message.
    /// The caller owns clearing the recognizer transcript in the same step.
    pub fn reset(&mut self)
    {   debug!("Resetting profile to defaults");
        self.profile = Profile::default();
        self.message.clear();
        self.loading = false;
    }

    pub fn set_message(&mut self, message: impl Into<String>)
    {   self.message = message.into();
    }

    pub fn set_loading(&mut self, loading: bool)
    {   self.loading = loading;
    }
}

/// Snapshot published to the display layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView
{   pub profile: Profile
  , pub message: String
  , pub loading: bool
  , pub phase: crate::orchestrator::GenerationPhase
}

#[cfg(test)]
pub(crate) fn sample_persona_json() -> &'static str
{   r##"{
      "full_name": "Maya Lind",
      "age": 34,
      "interests_tags": ["hiking", "cooking"],
      "works_at": "Trailhead Foods",
      "top_5_professions": ["chef", "guide", "ranger", "writer", "nutritionist"],
      "job_title": "Head Chef",
      "country": "Norway",
      "city": "Bergen",
      "skin_color": "#e0ac69",
      "hair_color": "#4b3621",
      "eye_color": "#2e8b57",
      "hair_length_cm": 30,
      "height_cm": 170,
      "hair_style": "braided",
      "gender": "female"
    }"##
}
