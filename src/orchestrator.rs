//! Generation cycle state machine
//!
//! `Session` holds the profile state and decides every transition without
//! touching the network. It consumes command actions and stage outcomes and
//! answers with the effects the backend loop must carry out.

use serde::Serialize;
use log::{debug, error, info};

use crate::command::{CommandAction, HELP_MESSAGE, INTRO_MESSAGE};
use crate::profile::{PersonaAttributes, ProfileState, ProfileView};
use crate::request::GenerationRequest;

pub const BUSY_MESSAGE: &str
  = "A profile is already being generated, please wait.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase
{   Idle
  , PersonaPending
  , PersonaDone
  , PersonaFailed
  , ImagePending
  , ImageDone
  , ImageFailed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage
{   Persona
  , Image
}

/// Result of one service call, tagged with the cycle that issued it
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome
{   pub cycle: u64
  , pub stage: Stage
  , /// Persona response text, or the image url
    pub result: Result<String, crate::error::Error>
}

/// Work the backend loop performs on behalf of the session
#[derive(Debug, Clone, PartialEq)]
pub enum Effect
{   RequestPersona
    {   cycle: u64
      , request: GenerationRequest
    }
  , RequestImage
    {   cycle: u64
      , request: GenerationRequest
    }
  , ResetTranscript
  , Announce(String)
}

#[derive(Debug, Clone)]
pub struct Session
{   state: ProfileState
  , phase: GenerationPhase
  , cycle: u64
}

impl Default for Session
{   fn default() -> Self
    {   Session::new()
    }
}

impl Session
{   pub fn new() -> Self
    {   Session
        {   state: ProfileState::new()
          , phase: GenerationPhase::Idle
          , cycle: 0
        }
    }

    pub fn state(&self) -> &ProfileState
    {   &self.state
    }

    pub fn phase(&self) -> GenerationPhase
    {   self.phase
    }

    /// Id of the most recently started cycle
    pub fn cycle(&self) -> u64
    {   self.cycle
    }

    pub fn is_busy(&self) -> bool
    {   self.phase != GenerationPhase::Idle
    }

    pub fn view(&self) -> ProfileView
    {   ProfileView
        {   profile: self.state.profile().clone()
          , message: self.state.message().to_string()
          , loading: self.state.loading()
          , phase: self.phase
        }
    }

    fn transition(&mut self, next: GenerationPhase)
    {   debug!(
          "Cycle {}: {:?} -> {:?}",
          self.cycle, self.phase, next
        );
        self.phase = next;
    }

    fn announce(&mut self, message: &str) -> Vec<Effect>
    {   self.state.set_message(message);
        vec![Effect::Announce(message.to_string())]
    }

    pub fn handle_action(&mut self, action: CommandAction)
      -> Vec<Effect>
    {   match action
        {   CommandAction::CreateProfile { preferences, interests } => {
              self.begin_cycle(preferences, interests)
            }
          , CommandAction::Help => self.announce(HELP_MESSAGE)
          , CommandAction::Clear => {
              if self.is_busy()
              {   info!("Clear abandons cycle {}", self.cycle);
                  self.transition(GenerationPhase::Idle);
              }
              self.state.reset();
              vec![Effect::ResetTranscript]
            }
          , CommandAction::Unrecognized => self.announce(INTRO_MESSAGE)
        }
    }

    fn begin_cycle(
      &mut self
    , preferences: String
    , interests: Vec<String>
    ) -> Vec<Effect>
    {   if self.is_busy()
        {   info!("Rejecting new profile while cycle {} runs", self.cycle);
            return self.announce(BUSY_MESSAGE);
        }

        self.cycle += 1;
        let profile = self.state.profile()
          .with_inputs(preferences, interests);
        self.state.replace(profile);
        self.state.set_message("");
        self.state.set_loading(true);
        self.transition(GenerationPhase::PersonaPending);

        match crate::prompt::compile_persona_request(self.state.profile())
        {   Ok(request) => vec![Effect::RequestPersona
            {   cycle: self.cycle
              , request
            }]
          , Err(e) => self.fail(GenerationPhase::PersonaFailed, e)
        }
    }

    pub fn handle_outcome(&mut self, outcome: StageOutcome)
      -> Vec<Effect>
    {   let expected = match outcome.stage
        {   Stage::Persona => GenerationPhase::PersonaPending
          , Stage::Image => GenerationPhase::ImagePending
        };
        if outcome.cycle != self.cycle || self.phase != expected
        {   debug!(
              "Discarding {:?} outcome of cycle {} in {:?}",
              outcome.stage, outcome.cycle, self.phase
            );
            return vec![];
        }

        match (outcome.stage, outcome.result)
        {   (Stage::Persona, Ok(text)) => self.persona_done(&text)
          , (Stage::Persona, Err(e)) => {
              self.fail(GenerationPhase::PersonaFailed, e)
            }
          , (Stage::Image, Ok(url)) => self.image_done(url)
          , (Stage::Image, Err(e)) => {
              self.fail(GenerationPhase::ImageFailed, e)
            }
        }
    }

    fn persona_done(&mut self, text: &str) -> Vec<Effect>
    {   let persona = match PersonaAttributes::from_response_text(text)
        {   Ok(persona) => persona
          , Err(e) => return self.fail(GenerationPhase::PersonaFailed, e)
        };

        let persona_json = match serde_json::to_string(&persona)
        {   Ok(json) => json
          , Err(e) => {
              return self.fail(
                GenerationPhase::PersonaFailed,
                crate::error::Error::ParseError(e.to_string())
              );
            }
        };

        let profile = self.state.profile().with_persona(persona);
        self.state.replace(profile);
        self.transition(GenerationPhase::PersonaDone);

        let request = crate::prompt::compile_image_request(&persona_json);
        self.transition(GenerationPhase::ImagePending);
        vec![Effect::RequestImage
        {   cycle: self.cycle
          , request
        }]
    }

    fn image_done(&mut self, url: String) -> Vec<Effect>
    {   if url.trim().is_empty()
        {   return self.fail(
              GenerationPhase::ImageFailed,
              crate::error::Error::NoImageInResponse
            );
        }

        let profile = self.state.profile().with_photo(url);
        self.state.replace(profile);
        self.transition(GenerationPhase::ImageDone);
        self.state.set_loading(false);
        self.transition(GenerationPhase::Idle);
        info!("Cycle {} complete", self.cycle);
        vec![]
    }

    fn fail(
      &mut self
    , failed: GenerationPhase
    , e: crate::error::Error
    ) -> Vec<Effect>
    {   error!("Cycle {} failed in {:?}: {}", self.cycle, failed, e);
        self.transition(failed);
        self.state.set_loading(false);
        self.transition(GenerationPhase::Idle);
        self.announce(&e.user_message())
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::error::{Error, GENERATION_FAILED_MESSAGE};
    use crate::profile::{sample_persona_json, Profile};

    fn create(preferences: &str, interests: &[&str]) -> CommandAction
    {   CommandAction::CreateProfile
        {   preferences: preferences.to_string()
          , interests: interests.iter().map(|i| i.to_string()).collect()
        }
    }

    fn persona_ok(cycle: u64) -> StageOutcome
    {   StageOutcome
        {   cycle
          , stage: Stage::Persona
          , result: Ok(sample_persona_json().to_string())
        }
    }

    fn image(cycle: u64, result: Result<String, Error>) -> StageOutcome
    {   StageOutcome
        {   cycle
          , stage: Stage::Image
          , result
        }
    }

    /// Session holding a finished first cycle
    fn completed_session() -> Session
    {   let mut session = Session::new();
        session.handle_action(create("outdoorsy", &["hiking"]));
        session.handle_outcome(persona_ok(1));
        session.handle_outcome(image(1, Ok("https://img/old.png".to_string())));
        session
    }

    #[test]
    fn test_create_starts_persona_stage()
    {   let mut session = Session::new();
        let effects = session.handle_action(create("outdoorsy", &["hiking", "cooking"]));

        assert_eq!(session.phase(), GenerationPhase::PersonaPending);
        assert!(session.state().loading());
        assert_eq!(session.state().profile().preferences, "outdoorsy");
        match effects.as_slice()
        {   [Effect::RequestPersona { cycle, request }] => {
              assert_eq!(*cycle, 1);
              assert_eq!(
                request.user_content(),
                Some(r#"{"preferences":"outdoorsy","interests":["hiking","cooking"]}"#)
              );
            }
          , other => panic!("unexpected effects: {:?}", other)
        }
    }

    #[test]
    fn test_full_cycle_merges_persona_then_photo()
    {   let mut session = Session::new();
        session.handle_action(create("outdoorsy", &["hiking", "cooking"]));
        let effects = session.handle_outcome(persona_ok(1));

        let expected = PersonaAttributes::from_response_text(
          sample_persona_json()
        ).unwrap();
        assert_eq!(session.state().profile().persona, expected);
        assert_eq!(session.phase(), GenerationPhase::ImagePending);
        match effects.as_slice()
        {   [Effect::RequestImage { request, .. }] => {
              assert_eq!(
                request.user_content(),
                Some(serde_json::to_string(&expected).unwrap().as_str())
              );
            }
          , other => panic!("unexpected effects: {:?}", other)
        }

        let effects = session.handle_outcome(
          image(1, Ok("https://img/1.png".to_string()))
        );
        assert!(effects.is_empty());
        assert_eq!(session.state().profile().photo, "https://img/1.png");
        assert!(!session.state().loading());
        assert_eq!(session.phase(), GenerationPhase::Idle);
    }

    #[test]
    fn test_persona_failure_keeps_previous_profile()
    {   let mut session = completed_session();
        let before = session.state().profile().clone();

        session.handle_action(create("introverts", &["chess"]));
        let effects = session.handle_outcome(StageOutcome
        {   cycle: 2
          , stage: Stage::Persona
          , result: Err(Error::HttpError("connection refused".to_string()))
        });

        let after = session.state().profile();
        assert_eq!(after.persona, before.persona);
        assert_eq!(after.photo, before.photo);
        assert!(!session.state().loading());
        assert_eq!(session.phase(), GenerationPhase::Idle);
        assert_eq!(session.state().message(), GENERATION_FAILED_MESSAGE);
        assert_eq!(
          effects,
          vec![Effect::Announce(GENERATION_FAILED_MESSAGE.to_string())]
        );
    }

    #[test]
    fn test_schema_mismatch_is_a_persona_failure()
    {   let mut session = Session::new();
        session.handle_action(create("x", &["y"]));
        let effects = session.handle_outcome(StageOutcome
        {   cycle: 1
          , stage: Stage::Persona
          , result: Ok(r#"{"full_name":"half"}"#.to_string())
        });

        assert_eq!(session.state().profile().persona, PersonaAttributes::default());
        assert!(!session.state().loading());
        assert!(!effects.iter().any(|e| matches!(e, Effect::RequestImage { .. })));
    }

    #[test]
    fn test_image_failure_leaves_photo_stale()
    {   let mut session = completed_session();
        let old_persona = session.state().profile().persona.clone();

        session.handle_action(create("introverts", &["chess"]));
        let new_persona = sample_persona_json().replace("Maya Lind", "Ola Berg");
        session.handle_outcome(StageOutcome
        {   cycle: 2
          , stage: Stage::Persona
          , result: Ok(new_persona)
        });
        session.handle_outcome(image(2, Err(Error::Timeout)));

        let profile = session.state().profile();
        assert_ne!(profile.persona, old_persona);
        assert_eq!(profile.persona.full_name, "Ola Berg");
        assert_eq!(profile.photo, "https://img/old.png");
        assert!(!session.state().loading());
        assert_eq!(session.state().message(), GENERATION_FAILED_MESSAGE);
    }

    #[test]
    fn test_empty_image_url_is_a_failure()
    {   let mut session = Session::new();
        session.handle_action(create("x", &["y"]));
        session.handle_outcome(persona_ok(1));
        session.handle_outcome(image(1, Ok("  ".to_string())));
        assert!(!session.state().profile().has_photo());
        assert_eq!(session.state().message(), GENERATION_FAILED_MESSAGE);
    }

    #[test]
    fn test_busy_guard_rejects_second_create()
    {   let mut session = Session::new();
        session.handle_action(create("outdoorsy", &["hiking"]));
        let effects = session.handle_action(create("introverts", &["chess"]));

        assert_eq!(effects, vec![Effect::Announce(BUSY_MESSAGE.to_string())]);
        assert_eq!(session.cycle(), 1);
        assert_eq!(session.state().profile().preferences, "outdoorsy");
        assert_eq!(session.phase(), GenerationPhase::PersonaPending);
    }

    #[test]
    fn test_clear_resets_and_discards_late_outcome()
    {   let mut session = Session::new();
        session.handle_action(create("outdoorsy", &["hiking"]));
        session.handle_outcome(persona_ok(1));

        let effects = session.handle_action(CommandAction::Clear);
        assert_eq!(effects, vec![Effect::ResetTranscript]);
        assert_eq!(session.state().profile(), &Profile::default());
        assert_eq!(session.state().message(), "");
        assert!(!session.state().loading());
        assert_eq!(session.phase(), GenerationPhase::Idle);

        let late = session.handle_outcome(
          image(1, Ok("https://img/late.png".to_string()))
        );
        assert!(late.is_empty());
        assert_eq!(session.state().profile(), &Profile::default());
    }

    #[test]
    fn test_outcome_from_abandoned_cycle_ignored_by_new_cycle()
    {   let mut session = Session::new();
        session.handle_action(create("a", &["b"]));
        session.handle_action(CommandAction::Clear);
        session.handle_action(create("c", &["d"]));

        assert!(session.handle_outcome(persona_ok(1)).is_empty());
        assert_eq!(session.phase(), GenerationPhase::PersonaPending);
        assert_eq!(session.handle_outcome(persona_ok(2)).len(), 1);
    }

    #[test]
    fn test_unrecognized_only_sets_intro_message()
    {   let mut session = completed_session();
        let before = session.state().profile().clone();

        let effects = session.handle_action(CommandAction::Unrecognized);

        assert_eq!(session.state().profile(), &before);
        assert_eq!(session.state().message(), INTRO_MESSAGE);
        assert_eq!(effects, vec![Effect::Announce(INTRO_MESSAGE.to_string())]);
    }

    #[test]
    fn test_help_lists_commands()
    {   let mut session = Session::new();
        session.handle_action(CommandAction::Help);
        assert!(session.state().message().contains("clear - Clears the screen"));
        assert!(!session.is_busy());
    }
}
