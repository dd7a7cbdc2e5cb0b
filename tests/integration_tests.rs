use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use voice_persona::command::{CommandAction, INTRO_MESSAGE};
use voice_persona::error::{Error, GENERATION_FAILED_MESSAGE};
use voice_persona::orchestrator::GenerationPhase;
use voice_persona::profile::{PersonaAttributes, Profile, ProfileView};
use voice_persona::providers::GenerationService;
use voice_persona::request::GenerationRequest;
use voice_persona::speech::Recognizer;
use voice_persona::PersonaBackend;

const PERSONA_JSON: &str = r##"{"full_name":"Maya Lind","age":34,"interests_tags":["hiking","cooking"],"works_at":"Trailhead Foods","top_5_professions":["chef","guide","ranger","writer","nutritionist"],"job_title":"Head Chef","country":"Norway","city":"Bergen","skin_color":"#e0ac69","hair_color":"#4b3621","eye_color":"#2e8b57","hair_length_cm":30,"height_cm":170,"hair_style":"braided","gender":"female"}"##;

/// Scripted generation service recording every request it receives
#[derive(Clone)]
struct MockService
{   persona: Result<String, Error>
  , image: Result<String, Error>
  , requests: Arc<Mutex<Vec<GenerationRequest>>>
}

impl MockService
{   fn new(
      persona: Result<String, Error>
    , image: Result<String, Error>
    ) -> Self
    {   MockService
        {   persona
          , image
          , requests: Arc::new(Mutex::new(vec![]))
        }
    }

    fn succeeding() -> Self
    {   MockService::new(
          Ok(PERSONA_JSON.to_string()),
          Ok("https://img.example/maya.png".to_string())
        )
    }

    fn requests(&self) -> Vec<GenerationRequest>
    {   self.requests.lock().unwrap().clone()
    }
}

impl GenerationService for MockService
{   fn complete(
      &self
    , request: GenerationRequest
    ) -> impl Future<Output = Result<String, Error>> + Send
    {   self.requests.lock().unwrap().push(request);
        let result = self.persona.clone();
        async move { result }
    }

    fn generate_image(
      &self
    , request: GenerationRequest
    ) -> impl Future<Output = Result<String, Error>> + Send
    {   self.requests.lock().unwrap().push(request);
        let result = self.image.clone();
        async move { result }
    }
}

/// Recognizer whose resets and listening state can be observed
#[derive(Clone, Default)]
struct FakeRecognizer
{   continuous: bool
  , listening: Arc<AtomicBool>
  , resets: Arc<AtomicUsize>
}

impl FakeRecognizer
{   fn continuous() -> Self
    {   FakeRecognizer
        {   continuous: true
          , ..FakeRecognizer::default()
        }
    }
}

impl Recognizer for FakeRecognizer
{   fn supports_continuous_listening(&self) -> bool
    {   self.continuous
    }

    fn start_listening(&mut self) -> Result<(), Error>
    {   self.listening.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_listening(&mut self) -> Result<(), Error>
    {   self.listening.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_listening(&self) -> bool
    {   self.listening.load(Ordering::SeqCst)
    }

    fn reset_transcript(&mut self) -> Result<(), Error>
    {   self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn say(backend: &PersonaBackend, utterance: &str) -> CommandAction
{   let mut rx = backend
      .dispatch_utterance(utterance.to_string())
      .await
      .unwrap();
    rx.recv().await.unwrap().unwrap()
}

/// Wait until no cycle is running
async fn settled(backend: &PersonaBackend) -> ProfileView
{   let mut view_rx = backend.watch_view();
    let view = tokio::time::timeout(
      Duration::from_secs(5),
      view_rx.wait_for(|v| !v.loading && v.phase == GenerationPhase::Idle)
    )
    .await
    .expect("cycle did not settle")
    .unwrap()
    .clone();
    view
}

#[tokio::test]
async fn test_end_to_end_generation_cycle()
{   let service = MockService::succeeding();
    let backend = PersonaBackend::new(
      service.clone(),
      Box::new(FakeRecognizer::continuous())
    ).unwrap();

    let action = say(
      &backend,
      "Create a profile of outdoorsy interested in hiking and cooking"
    ).await;
    assert_eq!(
      action,
      CommandAction::CreateProfile
      {   preferences: "outdoorsy".to_string()
        , interests: vec!["hiking".to_string(), "cooking".to_string()]
      }
    );

    let view = settled(&backend).await;
    let expected = PersonaAttributes::from_response_text(PERSONA_JSON).unwrap();
    assert_eq!(view.profile.persona, expected);
    assert_eq!(view.profile.photo, "https://img.example/maya.png");
    assert_eq!(view.profile.preferences, "outdoorsy");
    assert_eq!(view.message, "");

    let requests = service.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
      requests[0].user_content(),
      Some(r#"{"preferences":"outdoorsy","interests":["hiking","cooking"]}"#)
    );
    assert_eq!(
      requests[1].user_content(),
      Some(serde_json::to_string(&view.profile.persona).unwrap().as_str())
    );

    tokio_test::assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_persona_failure_skips_image_stage()
{   let service = MockService::new(
      Err(Error::ApiError("401 Unauthorized".to_string())),
      Ok("https://img.example/never.png".to_string())
    );
    let backend = PersonaBackend::new(
      service.clone(),
      Box::new(FakeRecognizer::continuous())
    ).unwrap();

    say(&backend, "Create a profile of introverts interested in chess").await;
    let view = settled(&backend).await;

    assert_eq!(view.profile.persona, PersonaAttributes::default());
    assert_eq!(view.profile.photo, "");
    assert_eq!(view.message, GENERATION_FAILED_MESSAGE);
    assert_eq!(service.requests().len(), 1);

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_image_failure_keeps_new_persona()
{   let service = MockService::new(
      Ok(PERSONA_JSON.to_string()),
      Err(Error::NoImageInResponse)
    );
    let backend = PersonaBackend::new(
      service.clone(),
      Box::new(FakeRecognizer::continuous())
    ).unwrap();

    say(&backend, "Create a profile of outdoorsy interested in hiking").await;
    let view = settled(&backend).await;

    assert_eq!(view.profile.persona.full_name, "Maya Lind");
    assert_eq!(view.profile.photo, "");
    assert_eq!(view.message, GENERATION_FAILED_MESSAGE);

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_clear_resets_profile_message_and_transcript()
{   let recognizer = FakeRecognizer::continuous();
    let resets = recognizer.resets.clone();
    let backend = PersonaBackend::new(
      MockService::succeeding(),
      Box::new(recognizer)
    ).unwrap();

    say(&backend, "Create a profile of outdoorsy interested in hiking").await;
    settled(&backend).await;
    say(&backend, "what now").await;

    assert_eq!(say(&backend, "Clear.").await, CommandAction::Clear);

    let mut rx = backend.get_view().await.unwrap();
    let view = rx.recv().await.unwrap().unwrap();
    assert_eq!(view.profile, Profile::default());
    assert_eq!(view.message, "");
    assert!(!view.loading);
    assert_eq!(resets.load(Ordering::SeqCst), 1);

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_unrecognized_utterance_only_sets_intro()
{   let service = MockService::succeeding();
    let backend = PersonaBackend::new(
      service.clone(),
      Box::new(FakeRecognizer::continuous())
    ).unwrap();

    let action = say(&backend, "tell me a joke").await;
    assert_eq!(action, CommandAction::Unrecognized);

    let mut rx = backend.get_view().await.unwrap();
    let view = rx.recv().await.unwrap().unwrap();
    assert_eq!(view.profile, Profile::default());
    assert_eq!(view.message, INTRO_MESSAGE);
    assert!(service.requests().is_empty());

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_unsupported_platform_is_terminal()
{   let result = PersonaBackend::new(
      MockService::succeeding(),
      Box::new(FakeRecognizer::default())
    );
    assert!(matches!(result, Err(Error::UnsupportedPlatform)));
}

#[tokio::test]
async fn test_listening_controls()
{   let recognizer = FakeRecognizer::continuous();
    let listening = recognizer.listening.clone();
    let backend = PersonaBackend::new(
      MockService::succeeding(),
      Box::new(recognizer)
    ).unwrap();
    assert!(listening.load(Ordering::SeqCst));

    let mut rx = backend.set_listening(false).await.unwrap();
    assert_eq!(rx.recv().await, Some(Ok(false)));
    assert!(!listening.load(Ordering::SeqCst));

    let mut rx = backend.set_listening(true).await.unwrap();
    assert_eq!(rx.recv().await, Some(Ok(true)));

    tokio_test::assert_ok!(backend.shutdown().await);
    assert!(!listening.load(Ordering::SeqCst));
}

#[tokio::test]
#[ignore]
async fn test_live_generation_cycle()
{   let config = match voice_persona::config::ServiceConfig::from_env()
    {   Ok(c) => c
      , Err(_) => {
          println!("Skipping: OPENAI_API_KEY not set");
          return;
        }
    };
    let service = voice_persona::providers::OpenAiClient::new(&config)
      .unwrap();
    let backend = PersonaBackend::new(
      service,
      Box::new(FakeRecognizer::continuous())
    ).unwrap();

    say(&backend, "Create a profile of night owls interested in jazz").await;
    let mut view_rx = backend.watch_view();
    match tokio::time::timeout(
      Duration::from_secs(120),
      view_rx.wait_for(|v| !v.loading)
    ).await
    {   Ok(Ok(view)) => {
          println!("Message: {:?}", view.message);
          println!("Persona: {:?}", view.profile.persona);
          println!("Photo: {}", view.profile.photo);
        }
      , Ok(Err(_)) => println!("View channel closed")
      , Err(_) => println!("Timeout waiting for generation")
    }

    let _ = backend.shutdown().await;
}
