use std::process::ExitCode;

use log::{debug, error};
use tokio::io::{AsyncBufReadExt, BufReader};

use voice_persona::config::ServiceConfig;
use voice_persona::profile::ProfileView;
use voice_persona::providers::OpenAiClient;
use voice_persona::speech::ConsoleRecognizer;
use voice_persona::PersonaBackend;

fn render(view: &ProfileView)
{   if view.loading
    {   println!("Generating your image...");
        return;
    }
    if !view.message.is_empty()
    {   println!("{}", view.message);
    }
    let profile = &view.profile;
    let persona = &profile.persona;
    if !profile.has_photo()
    {   return;
    }
    println!("----------------------------------------");
    println!("Photo: {}", profile.photo);
    println!("{}", persona.full_name);
    println!("Age: {}", persona.age);
    println!(
      "Interests: {}",
      persona.interests_tags
        .iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ")
    );
    println!("Works at: {}", persona.works_at);
    println!("Top professions: {}", persona.top_5_professions.join(", "));
    println!("Job Title: {}", persona.job_title);
    println!("Location: {}, {}", persona.city, persona.country);
    println!(
      "Colors: skin {} hair {} eyes {}",
      persona.skin_color, persona.hair_color, persona.eye_color
    );
    println!("Hair length: {} cm", persona.hair_length_cm);
    println!("Height: {} cm", persona.height_cm);
    println!("Hair style: {}", persona.hair_style);
    println!("Gender: {}", persona.gender);
    println!("----------------------------------------");
}

async fn run() -> Result<(), voice_persona::Error>
{   let config = ServiceConfig::from_env()?;
    let service = OpenAiClient::new(&config)?;
    let recognizer = ConsoleRecognizer::new();
    let input = recognizer.clone();

    let backend = PersonaBackend::new(service, Box::new(recognizer))?;

    let mut view_rx = backend.watch_view();
    tokio::spawn(async move {
      while view_rx.changed().await.is_ok()
      {   let view = view_rx.borrow_and_update().clone();
          render(&view);
      }
    });

    println!("{}", voice_persona::command::INTRO_MESSAGE);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop
    {   let line = match lines.next_line().await
        {   Ok(Some(line)) => line
          , Ok(None) => break
          , Err(e) => {
              error!("Failed to read stdin: {}", e);
              break;
            }
        };
        if !input.hear(&line)?
        {   continue;
        }
        debug!("Transcript: {}", input.transcript()?);

        let mut reply_rx = backend.dispatch_utterance(line).await?;
        if let Some(Err(e)) = reply_rx.recv().await
        {   error!("Dispatch failed: {}", e);
        }
    }

    // Let a running cycle land before exiting on end of input
    let mut idle_rx = backend.watch_view();
    if idle_rx.wait_for(|v| !v.loading).await.is_err()
    {   error!("View channel closed before the cycle finished");
    }
    backend.shutdown().await
}

#[tokio::main]
async fn main() -> ExitCode
{   env_logger::init();

    match run().await
    {   Ok(()) => ExitCode::SUCCESS
      , Err(e) => {
          error!("{}", e);
          eprintln!("{}", e.user_message());
          ExitCode::FAILURE
        }
    }
}
