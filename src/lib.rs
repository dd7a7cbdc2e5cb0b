pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod profile;
pub mod command;
pub mod prompt;
pub mod orchestrator;
pub mod speech;
pub mod client;

pub use client::PersonaBackend;
pub use error::Error;

/*

voice_persona turns spoken commands into generated profiles:
"Create a profile of * interested in *" compiles a persona request,
its answer compiles an image request, and both land in one profile
that the display layer watches.

voice_persona/
├── src/
│   ├── lib.rs          # Actor interface and re-exports
│   ├── error.rs        # Error type and user-facing messages
│   ├── config.rs       # Service configuration from the environment
│   ├── request.rs      # GenerationRequest and friends
│   ├── profile.rs      # Profile, PersonaAttributes, ProfileState
│   ├── command.rs      # Voice command registry and dispatcher
│   ├── prompt.rs       # Persona and image request compilers
│   ├── orchestrator.rs # Generation cycle state machine
│   ├── client.rs       # Backend task running the state machine
│   ├── speech.rs       # Recognition engine boundary
│   ├── providers/      # Generation service implementations
│   │   ├── mod.rs      # GenerationService trait
│   │   └── openai.rs   # OpenAI chat + image client
│   └── main.rs         # Console front-end
└── tests/              # Integration tests

*/

/// VOICE PERSONA API INTERFACE:

// ===== DispatchUtterance =====

pub type DispatchUtteranceReply
  = Result<crate::command::CommandAction, crate::error::Error>;
pub type DispatchUtteranceReplySender
  = tokio::sync::mpsc::UnboundedSender<DispatchUtteranceReply>;

pub struct DispatchUtteranceArgs
{   pub utterance: String
  , pub reply: DispatchUtteranceReplySender
}

// ===== GetView =====

pub type GetViewReply
  = Result<crate::profile::ProfileView, crate::error::Error>;
pub type GetViewReplySender
  = tokio::sync::mpsc::UnboundedSender<GetViewReply>;

pub struct GetViewArgs
{   pub reply: GetViewReplySender
}

// ===== SetListening =====

/// Replies with the resulting listening state
pub type SetListeningReply = Result<bool, crate::error::Error>;
pub type SetListeningReplySender
  = tokio::sync::mpsc::UnboundedSender<SetListeningReply>;

pub struct SetListeningArgs
{   pub listening: bool
  , pub reply: SetListeningReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== PersonaHand (sender side) =====

pub struct PersonaHand
{   pub dispatch_utterance_tx
      : tokio::sync::mpsc::UnboundedSender<DispatchUtteranceArgs>
  , pub get_view_tx
      : tokio::sync::mpsc::UnboundedSender<GetViewArgs>
  , pub set_listening_tx
      : tokio::sync::mpsc::UnboundedSender<SetListeningArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== PersonaFoot (receiver side) =====

pub struct PersonaFoot
{   pub dispatch_utterance_rx
      : tokio::sync::mpsc::UnboundedReceiver<DispatchUtteranceArgs>
  , pub get_view_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetViewArgs>
  , pub set_listening_rx
      : tokio::sync::mpsc::UnboundedReceiver<SetListeningArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
