use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use log::{debug, error, info};

use crate::command::CommandRegistry;
use crate::orchestrator::{Effect, Session, Stage, StageOutcome};
use crate::profile::ProfileView;
use crate::providers::GenerationService;
use crate::speech::Recognizer;
use crate::PersonaFoot;

/// Public API for the voice persona backend - owns the task
pub struct PersonaBackend
{   hand: crate::PersonaHand
  , view_rx: watch::Receiver<ProfileView>
  , _task_handle: tokio::task::JoinHandle<()>
}

impl PersonaBackend
{   /// Create and spawn a new backend.
    /// Fails without spawning when the recognizer cannot listen continuously.
    pub fn new<S>(
      service: S
    , mut recognizer: Box<dyn Recognizer>
    ) -> Result<Self, crate::error::Error>
    where S: GenerationService
    {   debug!("Creating PersonaBackend with task ownership");

        if !recognizer.supports_continuous_listening()
        {   error!("Recognizer lacks continuous listening");
            return Err(crate::error::Error::UnsupportedPlatform);
        }

        let registry = CommandRegistry::standard()?;
        recognizer.start_listening()?;

        let (dispatch_utterance_tx, dispatch_utterance_rx)
          = mpsc::unbounded_channel();
        let (get_view_tx, get_view_rx)
          = mpsc::unbounded_channel();
        let (set_listening_tx, set_listening_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::PersonaHand
        {   dispatch_utterance_tx
          , get_view_tx
          , set_listening_tx
          , kill_process_tx
        };

        let foot = crate::PersonaFoot
        {   dispatch_utterance_rx
          , get_view_rx
          , set_listening_rx
          , kill_process_rx
        };

        let session = Session::new();
        let (view_tx, view_rx) = watch::channel(session.view());

        let backend_loop = BackendLoop
        {   service: Arc::new(service)
          , recognizer
          , registry
          , session
          , view_tx
        };
        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, backend_loop).await
        });

        Ok(PersonaBackend
        {   hand
          , view_rx
          , _task_handle
        })
    }

    /// Dispatch a finalized utterance - returns almost immediately.
    /// The reply carries the action the matched handler produced.
    pub async fn dispatch_utterance(
      &self
    , utterance: String
    ) -> Result<
        mpsc::UnboundedReceiver<crate::DispatchUtteranceReply>,
        crate::error::Error
      >
    {   debug!("dispatch_utterance queuing: {:?}", utterance);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::DispatchUtteranceArgs
        {   utterance
          , reply: reply_tx
        };

        self.hand.dispatch_utterance_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Snapshot the rendered state - returns almost immediately
    pub async fn get_view(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GetViewReply>,
        crate::error::Error
      >
    {   debug!("get_view queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GetViewArgs
        {   reply: reply_tx
        };

        self.hand.get_view_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Start or stop the recognizer - returns almost immediately
    pub async fn set_listening(
      &self
    , listening: bool
    ) -> Result<
        mpsc::UnboundedReceiver<crate::SetListeningReply>,
        crate::error::Error
      >
    {   debug!("set_listening queuing: {}", listening);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::SetListeningArgs
        {   listening
          , reply: reply_tx
        };

        self.hand.set_listening_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Receiver that sees every published view
    pub fn watch_view(&self) -> watch::Receiver<ProfileView>
    {   self.view_rx.clone()
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down PersonaBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(crate::error::Error::Timeout)
        }
    }
}

/// State owned by the backend task
struct BackendLoop<S>
{   service: Arc<S>
  , recognizer: Box<dyn Recognizer>
  , registry: CommandRegistry
  , session: Session
  , view_tx: watch::Sender<ProfileView>
}

impl<S: GenerationService> BackendLoop<S>
{   /// Carry out session effects. Service calls run on their own tasks
    /// and come back through `outcome_tx`.
    fn apply(
      &mut self
    , effects: Vec<Effect>
    , outcome_tx: &mpsc::UnboundedSender<StageOutcome>
    )
    {   for effect in effects
        {   match effect
            {   Effect::RequestPersona { cycle, request } => {
                  debug!("Sending persona request for cycle {}", cycle);
                  let service = Arc::clone(&self.service);
                  let tx = outcome_tx.clone();
                  tokio::spawn(async move {
                    let result = service.complete(request).await;
                    let _ = tx.send(StageOutcome
                    {   cycle
                      , stage: Stage::Persona
                      , result
                    });
                  });
                }
              , Effect::RequestImage { cycle, request } => {
                  debug!("Sending image request for cycle {}", cycle);
                  let service = Arc::clone(&self.service);
                  let tx = outcome_tx.clone();
                  tokio::spawn(async move {
                    let result = service.generate_image(request).await;
                    let _ = tx.send(StageOutcome
                    {   cycle
                      , stage: Stage::Image
                      , result
                    });
                  });
                }
              , Effect::ResetTranscript => {
                  if let Err(e) = self.recognizer.reset_transcript()
                  {   error!("Transcript reset failed: {}", e);
                  }
                }
              , Effect::Announce(text) => {
                  info!("Say: {}", text);
                }
            }
        }
    }

    fn publish(&self)
    {   let next = self.session.view();
        self.view_tx.send_if_modified(|current| {
          if *current == next
          {   return false;
          }
          *current = next;
          true
        });
    }
}

/// Main backend event loop
///
/// Design: tokio::select! is ONLY for fast queueing.
/// Each select arm runs a state machine step and returns.
/// Service calls never block the loop.
async fn run_backend_loop<S: GenerationService>(
  foot: crate::PersonaFoot
, mut state: BackendLoop<S>
)
{   debug!("Starting PersonaBackend event loop");
    let PersonaFoot
    {   mut dispatch_utterance_rx
      , mut get_view_rx
      , mut set_listening_rx
      , mut kill_process_rx
    } = foot;
    let (outcome_tx, mut outcome_rx)
      = mpsc::unbounded_channel::<StageOutcome>();

    loop
    { tokio::select!
      { Some(cmd) = dispatch_utterance_rx.recv() => {
          debug!("Received DispatchUtterance: {:?}", cmd.utterance);
          let action = state.registry.dispatch(&cmd.utterance);
          let effects = state.session.handle_action(action.clone());
          state.apply(effects, &outcome_tx);
          state.publish();
          let _ = cmd.reply.send(Ok(action));
        }
      , Some(outcome) = outcome_rx.recv() => {
          debug!(
            "Received {:?} outcome for cycle {}",
            outcome.stage, outcome.cycle
          );
          let effects = state.session.handle_outcome(outcome);
          state.apply(effects, &outcome_tx);
          state.publish();
        }
      , Some(cmd) = get_view_rx.recv() => {
          debug!("Received GetView");
          let _ = cmd.reply.send(Ok(state.session.view()));
        }
      , Some(cmd) = set_listening_rx.recv() => {
          debug!("Received SetListening: {}", cmd.listening);
          let switched = if cmd.listening
          {   state.recognizer.start_listening()
          } else
          {   state.recognizer.stop_listening()
          };
          let result = switched
            .map(|_| state.recognizer.is_listening());
          let _ = cmd.reply.send(result);
        }
      , cmd = kill_process_rx.recv() => {
          match cmd
          {   Some(cmd) => {
                debug!("Received KillProcess");
                if let Err(e) = state.recognizer.stop_listening()
                {   error!("Failed to stop recognizer: {}", e);
                }
                let _ = cmd.reply.send(Ok(()));
              }
            , None => debug!("Backend handle dropped")
          }
          info!("PersonaBackend shutting down");
          break;
        }
      }
    }
}
