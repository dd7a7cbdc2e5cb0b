//! Recognition engine boundary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use log::{debug, info};

/// Controls the speech recognition engine that feeds utterances in
pub trait Recognizer: Send
{   /// Whether the engine can keep listening between phrases
    fn supports_continuous_listening(&self) -> bool;

    fn start_listening(&mut self) -> Result<(), crate::error::Error>;

    fn stop_listening(&mut self) -> Result<(), crate::error::Error>;

    fn is_listening(&self) -> bool;

    /// Drop everything heard so far
    fn reset_transcript(&mut self) -> Result<(), crate::error::Error>;
}

/// Accumulated finalized phrases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptBuffer
{   phrases: Vec<String>
}

impl TranscriptBuffer
{   pub fn new() -> Self
    {   TranscriptBuffer::default()
    }

    pub fn push_final(&mut self, phrase: &str)
    {   let phrase = phrase.trim();
        if !phrase.is_empty()
        {   self.phrases.push(phrase.to_string());
        }
    }

    /// Full transcript, phrases separated by a space
    pub fn transcript(&self) -> String
    {   self.phrases.join(" ")
    }

    pub fn is_empty(&self) -> bool
    {   self.phrases.is_empty()
    }

    pub fn clear(&mut self)
    {   self.phrases.clear();
    }
}

/// Recognizer for typed input: each line read is one finalized utterance.
/// Clones share the transcript and the listening switch.
#[derive(Clone, Default)]
pub struct ConsoleRecognizer
{   transcript: Arc<Mutex<TranscriptBuffer>>
  , listening: Arc<AtomicBool>
}

impl ConsoleRecognizer
{   pub fn new() -> Self
    {   ConsoleRecognizer::default()
    }

    /// Record a line if listening; returns whether it should be dispatched
    pub fn hear(&self, line: &str) -> Result<bool, crate::error::Error>
    {   if !self.is_listening()
        {   debug!("Ignoring input while not listening");
            return Ok(false);
        }
        self.lock()?.push_final(line);
        Ok(true)
    }

    pub fn transcript(&self) -> Result<String, crate::error::Error>
    {   Ok(self.lock()?.transcript())
    }

    fn lock(&self)
      -> Result<MutexGuard<'_, TranscriptBuffer>, crate::error::Error>
    {   self.transcript.lock().map_err(|e| {
          crate::error::Error::RecognizerError(e.to_string())
        })
    }
}

impl Recognizer for ConsoleRecognizer
{   fn supports_continuous_listening(&self) -> bool
    {   true
    }

    fn start_listening(&mut self) -> Result<(), crate::error::Error>
    {   info!("Microphone: on");
        self.listening.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_listening(&mut self) -> Result<(), crate::error::Error>
    {   info!("Microphone: off");
        self.listening.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_listening(&self) -> bool
    {   self.listening.load(Ordering::SeqCst)
    }

    fn reset_transcript(&mut self) -> Result<(), crate::error::Error>
    {   debug!("Resetting transcript");
        self.lock()?.clear();
        Ok(())
    }
}
