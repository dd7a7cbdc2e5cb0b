//! Voice command registry and dispatcher
//!
//! Patterns are either a finite set of literal phrases or a template with
//! `*` slots. Specs are tried in registration order and the first
//! structural match wins; unmatched utterances go to the fallback handler.

use log::{debug, trace};

pub const CREATE_PROFILE_TEMPLATE: &str
  = "Create a profile of * interested in *";

pub const INTRO_MESSAGE: &str
  = "You can say \"help\" to get a list of commands";

pub const HELP_MESSAGE: &str
  = "You can use the following commands:\n\
     Create a profile of ... interested in ... - Generates a new persona\n\
     help - Shows this message\n\
     clear - Clears the screen\n";

/// What a matched utterance asks the orchestrator to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction
{   CreateProfile
    {   preferences: String
      , interests: Vec<String>
    }
  , Help
  , Clear
  , Unrecognized
}

/// One piece of a slotted template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment
{   Text(String)
  , Slot
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern
{   /// Any one of these phrases, matched whole
    Literals(Vec<String>)
  , /// Literal text interleaved with capturing slots
    Template(Vec<Segment>)
}

impl Pattern
{   pub fn literals(phrases: &[&str]) -> Self
    {   Pattern::Literals(
          phrases.iter().map(|p| p.to_string()).collect()
        )
    }

    /// Parse a template such as `"Create a profile of * interested in *"`
    pub fn template(template: &str)
      -> Result<Self, crate::error::Error>
    {   let parts: Vec<&str> = template.split('*').collect();
        let last = parts.len() - 1;
        let mut segments = vec![];
        for (i, part) in parts.iter().enumerate()
        {   if !part.is_empty()
            {   segments.push(Segment::Text(part.to_string()));
            } else if i > 0 && i < last
            {   return Err(crate::error::Error::InvalidConfiguration(
                  format!("Adjacent slots in template: {}", template)
                ));
            }
            if i < last
            {   segments.push(Segment::Slot);
            }
        }
        Ok(Pattern::Template(segments))
    }

    /// Match a normalized utterance, returning captures in order
    pub fn captures(&self, utterance: &str) -> Option<Vec<String>>
    {   match self
        {   Pattern::Literals(phrases) => phrases
              .iter()
              .find(|p| p.eq_ignore_ascii_case(utterance))
              .map(|p| vec![p.to_ascii_lowercase()])
          , Pattern::Template(segments) => {
              match_template(segments, utterance)
            }
        }
    }
}

/// Slot-by-slot matcher. The haystack is an ASCII-lowercased copy of the
/// utterance so byte offsets are shared with the original text.
fn match_template(segments: &[Segment], text: &str)
  -> Option<Vec<String>>
{   let hay = text.to_ascii_lowercase();
    let mut pos = 0;
    let mut open_slot: Option<usize> = None;
    let mut captures = vec![];

    for (i, segment) in segments.iter().enumerate()
    {   match segment
        {   Segment::Slot => open_slot = Some(pos)
          , Segment::Text(literal) => {
              let needle = literal.to_ascii_lowercase();
              match open_slot.take()
              {   None => {
                    if !hay[pos..].starts_with(&needle)
                    {   return None;
                    }
                    pos += needle.len();
                  }
                , Some(start) => {
                    let found = if i + 1 == segments.len()
                    {   hay.strip_suffix(needle.as_str())
                          .map(|head| head.len())
                          .filter(|&at| at >= start)
                    } else
                    {   hay[start..]
                          .match_indices(needle.as_str())
                          .map(|(offset, _)| start + offset)
                          .find(|&at| !text[start..at].trim().is_empty())
                    };
                    let at = found?;
                    let captured = text[start..at].trim();
                    if captured.is_empty()
                    {   return None;
                    }
                    captures.push(captured.to_string());
                    pos = at + needle.len();
                  }
              }
            }
        }
    }

    match open_slot
    {   Some(start) => {
          let captured = text[start..].trim();
          if captured.is_empty()
          {   return None;
          }
          captures.push(captured.to_string());
        }
      , None if pos != hay.len() => return None
      , None => {}
    }
    Some(captures)
}

/// Collapse whitespace and drop trailing punctuation from recognizer output
pub fn normalize_utterance(utterance: &str) -> String
{   let collapsed = utterance
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ");
    collapsed
      .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','))
      .trim_end()
      .to_string()
}

/// Split a spoken list such as `"hiking, cooking and chess"`
pub fn split_interests(raw: &str) -> Vec<String>
{   let mut interests = vec![];
    for piece in raw.split(',')
    {   let mut current: Vec<&str> = vec![];
        for word in piece.split_whitespace()
        {   if word.eq_ignore_ascii_case("and")
            {   if !current.is_empty()
                {   interests.push(current.join(" "));
                    current.clear();
                }
            } else
            {   current.push(word);
            }
        }
        if !current.is_empty()
        {   interests.push(current.join(" "));
        }
    }
    interests
}

pub type Handler = fn(&[String]) -> CommandAction;

/// One recognizable voice pattern and its handler
#[derive(Clone)]
pub struct CommandSpec
{   pub pattern: Pattern
  , pub handler: Handler
}

impl std::fmt::Debug for CommandSpec
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.debug_struct("CommandSpec")
          .field("pattern", &self.pattern)
          .finish_non_exhaustive()
    }
}

fn create_profile(captures: &[String]) -> CommandAction
{   match captures
    {   [preferences, interests] => CommandAction::CreateProfile
        {   preferences: preferences.clone()
          , interests: split_interests(interests)
        }
      , _ => CommandAction::Unrecognized
    }
}

fn help_or_clear(captures: &[String]) -> CommandAction
{   match captures.first().map(String::as_str)
    {   Some("help") => CommandAction::Help
      , Some("clear") => CommandAction::Clear
      , _ => CommandAction::Unrecognized
    }
}

fn unrecognized(_: &[String]) -> CommandAction
{   CommandAction::Unrecognized
}

/// Ordered table of command specs
#[derive(Clone)]
pub struct CommandRegistry
{   specs: Vec<CommandSpec>
  , fallback: Handler
}

impl std::fmt::Debug for CommandRegistry
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.debug_struct("CommandRegistry")
          .field("specs", &self.specs)
          .finish_non_exhaustive()
    }
}

impl CommandRegistry
{   pub fn new(fallback: Handler) -> Self
    {   CommandRegistry
        {   specs: vec![]
          , fallback
        }
    }

    /// Registry with the built-in profile, help and clear commands
    pub fn standard() -> Result<Self, crate::error::Error>
    {   let mut registry = CommandRegistry::new(unrecognized);
        registry.register(CommandSpec
        {   pattern: Pattern::template(CREATE_PROFILE_TEMPLATE)?
          , handler: create_profile
        })?;
        registry.register(CommandSpec
        {   pattern: Pattern::literals(&["help", "clear"])
          , handler: help_or_clear
        })?;
        Ok(registry)
    }

    /// Append a spec. A literal phrase may only be claimed once.
    pub fn register(&mut self, spec: CommandSpec)
      -> Result<(), crate::error::Error>
    {   if let Pattern::Literals(phrases) = &spec.pattern
        {   for phrase in phrases
            {   let claimed = self.specs.iter().any(|s| {
                  matches!(&s.pattern, Pattern::Literals(existing)
                    if existing.iter()
                      .any(|e| e.eq_ignore_ascii_case(phrase)))
                });
                if claimed
                {   return Err(
                      crate::error::Error::InvalidConfiguration(
                        format!("Phrase already registered: {}", phrase)
                      )
                    );
                }
            }
        }
        debug!("Registering command {:?}", spec.pattern);
        self.specs.push(spec);
        Ok(())
    }

    pub fn len(&self) -> usize
    {   self.specs.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.specs.is_empty()
    }

    /// Run the handler of the first matching spec, or the fallback
    pub fn dispatch(&self, utterance: &str) -> CommandAction
    {   let normalized = normalize_utterance(utterance);
        trace!("Dispatching utterance: {:?}", normalized);
        for (index, spec) in self.specs.iter().enumerate()
        {   if let Some(captures) = spec.pattern.captures(&normalized)
            {   debug!(
                  "Utterance matched command {} with {:?}",
                  index, captures
                );
                return (spec.handler)(&captures);
            }
        }
        debug!("No command matched {:?}", normalized);
        (self.fallback)(&[])
    }
}
