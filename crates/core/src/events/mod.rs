use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::GlowbitError;

/// The fixed set of simulated inputs a lesson can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventName {
    ButtonA,
    ButtonB,
    Shake,
    TiltUp,
    TiltDown,
    TiltLeft,
    TiltRight,
    ScreenUp,
    ScreenDown,
    Loud,
    Quiet,
}

impl EventName {
    pub const ALL: [EventName; 11] = [
        EventName::ButtonA,
        EventName::ButtonB,
        EventName::Shake,
        EventName::TiltUp,
        EventName::TiltDown,
        EventName::TiltLeft,
        EventName::TiltRight,
        EventName::ScreenUp,
        EventName::ScreenDown,
        EventName::Loud,
        EventName::Quiet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventName::ButtonA => "button-a",
            EventName::ButtonB => "button-b",
            EventName::Shake => "shake",
            EventName::TiltUp => "tilt-up",
            EventName::TiltDown => "tilt-down",
            EventName::TiltLeft => "tilt-left",
            EventName::TiltRight => "tilt-right",
            EventName::ScreenUp => "screen-up",
            EventName::ScreenDown => "screen-down",
            EventName::Loud => "loud",
            EventName::Quiet => "quiet",
        }
    }

    /// Looks up a name as typed by a UI or a lesson: case-insensitive,
    /// `_` and spaces read as `-`, and bare `A`/`B` mean the buttons.
    pub fn parse(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .chars()
            .map(|c| match c {
                '_' | ' ' => '-',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        match key.as_str() {
            "a" => Some(EventName::ButtonA),
            "b" => Some(EventName::ButtonB),
            _ => Self::ALL.into_iter().find(|event| event.as_str() == key),
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = GlowbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::parse(s).ok_or_else(|| GlowbitError::msg(format!("unknown event `{s}`")))
    }
}

impl TryFrom<String> for EventName {
    type Error = GlowbitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventName> for String {
    fn from(value: EventName) -> Self {
        value.as_str().to_string()
    }
}

/// Ordered handler lists keyed by event.
///
/// Generic over the handler type so the registry stays independent of what
/// a handler gets to touch when it runs.
#[derive(Debug)]
pub struct EventRegistry<H> {
    handlers: HashMap<EventName, Vec<H>>,
}

impl<H> Default for EventRegistry<H> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<H: Clone> EventRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, event: EventName, handler: H) {
        self.handlers.entry(event).or_default().push(handler);
    }

    /// Snapshot of the handlers for `event` in registration order. Handlers
    /// registered while these run only see later triggers.
    pub fn handlers_for(&self, event: EventName) -> Vec<H> {
        self.handlers.get(&event).cloned().unwrap_or_default()
    }

    pub fn handler_count(&self, event: EventName) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}
