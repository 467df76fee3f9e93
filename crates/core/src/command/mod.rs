use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Rgb;

/// Identifier of one attached display surface.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(String);

impl SurfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SurfaceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SurfaceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Pitch of a tone, either explicit or looked up from the note table when
/// the tone starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pitch {
    Hz(f32),
    Note(String),
}

impl From<f32> for Pitch {
    fn from(value: f32) -> Self {
        Self::Hz(value)
    }
}

impl From<&str> for Pitch {
    fn from(value: &str) -> Self {
        Self::Note(value.to_string())
    }
}

/// One atomic instruction consumed by the command queue.
///
/// Every optional argument is resolved against the session defaults when
/// the command is enqueued, so a queued command never changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Text {
        surface: SurfaceId,
        content: String,
        /// Time between scroll steps.
        speed: Duration,
        color: Rgb,
    },
    Icon {
        surface: SurfaceId,
        name: String,
        color: Rgb,
        duration: Duration,
    },
    Clear {
        surface: SurfaceId,
    },
    SetPixel {
        surface: SurfaceId,
        x: i32,
        y: i32,
        /// `None` turns the cell off.
        color: Option<Rgb>,
    },
    Tone {
        pitch: Pitch,
        duration: Duration,
    },
    Pause {
        duration: Duration,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Text { .. } => CommandKind::Text,
            Command::Icon { .. } => CommandKind::Icon,
            Command::Clear { .. } => CommandKind::Clear,
            Command::SetPixel { .. } => CommandKind::SetPixel,
            Command::Tone { .. } => CommandKind::Tone,
            Command::Pause { .. } => CommandKind::Pause,
        }
    }
}

/// Field-less tag of a [`Command`], used in logs and completion history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Text,
    Icon,
    Clear,
    SetPixel,
    Tone,
    Pause,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Text => "text",
            CommandKind::Icon => "icon",
            CommandKind::Clear => "clear",
            CommandKind::SetPixel => "set_pixel",
            CommandKind::Tone => "tone",
            CommandKind::Pause => "pause",
        };
        f.write_str(name)
    }
}
