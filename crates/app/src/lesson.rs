use std::{collections::BTreeMap, path::Path, rc::Rc, time::Duration};

use glowbit_core::{EventName, Pitch, Program, Result, Rgb, RuntimeSession, ToneLength};
use serde::{Deserialize, Serialize};

/// Tone length used when a lesson gives neither `ms` nor `beats`.
const DEFAULT_TONE_MS: u64 = 500;

/// Instruction list emitted by the block editor for one lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lesson {
    /// Top-level blocks, executed once when the lesson runs.
    #[serde(default)]
    pub on_start: Vec<Step>,
    /// Blocks attached to input events.
    #[serde(default)]
    pub on: BTreeMap<EventName, Vec<Step>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    ShowText {
        text: String,
        #[serde(default)]
        speed_ms: Option<u64>,
        #[serde(default)]
        color: Option<Rgb>,
        #[serde(default)]
        surface: Option<String>,
    },
    ShowIcon {
        icon: String,
        #[serde(default)]
        color: Option<Rgb>,
        #[serde(default)]
        surface: Option<String>,
    },
    Clear {
        #[serde(default)]
        surface: Option<String>,
    },
    SetPixel {
        x: i32,
        y: i32,
        #[serde(default)]
        color: Option<Rgb>,
        #[serde(default)]
        surface: Option<String>,
    },
    PlayTone {
        pitch: Pitch,
        #[serde(default)]
        ms: Option<u64>,
        #[serde(default)]
        beats: Option<f32>,
    },
    Pause {
        ms: u64,
    },
    SetBrightness {
        value: u8,
    },
    SetColor {
        color: Rgb,
    },
    SetTempo {
        bpm: u32,
    },
    ChangeCounter {
        by: i64,
    },
    ShowCounter {
        #[serde(default)]
        surface: Option<String>,
    },
}

impl Lesson {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl Program for Lesson {
    fn run(&self, session: &mut RuntimeSession) -> Result<()> {
        for (event, steps) in &self.on {
            let steps = Rc::new(steps.clone());
            session.on(*event, move |s| apply_steps(s, &steps));
        }
        apply_steps(session, &self.on_start)
    }
}

fn apply_steps(session: &mut RuntimeSession, steps: &[Step]) -> Result<()> {
    for step in steps {
        apply_step(session, step);
    }
    Ok(())
}

fn apply_step(session: &mut RuntimeSession, step: &Step) {
    match step {
        Step::ShowText {
            text,
            speed_ms,
            color,
            surface,
        } => {
            let speed = speed_ms.map(Duration::from_millis);
            session.show_text(text, speed, *color, surface.as_deref());
        }
        Step::ShowIcon {
            icon,
            color,
            surface,
        } => {
            session.show_icon(icon, *color, surface.as_deref());
        }
        Step::Clear { surface } => {
            session.clear(surface.as_deref());
        }
        Step::SetPixel {
            x,
            y,
            color,
            surface,
        } => {
            session.set_pixel(*x, *y, *color, surface.as_deref());
        }
        Step::PlayTone { pitch, ms, beats } => {
            let length = match (beats, ms) {
                (Some(beats), _) => ToneLength::Beats(*beats),
                (None, Some(ms)) => ToneLength::Millis(*ms),
                (None, None) => ToneLength::Millis(DEFAULT_TONE_MS),
            };
            session.play_tone(pitch.clone(), length);
        }
        Step::Pause { ms } => {
            session.pause(Duration::from_millis(*ms));
        }
        Step::SetBrightness { value } => session.set_brightness(*value),
        Step::SetColor { color } => session.set_default_color(*color),
        Step::SetTempo { bpm } => session.set_tempo(*bpm),
        Step::ChangeCounter { by } => {
            session.change_counter(*by);
        }
        Step::ShowCounter { surface } => {
            let text = session.counter().to_string();
            session.show_text(&text, None, None, surface.as_deref());
        }
    }
}
