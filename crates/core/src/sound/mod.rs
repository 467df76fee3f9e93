use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{GlowbitError, Result};

/// How the queue should learn that a started tone is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneCompletion {
    /// The backend plays asynchronously; wait out the requested duration.
    AfterDuration,
    /// The backend already finished before returning.
    Finished,
}

/// Opaque "play a tone" capability. Failures are never fatal to the queue.
pub trait ToneBackend {
    fn play_tone(&mut self, frequency_hz: f32, duration: Duration) -> Result<ToneCompletion>;

    /// Silences anything still sounding. Called when the session stops.
    fn silence(&mut self) {}
}

/// Backend that plays nothing but still keeps time.
#[derive(Debug, Default)]
pub struct Mute;

impl Mute {
    pub fn new() -> Self {
        Mute
    }
}

impl ToneBackend for Mute {
    fn play_tone(&mut self, _frequency_hz: f32, _duration: Duration) -> Result<ToneCompletion> {
        Ok(ToneCompletion::AfterDuration)
    }
}

/// One tone request seen by a [`ToneLog`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneRecord {
    pub frequency_hz: f32,
    pub duration: Duration,
}

/// Recording backend with a cloneable handle, so a host can inspect what
/// the session played after handing the backend over.
#[derive(Debug, Clone, Default)]
pub struct ToneLog {
    played: Arc<Mutex<Vec<ToneRecord>>>,
    silenced: Arc<Mutex<usize>>,
}

impl ToneLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Result<Vec<ToneRecord>> {
        Ok(self.lock_played()?.clone())
    }

    pub fn silence_count(&self) -> Result<usize> {
        self.silenced
            .lock()
            .map(|count| *count)
            .map_err(|_| GlowbitError::msg("tone log has been poisoned"))
    }

    fn lock_played(&self) -> Result<MutexGuard<'_, Vec<ToneRecord>>> {
        self.played
            .lock()
            .map_err(|_| GlowbitError::msg("tone log has been poisoned"))
    }
}

impl ToneBackend for ToneLog {
    fn play_tone(&mut self, frequency_hz: f32, duration: Duration) -> Result<ToneCompletion> {
        self.lock_played()?.push(ToneRecord {
            frequency_hz,
            duration,
        });
        Ok(ToneCompletion::AfterDuration)
    }

    fn silence(&mut self) {
        if let Ok(mut count) = self.silenced.lock() {
            *count += 1;
        }
    }
}

/// Backend standing in for a host without audio output.
#[derive(Debug, Default)]
pub struct Unavailable;

impl ToneBackend for Unavailable {
    fn play_tone(&mut self, _frequency_hz: f32, _duration: Duration) -> Result<ToneCompletion> {
        Err(GlowbitError::Tone("no audio output available".to_string()))
    }
}

/// Equal-tempered frequency for scientific pitch names such as `A4`,
/// `C#5` or `Bb3`, with A4 at 440 Hz. Octaves 0 through 8 are accepted.
pub fn note_frequency(name: &str) -> Option<f32> {
    let mut chars = name.trim().chars().peekable();

    let semitone: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let accidental = match chars.peek() {
        Some('#') => 1,
        Some('b') => -1,
        _ => 0,
    };
    if accidental != 0 {
        chars.next();
    }

    let octave: String = chars.collect();
    let octave: i32 = octave.parse().ok()?;
    if !(0..=8).contains(&octave) {
        return None;
    }

    let midi = (octave + 1) * 12 + semitone + accidental;
    Some(440.0 * 2f32.powf((midi - 69) as f32 / 12.0))
}

/// Tone length as written by a lesson: absolute, or in beats of the
/// session tempo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneLength {
    Millis(u64),
    Beats(f32),
}

impl ToneLength {
    pub fn to_duration(self, tempo_bpm: u32) -> Duration {
        match self {
            ToneLength::Millis(ms) => Duration::from_millis(ms),
            ToneLength::Beats(beats) => beats_to_duration(beats, tempo_bpm),
        }
    }
}

/// Length of `beats` at `tempo_bpm` beats per minute. Negative or NaN
/// lengths are zero; lengths too long for a `Duration` saturate.
pub fn beats_to_duration(beats: f32, tempo_bpm: u32) -> Duration {
    let beat_ms = 60_000.0 / tempo_bpm.max(1) as f32;
    let secs = (beats.max(0.0) * beat_ms / 1000.0).max(0.0);
    Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
}
