//! The runtime session: one lesson's framebuffers, command queue, event
//! handlers and scalar settings behind a single owned value.
//!
//! Nothing here waits on real time. The host moves time forward with
//! [`RuntimeSession::advance`], and every pending wait (a command's
//! completion, the scroll ticker, a tone's duration) lives in the session's
//! single timer slot.

use std::{fmt, rc::Rc, time::Duration};

use crate::{
    command::{Command, Pitch, SurfaceId},
    config::AppConfig,
    display::{DisplayEngine, Frame, RenderSink},
    events::{EventName, EventRegistry},
    framebuffer::{Framebuffer, PixelMatrix, SurfaceGeometry, DISPLAY_SIZE},
    queue::{CommandId, CommandQueue, CompletedCommand, QueueState},
    raster,
    sound::{self, Mute, ToneBackend, ToneCompletion, ToneLength},
    timeline::{SessionClock, TimerSlot},
    GlowbitError, Result, Rgb,
};

/// Event handler registered by a lesson program.
pub type Handler = Rc<dyn Fn(&mut RuntimeSession) -> Result<()>>;

/// Translated lesson code, executed once, top to bottom, by
/// [`RuntimeSession::run`].
pub trait Program {
    fn run(&self, session: &mut RuntimeSession) -> Result<()>;
}

impl<F> Program for F
where
    F: Fn(&mut RuntimeSession) -> Result<()>,
{
    fn run(&self, session: &mut RuntimeSession) -> Result<()> {
        self(session)
    }
}

/// Outcome of [`RuntimeSession::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The top-level pass finished; queued work and handlers stay live.
    Running,
    /// The top-level pass failed and the session was stopped.
    Failed,
}

#[derive(Debug)]
enum Pending {
    Complete { failed: bool },
    Scroll(ScrollState),
}

#[derive(Debug)]
struct ScrollState {
    surface: SurfaceId,
    strip: PixelMatrix,
    offset: usize,
    speed: Duration,
    color: Rgb,
}

enum Step {
    Wait(Duration, Pending),
    Done,
}

pub struct RuntimeSession {
    config: AppConfig,
    clock: SessionClock,
    timer: TimerSlot<Pending>,
    queue: CommandQueue,
    display: DisplayEngine,
    events: EventRegistry<Handler>,
    tone: Box<dyn ToneBackend>,
    sink: Option<Box<dyn RenderSink>>,
    default_surface: SurfaceId,
    default_color: Rgb,
    tempo_bpm: u32,
    last_gesture: Option<EventName>,
    counter: i64,
    running: bool,
}

impl RuntimeSession {
    /// Creates a stopped session with the default surface attached and a
    /// silent tone backend.
    pub fn new(config: AppConfig) -> Result<Self> {
        let default_surface = SurfaceId::new(config.display.default_surface.clone());
        let mut display = DisplayEngine::new(config.display.brightness, config.display.background);
        display.attach(default_surface.clone(), config.display.geometry)?;

        Ok(Self {
            clock: SessionClock::new(),
            timer: TimerSlot::new(),
            queue: CommandQueue::new(config.timing.history_limit),
            display,
            events: EventRegistry::new(),
            tone: Box::new(Mute::new()),
            sink: None,
            default_surface,
            default_color: config.display.default_color,
            tempo_bpm: config.sound.tempo_bpm.max(1),
            last_gesture: None,
            counter: 0,
            running: false,
            config,
        })
    }

    pub fn with_tone_backend(mut self, backend: impl ToneBackend + 'static) -> Self {
        self.tone = Box::new(backend);
        self
    }

    pub fn with_render_sink(mut self, sink: impl RenderSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ----- surfaces --------------------------------------------------------

    /// Allocates a framebuffer for `surface` and presents it blank.
    pub fn attach(&mut self, surface: impl Into<SurfaceId>, geometry: SurfaceGeometry) -> Result<()> {
        let surface = surface.into();
        self.display.attach(surface.clone(), geometry)?;
        self.present(&surface);
        Ok(())
    }

    pub fn render(&self, surface: &str) -> Result<Frame> {
        self.display.render(&SurfaceId::from(surface))
    }

    pub fn render_default(&self) -> Result<Frame> {
        self.display.render(&self.default_surface)
    }

    pub fn framebuffer(&self, surface: Option<&str>) -> Result<&Framebuffer> {
        self.display.framebuffer(&self.surface_or_default(surface))
    }

    pub fn default_surface(&self) -> &SurfaceId {
        &self.default_surface
    }

    pub fn display(&self) -> &DisplayEngine {
        &self.display
    }

    /// Writes a pixel straight into the framebuffer, bypassing the queue.
    /// Out-of-range coordinates and unknown surfaces are ignored.
    pub fn set_pixel_now(&mut self, x: i32, y: i32, color: Option<Rgb>, surface: Option<&str>) {
        let surface = self.surface_or_default(surface);
        match self.display.set_pixel(&surface, x, y, color) {
            Ok(true) => self.present(&surface),
            Ok(false) => {}
            Err(err) => tracing::warn!(error = %err, "direct pixel write ignored"),
        }
    }

    /// Clears a framebuffer straight away, bypassing the queue.
    pub fn clear_now(&mut self, surface: Option<&str>) {
        let surface = self.surface_or_default(surface);
        match self.display.clear(&surface) {
            Ok(()) => self.present(&surface),
            Err(err) => tracing::warn!(error = %err, "direct clear ignored"),
        }
    }

    // ----- command surface used by translated programs ---------------------

    /// Queues a command and starts draining if the queue was idle.
    pub fn enqueue(&mut self, command: Command) -> CommandId {
        let id = self.queue.push(command);
        if self.queue.is_idle() {
            self.drain();
        }
        id
    }

    pub fn show_text(
        &mut self,
        text: &str,
        speed: Option<Duration>,
        color: Option<Rgb>,
        surface: Option<&str>,
    ) -> CommandId {
        let command = Command::Text {
            surface: self.surface_or_default(surface),
            content: text.to_string(),
            speed: speed.unwrap_or_else(|| self.config.timing.text_speed()),
            color: color.unwrap_or(self.default_color),
        };
        self.enqueue(command)
    }

    pub fn show_icon(&mut self, name: &str, color: Option<Rgb>, surface: Option<&str>) -> CommandId {
        let command = Command::Icon {
            surface: self.surface_or_default(surface),
            name: name.to_string(),
            color: color.unwrap_or(self.default_color),
            duration: self.config.timing.icon_duration(),
        };
        self.enqueue(command)
    }

    pub fn clear(&mut self, surface: Option<&str>) -> CommandId {
        let command = Command::Clear {
            surface: self.surface_or_default(surface),
        };
        self.enqueue(command)
    }

    /// Queues a pixel write in `color`, or the default colour.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Option<Rgb>, surface: Option<&str>) -> CommandId {
        let command = Command::SetPixel {
            surface: self.surface_or_default(surface),
            x,
            y,
            color: Some(color.unwrap_or(self.default_color)),
        };
        self.enqueue(command)
    }

    /// Queues turning one pixel off.
    pub fn unset_pixel(&mut self, x: i32, y: i32, surface: Option<&str>) -> CommandId {
        let command = Command::SetPixel {
            surface: self.surface_or_default(surface),
            x,
            y,
            color: None,
        };
        self.enqueue(command)
    }

    pub fn play_tone(&mut self, pitch: impl Into<Pitch>, length: ToneLength) -> CommandId {
        let command = Command::Tone {
            pitch: pitch.into(),
            duration: length.to_duration(self.tempo_bpm),
        };
        self.enqueue(command)
    }

    pub fn pause(&mut self, duration: Duration) -> CommandId {
        self.enqueue(Command::Pause { duration })
    }

    // ----- events -----------------------------------------------------------

    pub fn on<F>(&mut self, event: EventName, handler: F)
    where
        F: Fn(&mut RuntimeSession) -> Result<()> + 'static,
    {
        self.events.on(event, Rc::new(handler));
    }

    /// Registers a handler by event name; names outside the fixed set are
    /// ignored and reported as `false`.
    pub fn on_named<F>(&mut self, name: &str, handler: F) -> bool
    where
        F: Fn(&mut RuntimeSession) -> Result<()> + 'static,
    {
        match EventName::parse(name) {
            Some(event) => {
                self.on(event, handler);
                true
            }
            None => {
                tracing::debug!(event = name, "ignoring handler for unknown event");
                false
            }
        }
    }

    /// Simulated input by name, as pressed in a UI. Unknown names do nothing.
    pub fn trigger(&mut self, name: &str) {
        match EventName::parse(name) {
            Some(event) => self.trigger_event(event),
            None => tracing::debug!(event = name, "ignoring unknown event"),
        }
    }

    /// Runs every handler for `event` in registration order and returns
    /// without waiting for anything they queue. Does nothing while stopped.
    pub fn trigger_event(&mut self, event: EventName) {
        if !self.running {
            tracing::debug!(%event, "session stopped; event dropped");
            return;
        }

        self.last_gesture = Some(event);
        let handlers = self.events.handlers_for(event);
        if handlers.is_empty() {
            tracing::debug!(%event, "no handlers registered");
        }

        for handler in handlers {
            if let Err(err) = (*handler)(self) {
                tracing::warn!(%event, error = %err, "event handler failed");
            }
            if !self.running {
                break;
            }
        }
    }

    pub fn last_gesture(&self) -> Option<EventName> {
        self.last_gesture
    }

    pub fn is_gesture(&self, name: &str) -> bool {
        match (EventName::parse(name), self.last_gesture) {
            (Some(wanted), Some(last)) => wanted == last,
            _ => false,
        }
    }

    pub fn handler_count(&self, event: EventName) -> usize {
        self.events.handler_count(event)
    }

    // ----- scalar settings --------------------------------------------------

    pub fn brightness(&self) -> u8 {
        self.display.brightness()
    }

    /// Changes the global brightness and repaints every surface with it.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.display.set_brightness(brightness);
        self.present_all();
    }

    pub fn default_color(&self) -> Rgb {
        self.default_color
    }

    pub fn set_default_color(&mut self, color: Rgb) {
        self.default_color = color;
    }

    pub fn tempo(&self) -> u32 {
        self.tempo_bpm
    }

    pub fn set_tempo(&mut self, bpm: u32) {
        self.tempo_bpm = bpm.max(1);
    }

    pub fn counter(&self) -> i64 {
        self.counter
    }

    pub fn set_counter(&mut self, value: i64) {
        self.counter = value;
    }

    pub fn change_counter(&mut self, delta: i64) -> i64 {
        self.counter = self.counter.saturating_add(delta);
        self.counter
    }

    // ----- lifecycle --------------------------------------------------------

    /// Resets the session and executes `program` once. Commands it queues
    /// start right away; handlers it registers fire on later triggers. A
    /// failing program is logged and leaves the session stopped.
    pub fn run<P: Program + ?Sized>(&mut self, program: &P) -> RunStatus {
        self.reset();
        self.running = true;
        tracing::info!(now_ms = self.clock.now().as_millis() as u64, "program started");

        match program.run(self) {
            Ok(()) => RunStatus::Running,
            Err(err) => {
                tracing::warn!(error = %err, "program failed; stopping session");
                self.stop();
                RunStatus::Failed
            }
        }
    }

    /// Cancels the pending timer, empties the queue, clears every surface
    /// and marks the session stopped. Safe to call at any time.
    pub fn stop(&mut self) {
        let cancelled = self.timer.cancel();
        let dropped = self.queue.clear();
        if cancelled {
            self.tone.silence();
        }

        let lit: Vec<SurfaceId> = self
            .display
            .surface_ids()
            .filter(|id| {
                self.display
                    .framebuffer(id)
                    .map(|fb| !fb.is_blank())
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        self.display.clear_all();
        for surface in &lit {
            self.present(surface);
        }

        if std::mem::replace(&mut self.running, false) || cancelled || dropped > 0 {
            tracing::info!(dropped, cancelled, "program stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ----- time -------------------------------------------------------------

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Session time at which the pending timer fires, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timer.due_at()
    }

    /// Moves session time forward by `delta`, firing every timer that falls
    /// due on the way, in order.
    pub fn advance(&mut self, delta: Duration) {
        let target = self.clock.now().saturating_add(delta);
        while let Some(timer) = self.timer.take_due(target) {
            self.clock.advance_to(timer.due);
            self.fire(timer.payload);
        }
        self.clock.advance_to(target);
    }

    /// Jumps from deadline to deadline until nothing is pending or the next
    /// deadline lies beyond `limit`. Returns the session time spent.
    pub fn run_until_idle(&mut self, limit: Duration) -> Duration {
        let start = self.clock.now();
        let deadline = start.saturating_add(limit);
        while let Some(due) = self.timer.due_at() {
            if due > deadline {
                break;
            }
            self.advance(due.saturating_sub(self.clock.now()));
        }
        self.clock.now() - start
    }

    // ----- queue inspection -------------------------------------------------

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_state(&self) -> QueueState {
        self.queue.state()
    }

    /// No command in flight, none waiting and no timer pending.
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle() && self.queue.is_empty() && !self.timer.is_armed()
    }

    pub fn history(&self) -> impl Iterator<Item = &CompletedCommand> {
        self.queue.history()
    }

    // ----- internals --------------------------------------------------------

    fn reset(&mut self) {
        self.stop();
        self.events.clear();
        self.display.set_brightness(self.config.display.brightness);
        self.default_color = self.config.display.default_color;
        self.tempo_bpm = self.config.sound.tempo_bpm.max(1);
        self.last_gesture = None;
        self.counter = 0;
    }

    fn surface_or_default(&self, surface: Option<&str>) -> SurfaceId {
        surface
            .map(SurfaceId::from)
            .unwrap_or_else(|| self.default_surface.clone())
    }

    fn drain(&mut self) {
        while let Some(next) = self.queue.start_next(self.clock.now()) {
            let kind = next.command.kind();
            match self.execute(next.command) {
                Ok(Step::Wait(delay, pending)) => {
                    self.timer.arm(self.clock.now().saturating_add(delay), pending);
                    return;
                }
                Ok(Step::Done) => {
                    self.queue.finish(self.clock.now(), false);
                }
                Err(err) => {
                    tracing::warn!(command = next.id.0, %kind, error = %err, "command failed");
                    self.queue.finish(self.clock.now(), true);
                }
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<Step> {
        let timing = &self.config.timing;
        match command {
            Command::Text {
                surface,
                content,
                speed,
                color,
            } => {
                debug_assert!(!self.timer.is_armed(), "text started with a timer pending");
                let strip = raster::text_filmstrip(&content);
                self.display.draw_scroll_step(&surface, &strip, 0, color)?;
                self.present(&surface);
                Ok(Step::Wait(
                    speed,
                    Pending::Scroll(ScrollState {
                        surface,
                        strip,
                        offset: 0,
                        speed,
                        color,
                    }),
                ))
            }
            Command::Icon {
                surface,
                name,
                color,
                duration,
            } => {
                self.display.draw_icon(&surface, &name, color)?;
                self.present(&surface);
                Ok(Step::Wait(duration, Pending::Complete { failed: false }))
            }
            Command::Clear { surface } => {
                let delay = timing.clear_delay();
                self.display.clear(&surface)?;
                self.present(&surface);
                Ok(Step::Wait(delay, Pending::Complete { failed: false }))
            }
            Command::SetPixel {
                surface,
                x,
                y,
                color,
            } => {
                let delay = timing.set_pixel_delay();
                if self.display.set_pixel(&surface, x, y, color)? {
                    self.present(&surface);
                }
                Ok(Step::Wait(delay, Pending::Complete { failed: false }))
            }
            Command::Tone { pitch, duration } => {
                let failure_delay = timing.tone_failure_delay();
                let started = resolve_pitch(&pitch)
                    .and_then(|frequency| self.tone.play_tone(frequency, duration));
                match started {
                    Ok(ToneCompletion::AfterDuration) => {
                        Ok(Step::Wait(duration, Pending::Complete { failed: false }))
                    }
                    Ok(ToneCompletion::Finished) => Ok(Step::Done),
                    Err(err) => {
                        tracing::warn!(error = %err, "tone failed; continuing");
                        Ok(Step::Wait(failure_delay, Pending::Complete { failed: true }))
                    }
                }
            }
            Command::Pause { duration } => Ok(Step::Wait(duration, Pending::Complete { failed: false })),
        }
    }

    fn fire(&mut self, pending: Pending) {
        match pending {
            Pending::Complete { failed } => self.complete_current(failed),
            Pending::Scroll(mut scroll) => {
                scroll.offset += 1;
                let drawn =
                    self.display
                        .draw_scroll_step(&scroll.surface, &scroll.strip, scroll.offset, scroll.color);
                if let Err(err) = drawn {
                    tracing::warn!(error = %err, "scroll step failed");
                    self.complete_current(true);
                    return;
                }
                self.present(&scroll.surface);

                let due = self.clock.now().saturating_add(scroll.speed);
                if scroll.offset >= scroll.strip.width() + DISPLAY_SIZE {
                    self.timer.arm(due, Pending::Complete { failed: false });
                } else {
                    self.timer.arm(due, Pending::Scroll(scroll));
                }
            }
        }
    }

    fn complete_current(&mut self, failed: bool) {
        if let Some(record) = self.queue.finish(self.clock.now(), failed) {
            tracing::trace!(command = record.id.0, kind = %record.kind, "command complete");
        }
        self.drain();
    }

    fn present(&mut self, surface: &SurfaceId) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let presented = self
            .display
            .render(surface)
            .and_then(|frame| sink.present(&frame));
        if let Err(err) = presented {
            tracing::warn!(%surface, error = %err, "render sink failed");
        }
    }

    fn present_all(&mut self) {
        let surfaces: Vec<SurfaceId> = self.display.surface_ids().cloned().collect();
        for surface in &surfaces {
            self.present(surface);
        }
    }
}

fn resolve_pitch(pitch: &Pitch) -> Result<f32> {
    match pitch {
        Pitch::Hz(hz) if hz.is_finite() && *hz > 0.0 => Ok(*hz),
        Pitch::Hz(hz) => Err(GlowbitError::Tone(format!("invalid frequency {hz}"))),
        Pitch::Note(name) => {
            sound::note_frequency(name).ok_or_else(|| GlowbitError::UnknownNote(name.clone()))
        }
    }
}

impl fmt::Debug for RuntimeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeSession")
            .field("now", &self.clock.now())
            .field("running", &self.running)
            .field("queue_state", &self.queue.state())
            .field("queued", &self.queue.len())
            .field("timer_due", &self.timer.due_at())
            .field("surfaces", &self.display.surface_ids().count())
            .field("default_color", &self.default_color)
            .field("tempo_bpm", &self.tempo_bpm)
            .field("counter", &self.counter)
            .finish()
    }
}

#[cfg(test)]
mod tests;
