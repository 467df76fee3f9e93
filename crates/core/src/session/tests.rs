use std::{cell::RefCell, rc::Rc, time::Duration};

use super::*;
use crate::{
    command::CommandKind,
    display::FrameLog,
    sound::{ToneBackend, ToneCompletion, ToneLog, Unavailable},
};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn session() -> RuntimeSession {
    RuntimeSession::new(AppConfig::default()).unwrap()
}

fn running_session() -> RuntimeSession {
    let mut session = session();
    session.run(&|_: &mut RuntimeSession| Ok(()));
    session
}

fn pixel(session: &RuntimeSession, x: i32, y: i32) -> Option<Rgb> {
    session.framebuffer(None).unwrap().pixel(x, y)
}

#[test]
fn enqueue_while_idle_starts_immediately() {
    let mut session = session();
    session.show_icon("square", Some(Rgb::BLUE), None);

    assert!(matches!(session.queue_state(), QueueState::Draining { .. }));
    assert_eq!(pixel(&session, 0, 0), Some(Rgb::BLUE));
    assert_eq!(session.next_deadline(), Some(ms(500)));
}

#[test]
fn commands_complete_in_enqueue_order() {
    let mut session = session();
    let ids = [
        session.pause(ms(30)),
        session.set_pixel(1, 1, None, None),
        session.clear(None),
        session.show_icon("happy", None, None),
    ];
    assert_eq!(session.queue_len(), 3);

    session.run_until_idle(Duration::from_secs(10));

    let finished: Vec<CommandId> = session.history().map(|record| record.id).collect();
    assert_eq!(finished, ids);
    let times: Vec<Duration> = session.history().map(|record| record.finished_at).collect();
    assert_eq!(times, vec![ms(30), ms(40), ms(90), ms(590)]);
    assert!(session.is_idle());
}

#[test]
fn text_scrolls_through_and_completes_one_tick_after_exit() {
    let mut session = session();
    session.show_text("HI", None, Some(Rgb::GREEN), None);
    assert!(session.framebuffer(None).unwrap().is_blank());

    session.advance(ms(150));
    // first column of the H has entered on the right
    assert_eq!(pixel(&session, 7, 0), Some(Rgb::GREEN));
    assert_eq!(pixel(&session, 6, 0), None);

    let strip_width = raster::text_filmstrip("HI").width() as u64;
    let total = (strip_width + DISPLAY_SIZE as u64 + 1) * 150;
    session.advance(ms(total - 150 - 1));
    assert!(!session.is_idle());
    assert!(session.framebuffer(None).unwrap().is_blank());

    session.advance(ms(1));
    assert!(session.is_idle());
    let record = session.history().last().copied().unwrap();
    assert_eq!(record.kind, CommandKind::Text);
    assert_eq!(record.finished_at, ms(total));
}

#[test]
fn icon_holds_for_its_duration() {
    let mut session = session();
    session.show_icon("no", None, None);
    session.show_icon("yes", None, None);

    session.advance(ms(499));
    assert_eq!(session.queue_len(), 1);
    session.advance(ms(1));
    assert_eq!(session.queue_len(), 0);
    assert_eq!(
        session.framebuffer(None).unwrap().pixel(7, 1),
        Some(session.default_color())
    );
}

#[test]
fn unknown_icon_draws_the_default() {
    let mut with_typo = session();
    with_typo.show_icon("hart", None, None);
    let mut with_default = session();
    with_default.show_icon(raster::DEFAULT_ICON, None, None);

    assert_eq!(
        with_typo.render_default().unwrap(),
        with_default.render_default().unwrap()
    );
}

#[test]
fn tone_then_pause_takes_at_least_their_sum() {
    let tones = ToneLog::new();
    let mut session = session().with_tone_backend(tones.clone());
    session.play_tone(440.0_f32, ToneLength::Millis(200));
    session.pause(ms(50));

    let elapsed = session.run_until_idle(Duration::from_secs(1));
    assert!(elapsed >= ms(250));

    let kinds: Vec<CommandKind> = session.history().map(|record| record.kind).collect();
    assert_eq!(kinds, vec![CommandKind::Tone, CommandKind::Pause]);
    let played = tones.played().unwrap();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].frequency_hz, 440.0);
}

#[test]
fn note_names_and_beats_are_resolved() {
    let tones = ToneLog::new();
    let mut session = session().with_tone_backend(tones.clone());
    session.set_tempo(60);
    session.play_tone("A5", ToneLength::Beats(0.5));

    let played = tones.played().unwrap();
    assert!((played[0].frequency_hz - 880.0).abs() < 0.1);
    assert_eq!(played[0].duration, ms(500));
}

/// Backend whose tones end as soon as they start.
struct Blip;

impl ToneBackend for Blip {
    fn play_tone(&mut self, _frequency_hz: f32, _duration: Duration) -> Result<ToneCompletion> {
        Ok(ToneCompletion::Finished)
    }
}

#[test]
fn finished_tones_complete_without_waiting() {
    let mut session = session().with_tone_backend(Blip);
    session.pause(ms(20));
    let tone = session.play_tone(440.0_f32, ToneLength::Millis(1_000));
    session.show_icon("square", Some(Rgb::GREEN), None);

    session.advance(ms(20));
    let record = session.history().find(|record| record.id == tone).copied().unwrap();
    assert!(!record.failed);
    assert_eq!(record.started_at, ms(20));
    assert_eq!(record.finished_at, ms(20));

    assert_eq!(session.queue_len(), 0);
    assert_eq!(pixel(&session, 0, 0), Some(Rgb::GREEN));
    assert_eq!(session.next_deadline(), Some(ms(520)));
}

#[test]
fn absurd_beat_counts_do_not_panic() {
    let tones = ToneLog::new();
    let mut session = session().with_tone_backend(tones.clone());
    session.play_tone(440.0_f32, ToneLength::Beats(1e20));
    session.play_tone(440.0_f32, ToneLength::Beats(f32::INFINITY));

    let played = tones.played().unwrap();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].duration, Duration::MAX);
    assert_eq!(session.queue_len(), 1);

    session.stop();
    assert!(session.is_idle());
}

#[test]
fn tone_failures_do_not_stall_the_queue() {
    let mut session = session().with_tone_backend(Unavailable);
    session.play_tone(440.0_f32, ToneLength::Millis(1_000));
    session.show_icon("heart", None, None);

    session.advance(ms(10));
    assert_eq!(session.queue_len(), 0);
    let tone = session.history().next().copied().unwrap();
    assert!(tone.failed);
    assert_eq!(tone.finished_at, ms(10));
}

#[test]
fn unknown_notes_count_as_tone_failures() {
    let tones = ToneLog::new();
    let mut session = session().with_tone_backend(tones.clone());
    session.play_tone("H9", ToneLength::Millis(300));
    session.run_until_idle(Duration::from_secs(1));

    assert!(tones.played().unwrap().is_empty());
    assert!(session.history().next().unwrap().failed);
    assert_eq!(session.now(), ms(10));
}

#[test]
fn commands_for_missing_surfaces_fail_and_move_on() {
    let mut session = session();
    session.pause(ms(5));
    session.show_icon("heart", None, Some("nowhere"));
    session.set_pixel(0, 0, Some(Rgb::WHITE), None);

    session.advance(ms(5));
    let records: Vec<(CommandKind, bool)> =
        session.history().map(|record| (record.kind, record.failed)).collect();
    assert_eq!(
        records,
        vec![(CommandKind::Pause, false), (CommandKind::Icon, true)]
    );
    assert_eq!(pixel(&session, 0, 0), Some(Rgb::WHITE));
}

#[test]
fn stop_during_scroll_clears_everything() {
    let frames = FrameLog::new();
    let mut session = session().with_render_sink(frames.clone());
    session.show_text("HELLO", None, None, None);
    session.pause(ms(100));
    session.advance(ms(150));
    assert!(!session.framebuffer(None).unwrap().is_blank());

    session.stop();
    assert_eq!(session.queue_len(), 0);
    assert!(session.is_idle());
    assert!(session.framebuffer(None).unwrap().is_blank());
    let last = frames.last().unwrap().unwrap();
    assert!(last.cells.iter().flatten().all(|cell| cell.is_black()));

    session.show_icon("heart", None, None);
    assert!(matches!(session.queue_state(), QueueState::Draining { .. }));
}

#[test]
fn stop_is_idempotent() {
    let frames = FrameLog::new();
    let mut session = session().with_render_sink(frames.clone());
    session.stop();
    session.stop();
    assert!(!session.is_running());
    assert!(session.is_idle());
    assert!(frames.frames().unwrap().is_empty());
}

#[test]
fn stop_silences_a_sounding_tone() {
    let tones = ToneLog::new();
    let mut session = session().with_tone_backend(tones.clone());
    session.play_tone(262.0_f32, ToneLength::Millis(400));
    session.stop();
    assert_eq!(tones.silence_count().unwrap(), 1);
}

#[test]
fn trigger_without_handlers_changes_nothing() {
    let mut session = running_session();
    session.pause(ms(100));
    session.pause(ms(100));

    session.trigger("A");
    assert_eq!(session.queue_len(), 1);
    assert!(session.is_running());
    assert!(session.is_gesture("button-a"));
}

#[test]
fn handlers_run_in_registration_order() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut session = session();
    let (first, second) = (calls.clone(), calls.clone());
    session.run(&move |s: &mut RuntimeSession| {
        let first = first.clone();
        let second = second.clone();
        s.on(EventName::ButtonA, move |_| {
            first.borrow_mut().push("h1");
            Ok(())
        });
        s.on_named("A", move |_| {
            second.borrow_mut().push("h2");
            Ok(())
        });
        Ok(())
    });

    session.trigger("A");
    session.trigger("b");
    assert_eq!(*calls.borrow(), vec!["h1", "h2"]);
}

#[test]
fn handler_commands_queue_behind_pending_work() {
    let mut session = session();
    session.run(&|s: &mut RuntimeSession| {
        s.on(EventName::Shake, |s| {
            s.show_icon("sad", None, None);
            Ok(())
        });
        s.pause(ms(100));
        s.pause(ms(100));
        Ok(())
    });

    session.trigger("shake");
    assert_eq!(session.queue_len(), 2);
    session.run_until_idle(Duration::from_secs(1));

    let kinds: Vec<CommandKind> = session.history().map(|record| record.kind).collect();
    assert_eq!(
        kinds,
        vec![CommandKind::Pause, CommandKind::Pause, CommandKind::Icon]
    );
}

#[test]
fn failing_handlers_are_contained() {
    let mut session = session();
    session.run(&|s: &mut RuntimeSession| {
        s.on(EventName::ButtonB, |_| Err("boom".into()));
        s.on(EventName::ButtonB, |s| {
            s.change_counter(1);
            Ok(())
        });
        Ok(())
    });

    session.trigger("B");
    assert_eq!(session.counter(), 1);
}

#[test]
fn triggers_are_dropped_while_stopped() {
    let mut session = session();
    session.on(EventName::Loud, |s| {
        s.change_counter(1);
        Ok(())
    });
    session.trigger("loud");
    assert_eq!(session.counter(), 0);
    assert_eq!(session.last_gesture(), None);
}

#[test]
fn unknown_event_names_are_ignored() {
    let mut session = running_session();
    assert!(!session.on_named("wobble", |_| Ok(())));
    session.trigger("wobble");
    assert_eq!(session.last_gesture(), None);
}

#[test]
fn failing_program_leaves_session_stopped() {
    let mut session = session();
    let status = session.run(&|s: &mut RuntimeSession| {
        s.show_text("NEVER SHOWN", None, None, None);
        s.pause(ms(10));
        Err(GlowbitError::msg("translated code blew up"))
    });

    assert_eq!(status, RunStatus::Failed);
    assert!(!session.is_running());
    assert!(session.is_idle());
    assert!(session.framebuffer(None).unwrap().is_blank());
}

#[test]
fn run_resets_previous_state() {
    let mut session = session();
    session.run(&|s: &mut RuntimeSession| {
        s.on(EventName::ButtonA, |_| Ok(()));
        s.set_counter(7);
        s.set_brightness(10);
        s.pause(ms(1_000));
        Ok(())
    });
    session.trigger("A");

    let status = session.run(&|_: &mut RuntimeSession| Ok(()));
    assert_eq!(status, RunStatus::Running);
    assert_eq!(session.handler_count(EventName::ButtonA), 0);
    assert_eq!(session.counter(), 0);
    assert_eq!(session.brightness(), 255);
    assert_eq!(session.last_gesture(), None);
    assert!(session.is_idle());
}

#[test]
fn brightness_applies_on_the_next_repaint() {
    let frames = FrameLog::new();
    let mut session = session().with_render_sink(frames.clone());
    session.set_pixel_now(4, 4, Some(Rgb::GREEN), None);
    assert_eq!(frames.last().unwrap().unwrap().cell(4, 4), Some(Rgb::GREEN));

    session.set_brightness(0);
    assert_eq!(frames.last().unwrap().unwrap().cell(4, 4), Some(Rgb::BLACK));
    assert_eq!(pixel(&session, 4, 4), Some(Rgb::GREEN));
}

#[test]
fn direct_writes_ignore_bad_coordinates() {
    let mut session = session();
    session.set_pixel_now(2, 3, Some(Rgb::RED), None);
    let before = session.framebuffer(None).unwrap().clone();

    session.set_pixel_now(8, 3, Some(Rgb::BLUE), None);
    session.set_pixel_now(2, -1, Some(Rgb::BLUE), None);
    session.set_pixel_now(0, 0, Some(Rgb::BLUE), Some("missing"));
    assert_eq!(session.framebuffer(None).unwrap(), &before);

    session.clear_now(None);
    assert!(session.framebuffer(None).unwrap().is_blank());
}

#[test]
fn queued_pixel_writes_respect_unset() {
    let mut session = session();
    session.set_pixel(3, 3, None, None);
    session.unset_pixel(3, 3, None);
    session.advance(ms(10));
    assert_eq!(pixel(&session, 3, 3), None);
}

#[test]
fn attached_surfaces_are_addressable() {
    let mut session = session();
    session
        .attach("right", SurfaceGeometry::new(10, 1).unwrap())
        .unwrap();
    session.show_icon("full", Some(Rgb::YELLOW), Some("right"));

    let frame = session.render("right").unwrap();
    assert_eq!(frame.width, 80);
    assert_eq!(frame.cell(5, 5), Some(Rgb::YELLOW));
    assert!(session.framebuffer(None).unwrap().is_blank());
    assert!(session.render("left").is_err());
}

#[test]
fn bad_default_geometry_fails_construction() {
    let mut config = AppConfig::default();
    config.display.geometry = SurfaceGeometry {
        pixel_size: 1,
        padding: 1,
    };
    let err = RuntimeSession::new(config).unwrap_err();
    assert!(matches!(err, GlowbitError::InvalidGeometry { .. }));
}
