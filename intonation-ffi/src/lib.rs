//! C ABI for Intonation game sessions.
//!
//! A host UI creates a session for one game, drives its clock with
//! `intonation_session_advance_ms`, forwards the player's taps and reads
//! what happened with `intonation_session_poll_event`. Audio is pulled through
//! a separate `IntonationAudio` handle from the host's own audio callback.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle types: `IntonationSession` and `IntonationAudio`
//!   (heap-allocated; you own/delete them).
//! - Every function tolerates a null handle and returns a neutral value.
//! - Verdicts come back as `int32_t`: `1` correct, `0` wrong, `-1` not accepted
//!   (gate closed, wrong shape, or a split selection still waiting for its
//!   other half).
//!
//! Threading
//! - `intonation_session_*` and `intonation_set_*` calls must come from one
//!   thread.
//! - `intonation_audio_*`, `intonation_reset`, `intonation_set_gain` and
//!   `intonation_render_interleaved_f32` take only the audio handle, which
//!   shares the synthesizer behind a mutex; any thread may call them. The
//!   audio handle may outlive its session (it then renders silence).

use std::collections::VecDeque;
use std::ffi::{c_char, CStr};

use intonation_engine::{SharedSynth, SoundProfile};
use intonation_game::prefs::snap_pause;
use intonation_game::{
    AdvanceMode, Answer, DifficultyMode, Direction, FileStore, MemoryStore, Phase, Preferences, ScaleInput,
    Session, SessionEvent, Stage, Store, Variant,
};

/// Events kept for a host that does not poll; older ones are dropped.
pub const EVENT_BACKLOG: usize = 64;

pub const INTONATION_EVENT_ROUND_READY: u32 = 1;
pub const INTONATION_EVENT_PLAYBACK_STARTED: u32 = 2;
pub const INTONATION_EVENT_INPUT_OPENED: u32 = 3;
pub const INTONATION_EVENT_PLAYBACK_FINISHED: u32 = 4;
pub const INTONATION_EVENT_ANSWERED: u32 = 5;
pub const INTONATION_EVENT_AWAITING_ADVANCE: u32 = 6;
pub const INTONATION_EVENT_NEW_HIGH_SCORE: u32 = 7;
pub const INTONATION_EVENT_GAME_OVER: u32 = 8;
pub const INTONATION_EVENT_EXITED: u32 = 9;

/// One session event, flattened for C.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IntonationEvent {
    /// One of the `INTONATION_EVENT_*` codes.
    pub kind: u32,
    /// Round ready, new high score, game over: the level.
    /// Playback started: 1 for a replay. Answered: 1 if correct.
    pub value: u32,
    /// Answered only: the expected scale degree (0 outside the scale game)
    pub expected_degree: u32,
    /// and direction.
    pub expected_up: bool,
}

impl From<&SessionEvent> for IntonationEvent {
    fn from(ev: &SessionEvent) -> Self {
        let simple = |kind, value| IntonationEvent { kind, value, ..Default::default() };
        match *ev {
            SessionEvent::RoundReady { level } => simple(INTONATION_EVENT_ROUND_READY, level),
            SessionEvent::PlaybackStarted { replay } => simple(INTONATION_EVENT_PLAYBACK_STARTED, u32::from(replay)),
            SessionEvent::InputOpened => simple(INTONATION_EVENT_INPUT_OPENED, 0),
            SessionEvent::PlaybackFinished => simple(INTONATION_EVENT_PLAYBACK_FINISHED, 0),
            SessionEvent::Answered { correct, expected } => {
                let (degree, dir) = match expected {
                    Answer::Direction(d) => (0, d),
                    Answer::Degree { index, direction } => (u32::try_from(index).unwrap_or(0), direction),
                };
                IntonationEvent {
                    kind: INTONATION_EVENT_ANSWERED,
                    value: u32::from(correct),
                    expected_degree: degree,
                    expected_up: dir == Direction::Up,
                }
            }
            SessionEvent::AwaitingAdvance => simple(INTONATION_EVENT_AWAITING_ADVANCE, 0),
            SessionEvent::NewHighScore { level } => simple(INTONATION_EVENT_NEW_HIGH_SCORE, level),
            SessionEvent::GameOver { level } => simple(INTONATION_EVENT_GAME_OVER, level),
            SessionEvent::Exited => simple(INTONATION_EVENT_EXITED, 0),
        }
    }
}

/// Opaque session wrapper handed to C.
pub struct IntonationSession {
    session: Session<SharedSynth>,
    events: VecDeque<SessionEvent>,
}

/// Opaque audio handle: the session's synthesizer, for the render thread.
pub struct IntonationAudio(SharedSynth);

impl IntonationSession {
    fn new(variant: Variant, sample_rate: f32, seed: u64, store: Box<dyn Store>) -> Self {
        let synth = SharedSynth::new(sample_rate.max(1.0));
        let policy = variant.policy();
        let session = if seed == 0 {
            Session::new(policy, synth, store)
        } else {
            Session::seeded(policy, synth, store, seed)
        };
        Self { session, events: VecDeque::with_capacity(EVENT_BACKLOG) }
    }

    /// Move the session's events into the backlog, keeping the newest.
    fn collect_events(&mut self) {
        self.events.extend(self.session.drain_events());
        let excess = self.events.len().saturating_sub(EVENT_BACKLOG);
        if excess > 0 {
            log::debug!(target: "ffi", "events not polled; dropping {excess}");
            self.events.drain(..excess);
        }
    }

    fn update_prefs(&mut self, f: impl FnOnce(&mut Preferences)) -> bool {
        let store = self.session.store_mut();
        let mut p = Preferences::load(store);
        f(&mut p);
        match p.save(store) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(target: "ffi", "saving preferences failed: {e}");
                false
            }
        }
    }
}

/// Borrow the session behind `ptr`, or `None` for null.
///
/// # Safety
/// `ptr` must be null or a live pointer from `intonation_session_create*`.
unsafe fn handle<'a>(ptr: *mut IntonationSession) -> Option<&'a mut IntonationSession> {
    ptr.as_mut()
}

/// # Safety
/// `ptr` must be null or a live pointer from `intonation_audio_create`.
unsafe fn audio<'a>(ptr: *const IntonationAudio) -> Option<&'a IntonationAudio> {
    ptr.as_ref()
}

fn direction(up: bool) -> Direction {
    if up { Direction::Up } else { Direction::Down }
}

fn verdict(v: Option<bool>) -> i32 {
    match v {
        Some(true) => 1,
        Some(false) => 0,
        None => -1,
    }
}

// --- Creation / destruction -------------------------------------------------------

/// Create a session for game `variant` (1..=5) rendering at `sample_rate`.
/// `seed == 0` draws rounds from OS entropy. Preferences and high scores live
/// in memory for the handle's lifetime.
///
/// Returns null for an unknown variant.
#[no_mangle]
pub extern "C" fn intonation_session_create(variant: u32, sample_rate: f32, seed: u64) -> *mut IntonationSession {
    let Some(v) = Variant::from_number(variant) else { return std::ptr::null_mut() };
    Box::into_raw(Box::new(IntonationSession::new(v, sample_rate, seed, Box::new(MemoryStore::new()))))
}

/// Like `intonation_session_create`, but preferences and high scores persist
/// in the JSON file at `store_path` (UTF-8). If the file cannot be opened the
/// session falls back to memory.
///
/// # Safety
/// `store_path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn intonation_session_create_persistent(
    variant: u32,
    sample_rate: f32,
    seed: u64,
    store_path: *const c_char,
) -> *mut IntonationSession {
    let Some(v) = Variant::from_number(variant) else { return std::ptr::null_mut() };
    let store: Box<dyn Store> = match (!store_path.is_null()).then(|| CStr::from_ptr(store_path).to_str()) {
        Some(Ok(path)) => match FileStore::open(path) {
            Ok(s) => Box::new(s),
            Err(e) => {
                log::warn!(target: "ffi", "store {path}: {e}; using memory");
                Box::new(MemoryStore::new())
            }
        },
        _ => Box::new(MemoryStore::new()),
    };
    Box::into_raw(Box::new(IntonationSession::new(v, sample_rate, seed, store)))
}

/// Destroy a session. Silences its audio first.
///
/// # Safety
/// `session` must be null or a pointer from `intonation_session_create*` not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn intonation_session_destroy(session: *mut IntonationSession) {
    if !session.is_null() {
        let mut s = Box::from_raw(session);
        s.session.exit();
    }
}

// --- Session control ----------------------------------------------------------------

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_start(session: *mut IntonationSession) {
    if let Some(s) = handle(session) {
        s.session.start();
    }
}

/// Move the session clock forward by `ms` milliseconds.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_advance_ms(session: *mut IntonationSession, ms: u32) {
    if let Some(s) = handle(session) {
        s.session.advance(u64::from(ms));
        s.collect_events();
    }
}

/// Take the oldest pending event into `out`. Returns false when there is none.
/// Only the newest [`EVENT_BACKLOG`] events are kept between polls.
///
/// # Safety
/// `session` as for [`intonation_session_destroy`]; `out` must be null or
/// point to a writable `IntonationEvent`.
#[no_mangle]
pub unsafe extern "C" fn intonation_session_poll_event(
    session: *mut IntonationSession,
    out: *mut IntonationEvent,
) -> bool {
    let Some(s) = handle(session) else { return false };
    if out.is_null() {
        return false;
    }
    s.collect_events();
    match s.events.pop_front() {
        Some(ev) => {
            *out = IntonationEvent::from(&ev);
            true
        }
        None => false,
    }
}

/// Answer higher (`up = true`) or lower.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_submit_direction(session: *mut IntonationSession, up: bool) -> i32 {
    handle(session).map_or(-1, |s| verdict(s.session.submit_answer(Answer::Direction(direction(up)))))
}

/// Scale game, combined input: degree `index` (1..=7) is sharp (`up`) or flat.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_submit_degree(
    session: *mut IntonationSession,
    index: u32,
    up: bool,
) -> i32 {
    handle(session).map_or(-1, |s| {
        let answer = Answer::Degree { index: index as usize, direction: direction(up) };
        verdict(s.session.submit_answer(answer))
    })
}

/// Scale game, split input: pick the degree.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_select_degree(session: *mut IntonationSession, index: u32) -> i32 {
    handle(session).map_or(-1, |s| verdict(s.session.select_degree(index as usize)))
}

/// Scale game, split input: pick the direction.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_select_direction(session: *mut IntonationSession, up: bool) -> i32 {
    handle(session).map_or(-1, |s| verdict(s.session.select_direction(direction(up))))
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_replay(session: *mut IntonationSession) -> bool {
    handle(session).is_some_and(|s| s.session.replay_stimulus())
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_advance_next(session: *mut IntonationSession) -> bool {
    handle(session).is_some_and(|s| s.session.advance_next())
}

/// Stop all sound and cancel pending work. The handle stays valid; call
/// `intonation_session_start` to play again.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_exit(session: *mut IntonationSession) {
    if let Some(s) = handle(session) {
        s.session.exit();
    }
}

// --- State getters ------------------------------------------------------------------

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_level(session: *mut IntonationSession) -> u32 {
    handle(session).map_or(0, |s| s.session.state().level)
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_lives(session: *mut IntonationSession) -> u32 {
    handle(session).map_or(0, |s| u32::from(s.session.state().lives))
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_is_game_over(session: *mut IntonationSession) -> bool {
    handle(session).is_some_and(|s| s.session.state().is_game_over())
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_input_enabled(session: *mut IntonationSession) -> bool {
    handle(session).is_some_and(|s| s.session.state().input_enabled)
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_is_audio_playing(session: *mut IntonationSession) -> bool {
    handle(session).is_some_and(|s| s.session.state().is_audio_playing)
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_can_replay(session: *mut IntonationSession) -> bool {
    handle(session).is_some_and(|s| s.session.can_replay())
}

/// `1` correct, `0` wrong, `-1` no answer yet this round.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_last_answer(session: *mut IntonationSession) -> i32 {
    handle(session).map_or(-1, |s| verdict(s.session.state().last_answer_correct))
}

/// `0` generating, `1` presenting, `2` awaiting input, `3` evaluating,
/// `4` reviewing, `5` game over.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_stage(session: *mut IntonationSession) -> i32 {
    handle(session).map_or(-1, |s| match s.session.state().phase {
        Phase::Playing(Stage::Generating) => 0,
        Phase::Playing(Stage::Presenting) => 1,
        Phase::Playing(Stage::AwaitingInput) => 2,
        Phase::Playing(Stage::Evaluating) => 3,
        Phase::Playing(Stage::Reviewing) => 4,
        Phase::GameOver => 5,
    })
}

/// Best level recorded for this session's game.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_session_high_score(session: *mut IntonationSession) -> u32 {
    handle(session).map_or(0, |s| s.session.high_score())
}

// --- Preferences (take effect at the next start) ------------------------------------

/// `0` default, `1` piano, `2` guitar, `3` synth.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_set_sound_profile(session: *mut IntonationSession, profile: u32) -> bool {
    let Some(&p) = SoundProfile::ALL.get(profile as usize) else { return false };
    handle(session).is_some_and(|s| s.update_prefs(|prefs| prefs.profile = p))
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_set_easy_mode(session: *mut IntonationSession, easy: bool) -> bool {
    let mode = if easy { DifficultyMode::Easy } else { DifficultyMode::Hard };
    handle(session).is_some_and(|s| s.update_prefs(|p| p.difficulty = mode))
}

/// Pause between notes; snapped to 0..=1000 ms in 100 ms steps.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_set_pause_ms(session: *mut IntonationSession, ms: u32) -> bool {
    handle(session).is_some_and(|s| s.update_prefs(|p| p.pause_ms = snap_pause(u64::from(ms))))
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_set_slow_advance(session: *mut IntonationSession, slow: bool) -> bool {
    let mode = if slow { AdvanceMode::Slow } else { AdvanceMode::Fast };
    handle(session).is_some_and(|s| s.update_prefs(|p| p.advance_mode = mode))
}

/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_set_split_scale_input(session: *mut IntonationSession, split: bool) -> bool {
    let mode = if split { ScaleInput::Split } else { ScaleInput::Combined };
    handle(session).is_some_and(|s| s.update_prefs(|p| p.scale_input = mode))
}

// --- Audio -------------------------------------------------------------------------

/// Audio handle sharing `session`'s synthesizer. Null for a null session.
///
/// # Safety
/// See [`intonation_session_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_audio_create(session: *mut IntonationSession) -> *mut IntonationAudio {
    match handle(session) {
        Some(s) => Box::into_raw(Box::new(IntonationAudio(s.session.tones().clone()))),
        None => std::ptr::null_mut(),
    }
}

/// # Safety
/// `audio` must be null or a pointer from `intonation_audio_create` not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn intonation_audio_destroy(audio: *mut IntonationAudio) {
    if !audio.is_null() {
        drop(Box::from_raw(audio));
    }
}

/// Reset the synthesizer to a new sample rate (e.g. when the host's device
/// changes). Sounding notes are dropped; a held drone fades back in.
///
/// # Safety
/// See [`intonation_audio_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_reset(audio_ptr: *const IntonationAudio, sample_rate: f32) {
    if let Some(a) = audio(audio_ptr) {
        if let Err(e) = a.0.reset(sample_rate.max(1.0)) {
            log::warn!(target: "ffi", "reset failed: {e}");
        }
    }
}

/// Set the master gain (0..1 suggested). Negative values clamp to 0 and
/// non-finite ones to 1; changes glide over a few milliseconds.
///
/// # Safety
/// See [`intonation_audio_destroy`].
#[no_mangle]
pub unsafe extern "C" fn intonation_set_gain(audio_ptr: *const IntonationAudio, gain: f32) {
    if let Some(a) = audio(audio_ptr) {
        if let Err(e) = a.0.set_gain(gain) {
            log::warn!(target: "ffi", "set gain failed: {e}");
        }
    }
}

/// Render `frames` of audio into an interleaved f32 buffer with `channels`
/// channels. The synthesizer is mono; each sample is copied to every channel.
///
/// Returns the number of frames rendered (0 on error).
///
/// # Safety
/// `audio_ptr` as for [`intonation_audio_destroy`]; `out_interleaved` must
/// point to at least `frames * channels` writable floats.
#[no_mangle]
pub unsafe extern "C" fn intonation_render_interleaved_f32(
    audio_ptr: *const IntonationAudio,
    out_interleaved: *mut f32,
    frames: u32,
    channels: u32,
) -> u32 {
    let Some(a) = audio(audio_ptr) else { return 0 };
    if out_interleaved.is_null() || frames == 0 || channels == 0 {
        return 0;
    }
    let len = (frames as usize) * (channels as usize);
    let out = std::slice::from_raw_parts_mut(out_interleaved, len);
    let rendered = a.0.render_interleaved(out, channels as usize);
    u32::try_from(rendered).unwrap_or(frames)
}
