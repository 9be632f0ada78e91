//! One game session: playback, input gating, lives and levels.
//!
//! The session is single-threaded and tick-driven. Every wait (the gap after a
//! note, the settle rest before a probe, the pause before auto-advancing) is a
//! [`Wake`] in the pending list, stamped with the sequence token current when
//! it was scheduled. Anything that supersedes earlier work (new playback, new
//! round, start, exit) bumps the token, so stale wakes are dropped when they
//! come due instead of mutating state late.
//!
//! Hosts call [`Session::advance`] with elapsed milliseconds and read
//! [`Session::drain_events`] to update their surface.

use rand::rngs::StdRng;
use rand::SeedableRng;

use intonation_core::pitch::Direction;
use intonation_engine::{DroneId, ToneEngine};

use crate::prefs::{self, AdvanceMode, DifficultyMode, Preferences};
use crate::round::{Answer, Cue, Round};
use crate::store::Store;
use crate::variants::{RoundPolicy, Variant, SCALE_DEGREES};

pub const START_LIVES: u8 = 3;
/// Pause between the verdict and the next round in fast mode.
pub const POST_ANSWER_DELAY_MS: u64 = 800;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Drawing the next round.
    Generating,
    /// Playing the stimulus; input is closed unless a cue opened it.
    Presenting,
    AwaitingInput,
    /// Answer judged; waiting for the auto-advance.
    Evaluating,
    /// Answer judged in slow mode; waiting for `advance_next`.
    Reviewing,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Playing(Stage),
    GameOver,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub level: u32,
    pub lives: u8,
    pub round: Option<Round>,
    /// Level `round` was drawn at. `level` moves on when the answer is judged,
    /// so replays after the verdict plan from this one.
    pub round_level: u32,
    pub is_audio_playing: bool,
    pub input_enabled: bool,
    pub last_answer_correct: Option<bool>,
    pub advance_mode: AdvanceMode,
}

impl SessionState {
    fn fresh(advance_mode: AdvanceMode) -> Self {
        Self {
            phase: Phase::Playing(Stage::Generating),
            level: 1,
            lives: START_LIVES,
            round: None,
            round_level: 1,
            is_audio_playing: false,
            input_enabled: false,
            last_answer_correct: None,
            advance_mode,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self.phase {
            Phase::Playing(s) => Some(s),
            Phase::GameOver => None,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }
}

/// What changed, for front ends.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    RoundReady { level: u32 },
    PlaybackStarted { replay: bool },
    InputOpened,
    PlaybackFinished,
    Answered { correct: bool, expected: Answer },
    /// Slow mode: the player may replay or move on.
    AwaitingAdvance,
    NewHighScore { level: u32 },
    GameOver { level: u32 },
    Exited,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum WakeKind {
    ResumeCues,
    AutoAdvance,
}

#[derive(Copy, Clone, Debug)]
struct Wake {
    at_ms: u64,
    token: u64,
    kind: WakeKind,
}

/// Half-made answer from the split selectors of the scale game.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    pub index: Option<usize>,
    pub direction: Option<Direction>,
}

pub struct Session<T: ToneEngine> {
    policy: Box<dyn RoundPolicy>,
    tones: T,
    store: Box<dyn Store>,
    rng: StdRng,
    prefs: Preferences,
    state: SessionState,

    clock_ms: u64,
    token: u64,
    pending: Vec<Wake>,

    plan: Vec<Cue>,
    cursor: usize,
    drone: Option<(DroneId, f32)>,
    draft: Draft,

    events: Vec<SessionEvent>,
    exited: bool,
}

impl<T: ToneEngine> Session<T> {
    pub fn new(policy: Box<dyn RoundPolicy>, tones: T, store: Box<dyn Store>) -> Self {
        Self::with_rng(policy, tones, store, StdRng::from_entropy())
    }

    /// Deterministic rounds for a given seed.
    pub fn seeded(policy: Box<dyn RoundPolicy>, tones: T, store: Box<dyn Store>, seed: u64) -> Self {
        Self::with_rng(policy, tones, store, StdRng::seed_from_u64(seed))
    }

    fn with_rng(policy: Box<dyn RoundPolicy>, tones: T, store: Box<dyn Store>, rng: StdRng) -> Self {
        Self {
            policy,
            tones,
            store,
            rng,
            prefs: Preferences::default(),
            state: SessionState::fresh(AdvanceMode::default()),
            clock_ms: 0,
            token: 0,
            pending: Vec::new(),
            plan: Vec::new(),
            cursor: 0,
            drone: None,
            draft: Draft::default(),
            events: Vec::new(),
            exited: false,
        }
    }

    // ------------------------------------ accessors ------------------------------------

    pub fn state(&self) -> &SessionState { &self.state }
    pub fn prefs(&self) -> &Preferences { &self.prefs }
    pub fn variant(&self) -> Variant { self.policy.variant() }
    pub fn clock_ms(&self) -> u64 { self.clock_ms }
    pub fn draft(&self) -> Draft { self.draft }
    pub fn is_exited(&self) -> bool { self.exited }
    pub fn tones(&self) -> &T { &self.tones }
    pub fn store(&self) -> &dyn Store { &*self.store }
    pub fn store_mut(&mut self) -> &mut dyn Store { &mut *self.store }

    pub fn high_score(&self) -> u32 {
        prefs::high_score(&*self.store, self.policy.variant())
    }

    /// Whether `replay_stimulus` would be accepted right now.
    pub fn can_replay(&self) -> bool {
        if self.exited || self.state.round.is_none() {
            return false;
        }
        match self.state.phase {
            Phase::Playing(Stage::AwaitingInput) => self.prefs.difficulty == DifficultyMode::Easy,
            Phase::Playing(Stage::Reviewing) => self.state.advance_mode == AdvanceMode::Slow,
            _ => false,
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------ operations -----------------------------------

    /// Begin (or restart) the game: read preferences, reset to level 1 with
    /// full lives and present the first round.
    pub fn start(&mut self) {
        self.prefs = Preferences::load(&*self.store);
        self.tones.stop_all();
        self.drone = None;
        self.cancel_pending();
        self.state = SessionState::fresh(self.prefs.advance_mode);
        self.exited = false;
        log::info!(
            target: "session",
            "start {} ({:?}, {:?}, pause {} ms)",
            self.policy.variant(),
            self.prefs.difficulty,
            self.prefs.advance_mode,
            self.prefs.pause_ms
        );
        self.next_round();
    }

    /// Judge `answer`. Returns the verdict, or `None` when the answer was not
    /// accepted (gate closed, wrong shape for this game).
    pub fn submit_answer(&mut self, answer: Answer) -> Option<bool> {
        if !self.accepting_input() {
            log::debug!(target: "session", "answer {answer:?} ignored: input closed");
            return None;
        }
        let round = self.state.round.as_ref()?;
        let Some(correct) = self.policy.judge(round, &answer) else {
            log::debug!(target: "session", "answer {answer:?} does not fit {}", self.policy.variant());
            return None;
        };
        let expected = round.expected;

        self.state.input_enabled = false;
        self.state.phase = Phase::Playing(Stage::Evaluating);
        self.state.last_answer_correct = Some(correct);
        self.draft = Draft::default();
        self.events.push(SessionEvent::Answered { correct, expected });
        log::debug!(target: "session", "level {} answered {answer:?}: {correct}", self.state.level);

        if !correct {
            self.state.lives = self.state.lives.saturating_sub(1);
            if self.state.lives == 0 {
                self.game_over();
                return Some(false);
            }
        }
        // A miss still moves the difficulty on.
        self.state.level += 1;
        self.save_high_score();

        match self.state.advance_mode {
            AdvanceMode::Fast => self.schedule(POST_ANSWER_DELAY_MS, WakeKind::AutoAdvance),
            AdvanceMode::Slow => {
                self.state.phase = Phase::Playing(Stage::Reviewing);
                self.events.push(SessionEvent::AwaitingAdvance);
            }
        }
        Some(correct)
    }

    /// Split input: pick the mistuned degree. Submits once a direction is
    /// also picked. Degree 0 (the tonic) and anything past 7 are rejected.
    pub fn select_degree(&mut self, index: usize) -> Option<bool> {
        if !self.accepting_selection() {
            return None;
        }
        if !SCALE_DEGREES.contains(&index) {
            log::debug!(target: "session", "degree {index} is not selectable");
            return None;
        }
        self.draft.index = Some(index);
        self.submit_draft()
    }

    /// Split input: pick the mistuning direction.
    pub fn select_direction(&mut self, direction: Direction) -> Option<bool> {
        if !self.accepting_selection() {
            return None;
        }
        self.draft.direction = Some(direction);
        self.submit_draft()
    }

    /// Slow mode only: move on from the verdict to the next round.
    pub fn advance_next(&mut self) -> bool {
        if self.exited
            || self.state.advance_mode != AdvanceMode::Slow
            || self.state.phase != Phase::Playing(Stage::Reviewing)
        {
            log::debug!(target: "session", "advance_next ignored in {:?}", self.state.phase);
            return false;
        }
        self.next_round();
        true
    }

    /// Play the current round again. Level, lives and the round itself are
    /// untouched; a replay supersedes any playback still running.
    pub fn replay_stimulus(&mut self) -> bool {
        if !self.can_replay() {
            log::debug!(target: "session", "replay ignored in {:?}", self.state.phase);
            return false;
        }
        if self.state.phase == Phase::Playing(Stage::AwaitingInput) {
            self.state.phase = Phase::Playing(Stage::Presenting);
            self.state.input_enabled = false;
        }
        self.begin_playback(true);
        true
    }

    /// Silence everything and stop reacting to pending waits. Valid in any state.
    pub fn exit(&mut self) {
        self.tones.stop_all();
        self.drone = None;
        self.cancel_pending();
        self.state.input_enabled = false;
        self.state.is_audio_playing = false;
        if !self.exited {
            self.exited = true;
            self.events.push(SessionEvent::Exited);
            log::info!(target: "session", "exit at level {}", self.state.level);
        }
    }

    /// Move the clock forward by `dt_ms`, firing due waits in time order.
    pub fn advance(&mut self, dt_ms: u64) {
        let target = self.clock_ms.saturating_add(dt_ms);
        while let Some(i) = self.next_due(target) {
            let wake = self.pending.remove(i);
            self.clock_ms = self.clock_ms.max(wake.at_ms);
            if wake.token != self.token || self.exited {
                log::trace!(target: "session", "dropping stale {:?} (token {} != {})", wake.kind, wake.token, self.token);
                continue;
            }
            match wake.kind {
                WakeKind::ResumeCues => self.run_cues(),
                WakeKind::AutoAdvance => {
                    if self.state.phase == Phase::Playing(Stage::Evaluating) {
                        self.next_round();
                    }
                }
            }
        }
        self.clock_ms = target;
    }

    // ------------------------------------ internals ------------------------------------

    fn accepting_selection(&self) -> bool {
        self.policy.variant() == Variant::Scale && self.accepting_input()
    }

    fn accepting_input(&self) -> bool {
        !self.exited
            && self.state.input_enabled
            && self.state.phase == Phase::Playing(Stage::AwaitingInput)
    }

    fn submit_draft(&mut self) -> Option<bool> {
        match self.draft {
            Draft { index: Some(index), direction: Some(direction) } => {
                self.submit_answer(Answer::Degree { index, direction })
            }
            _ => None,
        }
    }

    fn next_due(&self, target: u64) -> Option<usize> {
        // Earliest first; ties keep scheduling order.
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, w)| w.at_ms <= target)
            .min_by_key(|(i, w)| (w.at_ms, *i))
            .map(|(i, _)| i)
    }

    fn schedule(&mut self, after_ms: u64, kind: WakeKind) {
        self.pending.push(Wake { at_ms: self.clock_ms + after_ms, token: self.token, kind });
    }

    fn cancel_pending(&mut self) {
        self.token += 1;
        self.pending.clear();
    }

    fn next_round(&mut self) {
        self.state.phase = Phase::Playing(Stage::Generating);
        let level = self.state.level;
        let round = self.policy.generate(level, self.state.round.as_ref(), &mut self.rng);
        log::debug!(target: "session", "level {level}: stimulus {:?}, expect {:?}", round.stimulus, round.expected);
        self.state.round = Some(round);
        self.state.round_level = level;
        self.state.last_answer_correct = None;
        self.draft = Draft::default();
        self.events.push(SessionEvent::RoundReady { level });

        self.state.phase = Phase::Playing(Stage::Presenting);
        self.state.input_enabled = false;
        self.begin_playback(false);
    }

    fn begin_playback(&mut self, replay: bool) {
        let Some(round) = self.state.round.as_ref() else { return };
        self.plan = self.policy.cues(round, self.state.round_level, self.prefs.timing());
        self.cursor = 0;
        self.cancel_pending();
        self.state.is_audio_playing = true;
        self.events.push(SessionEvent::PlaybackStarted { replay });
        self.run_cues();
    }

    /// Run cues until one needs a wait or the plan ends.
    fn run_cues(&mut self) {
        while let Some(&cue) = self.plan.get(self.cursor) {
            self.cursor += 1;
            match cue {
                Cue::Note { freq, secs, .. } => {
                    if let Err(e) = self.tones.play_tone(freq, secs, self.prefs.profile) {
                        log::warn!(target: "session", "tone {freq:.2} Hz failed: {e}");
                    }
                }
                Cue::Drone { freq } => self.hold_drone(freq),
                Cue::Rest { .. } => {}
                Cue::OpenInput => self.open_input(),
            }
            let wait = cue.wait_ms();
            if wait > 0 {
                self.schedule(wait, WakeKind::ResumeCues);
                return;
            }
        }
        self.state.is_audio_playing = false;
        self.events.push(SessionEvent::PlaybackFinished);
        self.open_input();
    }

    fn open_input(&mut self) {
        if self.state.phase != Phase::Playing(Stage::Presenting) {
            return;
        }
        self.state.phase = Phase::Playing(Stage::AwaitingInput);
        self.state.input_enabled = true;
        self.events.push(SessionEvent::InputOpened);
    }

    fn hold_drone(&mut self, freq: f32) {
        if matches!(self.drone, Some((_, f)) if f == freq) {
            return;
        }
        match self.tones.start_drone(freq, self.prefs.profile) {
            Ok(id) => self.drone = Some((id, freq)),
            Err(e) => {
                self.drone = None;
                log::warn!(target: "session", "drone {freq:.2} Hz failed: {e}");
            }
        }
    }

    fn stop_drone(&mut self) {
        if let Some((id, _)) = self.drone.take() {
            if let Err(e) = self.tones.stop_drone(id) {
                log::warn!(target: "session", "stopping drone failed: {e}");
            }
        }
    }

    fn game_over(&mut self) {
        self.state.phase = Phase::GameOver;
        self.state.input_enabled = false;
        self.cancel_pending();
        self.state.is_audio_playing = false;
        self.stop_drone();
        self.save_high_score();
        self.events.push(SessionEvent::GameOver { level: self.state.level });
        log::info!(target: "session", "game over at level {}", self.state.level);
    }

    fn save_high_score(&mut self) {
        let (variant, level) = (self.policy.variant(), self.state.level);
        match prefs::record_high_score(&mut *self.store, variant, level) {
            Ok(true) => self.events.push(SessionEvent::NewHighScore { level }),
            Ok(false) => {}
            Err(e) => log::warn!(target: "session", "saving high score failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{ScaleInput, KEY_ADVANCE_MODE, KEY_DIFFICULTY, KEY_PAUSE_MS};
    use crate::store::{MemoryStore, StoreError};
    use intonation_core::difficulty::DifficultyCurve;
    use intonation_core::pitch::{direction_between, ratio_for_semitones, MAX_FREQ, MIN_FREQ};
    use intonation_engine::{AudioResult, SoundProfile};

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Tone(f32),
        StartDrone(f32),
        StopDrone(DroneId),
        StopAll,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        next: u64,
    }

    impl Recorder {
        fn tones(&self) -> Vec<f32> {
            self.calls.iter().filter_map(|c| match c { Call::Tone(f) => Some(*f), _ => None }).collect()
        }
        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }
    }

    impl ToneEngine for Recorder {
        fn play_tone(&mut self, freq: f32, _secs: f32, _profile: SoundProfile) -> AudioResult<()> {
            self.calls.push(Call::Tone(freq));
            Ok(())
        }
        fn start_drone(&mut self, freq: f32, _profile: SoundProfile) -> AudioResult<DroneId> {
            self.next += 1;
            self.calls.push(Call::StartDrone(freq));
            Ok(DroneId(self.next))
        }
        fn stop_drone(&mut self, id: DroneId) -> AudioResult<()> {
            self.calls.push(Call::StopDrone(id));
            Ok(())
        }
        fn stop_all(&mut self) {
            self.calls.push(Call::StopAll);
        }
    }

    struct BrokenStore;

    impl Store for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::NoDataDir)
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::NoDataDir)
        }
    }

    fn store_with(pairs: &[(&str, &str)]) -> Box<dyn Store> {
        let mut s = MemoryStore::new();
        for (k, v) in pairs {
            s.set(k, v).unwrap();
        }
        Box::new(s)
    }

    fn session(variant: Variant, pairs: &[(&str, &str)]) -> Session<Recorder> {
        Session::seeded(variant.policy(), Recorder::default(), store_with(pairs), 42)
    }

    fn expected_direction(s: &Session<Recorder>) -> Direction {
        match s.state().round.as_ref().unwrap().expected {
            Answer::Direction(d) => d,
            Answer::Degree { direction, .. } => direction,
        }
    }

    fn right(s: &Session<Recorder>) -> Answer {
        s.state().round.as_ref().unwrap().expected
    }

    fn wrong(s: &Session<Recorder>) -> Answer {
        match right(s) {
            Answer::Direction(d) => Answer::Direction(d.flip()),
            Answer::Degree { index, direction } => Answer::Degree { index, direction: direction.flip() },
        }
    }

    /// Advance until input opens (bounded).
    fn until_input(s: &mut Session<Recorder>) {
        for _ in 0..1000 {
            if s.state().input_enabled {
                return;
            }
            s.advance(50);
        }
        panic!("input never opened: {:?}", s.state().phase);
    }

    #[test]
    fn start_resets_and_presents_round_one() {
        let mut s = session(Variant::Basic, &[]);
        s.start();
        let st = s.state();
        assert_eq!(st.level, 1);
        assert_eq!(st.lives, 3);
        assert_eq!(st.phase, Phase::Playing(Stage::Presenting));
        assert!(st.is_audio_playing);
        assert!(!st.input_enabled);
        assert_eq!(s.tones().calls[0], Call::StopAll);
        assert_eq!(s.tones().tones().len(), 1);
    }

    #[test]
    fn notes_follow_duration_plus_pause() {
        let mut s = session(Variant::Basic, &[(KEY_PAUSE_MS, "300")]);
        s.start();
        // first note 800 ms + 300 ms pause, second note 800 ms
        s.advance(1099);
        assert_eq!(s.tones().tones().len(), 1);
        s.advance(1);
        assert_eq!(s.tones().tones().len(), 2);
        s.advance(799);
        assert!(!s.state().input_enabled);
        s.advance(1);
        assert!(s.state().input_enabled);
        assert!(!s.state().is_audio_playing);
        assert_eq!(s.state().phase, Phase::Playing(Stage::AwaitingInput));
    }

    #[test]
    fn scenario_a_pair_matches_forced_interval() {
        let curve = DifficultyCurve::new(1.0, 1.0, 0.0);
        let mut s = Session::seeded(
            Variant::Basic.policy_with_curve(curve),
            Recorder::default(),
            Box::new(MemoryStore::new()),
            9,
        );
        s.start();
        assert_eq!((s.state().level, s.state().lives), (1, 3));
        let r = s.state().round.clone().unwrap();
        let (f1, f2) = (r.stimulus[0], r.stimulus[1]);
        let ratio = if f2 > f1 { f2 / f1 } else { f1 / f2 };
        assert!((ratio - ratio_for_semitones(2.0)).abs() < 1e-4);
        assert!((MIN_FREQ..=MAX_FREQ).contains(&f1));
        assert!((MIN_FREQ..=MAX_FREQ).contains(&f2));
        assert_eq!(r.expected, Answer::Direction(direction_between(f1, f2)));
    }

    #[test]
    fn scenario_b_three_misses_end_the_game() {
        let mut s = session(Variant::Basic, &[]);
        s.start();
        for miss in 1..=3u32 {
            until_input(&mut s);
            let a = wrong(&s);
            assert_eq!(s.submit_answer(a), Some(false));
            if miss < 3 {
                assert_eq!(s.state().level, 1 + miss);
                assert_eq!(s.state().lives, 3 - miss as u8);
                assert!(!s.state().is_game_over());
                s.advance(POST_ANSWER_DELAY_MS);
            }
        }
        assert!(s.state().is_game_over());
        assert_eq!(s.state().lives, 0);
        assert_eq!(s.state().level, 3);

        let overs = s.drain_events().iter().filter(|e| matches!(e, SessionEvent::GameOver { .. })).count();
        assert_eq!(overs, 1);
        assert_eq!(s.high_score(), 3);

        // Nothing moves after game over.
        s.advance(10_000);
        assert!(s.drain_events().is_empty());
        assert_eq!(s.submit_answer(Answer::Direction(Direction::Up)), None);
    }

    #[test]
    fn correct_answer_levels_up_and_saves() {
        let mut s = session(Variant::Basic, &[]);
        s.start();
        until_input(&mut s);
        let a = right(&s);
        assert_eq!(s.submit_answer(a), Some(true));
        assert_eq!(s.state().level, 2);
        assert_eq!(s.state().lives, 3);
        assert_eq!(s.state().last_answer_correct, Some(true));
        assert_eq!(s.high_score(), 2);
        assert_eq!(s.state().phase, Phase::Playing(Stage::Evaluating));

        s.advance(POST_ANSWER_DELAY_MS - 1);
        assert_eq!(s.state().phase, Phase::Playing(Stage::Evaluating));
        s.advance(1);
        assert_eq!(s.state().phase, Phase::Playing(Stage::Presenting));
        assert_eq!(s.state().last_answer_correct, None);
    }

    #[test]
    fn one_answer_per_round() {
        let mut s = session(Variant::Basic, &[]);
        s.start();
        assert_eq!(s.submit_answer(Answer::Direction(Direction::Up)), None, "gate closed during playback");
        until_input(&mut s);
        let a = right(&s);
        assert!(s.submit_answer(a).is_some());
        assert_eq!(s.submit_answer(a), None);
        assert_eq!(s.state().level, 2);
    }

    #[test]
    fn lives_never_go_negative() {
        for seed in 0..20 {
            let mut s = Session::seeded(Variant::Basic.policy(), Recorder::default(), Box::new(MemoryStore::new()), seed);
            s.start();
            let mut overs = 0;
            for _ in 0..50 {
                if s.state().is_game_over() {
                    break;
                }
                until_input(&mut s);
                let a = if s.state().level % 2 == 0 { right(&s) } else { wrong(&s) };
                s.submit_answer(a);
                overs += s.drain_events().iter().filter(|e| matches!(e, SessionEvent::GameOver { .. })).count();
                s.advance(POST_ANSWER_DELAY_MS);
            }
            assert!(s.state().is_game_over());
            assert_eq!(s.state().lives, 0);
            assert_eq!(overs, 1);
        }
    }

    #[test]
    fn slow_mode_waits_for_advance_next() {
        let mut s = session(Variant::Basic, &[(KEY_ADVANCE_MODE, "slow")]);
        s.start();
        assert!(!s.advance_next());
        until_input(&mut s);
        let a = right(&s);
        s.submit_answer(a);
        assert_eq!(s.state().phase, Phase::Playing(Stage::Reviewing));
        s.advance(60_000);
        assert_eq!(s.state().phase, Phase::Playing(Stage::Reviewing));
        assert!(s.advance_next());
        assert_eq!(s.state().phase, Phase::Playing(Stage::Presenting));
        assert_eq!(s.state().level, 2);
    }

    #[test]
    fn fast_mode_rejects_advance_next() {
        let mut s = session(Variant::Basic, &[]);
        s.start();
        until_input(&mut s);
        let a = right(&s);
        s.submit_answer(a);
        assert!(!s.advance_next());
    }

    #[test]
    fn replay_needs_easy_mode_while_answering() {
        let mut hard = session(Variant::Basic, &[]);
        hard.start();
        until_input(&mut hard);
        assert!(!hard.replay_stimulus());

        let mut easy = session(Variant::Basic, &[(KEY_DIFFICULTY, "easy")]);
        easy.start();
        assert!(!easy.replay_stimulus(), "not while presenting");
        until_input(&mut easy);
        let before = easy.state().round.clone();
        assert!(easy.replay_stimulus());
        assert!(!easy.state().input_enabled);
        assert_eq!(easy.state().round, before);
        assert_eq!((easy.state().level, easy.state().lives), (1, 3));
        until_input(&mut easy);
        assert_eq!(easy.tones().tones().len(), 4);
    }

    #[test]
    fn rapid_replays_leave_one_playback() {
        let mut s = session(Variant::Basic, &[(KEY_DIFFICULTY, "easy"), (KEY_PAUSE_MS, "0")]);
        s.start();
        until_input(&mut s);
        s.drain_events();

        assert!(s.replay_stimulus());
        s.advance(100);
        // Still presenting, so this one is refused and the first keeps going.
        assert!(!s.replay_stimulus());
        s.advance(10_000);

        let ev = s.drain_events();
        let finished = ev.iter().filter(|e| **e == SessionEvent::PlaybackFinished).count();
        let opened = ev.iter().filter(|e| **e == SessionEvent::InputOpened).count();
        assert_eq!((finished, opened), (1, 1));
    }

    #[test]
    fn back_to_back_replays_supersede_each_other() {
        let mut s = session(Variant::Basic, &[(KEY_ADVANCE_MODE, "slow"), (KEY_PAUSE_MS, "0")]);
        s.start();
        until_input(&mut s);
        let a = right(&s);
        s.submit_answer(a);
        let tones_before = s.tones().tones().len();
        s.drain_events();

        for _ in 0..3 {
            assert!(s.replay_stimulus());
            s.advance(100);
        }
        s.advance(10_000);

        let ev = s.drain_events();
        assert_eq!(ev.iter().filter(|e| **e == SessionEvent::PlaybackFinished).count(), 1);
        // Each replay sounded its first note; only the last got to the second.
        assert_eq!(s.tones().tones().len(), tones_before + 4);
        assert_eq!(s.state().level, 2);
        assert_eq!(s.state().phase, Phase::Playing(Stage::Reviewing));
    }

    #[test]
    fn replay_after_the_verdict_keeps_the_rounds_plan() {
        let mut s = session(Variant::Consecutive, &[(KEY_ADVANCE_MODE, "slow")]);
        s.start();
        until_input(&mut s);
        let r = s.state().round.clone().unwrap();
        assert_eq!(s.tones().tones(), vec![r.reference, r.probe]);

        let a = right(&s);
        s.submit_answer(a);
        assert_eq!(s.state().level, 2);
        assert_eq!(s.state().round_level, 1);
        assert!(s.replay_stimulus());
        s.advance(10_000);
        // Level 1 plays both notes, and so does its replay.
        assert_eq!(&s.tones().tones()[2..], &[r.reference, r.probe]);
    }

    #[test]
    fn drone_replay_at_level_one_waits_for_the_settle() {
        let mut s = session(Variant::Drone, &[(KEY_ADVANCE_MODE, "slow")]);
        s.start();
        until_input(&mut s);
        let a = right(&s);
        s.submit_answer(a);
        let before = s.tones().tones().len();

        assert!(s.replay_stimulus());
        s.advance(DRONE_SETTLE - 1);
        assert_eq!(s.tones().tones().len(), before);
        s.advance(1);
        assert_eq!(s.tones().tones().len(), before + 1);
        assert_eq!(s.tones().count(|c| matches!(c, Call::StartDrone(_))), 1);
    }

    #[test]
    fn slow_mode_replays_after_the_verdict() {
        let mut s = session(Variant::Basic, &[(KEY_ADVANCE_MODE, "slow")]);
        s.start();
        until_input(&mut s);
        let a = wrong(&s);
        s.submit_answer(a);
        let level = s.state().level;
        assert!(s.replay_stimulus());
        s.advance(10_000);
        assert_eq!(s.state().phase, Phase::Playing(Stage::Reviewing));
        assert!(!s.state().input_enabled);
        assert_eq!(s.state().level, level);
        assert_eq!(s.state().lives, 2);
    }

    #[test]
    fn exit_cancels_everything() {
        let mut s = session(Variant::Basic, &[]);
        s.start();
        s.advance(100);
        s.exit();
        let calls = s.tones().calls.len();
        s.drain_events();

        s.advance(60_000);
        assert_eq!(s.tones().calls.len(), calls, "no late tones after exit");
        assert!(s.drain_events().is_empty());
        assert!(!s.state().input_enabled);
        assert_eq!(s.tones().calls.last(), Some(&Call::StopAll));
        assert_eq!(s.submit_answer(Answer::Direction(Direction::Up)), None);
    }

    #[test]
    fn exit_during_auto_advance_stops_the_next_round() {
        let mut s = session(Variant::Basic, &[]);
        s.start();
        until_input(&mut s);
        let a = right(&s);
        s.submit_answer(a);
        s.exit();
        s.advance(POST_ANSWER_DELAY_MS * 2);
        assert_eq!(s.state().phase, Phase::Playing(Stage::Evaluating));
        assert!(s.is_exited());
    }

    #[test]
    fn restart_after_exit() {
        let mut s = session(Variant::Basic, &[]);
        s.start();
        s.exit();
        s.start();
        assert!(!s.is_exited());
        until_input(&mut s);
        assert_eq!(s.state().level, 1);
    }

    #[test]
    fn drone_holds_its_root_across_rounds() {
        let mut s = session(Variant::Drone, &[]);
        s.start();
        assert!(matches!(s.tones().calls[1], Call::StartDrone(_)));
        assert!(s.tones().tones().is_empty(), "probe waits for the drone to settle");
        s.advance(DRONE_SETTLE);
        assert_eq!(s.tones().tones().len(), 1);
        until_input(&mut s);

        let a = right(&s);
        s.submit_answer(a);
        s.advance(POST_ANSWER_DELAY_MS);
        // Same root: no second drone, probe plays at once.
        assert_eq!(s.tones().count(|c| matches!(c, Call::StartDrone(_))), 1);
        assert_eq!(s.tones().tones().len(), 2);
    }

    const DRONE_SETTLE: u64 = crate::variants::DRONE_SETTLE_MS;

    #[test]
    fn drone_stops_at_game_over() {
        let mut s = session(Variant::Drone, &[]);
        s.start();
        for _ in 0..3 {
            until_input(&mut s);
            let a = wrong(&s);
            s.submit_answer(a);
            s.advance(POST_ANSWER_DELAY_MS);
        }
        assert!(s.state().is_game_over());
        assert_eq!(s.tones().count(|c| matches!(c, Call::StopDrone(_))), 1);
    }

    #[test]
    fn cadence_accepts_answers_during_the_resolution() {
        let mut s = session(Variant::Cadence, &[(KEY_PAUSE_MS, "0")]);
        s.start();
        s.advance(1199);
        assert!(!s.state().input_enabled);
        s.advance(1);
        // Root and supertonic done; resolution just started.
        assert!(s.state().input_enabled);
        assert!(s.state().is_audio_playing);
        assert_eq!(s.tones().tones().len(), 3);

        let d = expected_direction(&s);
        assert_eq!(s.submit_answer(Answer::Direction(d)), Some(true));
        s.advance(400);
        assert_eq!(s.state().phase, Phase::Playing(Stage::Evaluating));
    }

    #[test]
    fn scenario_c_scale_compound_answer() {
        let mut s = session(Variant::Scale, &[]);
        s.start();
        until_input(&mut s);
        let Answer::Degree { index, direction } = right(&s) else { panic!("scale round") };
        let wrong_dir = Answer::Degree { index, direction: direction.flip() };
        assert_eq!(s.submit_answer(Answer::Direction(direction)), None, "bare direction is the wrong shape");
        assert!(s.state().input_enabled);
        assert_eq!(s.submit_answer(wrong_dir), Some(false));
        assert_eq!(s.state().lives, 2);
    }

    #[test]
    fn split_selectors_combine_into_one_verdict() {
        let mut s = session(Variant::Scale, &[(crate::prefs::KEY_SCALE_INPUT, "split")]);
        s.start();
        assert_eq!(s.prefs().scale_input, ScaleInput::Split);
        until_input(&mut s);
        let Answer::Degree { index, direction } = right(&s) else { panic!("scale round") };

        assert_eq!(s.select_degree(0), None);
        assert_eq!(s.select_degree(8), None);
        assert_eq!(s.draft(), Draft::default());

        let other = if index == 7 { 6 } else { index + 1 };
        assert_eq!(s.select_degree(other), None);
        assert_eq!(s.select_degree(index), None, "changing the pick is fine");
        assert_eq!(s.draft().index, Some(index));
        assert_eq!(s.select_direction(direction), Some(true));
        assert_eq!(s.draft(), Draft::default());
        assert_eq!(s.state().level, 2);
    }

    #[test]
    fn scale_plays_eight_notes() {
        let mut s = session(Variant::Scale, &[(KEY_PAUSE_MS, "0")]);
        s.start();
        s.advance(8 * 500);
        assert_eq!(s.tones().tones().len(), 8);
        assert!(s.state().input_enabled);
    }

    #[test]
    fn consecutive_plays_only_the_new_note_after_level_one() {
        let mut s = session(Variant::Consecutive, &[]);
        s.start();
        until_input(&mut s);
        let first_probe = s.state().round.as_ref().unwrap().probe;
        let a = right(&s);
        s.submit_answer(a);
        s.advance(POST_ANSWER_DELAY_MS);
        until_input(&mut s);
        let r = s.state().round.clone().unwrap();
        assert_eq!(r.reference, first_probe);
        let played = s.tones().tones();
        assert_eq!(played.len(), 3);
        assert_eq!(&played[1..], &[first_probe, r.probe]);
    }

    #[test]
    fn broken_store_never_stops_play() {
        let mut s = Session::seeded(Variant::Basic.policy(), Recorder::default(), Box::new(BrokenStore), 1);
        s.start();
        assert_eq!(*s.prefs(), Preferences::default());
        until_input(&mut s);
        let a = right(&s);
        assert_eq!(s.submit_answer(a), Some(true));
        assert_eq!(s.state().level, 2);
        assert_eq!(s.high_score(), 0);
    }

    #[test]
    fn silent_engine_plays_the_whole_game() {
        let mut s = Session::seeded(
            Variant::Cadence.policy(),
            intonation_engine::SilentTones::new(),
            Box::new(MemoryStore::new()),
            3,
        );
        s.start();
        let mut answered = 0;
        while !s.state().is_game_over() && answered < 100 {
            s.advance(100);
            if s.state().input_enabled {
                s.submit_answer(Answer::Direction(Direction::Up));
                answered += 1;
            }
        }
        assert!(s.state().is_game_over());
    }
}
