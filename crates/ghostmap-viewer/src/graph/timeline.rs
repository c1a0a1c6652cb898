use ghostmap_core::ActivityPayload;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::graph::model::EntityId;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Activity {
    pub id: Option<EntityId>,
    pub action: String,
    pub result: String,
    pub timestamp: String,
    pub target_id: Option<EntityId>,
    pub endpoint_id: Option<EntityId>,
    pub severity: Option<String>,
    pub tools: Vec<String>,
    pub is_finding: bool,
}

impl Activity {
    pub fn from_payload(raw: &ActivityPayload) -> Self {
        let action = raw
            .action
            .clone()
            .or_else(|| raw.event_type.clone())
            .unwrap_or_else(|| "activity".to_string());
        let result = raw
            .result
            .clone()
            .or_else(|| raw.message.clone())
            .unwrap_or_default();
        Self {
            id: raw.id.as_ref().map(EntityId::from),
            action,
            result,
            timestamp: raw.timestamp.clone().unwrap_or_default(),
            target_id: raw.target_id.as_ref().map(EntityId::from),
            endpoint_id: raw.endpoint_id.as_ref().map(EntityId::from),
            severity: raw.severity.clone(),
            tools: raw.tools.clone(),
            is_finding: raw.is_finding,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    #[default]
    #[serde(rename = "1")]
    X1,
    #[serde(rename = "2")]
    X2,
    #[serde(rename = "5")]
    X5,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 3] = [PlaybackSpeed::X1, PlaybackSpeed::X2, PlaybackSpeed::X5];

    pub fn delay(self) -> Duration {
        Duration::from_millis(match self {
            PlaybackSpeed::X1 => 1400,
            PlaybackSpeed::X2 => 800,
            PlaybackSpeed::X5 => 350,
        })
    }

    pub fn from_factor(factor: u32) -> Option<Self> {
        match factor {
            1 => Some(PlaybackSpeed::X1),
            2 => Some(PlaybackSpeed::X2),
            5 => Some(PlaybackSpeed::X5),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlaybackSpeed::X1 => "1x",
            PlaybackSpeed::X2 => "2x",
            PlaybackSpeed::X5 => "5x",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Owner of the single repeating playback timer.
///
/// `start` replaces any running timer; every tick it delivers must carry the
/// generation it was started with so late ticks from a replaced timer can be
/// told apart.
pub trait TickScheduler {
    fn start(&mut self, period: Duration, generation: u64);
    fn cancel(&mut self);
}

#[derive(Debug)]
pub struct PlaybackEngine<S: TickScheduler> {
    activities: Vec<Activity>,
    index: usize,
    mode: PlaybackMode,
    speed: PlaybackSpeed,
    session: Option<EntityId>,
    generation: u64,
    scheduler: S,
}

impl<S: TickScheduler> PlaybackEngine<S> {
    pub fn new(scheduler: S, speed: PlaybackSpeed) -> Self {
        Self {
            activities: Vec::new(),
            index: 0,
            mode: PlaybackMode::Idle,
            speed,
            session: None,
            generation: 0,
            scheduler,
        }
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn session(&self) -> Option<&EntityId> {
        self.session.as_ref()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn current(&self) -> Option<&Activity> {
        self.activities.get(self.index)
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// `(index + 1, len)`, `(0, 0)` with no log.
    pub fn progress(&self) -> (usize, usize) {
        if self.activities.is_empty() {
            (0, 0)
        } else {
            (self.index + 1, self.activities.len())
        }
    }

    fn stop_timer(&mut self) {
        self.scheduler.cancel();
        self.generation += 1;
    }

    fn start_timer(&mut self) {
        self.generation += 1;
        self.scheduler.start(self.speed.delay(), self.generation);
    }

    /// Installs a new log at index 0, idle.
    pub fn load(&mut self, session: EntityId, activities: Vec<Activity>) {
        self.stop_timer();
        self.session = Some(session);
        self.activities = activities;
        self.index = 0;
        self.mode = PlaybackMode::Idle;
    }

    pub fn teardown(&mut self) {
        self.stop_timer();
        self.session = None;
        self.activities.clear();
        self.index = 0;
        self.mode = PlaybackMode::Idle;
    }

    /// Starts the timer. Playing from the last activity rewinds to index 0
    /// first, so the log replays instead of stopping on the first tick.
    /// Returns false when there is nothing to play.
    pub fn play(&mut self) -> bool {
        if self.activities.is_empty() {
            return false;
        }
        if self.mode == PlaybackMode::Playing {
            return true;
        }
        if self.index + 1 >= self.activities.len() {
            self.index = 0;
        }
        self.mode = PlaybackMode::Playing;
        self.start_timer();
        true
    }

    pub fn pause(&mut self) {
        if self.mode == PlaybackMode::Playing {
            self.stop_timer();
        }
        if !self.activities.is_empty() {
            self.mode = PlaybackMode::Paused;
        }
    }

    pub fn toggle(&mut self) {
        match self.mode {
            PlaybackMode::Playing => self.pause(),
            PlaybackMode::Idle | PlaybackMode::Paused => {
                self.play();
            }
        }
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        if self.speed == speed {
            return;
        }
        self.speed = speed;
        if self.mode == PlaybackMode::Playing {
            self.scheduler.cancel();
            self.start_timer();
        }
    }

    /// Clamped seek; always leaves the engine paused. Returns the new index.
    pub fn seek(&mut self, target: i64) -> Option<usize> {
        if self.activities.is_empty() {
            return None;
        }
        self.pause();
        let last = self.activities.len() as i64 - 1;
        self.index = target.clamp(0, last) as usize;
        Some(self.index)
    }

    pub fn next_finding(&self) -> Option<usize> {
        self.activities
            .iter()
            .enumerate()
            .skip(self.index + 1)
            .find(|(_, a)| a.is_finding)
            .map(|(i, _)| i)
    }

    /// Seeks to the next finding after the current index; no-op when none.
    pub fn skip_to_next_finding(&mut self) -> Option<usize> {
        let next = self.next_finding()?;
        self.seek(next as i64)
    }

    /// Advances on a tick from the live timer. Returns the new index when it moved.
    pub fn on_tick(&mut self, generation: u64) -> Option<usize> {
        if self.mode != PlaybackMode::Playing || generation != self.generation {
            return None;
        }
        let last = self.activities.len().saturating_sub(1);
        if self.index >= last {
            self.pause();
            return None;
        }
        self.index += 1;
        if self.index == last {
            self.pause();
        }
        Some(self.index)
    }
}

impl<S: TickScheduler> Drop for PlaybackEngine<S> {
    fn drop(&mut self) {
        self.scheduler.cancel();
    }
}

/// Records scheduler calls; ticks are fed by hand.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pub running: Option<(Duration, u64)>,
    pub starts: usize,
    pub cancels: usize,
}

#[cfg(test)]
impl TickScheduler for ManualScheduler {
    fn start(&mut self, period: Duration, generation: u64) {
        self.running = Some((period, generation));
        self.starts += 1;
    }

    fn cancel(&mut self) {
        self.running = None;
        self.cancels += 1;
    }
}

#[cfg(test)]
impl ManualScheduler {
    pub fn live_generation(&self) -> Option<u64> {
        self.running.map(|(_, g)| g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostmap_core::WireId;

    fn activity(is_finding: bool) -> Activity {
        Activity {
            action: "probe".into(),
            is_finding,
            ..Activity::default()
        }
    }

    fn engine_with(findings: &[usize], len: usize) -> PlaybackEngine<ManualScheduler> {
        let mut engine = PlaybackEngine::new(ManualScheduler::default(), PlaybackSpeed::X1);
        let log = (0..len).map(|i| activity(findings.contains(&i))).collect();
        engine.load(EntityId::from("s1"), log);
        engine
    }

    fn tick(engine: &mut PlaybackEngine<ManualScheduler>) -> Option<usize> {
        let generation = engine.scheduler().live_generation()?;
        engine.on_tick(generation)
    }

    #[test]
    fn empty_log_stays_idle() {
        let mut engine = engine_with(&[], 0);
        assert!(!engine.play());
        engine.toggle();
        assert_eq!(engine.mode(), PlaybackMode::Idle);
        assert_eq!(engine.seek(4), None);
        assert_eq!(engine.progress(), (0, 0));
        assert!(engine.scheduler().running.is_none());
    }

    #[test]
    fn ticks_advance_and_stop_at_the_end() {
        let mut engine = engine_with(&[], 3);
        assert!(engine.play());
        assert_eq!(engine.scheduler().running.map(|r| r.0), Some(Duration::from_millis(1400)));
        assert_eq!(tick(&mut engine), Some(1));
        assert_eq!(engine.progress(), (2, 3));
        assert_eq!(tick(&mut engine), Some(2));
        assert_eq!(engine.mode(), PlaybackMode::Paused);
        assert!(engine.scheduler().running.is_none());
        assert_eq!(tick(&mut engine), None);
        assert_eq!(engine.index(), 2);
    }

    #[test]
    fn seek_clamps_and_pauses() {
        let mut engine = engine_with(&[], 4);
        engine.play();
        assert_eq!(engine.seek(99), Some(3));
        assert_eq!(engine.mode(), PlaybackMode::Paused);
        assert!(engine.scheduler().running.is_none());
        assert_eq!(engine.seek(-5), Some(0));
    }

    #[test]
    fn skip_to_next_finding() {
        let mut engine = engine_with(&[2, 5, 7], 9);
        engine.seek(3);
        assert_eq!(engine.skip_to_next_finding(), Some(5));
        engine.seek(7);
        assert_eq!(engine.skip_to_next_finding(), None);
        assert_eq!(engine.index(), 7);
    }

    #[test]
    fn speed_change_replaces_the_timer() {
        let mut engine = engine_with(&[], 5);
        engine.play();
        let old = engine.scheduler().live_generation().unwrap();
        engine.set_speed(PlaybackSpeed::X5);
        let (period, new) = engine.scheduler().running.unwrap();
        assert_eq!(period, Duration::from_millis(350));
        assert_ne!(old, new);
        assert_eq!(engine.on_tick(old), None);
        assert_eq!(engine.index(), 0);
        assert_eq!(engine.on_tick(new), Some(1));
    }

    #[test]
    fn load_cancels_and_resets() {
        let mut engine = engine_with(&[], 5);
        engine.play();
        tick(&mut engine);
        let stale = engine.scheduler().live_generation().unwrap();
        engine.load(EntityId::from("s2"), vec![activity(false); 2]);
        assert_eq!(engine.index(), 0);
        assert_eq!(engine.mode(), PlaybackMode::Idle);
        assert!(engine.scheduler().running.is_none());
        assert_eq!(engine.on_tick(stale), None);
    }

    #[test]
    fn play_from_the_end_restarts() {
        let mut engine = engine_with(&[], 3);
        engine.seek(2);
        engine.play();
        assert_eq!(engine.index(), 0);
        assert_eq!(engine.mode(), PlaybackMode::Playing);
    }

    #[test]
    fn payload_fallbacks() {
        let raw = ActivityPayload {
            event_type: Some("scan".into()),
            message: Some("started".into()),
            endpoint_id: Some(WireId::Num(4)),
            ..ActivityPayload::default()
        };
        let a = Activity::from_payload(&raw);
        assert_eq!(a.action, "scan");
        assert_eq!(a.result, "started");
        assert_eq!(a.endpoint_id, Some(EntityId::from("4")));
    }
}
