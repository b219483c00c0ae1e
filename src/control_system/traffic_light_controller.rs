use crate::control_system::config::{ConfigError, ControllerConfig, SignalTimings};
use crate::control_system::inputs::ControlInputs;
use crate::control_system::road_queue::{sample_queues, RoadQueue};
use crate::control_system::scheduler::{self, PhaseTimer, ScheduledTask, Timed, TimerView};
use crate::control_system::signals::{SignalBoard, SignalState};
use crate::control_system::timing_policy::{Decision, TimingPolicy};
use crate::shared_data::{Approach, LightColor, RoadPair};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{Duration, Instant};

/// What the controller is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "pair")]
pub enum Phase {
    Green(RoadPair),
    Yellow(RoadPair),
    AllRed,
}

impl Phase {
    pub fn pair(&self) -> Option<RoadPair> {
        match self {
            Phase::Green(pair) | Phase::Yellow(pair) => Some(*pair),
            Phase::AllRed => None,
        }
    }
}

/// Serializable summary for display surfaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub phase: Phase,
    pub pair: Option<RoadPair>,
    pub duration_ms: u64,
    pub remaining_ms: u64,
    pub emergency: bool,
    pub override_mode: bool,
    pub description: String,
}

#[derive(Debug, Clone)]
struct PhaseStatus {
    phase: Phase,
    // Last pair that held right-of-way, for the override banner.
    last_pair: RoadPair,
    duration: Duration,
    emergency: bool,
    paused: bool,
    started: bool,
}

impl PhaseStatus {
    fn describe(&self, remaining: Duration) -> String {
        if self.paused {
            return format!("Manual Override ({})", self.last_pair);
        }
        if !self.started {
            return "Initializing...".to_string();
        }
        let remaining_secs = remaining.as_millis().div_ceil(1000);
        match self.phase {
            Phase::Green(pair) => format!(
                "{}{} GREEN for {}s ({}s remaining)",
                if self.emergency { "EMERGENCY: " } else { "" },
                pair.display_name(),
                self.duration.as_millis() / 1000,
                remaining_secs
            ),
            Phase::Yellow(pair) => {
                format!("{} YELLOW ({}s remaining)", pair.display_name(), remaining_secs)
            }
            Phase::AllRed => format!("ALL RED ({}s remaining)", remaining_secs),
        }
    }
}

/// Shared, read-mostly view of the controller's phase for display. The
/// countdown comes from the controller's own timer.
#[derive(Debug, Clone)]
struct StatusBoard {
    inner: Arc<Mutex<PhaseStatus>>,
    timer: TimerView,
}

impl StatusBoard {
    fn new(timer: TimerView) -> Self {
        Self {
            timer,
            inner: Arc::new(Mutex::new(PhaseStatus {
                phase: Phase::AllRed,
                last_pair: RoadPair::NS,
                duration: Duration::ZERO,
                emergency: false,
                paused: false,
                started: false,
            })),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut PhaseStatus)) {
        let mut status = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut status);
    }

    fn read(&self) -> PhaseStatus {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.timer.remaining(now)
    }
}

/// Adaptive two-pair signal controller.
///
/// Cycles `AllRed -> Green(pair) -> Yellow(pair) -> AllRed` forever. The
/// decision at the top of each cycle samples the queues, consumes any
/// pending emergency request and honours override mode. Phases already
/// running always complete their timers.
pub struct Controller {
    timings: SignalTimings,
    policy: TimingPolicy,
    signals: SignalState,
    queues: Arc<dyn RoadQueue>,
    inputs: Arc<ControlInputs>,
    status: StatusBoard,
    timer: PhaseTimer,
    phase: Phase,
    cycles: u64,
}

impl Controller {
    /// Validates `config` before anything else; an invalid config never yields a controller.
    pub fn new(config: &ControllerConfig, queues: Arc<dyn RoadQueue>) -> Result<Self, ConfigError> {
        let timings = config.validate()?;
        log::info!(
            "Controller configured: base green {}ms, bonus {}ms/vehicle, yellow {}ms, all-red {}ms, emergency x{}, override poll {}ms, cap {:?}",
            timings.base_green_ms,
            timings.vehicle_bonus_ms,
            timings.yellow_ms,
            timings.all_red_ms,
            timings.emergency_factor,
            timings.override_poll_ms,
            timings.max_green_ms
        );
        let timer = PhaseTimer::new();
        Ok(Self {
            timings,
            policy: TimingPolicy::new(&timings),
            signals: SignalState::new(),
            queues,
            inputs: Arc::new(ControlInputs::new()),
            status: StatusBoard::new(timer.view()),
            timer,
            phase: Phase::AllRed,
            cycles: 0,
        })
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            inputs: Arc::clone(&self.inputs),
            signals: self.signals.board(),
            status: self.status.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of green phases started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs the transition due at `now`, arms the timer for the next one
    /// and returns its delay.
    pub fn advance(&mut self, now: Instant) -> Duration {
        let after = match self.phase {
            Phase::AllRed => self.decide_next(),
            Phase::Green(pair) => self.enter_yellow(pair),
            Phase::Yellow(pair) => self.enter_all_red(pair),
        };
        self.timer.arm(now, after);
        after
    }

    /// Moves the controller onto the current runtime's event loop.
    pub fn spawn(self) -> ScheduledTask {
        scheduler::spawn(self)
    }

    fn decide_next(&mut self) -> Duration {
        if self.inputs.override_mode() {
            let poll = self.timings.override_poll();
            log::debug!("Override mode active; re-polling in {}ms", poll.as_millis());
            self.status.update(|status| status.paused = true);
            return poll;
        }

        let emergency = self.inputs.take_emergency();
        let queues = sample_queues(self.queues.as_ref());
        let decision = self.policy.decide(&queues, emergency);
        self.enter_green(decision)
    }

    fn enter_green(&mut self, decision: Decision) -> Duration {
        let Decision {
            pair, emergency, ..
        } = decision;
        if let Some(request) = emergency {
            log::warn!(
                "Emergency preemption for {}: granting {} green for {}ms",
                request.target,
                pair,
                decision.duration_ms
            );
        }
        log::info!("{} GREEN for {}ms", pair.display_name(), decision.duration_ms);

        self.signals.set_pair(pair, LightColor::Green);
        self.phase = Phase::Green(pair);
        self.cycles += 1;
        let duration = decision.duration();
        self.status.update(|status| {
            status.phase = Phase::Green(pair);
            status.last_pair = pair;
            status.duration = duration;
            status.emergency = emergency.is_some();
            status.paused = false;
            status.started = true;
        });
        duration
    }

    fn enter_yellow(&mut self, pair: RoadPair) -> Duration {
        let duration = self.timings.yellow();
        log::info!("{} YELLOW for {}ms", pair.display_name(), duration.as_millis());
        self.signals.set_pair(pair, LightColor::Yellow);
        self.phase = Phase::Yellow(pair);
        self.status.update(|status| {
            status.phase = Phase::Yellow(pair);
            status.duration = duration;
        });
        duration
    }

    fn enter_all_red(&mut self, pair: RoadPair) -> Duration {
        let duration = self.timings.all_red();
        log::info!("ALL RED clearance for {}ms", duration.as_millis());
        self.signals.set_pair(pair, LightColor::Red);
        self.phase = Phase::AllRed;
        self.status.update(|status| {
            status.phase = Phase::AllRed;
            status.duration = duration;
            status.emergency = false;
        });
        duration
    }
}

impl Timed for Controller {
    fn on_timer(&mut self, now: Instant) {
        self.advance(now);
    }

    fn timer(&mut self) -> &mut PhaseTimer {
        &mut self.timer
    }
}

/// Cloneable surface for everything outside the controller: inbound
/// requests and outbound observations.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    inputs: Arc<ControlInputs>,
    signals: SignalBoard,
    status: StatusBoard,
}

impl ControllerHandle {
    /// Fire-and-forget; honoured at the next decision point.
    pub fn request_emergency(&self, approach: Approach) {
        log::info!("Emergency requested for {}", approach);
        self.inputs.request_emergency(approach);
    }

    /// Like [`request_emergency`](Self::request_emergency) but takes an
    /// approach name. Unknown names are logged and ignored.
    pub fn request_emergency_named(&self, name: &str) -> bool {
        match name.parse::<Approach>() {
            Ok(approach) => {
                self.request_emergency(approach);
                true
            }
            Err(e) => {
                log::warn!("Ignoring emergency request: {}", e);
                false
            }
        }
    }

    /// Files an emergency for whichever approach currently holds the most vehicles.
    pub fn request_emergency_busiest(&self, queues: &dyn RoadQueue) -> Approach {
        let target = sample_queues(queues).busiest();
        self.request_emergency(target);
        target
    }

    pub fn set_override_mode(&self, enabled: bool) {
        log::info!(
            "Override mode {}",
            if enabled { "enabled" } else { "cleared" }
        );
        self.inputs.set_override_mode(enabled);
    }

    pub fn override_mode(&self) -> bool {
        self.inputs.override_mode()
    }

    pub fn emergency_pending(&self) -> bool {
        self.inputs.pending_emergency().is_some()
    }

    pub fn color_of(&self, approach: Approach) -> LightColor {
        self.signals.color_of(approach)
    }

    pub fn signals(&self) -> &SignalBoard {
        &self.signals
    }

    pub fn status_description(&self) -> String {
        self.status
            .read()
            .describe(self.status.remaining(Instant::now()))
    }

    pub fn status_report(&self) -> StatusReport {
        let status = self.status.read();
        let remaining = self.status.remaining(Instant::now());
        StatusReport {
            phase: status.phase,
            pair: status.phase.pair(),
            duration_ms: status.duration.as_millis() as u64,
            remaining_ms: remaining.as_millis() as u64,
            emergency: status.emergency,
            override_mode: self.inputs.override_mode(),
            description: status.describe(remaining),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_data::QueueSnapshot;

    fn controller(queues: QueueSnapshot) -> Controller {
        Controller::new(&ControllerConfig::default(), Arc::new(queues)).unwrap()
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn invalid_config_never_builds_a_controller() {
        let config = ControllerConfig {
            all_red_ms: 0,
            ..ControllerConfig::default()
        };
        let result = Controller::new(&config, Arc::new(QueueSnapshot::default()));
        assert!(matches!(
            result,
            Err(ConfigError::NonPositiveDuration { name: "all_red_ms", .. })
        ));
    }

    #[test]
    fn starts_all_red_and_initializing() {
        let controller = controller(QueueSnapshot::default());
        let handle = controller.handle();
        assert_eq!(controller.phase(), Phase::AllRed);
        for approach in Approach::ALL {
            assert_eq!(handle.color_of(approach), LightColor::Red);
        }
        assert_eq!(handle.status_description(), "Initializing...");
    }

    #[test]
    fn cycles_through_green_yellow_all_red() {
        let mut controller = controller(QueueSnapshot::new(2, 0, 1, 0));
        let handle = controller.handle();
        let t0 = Instant::now();

        assert_eq!(controller.advance(t0), ms(16_000));
        assert_eq!(controller.phase(), Phase::Green(RoadPair::NS));
        assert_eq!(handle.color_of(Approach::North), LightColor::Green);
        assert_eq!(handle.color_of(Approach::South), LightColor::Green);
        assert_eq!(handle.color_of(Approach::East), LightColor::Red);

        assert_eq!(controller.advance(t0 + ms(16_000)), ms(3_000));
        assert_eq!(controller.phase(), Phase::Yellow(RoadPair::NS));
        assert_eq!(handle.color_of(Approach::North), LightColor::Yellow);

        assert_eq!(controller.advance(t0 + ms(19_000)), ms(1_000));
        assert_eq!(controller.phase(), Phase::AllRed);
        assert_eq!(handle.color_of(Approach::North), LightColor::Red);
        assert_eq!(handle.color_of(Approach::West), LightColor::Red);

        assert_eq!(controller.advance(t0 + ms(20_000)), ms(16_000));
        assert_eq!(controller.cycles(), 2);
    }

    #[test]
    fn emergency_waits_for_the_decision_point() {
        let mut controller = controller(QueueSnapshot::new(2, 0, 1, 0));
        let handle = controller.handle();
        let t0 = Instant::now();

        controller.advance(t0);
        handle.request_emergency(Approach::East);
        assert_eq!(controller.advance(t0 + ms(16_000)), ms(3_000));
        assert_eq!(controller.phase(), Phase::Yellow(RoadPair::NS));
        controller.advance(t0 + ms(19_000));
        assert!(handle.emergency_pending());

        assert_eq!(controller.advance(t0 + ms(20_000)), ms(24_000));
        assert_eq!(controller.phase(), Phase::Green(RoadPair::EW));
        assert!(!handle.emergency_pending());
        assert!(handle.status_report().emergency);

        controller.advance(t0 + ms(44_000));
        controller.advance(t0 + ms(47_000));
        assert_eq!(controller.advance(t0 + ms(48_000)), ms(16_000));
        assert_eq!(controller.phase(), Phase::Green(RoadPair::NS));
        assert!(!handle.status_report().emergency);
    }

    #[test]
    fn override_holds_at_the_decision_point() {
        let mut controller = controller(QueueSnapshot::new(0, 1, 0, 3));
        let handle = controller.handle();
        let t0 = Instant::now();

        handle.set_override_mode(true);
        for poll in 0..5 {
            assert_eq!(controller.advance(t0 + ms(poll * 1_000)), ms(1_000));
            assert_eq!(controller.phase(), Phase::AllRed);
        }
        assert_eq!(handle.status_description(), "Manual Override (NS)");

        handle.set_override_mode(false);
        assert_eq!(controller.advance(t0 + ms(5_000)), ms(18_000));
        assert_eq!(controller.phase(), Phase::Green(RoadPair::EW));
    }

    #[test]
    fn unknown_emergency_names_are_ignored() {
        let controller = controller(QueueSnapshot::default());
        let handle = controller.handle();
        assert!(!handle.request_emergency_named("sideways"));
        assert!(!handle.emergency_pending());
        assert!(handle.request_emergency_named("West"));
        assert!(handle.emergency_pending());
    }

    #[test]
    fn busiest_emergency_targets_longest_queue() {
        let controller = controller(QueueSnapshot::default());
        let handle = controller.handle();
        let queues = QueueSnapshot::new(1, 0, 0, 6);
        assert_eq!(handle.request_emergency_busiest(&queues), Approach::West);
        assert!(handle.emergency_pending());
    }

    #[test]
    fn status_text_mirrors_phase() {
        let mut controller = controller(QueueSnapshot::new(2, 0, 1, 0));
        let handle = controller.handle();
        let t0 = Instant::now();
        controller.advance(t0);
        let text = handle.status_description();
        assert!(text.starts_with("NORTH/SOUTH GREEN for 16s"), "{}", text);

        let report = handle.status_report();
        assert_eq!(report.phase, Phase::Green(RoadPair::NS));
        assert_eq!(report.duration_ms, 16_000);
        assert!(!report.override_mode);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["phase"]["phase"], "Green");
        assert_eq!(json["phase"]["pair"], "NS");
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_follows_the_armed_timer() {
        let mut controller = controller(QueueSnapshot::new(2, 0, 1, 0));
        let handle = controller.handle();
        let t0 = Instant::now();
        assert_eq!(handle.status_report().remaining_ms, 0);

        controller.advance(t0);
        tokio::time::sleep(ms(4_000)).await;
        assert_eq!(handle.status_report().remaining_ms, 12_000);
        assert_eq!(
            handle.status_description(),
            "NORTH/SOUTH GREEN for 16s (12s remaining)"
        );

        handle.set_override_mode(true);
        controller.advance(t0 + ms(16_000));
        controller.advance(t0 + ms(19_000));
        controller.advance(t0 + ms(20_000));
        assert_eq!(controller.phase(), Phase::AllRed);
        assert_eq!(handle.status_report().remaining_ms, 17_000);
    }
}
