//! Test orchestration: safety state machine, test lifecycle, jogging and
//! data sampling.
//!
//! The orchestrator owns the test parameters, the current result and the
//! sampler. Collaborators (motion controller, force sensor, emergency
//! input, response sink) are borrowed per call through a
//! [`TickContext`].
//!
//! Every condition detected during a tick is resolved within that tick:
//! one state transition and one outbound message.

pub mod machine;
pub mod sampling;

use tensile_common::hal::driver::{Actuator, EmergencyInput, ForceSensor};
use tensile_common::tester::command::{Command, CommandFrame};
use tensile_common::tester::config::RigConfig;
use tensile_common::tester::error::ErrorCode;
use tensile_common::tester::params::{
    DataPoint, ParameterLimits, RangeError, TestParameters, TestResult,
};
use tensile_common::tester::state::{Direction, MachineState};
use tracing::{debug, info, trace, warn};

use crate::motion::{MAX_TARGET_STEPS, MotionController};
use crate::motion::homing::{HomingFailReason, HomingTickResult};
use crate::protocol::{Response, ResponseSink};

use self::machine::{TestEvent, TestStateMachine, TransitionResult};
use self::sampling::{HybridSampler, detect_break};

/// Target for an unbounded jog [steps].
pub const CONTINUOUS_JOG_STEPS: i64 = MAX_TARGET_STEPS;

/// Collaborators borrowed for one command or one update.
pub struct TickContext<'a, A: Actuator> {
    pub motion: &'a mut MotionController<A>,
    pub sensor: &'a mut dyn ForceSensor,
    pub emergency: &'a dyn EmergencyInput,
    pub sink: &'a mut dyn ResponseSink,
    /// Monotonic time [µs].
    pub now_us: u64,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    machine: TestStateMachine,
    params: TestParameters,
    limits: ParameterLimits,
    result: TestResult,
    sampler: HybridSampler,
    homing_direction: Direction,
    tare_samples: u32,
    test_start_us: u64,
    start_position_mm: f64,
    jog_active: bool,
    /// Data points go out on the channel while set.
    streaming: bool,
}

impl Orchestrator {
    pub fn new(cfg: &RigConfig) -> Self {
        Self {
            machine: TestStateMachine::new(),
            params: cfg.test,
            limits: cfg.parameter_limits(),
            result: TestResult::default(),
            sampler: HybridSampler::new(),
            homing_direction: cfg.motion.homing_direction,
            tare_samples: cfg.load_cell.tare_samples,
            test_start_us: 0,
            start_position_mm: 0.0,
            jog_active: false,
            streaming: false,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub fn state(&self) -> MachineState {
        self.machine.state()
    }

    #[inline]
    pub fn params(&self) -> &TestParameters {
        &self.params
    }

    #[inline]
    pub fn result(&self) -> &TestResult {
        &self.result
    }

    #[inline]
    pub fn is_jog_active(&self) -> bool {
        self.jog_active
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Crosshead position at test start [mm].
    #[inline]
    pub fn start_position_mm(&self) -> f64 {
        self.start_position_mm
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Execute one inbound command. Exactly one response is sent.
    pub fn handle_command<A: Actuator>(&mut self, frame: CommandFrame, ctx: &mut TickContext<'_, A>) {
        debug!("Command {:?} {:?} in {}", frame.command, frame.parameter, self.state());
        let response = self.dispatch(frame, ctx);
        if let Response::Error { code, .. } = response {
            debug!("Command {:?} declined: {code}", frame.command);
        }
        ctx.sink.send(response);
    }

    fn dispatch<A: Actuator>(&mut self, frame: CommandFrame, ctx: &mut TickContext<'_, A>) -> Response {
        let command = frame.command;
        if takes_parameter(command) && frame.parameter.is_some_and(|p| !p.is_finite()) {
            return Response::error(ErrorCode::InvalidParameter);
        }
        if command.requires_parameter() && frame.parameter.is_none() {
            return Response::error_with(ErrorCode::InvalidParameter, "Parameter required");
        }
        let param = frame.parameter.unwrap_or(0.0);

        match command {
            // ── Test control ──
            Command::StartTest => self.start_test(ctx),
            Command::StopTest => {
                if !self.state().is_test_active() {
                    return Response::error(ErrorCode::NotReady);
                }
                self.end_test(ctx);
                Response::ok_with("Test stopped")
            }
            Command::PauseTest => {
                if self.state() != MachineState::Running {
                    return Response::error(ErrorCode::NotReady);
                }
                ctx.motion.stop_decelerate();
                self.transition(TestEvent::PauseRequested);
                Response::ok_with("Test paused")
            }
            Command::ResumeTest => {
                if self.state() != MachineState::Paused {
                    return Response::error(ErrorCode::NotReady);
                }
                ctx.motion.move_to_mm(self.params.max_extension_mm);
                self.transition(TestEvent::ResumeRequested);
                Response::ok_with("Test resumed")
            }
            Command::EmergencyStop => {
                self.enter_emergency(ctx);
                Response::ok_with("Emergency stop")
            }

            // ── Movement ──
            Command::MoveUp => self.jog(Direction::Up, frame.parameter, ctx),
            Command::MoveDown => self.jog(Direction::Down, frame.parameter, ctx),
            Command::MoveTo => {
                if let Some(declined) = self.motion_gate() {
                    return declined;
                }
                if param.abs() > self.limits.travel_limit {
                    return invalid(RangeError {
                        field: "goto",
                        value: param,
                    });
                }
                ctx.motion.enable();
                ctx.motion.move_to_mm(param);
                self.jog_active = true;
                Response::ok()
            }
            Command::Halt => {
                if self.jog_active {
                    ctx.motion.stop_decelerate();
                    self.jog_active = false;
                }
                Response::ok()
            }
            Command::Home => self.start_homing(ctx),

            // ── Configuration ──
            Command::SetSpeed => match self.params.set_speed(param) {
                Ok(()) => {
                    ctx.motion.set_speed_mm_per_s(param);
                    Response::ok()
                }
                Err(e) => invalid(e),
            },
            Command::SetMaxForce => match self.params.set_max_force(param, &self.limits) {
                Ok(()) => Response::ok(),
                Err(e) => invalid(e),
            },
            Command::SetMaxExtension => match self.params.set_max_extension(param, &self.limits) {
                Ok(()) => Response::ok(),
                Err(e) => invalid(e),
            },
            Command::SetSampleRate => {
                let ms = if param < 0.0 { 0 } else { param as u32 };
                match self.params.set_sample_interval(ms) {
                    Ok(()) => Response::ok(),
                    Err(e) => invalid(e),
                }
            }

            // ── Calibration ──
            Command::Tare => {
                if self.state().is_test_active() {
                    return Response::error(ErrorCode::Busy);
                }
                ctx.sensor.tare(self.tare_samples);
                info!("Load cell tared over {} samples", self.tare_samples);
                Response::ok_with("Tared")
            }
            Command::Calibrate => Response::error_with(ErrorCode::NotReady, "Not implemented"),
            Command::SetCalFactor => {
                if param == 0.0 {
                    return Response::error(ErrorCode::InvalidParameter);
                }
                ctx.sensor.set_calibration_factor(param);
                info!("Calibration factor set to {param}");
                Response::ok()
            }

            // ── Queries ──
            Command::GetStatus => Response::Status {
                state: self.state(),
                force_n: ctx.sensor.last_force(),
                position_mm: ctx.motion.position_mm(),
                test_active: self.state().is_test_active(),
            },
            Command::GetForce => Response::Force(ctx.sensor.last_force()),
            Command::GetPosition => Response::Position(ctx.motion.position_mm()),
            Command::GetConfig => Response::Config {
                speed_mm_s: self.params.speed_mm_s,
                max_force_n: self.params.max_force_n,
                max_extension_mm: self.params.max_extension_mm,
                sample_interval_ms: self.params.sample_interval_ms,
            },

            // ── System ──
            Command::Reset => self.reset(ctx),
            Command::Identify => Response::Identity,

            // Recorded data is streamed while running; there is no replay.
            Command::GetData | Command::Unknown => Response::error(ErrorCode::UnknownCommand),
        }
    }

    fn start_test<A: Actuator>(&mut self, ctx: &mut TickContext<'_, A>) -> Response {
        if self.state() != MachineState::Ready {
            return Response::error(ErrorCode::NotReady);
        }

        self.result.reset();
        self.sampler.reset();
        self.test_start_us = ctx.now_us;
        self.start_position_mm = ctx.motion.position_mm();
        self.jog_active = false;

        ctx.motion.set_speed_mm_per_s(self.params.speed_mm_s);
        ctx.motion.enable();
        ctx.motion.move_to_mm(self.params.max_extension_mm);

        self.streaming = true;
        self.transition(TestEvent::StartRequested);
        info!(
            "Test started at {:.3} mm: {:.2} mm/s, max {:.1} N / {:.1} mm",
            self.start_position_mm,
            self.params.speed_mm_s,
            self.params.max_force_n,
            self.params.max_extension_mm
        );
        Response::ok_with("Test started")
    }

    fn start_homing<A: Actuator>(&mut self, ctx: &mut TickContext<'_, A>) -> Response {
        if !matches!(
            self.state(),
            MachineState::Idle | MachineState::Ready | MachineState::Stopped
        ) {
            return Response::error(ErrorCode::Busy);
        }
        self.jog_active = false;
        ctx.motion.start_homing(self.homing_direction, ctx.now_us);
        self.transition(TestEvent::HomeRequested);
        Response::ok_with("Homing started")
    }

    fn jog<A: Actuator>(
        &mut self,
        direction: Direction,
        distance_mm: Option<f64>,
        ctx: &mut TickContext<'_, A>,
    ) -> Response {
        if let Some(declined) = self.motion_gate() {
            return declined;
        }
        ctx.motion.enable();
        let sign = f64::from(direction.sign());
        match distance_mm {
            Some(mm) if mm > 0.0 => ctx.motion.move_relative_mm(mm * sign),
            _ => ctx
                .motion
                .move_to(CONTINUOUS_JOG_STEPS * i64::from(direction.sign())),
        }
        self.jog_active = true;
        debug!("Jog {direction:?} {distance_mm:?}");
        Response::ok()
    }

    fn reset<A: Actuator>(&mut self, ctx: &mut TickContext<'_, A>) -> Response {
        let was = self.state();
        let event = TestEvent::Reset {
            input_released: !ctx.emergency.is_engaged(),
        };
        match self.transition(event) {
            TransitionResult::Ok(_) => {
                if was == MachineState::Homing {
                    ctx.motion.abort_homing();
                }
                Response::ok_with("Reset")
            }
            TransitionResult::Rejected(reason) => {
                if was == MachineState::Emergency {
                    Response::error_with(ErrorCode::Emergency, reason)
                } else {
                    Response::error_with(ErrorCode::Busy, reason)
                }
            }
        }
    }

    /// Manual motion is refused while testing, homing or in emergency.
    fn motion_gate(&self) -> Option<Response> {
        match self.state() {
            MachineState::Running | MachineState::Emergency => Some(Response::error(ErrorCode::NotReady)),
            MachineState::Homing => Some(Response::error(ErrorCode::Busy)),
            _ => None,
        }
    }

    // ─── Periodic Update ────────────────────────────────────────────

    /// Run one tick of the state machine.
    pub fn update<A: Actuator>(&mut self, ctx: &mut TickContext<'_, A>) {
        if ctx.emergency.is_engaged() && self.state() != MachineState::Emergency {
            self.enter_emergency(ctx);
            ctx.sink
                .send(Response::error_with(ErrorCode::Emergency, "Emergency input engaged"));
            return;
        }

        let force = ctx.sensor.read_force();

        match self.state() {
            MachineState::Homing => self.update_homing(ctx),
            MachineState::Running => self.update_running(force, ctx),
            MachineState::Ready => {
                if self.limit_violation(ctx) {
                    ctx.motion.stop_immediate();
                    self.jog_active = false;
                    self.transition(TestEvent::SafetyFault);
                    ctx.sink.send(Response::error_with(
                        ErrorCode::LimitReached,
                        "Limit switch triggered",
                    ));
                    return;
                }
                self.settle_jog(ctx);
            }
            MachineState::Emergency => {}
            MachineState::Idle | MachineState::Paused | MachineState::Stopped | MachineState::Error => {
                self.settle_jog(ctx)
            }
        }
    }

    fn update_homing<A: Actuator>(&mut self, ctx: &mut TickContext<'_, A>) {
        match ctx.motion.tick_homing(ctx.now_us) {
            HomingTickResult::InProgress => {}
            HomingTickResult::Success => {
                self.transition(TestEvent::HomingSucceeded);
                ctx.sink.send(Response::ok_with("Homing complete"));
            }
            HomingTickResult::Failed { reason } => self.fail_homing(reason, ctx),
            HomingTickResult::Inactive => {
                warn!("HOMING state without an active sequence");
                self.fail_homing(HomingFailReason::Aborted, ctx);
            }
        }
    }

    fn fail_homing<A: Actuator>(&mut self, reason: HomingFailReason, ctx: &mut TickContext<'_, A>) {
        self.transition(TestEvent::HomingFailed);
        ctx.sink
            .send(Response::error_with(ErrorCode::NotHomed, reason.message()));
    }

    fn update_running<A: Actuator>(&mut self, force: f64, ctx: &mut TickContext<'_, A>) {
        if self.limit_violation(ctx) {
            ctx.motion.stop_immediate();
            self.finalize(ctx.now_us);
            self.transition(TestEvent::SafetyFault);
            ctx.sink
                .send(Response::error_with(ErrorCode::LimitReached, "Limit switch triggered"));
            return;
        }

        if force >= self.params.max_force_n || ctx.sensor.is_overload() {
            warn!("Force limit exceeded: {force:.2} N");
            self.end_test(ctx);
            ctx.sink
                .send(Response::error_with(ErrorCode::Overload, "Force limit exceeded"));
            return;
        }

        let extension = ctx.motion.position_mm() - self.start_position_mm;
        if extension >= self.params.max_extension_mm {
            self.end_test(ctx);
            ctx.sink.send(Response::ok_with("Extension limit reached"));
            return;
        }

        if force > self.result.peak_force_n {
            self.result.peak_force_n = force;
            self.result.extension_at_peak_mm = extension;
        }

        if self.params.stop_on_break
            && detect_break(force, self.result.peak_force_n, self.params.break_threshold)
        {
            self.result.break_force_n = force;
            self.result.break_extension_mm = extension;
            self.result.specimen_broke = true;
            info!("Specimen break at {extension:.3} mm ({force:.2} N)");
            self.end_test(ctx);
            ctx.sink.send(Response::ok_with("Specimen break detected"));
            return;
        }

        if !ctx.motion.is_moving() {
            self.result.completed = true;
            self.end_test(ctx);
            ctx.sink.send(Response::ok_with("Test completed"));
            return;
        }

        let elapsed_ms = self.elapsed_ms(ctx.now_us);
        let trigger = self
            .sampler
            .evaluate(elapsed_ms, force, self.params.sample_interval_ms);
        if trigger.should_record() {
            self.result.data_points = self.result.data_points.saturating_add(1);
            trace!("Sample {:?} at {elapsed_ms} ms", trigger);
            if self.streaming {
                ctx.sink.send(Response::Data(DataPoint {
                    elapsed_ms,
                    force_n: force,
                    extension_mm: extension,
                    stress: 0.0,
                    strain: 0.0,
                }));
            }
        }
    }

    // ── Helpers ──

    fn enter_emergency<A: Actuator>(&mut self, ctx: &mut TickContext<'_, A>) {
        ctx.motion.abort_homing();
        ctx.motion.stop_immediate();
        ctx.motion.disable();
        if self.state().is_test_active() {
            self.finalize(ctx.now_us);
        }
        self.jog_active = false;
        self.streaming = false;
        warn!("EMERGENCY STOP from {}", self.state());
        self.transition(TestEvent::EmergencyStop);
    }

    /// Stop motion, seal the result and enter STOPPED.
    fn end_test<A: Actuator>(&mut self, ctx: &mut TickContext<'_, A>) {
        ctx.motion.stop_immediate();
        self.finalize(ctx.now_us);
        self.transition(TestEvent::TestEnded);
    }

    fn finalize(&mut self, now_us: u64) {
        self.streaming = false;
        self.result.duration_ms = self.elapsed_ms(now_us);
        info!(
            "Test finalized: peak {:.2} N at {:.3} mm, {} points, {} ms{}",
            self.result.peak_force_n,
            self.result.extension_at_peak_mm,
            self.result.data_points,
            self.result.duration_ms,
            if self.result.specimen_broke { ", specimen broke" } else { "" }
        );
    }

    fn limit_violation<A: Actuator>(&self, ctx: &TickContext<'_, A>) -> bool {
        ctx.motion.limit_inputs().blocks(ctx.motion.direction())
    }

    fn settle_jog<A: Actuator>(&mut self, ctx: &TickContext<'_, A>) {
        if self.jog_active && !ctx.motion.is_moving() {
            self.jog_active = false;
            debug!("Jog finished at {:.3} mm", ctx.motion.position_mm());
        }
    }

    #[inline]
    fn elapsed_ms(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.test_start_us) / 1000
    }

    fn transition(&mut self, event: TestEvent) -> TransitionResult {
        let from = self.machine.state();
        let result = self.machine.handle_event(event);
        match result {
            TransitionResult::Ok(to) if to != from => info!("State {from} -> {to} ({event:?})"),
            TransitionResult::Ok(_) => {}
            TransitionResult::Rejected(reason) => debug!("{event:?} rejected in {from}: {reason}"),
        }
        result
    }
}

/// Commands whose parameter is interpreted.
fn takes_parameter(command: Command) -> bool {
    command.requires_parameter() || matches!(command, Command::MoveUp | Command::MoveDown)
}

fn invalid(e: RangeError) -> Response {
    debug!("{e}");
    Response::error(ErrorCode::InvalidParameter)
}
