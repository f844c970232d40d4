//! Implementations for the RcCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::time::Instant;

// Internal
use super::{
    InitError, LineParser, Params, ProcError, RcFrame, OVERRIDE_CHANNEL, STEER_CHANNEL,
    THROTTLE_CHANNEL,
};
use util::{maths::clamp, module::State, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// RC override control module state.
///
/// All of this state is owned exclusively by the loop's own thread: it is
/// initialised at loop start, mutated only through [`State::proc`], and
/// discarded when the loop terminates.
#[derive(Default)]
pub struct RcCtrl {
    params: Params,
    parser: Option<LineParser>,

    report: StatusReport,

    /// Time of the last accepted sample, used for debouncing.
    last_sample_time: Option<Instant>,

    /// Time of the last sample that asserted override. `None` means the
    /// override watchdog has already expired.
    last_override_time: Option<Instant>,

    override_active: bool,
    stop_latched: bool,
}

/// Input data to RC override control, one entry per channel read.
pub struct InputData {
    /// The line read from the telemetry stream, or `None` if the read timed
    /// out with no data.
    pub line: Option<String>,

    /// The time at which the line was read.
    pub now: Instant,

    /// The chassis minimum turn radius.
    ///
    /// Units: meters
    pub min_radius_m: f64,

    /// The chassis maximum finite turn radius.
    ///
    /// Units: meters
    pub max_radius_m: f64,
}

/// Output demands from RC override control that the caller must apply to the
/// chassis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OutputData {
    /// Motion demand to issue, or `None` if this sample requires no command
    /// (idle mode, debounced line, noise, or a stop already latched).
    pub demand: Option<MotionDemand>,

    /// Whether the RC transmitter currently holds manual override. The
    /// caller publishes this on the chassis for other motion sources to
    /// observe.
    pub rc_active: bool,
}

/// A single motion demand in the radius-of-turn model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionDemand {
    /// Throttle demand as a percentage of full speed, negative backwards.
    pub throttle_pct: f64,

    /// Turn radius. Positive radii turn right, negative turn left, and an
    /// infinite radius of either sign is straight travel.
    ///
    /// Units: meters
    pub radius_m: f64,
}

/// Status report for RcCtrl processing.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusReport {
    /// A line was parsed and accepted this cycle.
    pub line_accepted: bool,

    /// A line was discarded as noise this cycle.
    pub line_rejected: bool,

    /// A valid line arrived inside the debounce window and was discarded.
    pub debounced: bool,

    /// Override mode after this cycle.
    pub override_active: bool,

    /// Whether the stop latch is currently set.
    pub stop_latched: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for RcCtrl {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ProcError;

    /// Initialise the RcCtrl module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let params = params::load(init_data).map_err(InitError::ParamLoadError)?;

        *self = Self::with_params(params)?;

        Ok(())
    }

    /// Process one channel read.
    ///
    /// Mode and stop-latch transitions are pure state decisions and never
    /// error; the only failure here is use before initialisation.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        let mut demand = None;

        if let Some(ref line) = input_data.line {
            let parser = self.parser.as_ref().ok_or(ProcError::NotInitialised)?;

            match parser.parse(line) {
                Some(frame) => demand = self.process_frame(&frame, input_data),
                // Noise on the link, drop it and carry on
                None => self.report.line_rejected = true,
            }
        }

        // Override watchdog, independent of line processing: a receiver that
        // stops producing valid samples must not hold override on, even if
        // its last word was "override enabled".
        if self.override_expired(input_data.now) {
            self.override_active = false;
        }

        self.report.override_active = self.override_active;
        self.report.stop_latched = self.stop_latched;

        Ok((
            OutputData {
                demand,
                rc_active: self.override_active,
            },
            self.report,
        ))
    }
}

impl RcCtrl {
    /// Build an initialised RcCtrl directly from a parameter set, bypassing
    /// the parameter file load.
    pub fn with_params(params: Params) -> Result<Self, InitError> {
        Ok(Self {
            params,
            parser: Some(LineParser::new().map_err(InitError::LinePatternError)?),
            ..Self::default()
        })
    }

    /// Process one accepted telemetry frame, returning the motion demand it
    /// produces, if any.
    fn process_frame(&mut self, frame: &RcFrame, input: &InputData) -> Option<MotionDemand> {
        // Debounce: discard samples arriving faster than the chassis can
        // react. Debounced lines refresh nothing, including the override
        // watchdog.
        if let Some(last) = self.last_sample_time {
            if input.now.duration_since(last).as_secs_f64() < self.params.debounce_s {
                self.report.debounced = true;
                return None;
            }
        }

        self.last_sample_time = Some(input.now);
        self.report.line_accepted = true;

        // Neutral-centre the channels of interest
        let steer_pct = (frame.channel(STEER_CHANNEL) - self.params.centre_pulse_us)
            / self.params.stick_scale_us_per_pct;
        let throttle_pct = (frame.channel(THROTTLE_CHANNEL) - self.params.centre_pulse_us)
            / self.params.stick_scale_us_per_pct;
        let override_signal = frame.channel(OVERRIDE_CHANNEL) - self.params.centre_pulse_us;

        // Mode decision: the override switch below centre releases override
        // and expires the watchdog immediately, at or above centre asserts
        // it and refreshes the watchdog.
        if override_signal < 0.0 {
            self.override_active = false;
            self.last_override_time = None;
            return None;
        }

        self.override_active = true;
        self.last_override_time = Some(input.now);

        let steer_pct = clamp(&steer_pct, &-100.0, &100.0);
        let mut throttle_pct = clamp(&throttle_pct, &-100.0, &100.0);

        let radius_m = self.steer_to_radius(steer_pct, input);

        if throttle_pct.abs() <= self.params.throttle_deadzone_pct {
            throttle_pct = 0.0;
        }

        // Stop latching: moving demands always go out and re-arm the latch.
        // A stationary demand (zero throttle, straight ahead) goes out once
        // per transition into the stationary state, so the chassis sees a
        // single stop rather than one per sample.
        if throttle_pct != 0.0 || radius_m.is_finite() {
            self.stop_latched = false;
            Some(MotionDemand {
                throttle_pct,
                radius_m,
            })
        } else if !self.stop_latched {
            self.stop_latched = true;
            Some(MotionDemand {
                throttle_pct,
                radius_m,
            })
        } else {
            None
        }
    }

    /// Map a steering deflection onto a turn radius.
    ///
    /// Deflections inside the dead-zone are straight travel (infinite
    /// radius). Outside it the radius runs linearly from the chassis maximum
    /// (just past the dead-zone) down to the minimum (full deflection), with
    /// the mirrored form for left turns. The linear branch boundary sits
    /// inside the dead-zone, so both branches only ever see deflections
    /// beyond it.
    fn steer_to_radius(&self, steer_pct: f64, input: &InputData) -> f64 {
        if steer_pct.abs() <= self.params.steer_deadzone_pct {
            f64::INFINITY
        } else if steer_pct > 1.0 {
            input.min_radius_m
                + (input.max_radius_m - input.min_radius_m) * (100.0 - steer_pct) / 100.0
        } else {
            -input.min_radius_m
                - (input.max_radius_m - input.min_radius_m) * (100.0 + steer_pct) / 100.0
        }
    }

    /// Whether the override watchdog has expired at the given time.
    fn override_expired(&self, now: Instant) -> bool {
        match self.last_override_time {
            Some(t) => now.duration_since(t).as_secs_f64() > self.params.override_timeout_s,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
