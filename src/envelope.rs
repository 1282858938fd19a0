//! Envelope Module
//!
//! Six-stage DAHDSR volume envelope: DELAY, ATTACK, HOLD, DECAY,
//! SUSTAIN, RELEASE, FINISHED. The envelope produces one scalar per
//! sample by linear interpolation within the current stage.
//!
//! # Snapshot rendering
//!
//! The voice renderer snapshots the envelope state at the top of a
//! collection batch, advances the copy sample by sample, and writes it
//! back at the end. `release()` may be called from the control side in
//! between; the `force_release` latch guarantees that a write-back can
//! never pull the envelope back out of the RELEASE stage once a release
//! has been requested.

/// Envelope stages, in progression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnvelopeStage {
    /// Holding at zero before the attack starts
    Delay,

    /// Rising linearly from zero to peak
    Attack,

    /// Holding at peak
    Hold,

    /// Falling linearly from peak to the sustain level
    Decay,

    /// Holding at the sustain level until release
    Sustain,

    /// Falling from the level at release time to zero
    Release,

    /// Done; the voice can be reclaimed
    Finished,
}

/// Stage durations and levels, in seconds and linear gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub delay: f32,
    pub attack: f32,
    pub hold: f32,
    pub decay: f32,

    /// Sustain level as linear gain in [0, 1]
    pub sustain_level: f32,

    pub release: f32,
}

/// Sentinel duration for stages with no time-out (SUSTAIN, FINISHED).
const UNTIMED: f32 = -1.0;

/// The mutable envelope state, snapshot-able by the render loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeState {
    pub stage: EnvelopeStage,

    /// Elapsed time in the current stage, seconds
    pub position: f32,

    pub start_val: f32,
    pub current_val: f32,
    pub target_val: f32,

    /// Duration of the current stage; `UNTIMED` for SUSTAIN/FINISHED
    pub stage_duration: f32,
}

impl EnvelopeState {
    fn initial(params: &EnvelopeParams) -> Self {
        Self {
            stage: EnvelopeStage::Delay,
            position: 0.0,
            start_val: 0.0,
            current_val: 0.0,
            target_val: 0.0,
            stage_duration: params.delay,
        }
    }

    /// Advance by `dt` seconds (one output sample) and return the new
    /// envelope value. SUSTAIN and FINISHED do not advance.
    pub fn advance(&mut self, params: &EnvelopeParams, dt: f32) -> f32 {
        if matches!(self.stage, EnvelopeStage::Sustain | EnvelopeStage::Finished) {
            return self.current_val;
        }

        self.position += dt;
        if self.position >= self.stage_duration {
            self.next_stage(params);
        } else {
            self.current_val = self.start_val
                + (self.target_val - self.start_val) * (self.position / self.stage_duration);
        }
        self.current_val
    }

    fn next_stage(&mut self, params: &EnvelopeParams) {
        self.position = 0.0;
        match self.stage {
            EnvelopeStage::Delay => {
                self.stage = EnvelopeStage::Attack;
                self.start_val = 0.0;
                self.current_val = 0.0;
                self.target_val = 1.0;
                self.stage_duration = params.attack;
            }
            EnvelopeStage::Attack => {
                self.stage = EnvelopeStage::Hold;
                self.start_val = 1.0;
                self.current_val = 1.0;
                self.target_val = 1.0;
                self.stage_duration = params.hold;
            }
            EnvelopeStage::Hold => {
                self.stage = EnvelopeStage::Decay;
                self.start_val = 1.0;
                self.current_val = 1.0;
                self.target_val = params.sustain_level;
                self.stage_duration = params.decay;
            }
            EnvelopeStage::Decay => {
                self.stage = EnvelopeStage::Sustain;
                self.start_val = params.sustain_level;
                self.current_val = params.sustain_level;
                self.target_val = params.sustain_level;
                self.stage_duration = UNTIMED;
            }
            EnvelopeStage::Release => {
                self.stage = EnvelopeStage::Finished;
                self.start_val = 0.0;
                self.current_val = 0.0;
                self.target_val = 0.0;
                self.stage_duration = UNTIMED;
            }
            // SUSTAIN only leaves via release(); FINISHED is terminal.
            EnvelopeStage::Sustain | EnvelopeStage::Finished => {}
        }
    }

    fn enter_release(&mut self, params: &EnvelopeParams) {
        self.stage = EnvelopeStage::Release;
        self.position = 0.0;
        self.start_val = self.current_val;
        self.target_val = 0.0;
        self.stage_duration = params.release;
    }
}

/// The DAHDSR envelope.
#[derive(Debug, Clone)]
pub struct Envelope {
    params: EnvelopeParams,
    state: EnvelopeState,

    /// Set by `release()`; consulted and cleared on `write_back` so a
    /// rendering batch that straddled the release cannot clobber it.
    force_release: bool,
}

impl Envelope {
    pub fn new(params: EnvelopeParams) -> Self {
        let state = EnvelopeState::initial(&params);
        Self {
            params,
            state,
            force_release: false,
        }
    }

    pub fn params(&self) -> &EnvelopeParams {
        &self.params
    }

    /// Copy of the state for a rendering batch. Clears the release
    /// latch: a release requested before this point is already part of
    /// the snapshot, so only a release arriving while the batch is in
    /// flight needs to be re-applied at write-back.
    pub fn snapshot(&mut self) -> EnvelopeState {
        self.force_release = false;
        self.state
    }

    /// Store a rendering batch's final state. If a release was forced
    /// while the batch ran, the advanced position and values are kept
    /// but the envelope re-enters RELEASE from the written-back value.
    pub fn write_back(&mut self, state: EnvelopeState) {
        self.state = state;
        if self.force_release {
            self.force_release = false;
            if self.state.stage != EnvelopeStage::Finished {
                self.state.enter_release(&self.params);
            }
        }
    }

    /// Advance the live state directly (outside a snapshot batch).
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.state.advance(&self.params, dt)
    }

    /// Jump to the RELEASE stage from any non-finished stage, starting
    /// the ramp at the current value. Idempotent: repeat calls while
    /// already releasing (or finished) change nothing.
    pub fn release(&mut self) {
        if matches!(
            self.state.stage,
            EnvelopeStage::Release | EnvelopeStage::Finished
        ) {
            return;
        }
        self.state.enter_release(&self.params);
        self.force_release = true;
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.state.stage
    }

    pub fn value(&self) -> f32 {
        self.state.current_val
    }

    pub fn finished(&self) -> bool {
        self.state.stage == EnvelopeStage::Finished
    }
}
