// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — Stages
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Beamline elements and their composition.
//!
//! A [`Stage`] transforms a [`ParticleEnsemble`]; [`Stage::track`] adds the
//! bookkeeping every element shares (advance the beam location by the
//! element length, bump the stage counter). A [`Beamline`] chains stages.

use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{ParticleEnsemble, Plane};
use tracing::{debug, info};

/// Tracking options passed down a beamline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackContext {
    /// Nesting level of the current element.
    pub depth: usize,
    /// Report each element at info level instead of debug.
    pub verbose: bool,
}

impl TrackContext {
    pub fn verbose() -> Self {
        TrackContext {
            depth: 0,
            verbose: true,
        }
    }

    pub fn nested(&self) -> Self {
        TrackContext {
            depth: self.depth + 1,
            ..*self
        }
    }
}

pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Element length [m].
    fn length(&self) -> BeamResult<f64>;

    /// Apply the element's map to the beam.
    fn process(&self, beam: ParticleEnsemble, ctx: &TrackContext) -> BeamResult<ParticleEnsemble>;

    /// [`Stage::process`] followed by the location/stage bookkeeping.
    fn track(&self, beam: ParticleEnsemble, ctx: &TrackContext) -> BeamResult<ParticleEnsemble> {
        let mut beam = self.process(beam, ctx)?;
        beam.location += self.length()?;
        beam.stage_number += 1;
        if ctx.verbose {
            info!(
                stage = self.name(),
                depth = ctx.depth,
                number = beam.stage_number,
                location_m = beam.location,
                particles = beam.len(),
                "tracked stage"
            );
        } else {
            debug!(
                stage = self.name(),
                depth = ctx.depth,
                number = beam.stage_number,
                location_m = beam.location,
                "tracked stage"
            );
        }
        Ok(beam)
    }
}

/// Field-free drift: `u += L u'` in both planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drift {
    length: f64,
}

impl Drift {
    pub fn new(length: f64) -> BeamResult<Self> {
        if !length.is_finite() || length < 0.0 {
            return Err(BeamError::InvalidParameter(format!(
                "drift length must be finite and >= 0, got {length}"
            )));
        }
        Ok(Drift { length })
    }
}

impl Stage for Drift {
    fn name(&self) -> &str {
        "drift"
    }

    fn length(&self) -> BeamResult<f64> {
        Ok(self.length)
    }

    fn process(
        &self,
        mut beam: ParticleEnsemble,
        _ctx: &TrackContext,
    ) -> BeamResult<ParticleEnsemble> {
        for plane in Plane::BOTH {
            let (mut u, up) = beam.plane_mut(plane);
            u.scaled_add(self.length, &up);
        }
        Ok(beam)
    }
}

/// Ordered chain of stages, itself usable as a stage.
#[derive(Default)]
pub struct Beamline {
    name: String,
    stages: Vec<Box<dyn Stage>>,
}

impl Beamline {
    pub fn new(name: impl Into<String>) -> Self {
        Beamline {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Stage for Beamline {
    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> BeamResult<f64> {
        self.stages.iter().map(|s| s.length()).sum()
    }

    fn process(&self, beam: ParticleEnsemble, ctx: &TrackContext) -> BeamResult<ParticleEnsemble> {
        let inner = ctx.nested();
        self.stages
            .iter()
            .try_fold(beam, |beam, stage| stage.track(beam, &inner))
    }

    /// Bookkeeping already happened per element.
    fn track(&self, beam: ParticleEnsemble, ctx: &TrackContext) -> BeamResult<ParticleEnsemble> {
        self.process(beam, ctx)
    }
}
