// THEORY:
// The Scoreboard model treats every electrode as an independent point source.
// Each active electrode paints a Gaussian "phosphene" on the retina, and the
// percept at a visual-field location is the sum of all phosphenes at the
// corresponding retinal location:
//
//     brightness(p) = Σ amp_e · exp(-|ret(p) - e|² / (2ρ²))
//
// There is no axonal spread and no temporal dynamics, so a single frame fully
// describes the percept.
//
// Key architectural principles:
// 1.  **Build once, predict many**: `build` samples the visual-field grid and
//     maps every sample to retinal microns. `predict_percept` only sums Gaussians.
// 2.  **Bounded support**: contributions beyond `CUTOFF_SIGMAS` standard
//     deviations are skipped; they are below 8-bit resolution anyway.

use crate::core_modules::implant::Implant;
use crate::core_modules::percept::Percept;
use crate::core_modules::registry::ModelParams;
use crate::core_modules::retinotopy::dva_to_retina;
use crate::error::SimulationError;

/// Default phosphene spread in microns.
pub const DEFAULT_RHO_UM: f64 = 100.0;
const CUTOFF_SIGMAS: f64 = 5.0;

#[derive(Debug, Clone)]
struct SpatialGrid {
    width: usize,
    height: usize,
    /// Retinal positions in microns, row-major, row 0 at the largest y.
    retina: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct ScoreboardModel {
    params: ModelParams,
    rho: f64,
    grid: Option<SpatialGrid>,
}

impl ScoreboardModel {
    pub fn new(params: ModelParams) -> Self {
        Self { params, rho: DEFAULT_RHO_UM, grid: None }
    }

    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self.grid = None;
        self
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn is_built(&self) -> bool {
        self.grid.is_some()
    }

    /// `(height, width)` of the percept this model produces, once built.
    pub fn grid_shape(&self) -> Option<(usize, usize)> {
        self.grid.as_ref().map(|g| (g.height, g.width))
    }

    /// Samples the visual field and caches each sample's retinal position.
    pub fn build(&mut self) -> Result<&mut Self, SimulationError> {
        let ModelParams { x_range, y_range, xy_step } = self.params;
        if !(self.rho.is_finite() && self.rho > 0.0) {
            return Err(SimulationError::model(format!("rho must be positive, got {}", self.rho)));
        }
        let xs = axis(x_range, xy_step)?;
        let ys = axis(y_range, xy_step)?;

        let mut retina = Vec::with_capacity(xs.len() * ys.len());
        for &y in ys.iter().rev() {
            for &x in &xs {
                retina.push(dva_to_retina(x, y));
            }
        }

        self.grid = Some(SpatialGrid { width: xs.len(), height: ys.len(), retina });
        Ok(self)
    }

    /// Sums every electrode's phosphene over the grid for the implant's current stimulus.
    pub fn predict_percept(&self, implant: &Implant) -> Result<Percept, SimulationError> {
        let grid = self
            .grid
            .as_ref()
            .ok_or_else(|| SimulationError::model("model must be built before predicting a percept"))?;
        let stim = implant
            .stim()
            .ok_or_else(|| SimulationError::model(format!("no stimulus assigned to {}", implant.kind())))?;

        let active: Vec<(f64, f64, f64)> = implant
            .electrodes()
            .iter()
            .zip(stim.values())
            .filter(|(_, amp)| **amp > 0.0)
            .map(|(e, amp)| (e.x, e.y, f64::from(*amp)))
            .collect();

        let two_rho_sq = 2.0 * self.rho * self.rho;
        let cutoff = CUTOFF_SIGMAS * self.rho;
        let cutoff_sq = cutoff * cutoff;

        let data = grid
            .retina
            .iter()
            .map(|&(px, py)| {
                let mut brightness = 0.0;
                for &(ex, ey, amp) in &active {
                    let dx = px - ex;
                    if dx.abs() > cutoff {
                        continue;
                    }
                    let dy = py - ey;
                    let d_sq = dx * dx + dy * dy;
                    if d_sq <= cutoff_sq {
                        brightness += amp * (-d_sq / two_rho_sq).exp();
                    }
                }
                brightness as f32
            })
            .collect();

        Ok(Percept::new(grid.width, grid.height, data))
    }
}

/// `start, start + step, ...` up to `end` inclusive, with half-step tolerance.
fn axis((start, end): (f64, f64), step: f64) -> Result<Vec<f64>, SimulationError> {
    if !(step.is_finite() && step > 0.0) {
        return Err(SimulationError::model(format!("grid step must be positive, got {step}")));
    }
    if !(start.is_finite() && end.is_finite()) || end < start {
        return Err(SimulationError::model(format!("invalid grid range ({start}, {end})")));
    }
    let n = ((end - start) / step + 0.5).floor() as usize + 1;
    Ok((0..n).map(|i| start + i as f64 * step).collect())
}
