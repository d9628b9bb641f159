// THEORY:
// An `Implant` is a fixed electrode layout on the retinal surface plus the
// stimulus currently assigned to it. Electrodes are stored row-major, so a
// stimulus image resized to `shape()` maps pixel-for-electrode with no lookup.
//
// Coordinates are in microns on the retina, centred on the fovea, with +y up.
// Row 0 is the top row of the array so that the top of the input image drives
// the top of the visual field.

use crate::core_modules::registry::ImplantKind;
use crate::core_modules::stimulus::Stimulus;
use crate::error::SimulationError;

/// A single stimulating site.
#[derive(Debug, Clone, PartialEq)]
pub struct Electrode {
    /// Conventional label, e.g. "A1" for Argus II.
    pub name: String,
    /// Horizontal retinal position in microns.
    pub x: f64,
    /// Vertical retinal position in microns.
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridLayout {
    Rect,
    /// Odd rows are shifted right by half a spacing; rows sit `spacing * sqrt(3)/2` apart.
    Hex,
}

#[derive(Debug, Clone)]
pub struct Implant {
    kind: ImplantKind,
    rows: usize,
    cols: usize,
    electrodes: Vec<Electrode>,
    stim: Option<Stimulus>,
}

impl Implant {
    pub fn new(kind: ImplantKind) -> Self {
        match kind {
            ImplantKind::ArgusII => Self::grid(kind, 6, 10, 575.0, GridLayout::Rect),
            ImplantKind::AlphaAms => Self::grid(kind, 40, 40, 70.0, GridLayout::Rect),
            ImplantKind::Prima => Self::grid(kind, 18, 21, 100.0, GridLayout::Hex),
        }
    }

    fn grid(kind: ImplantKind, rows: usize, cols: usize, spacing: f64, layout: GridLayout) -> Self {
        let row_pitch = match layout {
            GridLayout::Rect => spacing,
            GridLayout::Hex => spacing * 3f64.sqrt() / 2.0,
        };
        let hex_shift = if layout == GridLayout::Hex { spacing / 4.0 } else { 0.0 };

        let x0 = -(cols as f64 - 1.0) * spacing / 2.0;
        let y0 = (rows as f64 - 1.0) * row_pitch / 2.0;

        let mut electrodes = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            // Centre the staggered rows around x = 0.
            let shift = match layout {
                GridLayout::Hex if r % 2 == 1 => hex_shift,
                GridLayout::Hex => -hex_shift,
                GridLayout::Rect => 0.0,
            };
            for c in 0..cols {
                electrodes.push(Electrode {
                    name: electrode_name(r, c),
                    x: x0 + c as f64 * spacing + shift,
                    y: y0 - r as f64 * row_pitch,
                });
            }
        }

        Self { kind, rows, cols, electrodes, stim: None }
    }

    pub fn kind(&self) -> ImplantKind {
        self.kind
    }

    /// `(rows, cols)` of the electrode array; stimulus images are resized to this.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn electrodes(&self) -> &[Electrode] {
        &self.electrodes
    }

    pub fn stim(&self) -> Option<&Stimulus> {
        self.stim.as_ref()
    }

    /// Assigns one amplitude per electrode. The stimulus must already match `shape()`.
    pub fn set_stim(&mut self, stim: Stimulus) -> Result<(), SimulationError> {
        if stim.shape() != self.shape() {
            return Err(SimulationError::model(format!(
                "stimulus shape {:?} does not match {} electrode array {:?}",
                stim.shape(),
                self.kind,
                self.shape()
            )));
        }
        self.stim = Some(stim);
        Ok(())
    }
}

/// Row letters then 1-based column, spreadsheet style past "Z" ("AA", "AB", ...).
fn electrode_name(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = row + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), col + 1)
}
