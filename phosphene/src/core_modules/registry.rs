// THEORY:
// The registry is the single place that knows which implants the simulator
// supports and which model grid each one is rendered on. The set is closed:
// `ImplantKind` enumerates it, and any other identifier is rejected before a
// model is ever built.
//
// The spatial ranges and steps are calibration values. AlphaAMS and PRIMA have
// small, dense arrays and get a fine 0.1 dva grid; Argus II spans a wider field
// with coarse electrodes and is sampled at 1 dva.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// The closed set of simulated implants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImplantKind {
    #[serde(rename = "AlphaAMS")]
    AlphaAms,
    #[serde(rename = "ArgusII")]
    ArgusII,
    #[serde(rename = "PRIMA")]
    Prima,
}

impl ImplantKind {
    /// Every implant, in the order the orchestrator runs them.
    pub const ALL: [ImplantKind; 3] = [ImplantKind::AlphaAms, ImplantKind::ArgusII, ImplantKind::Prima];

    pub fn identifier(self) -> &'static str {
        match self {
            ImplantKind::AlphaAms => "AlphaAMS",
            ImplantKind::ArgusII => "ArgusII",
            ImplantKind::Prima => "PRIMA",
        }
    }
}

impl fmt::Display for ImplantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for ImplantKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImplantKind::ALL
            .into_iter()
            .find(|kind| kind.identifier() == s)
            .ok_or_else(|| SimulationError::UnknownImplant(s.to_string()))
    }
}

/// Visual-field sampling grid for a Scoreboard model, in degrees of visual angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub xy_step: f64,
}

/// An implant paired with the grid its percept is rendered on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImplantConfiguration {
    pub kind: ImplantKind,
    pub model: ModelParams,
}

/// Immutable lookup table from identifier to configuration.
#[derive(Debug, Clone)]
pub struct ConfigurationRegistry {
    entries: [ImplantConfiguration; 3],
}

impl Default for ConfigurationRegistry {
    fn default() -> Self {
        let fine = |kind| ImplantConfiguration {
            kind,
            model: ModelParams { x_range: (-7.0, 7.0), y_range: (-7.0, 7.0), xy_step: 0.1 },
        };
        Self {
            entries: [
                fine(ImplantKind::AlphaAms),
                ImplantConfiguration {
                    kind: ImplantKind::ArgusII,
                    model: ModelParams { x_range: (-10.0, 10.0), y_range: (-10.0, 10.0), xy_step: 1.0 },
                },
                fine(ImplantKind::Prima),
            ],
        }
    }
}

impl ConfigurationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the configuration for a textual identifier.
    pub fn resolve(&self, identifier: &str) -> Result<&ImplantConfiguration, SimulationError> {
        let kind = identifier.parse::<ImplantKind>()?;
        Ok(self.get(kind))
    }

    pub fn get(&self, kind: ImplantKind) -> &ImplantConfiguration {
        // `entries` holds one configuration per variant.
        &self.entries[kind as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImplantConfiguration> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_documented_parameters() {
        let registry = ConfigurationRegistry::new();

        let alpha = registry.resolve("AlphaAMS").unwrap();
        assert_eq!(alpha.kind, ImplantKind::AlphaAms);
        assert_eq!(alpha.model, ModelParams { x_range: (-7.0, 7.0), y_range: (-7.0, 7.0), xy_step: 0.1 });

        let argus = registry.resolve("ArgusII").unwrap();
        assert_eq!(argus.kind, ImplantKind::ArgusII);
        assert_eq!(argus.model, ModelParams { x_range: (-10.0, 10.0), y_range: (-10.0, 10.0), xy_step: 1.0 });

        let prima = registry.resolve("PRIMA").unwrap();
        assert_eq!(prima.kind, ImplantKind::Prima);
        assert_eq!(prima.model, ModelParams { x_range: (-7.0, 7.0), y_range: (-7.0, 7.0), xy_step: 0.1 });
    }

    #[test]
    fn rejects_unknown_identifiers() {
        let registry = ConfigurationRegistry::new();
        for bad in ["Unknown", "prima", "Argus II", ""] {
            match registry.resolve(bad) {
                Err(SimulationError::UnknownImplant(id)) => assert_eq!(id, bad),
                other => panic!("expected UnknownImplant for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn entries_line_up_with_kinds() {
        let registry = ConfigurationRegistry::new();
        for kind in ImplantKind::ALL {
            assert_eq!(registry.get(kind).kind, kind);
            assert_eq!(kind.to_string().parse::<ImplantKind>().unwrap(), kind);
        }
        assert_eq!(registry.iter().count(), 3);
    }
}
