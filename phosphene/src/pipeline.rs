// THEORY:
// The `pipeline` module is the top-level API of the simulator. It turns an
// image on disk into one base64 PNG per configured implant.
//
// Two layers:
// 1.  **SimulationRunner**: one image, one implant. Loads the stimulus, builds
//     the implant and its Scoreboard model, predicts the percept, renders it
//     to a scratch PNG and returns that PNG as base64. The scratch PNG never
//     outlives the call.
// 2.  **Orchestrator**: one image, every implant, in a fixed order. It is
//     all-or-nothing: the first failure aborts the whole run and no partial
//     result escapes.
//
// Both layers are synchronous and CPU bound. Async callers should run them on
// a blocking thread.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::{debug, info};

use crate::core_modules::implant::Implant;
use crate::core_modules::registry::{ConfigurationRegistry, ImplantKind};
use crate::core_modules::scoreboard::ScoreboardModel;
use crate::core_modules::stimulus::Stimulus;
use crate::core_modules::temp_file::TempFileManager;
use crate::error::SimulationError;

const RENDER_SUFFIX: &str = ".png";

/// Base64 PNG per implant. Serializes as `{"AlphaAMS": .., "ArgusII": .., "PRIMA": ..}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SimulationResult(BTreeMap<ImplantKind, String>);

impl SimulationResult {
    pub fn get(&self, kind: ImplantKind) -> Option<&str> {
        self.0.get(&kind).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImplantKind, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Runs a single implant configuration against an image.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    registry: Arc<ConfigurationRegistry>,
    temp_files: TempFileManager,
}

impl SimulationRunner {
    pub fn new(registry: Arc<ConfigurationRegistry>, temp_files: TempFileManager) -> Self {
        Self { registry, temp_files }
    }

    pub fn registry(&self) -> &ConfigurationRegistry {
        &self.registry
    }

    pub fn temp_files(&self) -> &TempFileManager {
        &self.temp_files
    }

    /// Simulates `identifier` on the image at `image_path` and returns a base64 PNG.
    pub fn run(&self, image_path: &Path, identifier: &str) -> Result<String, SimulationError> {
        // Stage 1: Stimulus. Grayscale, then invert so dark content drives the electrodes.
        let stim = Stimulus::open(image_path)?.invert();

        // Stage 2: Configuration
        let config = self.registry.resolve(identifier)?;

        // Stage 3: Implant and model
        let mut implant = Implant::new(config.kind);
        let mut model = ScoreboardModel::new(config.model);
        model.build()?;

        // Stage 4: Prediction
        implant.set_stim(stim.resize(implant.shape())?)?;
        let percept = model.predict_percept(&implant)?;
        debug!(implant = %config.kind, peak = percept.max(), "predicted percept");

        // Stage 5: Render. `rendered` deletes the PNG on every exit from here on;
        // once the bytes are read, a failed delete no longer fails the run.
        let rendered = self.temp_files.reserve(RENDER_SUFFIX)?;
        percept.save(rendered.path())?;
        let bytes = fs::read(rendered.path())?;
        rendered.discard();

        Ok(STANDARD.encode(bytes))
    }
}

/// Runs every configured implant, in order, against the same image.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    runner: SimulationRunner,
    order: Vec<ImplantKind>,
}

impl Orchestrator {
    pub fn new(runner: SimulationRunner) -> Self {
        Self { runner, order: ImplantKind::ALL.to_vec() }
    }

    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    pub fn run_all(&self, image_path: &Path) -> Result<SimulationResult, SimulationError> {
        let mut results = BTreeMap::new();
        for kind in &self.order {
            let started = Instant::now();
            let encoded = self.runner.run(image_path, kind.identifier())?;
            info!(
                implant = %kind,
                elapsed_ms = started.elapsed().as_millis() as u64,
                png_base64_len = encoded.len(),
                "simulation finished"
            );
            results.insert(*kind, encoded);
        }
        Ok(SimulationResult(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn setup() -> (tempfile::TempDir, tempfile::TempDir, Orchestrator) {
        let inputs = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let runner = SimulationRunner::new(
            Arc::new(ConfigurationRegistry::new()),
            TempFileManager::new(scratch.path()),
        );
        (inputs, scratch, Orchestrator::new(runner))
    }

    /// A dark square on a white background.
    fn write_square(dir: &Path) -> std::path::PathBuf {
        let img = GrayImage::from_fn(64, 64, |x, y| {
            if (16..48).contains(&x) && (16..48).contains(&y) { Luma([0]) } else { Luma([255]) }
        });
        let path = dir.join("square.png");
        img.save(&path).unwrap();
        path
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        fs::read_dir(dir).unwrap().next().is_none()
    }

    fn assert_png(encoded: &str) {
        let bytes = STANDARD.decode(encoded).unwrap();
        assert!(bytes.starts_with(PNG_MAGIC));
        image::load_from_memory(&bytes).unwrap();
    }

    #[test]
    fn run_all_returns_every_implant_as_png() {
        let (inputs, scratch, orchestrator) = setup();
        let input = write_square(inputs.path());

        let result = orchestrator.run_all(&input).unwrap();

        assert_eq!(result.len(), 3);
        for kind in ImplantKind::ALL {
            assert_png(result.get(kind).unwrap());
        }
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn run_all_is_repeatable() {
        let (inputs, _scratch, orchestrator) = setup();
        let input = write_square(inputs.path());

        let first = orchestrator.run_all(&input).unwrap();
        let second = orchestrator.run_all(&input).unwrap();

        for (_, encoded) in first.iter().chain(second.iter()) {
            assert_png(encoded);
        }
    }

    #[test]
    fn result_serializes_with_identifier_keys() {
        let (inputs, _scratch, orchestrator) = setup();
        let input = write_square(inputs.path());

        let json = serde_json::to_value(orchestrator.run_all(&input).unwrap()).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["AlphaAMS", "ArgusII", "PRIMA"]);
    }

    #[test]
    fn runner_rejects_unknown_implant_without_leaking_files() {
        let (inputs, scratch, orchestrator) = setup();
        let input = write_square(inputs.path());

        let err = orchestrator.runner().run(&input, "Unknown").unwrap_err();

        assert!(matches!(err, SimulationError::UnknownImplant(_)));
        assert_eq!(err.to_string(), "Unknown implant: Unknown");
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn corrupt_input_fails_the_whole_run() {
        let (inputs, scratch, orchestrator) = setup();
        let input = inputs.path().join("broken.png");
        fs::write(&input, b"definitely not a png").unwrap();

        assert!(orchestrator.run_all(&input).is_err());
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn blank_input_still_renders() {
        let (inputs, _scratch, orchestrator) = setup();
        let input = inputs.path().join("white.png");
        GrayImage::from_pixel(8, 8, Luma([255])).save(&input).unwrap();

        let encoded = orchestrator.runner().run(&input, "ArgusII").unwrap();
        let decoded = image::load_from_memory(&STANDARD.decode(encoded).unwrap()).unwrap().into_luma8();
        assert!(decoded.pixels().all(|p| p.0[0] == 0));
    }
}
