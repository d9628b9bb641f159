// THEORY:
// A `Percept` is the model's output for one frame: a brightness value per
// visual-field sample. Brightness is unitless and unbounded above (overlapping
// phosphenes add), so rendering scales by the frame maximum before quantizing
// to 8-bit grayscale.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder};

use crate::error::SimulationError;

#[derive(Debug, Clone, PartialEq)]
pub struct Percept {
    width: usize,
    height: usize,
    /// Row-major brightness, row 0 at the top of the visual field.
    data: Vec<f32>,
}

impl Percept {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(width * height, data.len());
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }

    /// Quantizes to 8-bit grayscale, mapping the brightest sample to 255.
    pub fn to_gray(&self) -> GrayImage {
        let max = self.max();
        let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
        let pixels = self
            .data
            .iter()
            .map(|&v| (v.max(0.0) * scale).round().min(255.0) as u8)
            .collect();
        GrayImage::from_raw(self.width as u32, self.height as u32, pixels).unwrap_or_default()
    }

    /// Writes the percept to `path` as a grayscale PNG.
    pub fn save(&self, path: &Path) -> Result<(), SimulationError> {
        if self.width == 0 || self.height == 0 {
            return Err(SimulationError::model("cannot save an empty percept"));
        }
        let gray = self.to_gray();
        let mut output = BufWriter::new(File::create(path)?);
        PngEncoder::new(&mut output).write_image(gray.as_raw(), gray.width(), gray.height(), ExtendedColorType::L8)?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightest_sample_maps_to_white() {
        let percept = Percept::new(3, 1, vec![0.0, 1.0, 2.0]);
        assert_eq!(percept.to_gray().as_raw(), &vec![0u8, 128, 255]);
    }

    #[test]
    fn dark_percept_stays_black() {
        let percept = Percept::new(2, 2, vec![0.0; 4]);
        assert!(percept.to_gray().as_raw().iter().all(|&p| p == 0));
    }

    #[test]
    fn save_writes_a_decodable_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("percept.png");
        let percept = Percept::new(4, 3, (0..12).map(|v| v as f32).collect());

        percept.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn empty_percept_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Percept::new(0, 0, Vec::new()).save(&dir.path().join("x.png")).is_err());
    }
}
