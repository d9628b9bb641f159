// THEORY:
// A `Stimulus` is a 2D grid of electrode amplitudes in [0, 1]. It starts life
// as an arbitrary image on disk and is reduced, in order, to:
//   1. grayscale (Rec. 601 luma via `image`), with transparency composited
//      onto white so see-through regions read as background,
//   2. inverted intensity, so dark strokes on a light background become the
//      strongly stimulated electrodes,
//   3. the implant's `(rows, cols)` shape.
// Values stay as f32 throughout; only the decode and the resize touch `image`.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

use crate::error::SimulationError;

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Stimulus {
    rows: usize,
    cols: usize,
    /// Row-major amplitudes in [0, 1].
    values: Vec<f32>,
}

impl Stimulus {
    /// Loads an image from disk as a grayscale stimulus at its native resolution.
    pub fn open(path: &Path) -> Result<Self, SimulationError> {
        let image = image::ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(Self::from_image(image))
    }

    /// Decodes an in-memory image as a grayscale stimulus.
    pub fn decode(bytes: &[u8]) -> Result<Self, SimulationError> {
        Ok(Self::from_image(image::load_from_memory(bytes)?))
    }

    /// Grayscale with alpha flattened onto a white background.
    pub fn from_image(image: DynamicImage) -> Self {
        if !image.color().has_alpha() {
            return Self::from_gray(&image.into_luma8());
        }
        let gray_alpha = image.into_luma_alpha8();
        let flattened = GrayImage::from_fn(gray_alpha.width(), gray_alpha.height(), |x, y| {
            let [l, a] = gray_alpha.get_pixel(x, y).0;
            let (l, a) = (u32::from(l), u32::from(a));
            Luma([((l * a + 255 * (255 - a) + 127) / 255) as u8])
        });
        Self::from_gray(&flattened)
    }

    pub fn from_gray(gray: &GrayImage) -> Self {
        Self {
            rows: gray.height() as usize,
            cols: gray.width() as usize,
            values: gray.pixels().map(|p| f32::from(p.0[0]) / 255.0).collect(),
        }
    }

    pub fn from_values(rows: usize, cols: usize, values: Vec<f32>) -> Self {
        debug_assert_eq!(rows * cols, values.len());
        Self { rows, cols, values }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Flips intensity: `v -> 1 - v`.
    pub fn invert(mut self) -> Self {
        for v in &mut self.values {
            *v = 1.0 - *v;
        }
        self
    }

    /// Resamples to `(rows, cols)` with a triangle (bilinear) filter.
    pub fn resize(self, (rows, cols): (usize, usize)) -> Result<Self, SimulationError> {
        if rows == 0 || cols == 0 || self.rows == 0 || self.cols == 0 {
            return Err(SimulationError::model(format!(
                "cannot resize a {:?} stimulus to {:?}",
                self.shape(),
                (rows, cols)
            )));
        }
        if self.shape() == (rows, cols) {
            return Ok(self);
        }

        let source = GrayF32::from_raw(self.cols as u32, self.rows as u32, self.values)
            .ok_or_else(|| SimulationError::model("stimulus buffer does not match its shape"))?;
        let resized = imageops::resize(&source, cols as u32, rows as u32, FilterType::Triangle);

        Ok(Self {
            rows,
            cols,
            values: resized.into_raw().into_iter().map(|v| v.clamp(0.0, 1.0)).collect(),
        })
    }
}
