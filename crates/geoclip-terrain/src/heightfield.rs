//! Height field storage and bounds-safe sampling

use geoclip_core::{GeoclipError, Result};

/// One height field cell: a scalar height and an RGB colour
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeightSample {
    pub height: f32,
    pub colour: [f32; 3],
}

impl HeightSample {
    pub const fn new(height: f32, colour: [f32; 3]) -> Self {
        Self { height, colour }
    }
}

/// What `HeightField::value` reports for a cell.
///
/// Fixed when the field is built so every level samples the same quantity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeightPolicy {
    /// The stored scalar height
    #[default]
    Stored,
    /// Squared length of the colour sample
    ColourLengthSquared,
}

/// A read-only grid of height samples addressed by integer cell coordinates
#[derive(Debug)]
pub struct HeightField {
    /// Row-major samples, `depth` rows of `width` cells
    samples: Vec<HeightSample>,
    width: usize,
    depth: usize,
    policy: HeightPolicy,
    highest: f32,
}

impl HeightField {
    /// Build a height field using `HeightPolicy::Stored`
    pub fn new(width: usize, depth: usize, samples: Vec<HeightSample>) -> Result<Self> {
        Self::with_policy(width, depth, samples, HeightPolicy::Stored)
    }

    pub fn with_policy(
        width: usize,
        depth: usize,
        samples: Vec<HeightSample>,
        policy: HeightPolicy,
    ) -> Result<Self> {
        let expected = width * depth;
        if width == 0 || depth == 0 || samples.len() != expected {
            return Err(GeoclipError::InvalidHeightField {
                width,
                depth,
                expected,
                got: samples.len(),
            });
        }

        let highest = samples
            .iter()
            .map(|s| resolve(s, policy))
            .fold(f32::MIN, f32::max);

        Ok(Self {
            samples,
            width,
            depth,
            policy,
            highest,
        })
    }

    /// Create a height field from raw heights; colours are the matching grey
    pub fn from_heights(width: usize, depth: usize, heights: Vec<f32>) -> Result<Self> {
        let samples = heights
            .into_iter()
            .map(|h| HeightSample::new(h, [h, h, h]))
            .collect();
        Self::new(width, depth, samples)
    }

    /// Width in cells (x axis)
    pub fn width(&self) -> usize {
        self.width
    }

    /// Depth in cells (y axis)
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn policy(&self) -> HeightPolicy {
        self.policy
    }

    /// The cell at `(x, y)`, or the default sample outside the field
    pub fn sample(&self, x: i32, y: i32) -> HeightSample {
        self.index(x, y)
            .map(|i| self.samples[i])
            .unwrap_or_default()
    }

    /// Height at `(x, y)` under this field's policy; 0 outside the field
    pub fn value(&self, x: i32, y: i32) -> f32 {
        self.index(x, y)
            .map(|i| resolve(&self.samples[i], self.policy))
            .unwrap_or(0.0)
    }

    /// Colour at `(x, y)`; black outside the field
    pub fn colour(&self, x: i32, y: i32) -> [f32; 3] {
        self.sample(x, y).colour
    }

    /// Largest `value` anywhere in the field, computed once at construction
    pub fn highest_point(&self) -> f32 {
        self.highest
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.depth {
            return None;
        }
        Some(y * self.width + x)
    }
}

fn resolve(sample: &HeightSample, policy: HeightPolicy) -> f32 {
    match policy {
        HeightPolicy::Stored => sample.height,
        HeightPolicy::ColourLengthSquared => {
            let [r, g, b] = sample.colour;
            r * r + g * g + b * b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_4x4() -> HeightField {
        HeightField::from_heights(4, 4, (0..16).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn in_range_reads_row_major() {
        let hf = ramp_4x4();
        assert_eq!(hf.width(), 4);
        assert_eq!(hf.depth(), 4);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(hf.value(x, y), (y * 4 + x) as f32);
                let v = (y * 4 + x) as f32;
                assert_eq!(hf.colour(x, y), [v, v, v]);
            }
        }
    }

    #[test]
    fn out_of_range_returns_default() {
        let hf = ramp_4x4();
        assert_eq!(hf.value(5, 5), 0.0);
        assert_eq!(hf.value(4, 0), 0.0);
        assert_eq!(hf.value(-1, 2), 0.0);
        assert_eq!(hf.colour(0, 4), [0.0; 3]);
        assert_eq!(hf.sample(i32::MIN, i32::MAX), HeightSample::default());
    }

    #[test]
    fn highest_point_follows_policy() {
        let samples: Vec<HeightSample> = (0..16)
            .map(|v| {
                let v = v as f32;
                HeightSample::new(v, [v, v, v])
            })
            .collect();

        let stored = HeightField::new(4, 4, samples.clone()).unwrap();
        assert_eq!(stored.highest_point(), 15.0);

        let squared =
            HeightField::with_policy(4, 4, samples, HeightPolicy::ColourLengthSquared).unwrap();
        assert_eq!(squared.highest_point(), 15.0f32.powi(2) * 3.0);
        assert_eq!(squared.value(1, 0), 3.0);
    }

    #[test]
    fn mismatched_sample_count_is_rejected() {
        let err = HeightField::from_heights(4, 4, vec![0.0; 15]).unwrap_err();
        assert!(matches!(
            err,
            GeoclipError::InvalidHeightField {
                expected: 16,
                got: 15,
                ..
            }
        ));
        assert!(HeightField::from_heights(0, 4, Vec::new()).is_err());
    }
}
