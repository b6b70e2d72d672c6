use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pressure assumed for devices that do not report one.
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// A single pointer sample in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 3]")]
pub struct StrokeSample {
    pub x: f64,
    pub y: f64,
    pub pressure: Option<f64>,
}

impl StrokeSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            pressure: None,
        }
    }

    pub fn with_pressure(x: f64, y: f64, pressure: f64) -> Self {
        Self {
            x,
            y,
            pressure: Some(pressure),
        }
    }

    /// The same sample, with the constant default pressure filled in if the
    /// device reported none.
    pub fn estimated(self) -> Self {
        Self {
            pressure: Some(self.pressure.unwrap_or(DEFAULT_PRESSURE)),
            ..self
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("a stroke sample needs 2 or 3 components, found {0}")]
    Components(usize),
    #[error("stroke sample components must be finite")]
    NotFinite,
}

impl TryFrom<Vec<f64>> for StrokeSample {
    type Error = SampleError;

    fn try_from(components: Vec<f64>) -> Result<Self, Self::Error> {
        if components.iter().any(|c| !c.is_finite()) {
            return Err(SampleError::NotFinite);
        }
        match components[..] {
            [x, y] => Ok(Self::new(x, y)),
            [x, y, pressure] => Ok(Self::with_pressure(x, y, pressure)),
            _ => Err(SampleError::Components(components.len())),
        }
    }
}

impl From<StrokeSample> for [f64; 3] {
    fn from(sample: StrokeSample) -> Self {
        [
            sample.x,
            sample.y,
            sample.pressure.unwrap_or(DEFAULT_PRESSURE),
        ]
    }
}

/// One continuous pointer-down-to-up gesture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<StrokeSample>", into = "Vec<StrokeSample>")]
pub struct Stroke {
    samples: Vec<StrokeSample>,
}

impl Stroke {
    pub fn samples(&self) -> &[StrokeSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Vec<StrokeSample>> for Stroke {
    fn from(samples: Vec<StrokeSample>) -> Self {
        samples.into_iter().collect()
    }
}

impl From<Stroke> for Vec<StrokeSample> {
    fn from(stroke: Stroke) -> Self {
        stroke.samples
    }
}

impl FromIterator<StrokeSample> for Stroke {
    fn from_iter<I: IntoIterator<Item = StrokeSample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().map(StrokeSample::estimated).collect(),
        }
    }
}

/// A drawn signature: every pen lift starts a new stroke.
///
/// Strokes can only be appended or the whole drawing cleared; there is no
/// way to edit an earlier part of the drawing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature {
    strokes: Vec<Stroke>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer down: start a new stroke at `sample`.
    pub fn begin_stroke(&mut self, sample: StrokeSample) {
        self.strokes.push(Stroke {
            samples: vec![sample.estimated()],
        });
    }

    /// Pointer move: extend the current stroke, starting one if none exists.
    pub fn extend_stroke(&mut self, sample: StrokeSample) {
        match self.strokes.last_mut() {
            Some(stroke) => stroke.samples.push(sample.estimated()),
            None => self.begin_stroke(sample),
        }
    }

    /// Append a finished stroke.
    pub fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// True if nothing has been drawn at all.
    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(Stroke::is_empty)
    }
}

impl FromIterator<Stroke> for Signature {
    fn from_iter<I: IntoIterator<Item = Stroke>>(iter: I) -> Self {
        Self {
            strokes: iter.into_iter().collect(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json;

    #[test]
    fn append_and_clear() {
        let mut signature = Signature::new();
        assert!(signature.is_empty());

        signature.extend_stroke(StrokeSample::new(1.0, 2.0));
        signature.extend_stroke(StrokeSample::new(3.0, 4.0));
        signature.begin_stroke(StrokeSample::with_pressure(5.0, 6.0, 0.9));
        assert_eq!(signature.strokes().len(), 2);
        assert_eq!(signature.strokes()[0].len(), 2);
        assert_eq!(signature.strokes()[0].samples()[0].pressure, Some(DEFAULT_PRESSURE));
        assert_eq!(signature.strokes()[1].samples()[0].pressure, Some(0.9));

        signature.clear();
        assert!(signature.is_empty());
        assert!(signature.strokes().is_empty());
    }

    #[test]
    fn deserialize_strokes() {
        let json = "[[[10,10,0.5],[20,10]],[[1,2,0.25]]]";
        let signature: Signature = serde_json::from_str(json).unwrap();
        assert_eq!(signature.strokes().len(), 2);
        assert_eq!(
            signature.strokes()[0].samples()[1],
            StrokeSample::with_pressure(20.0, 10.0, DEFAULT_PRESSURE)
        );
        assert_eq!(
            signature.strokes()[1].samples()[0],
            StrokeSample::with_pressure(1.0, 2.0, 0.25)
        );

        let reencoded = serde_json::to_string(&signature).unwrap();
        assert_eq!(reencoded, "[[[10.0,10.0,0.5],[20.0,10.0,0.5]],[[1.0,2.0,0.25]]]");
    }

    #[test]
    fn reject_bad_samples() {
        assert!(serde_json::from_str::<Signature>("[[[1]]]").is_err());
        assert!(serde_json::from_str::<Signature>("[[[1,2,3,4]]]").is_err());
        assert_eq!(
            StrokeSample::try_from(vec![f64::NAN, 1.0]),
            Err(SampleError::NotFinite)
        );
    }
}
