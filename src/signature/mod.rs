//! Freehand signature capture, outlining and rendering.

pub mod draft;
pub mod outline;
pub mod path;
pub mod render;
pub mod stroke;

pub use draft::DraftStore;
pub use path::{PathCommand, SignaturePath, VectorImage, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use render::{rasterise, render, vectorise, RenderError, SignatureArtifact};
pub use stroke::{Signature, Stroke, StrokeSample};
