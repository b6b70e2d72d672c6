use thiserror::Error;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke as LineStyle, Transform};

use super::{
    outline::outline,
    path::{PathCommand, VectorImage},
    stroke::Signature,
};

/// Stroke width of every path, in pixels.
const LINE_WIDTH: f32 = 1.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("signature has no renderable strokes")]
    EmptyArtifact,
    #[error("cannot allocate a {0}x{1} canvas")]
    Canvas(u32, u32),
    #[error("failed to encode PNG: {0}")]
    Encode(String),
}

/// The rasterised signature: PNG bytes, and the only durable copy the voter keeps.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureArtifact {
    png: Vec<u8>,
}

impl SignatureArtifact {
    /// Wrap bytes that were previously produced by [`render`], e.g. a re-uploaded file.
    pub fn from_png(png: Vec<u8>) -> Self {
        Self { png }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }

    /// Download filename for the artifact of a vote on the given proposal.
    pub fn filename(proposal_id: u32) -> String {
        format!("proposal_{proposal_id}_signature_vote.png")
    }
}

// Artifact bytes are secret material; keep them out of logs.
impl std::fmt::Debug for SignatureArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignatureArtifact({} bytes)", self.png.len())
    }
}

/// Outline every stroke of the signature into a vector image of the default size.
pub fn vectorise(signature: &Signature) -> VectorImage {
    let mut image = VectorImage::default();
    for stroke in signature.strokes() {
        image.push_outline(&outline(stroke));
    }
    image
}

/// Render a signature all the way to its PNG artifact.
pub fn render(signature: &Signature) -> Result<SignatureArtifact, RenderError> {
    rasterise(&vectorise(signature))
}

/// Rasterise a vector image at its native resolution.
pub fn rasterise(image: &VectorImage) -> Result<SignatureArtifact, RenderError> {
    if image.is_empty() {
        return Err(RenderError::EmptyArtifact);
    }

    let mut pixmap = Pixmap::new(image.width, image.height)
        .ok_or(RenderError::Canvas(image.width, image.height))?;

    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;
    let line_style = LineStyle {
        width: LINE_WIDTH,
        ..LineStyle::default()
    };

    for path in image.paths() {
        let mut builder = PathBuilder::new();
        for command in path.commands() {
            match *command {
                PathCommand::MoveTo([x, y]) => builder.move_to(x as f32, y as f32),
                PathCommand::QuadTo {
                    control: [cx, cy],
                    to: [x, y],
                } => builder.quad_to(cx as f32, cy as f32, x as f32, y as f32),
                PathCommand::Close => builder.close(),
            }
        }
        // Degenerate geometry (e.g. every point identical) has nothing to draw.
        let Some(skia_path) = builder.finish() else {
            continue;
        };
        pixmap.fill_path(
            &skia_path,
            &paint,
            FillRule::Winding,
            Transform::identity(),
            None,
        );
        pixmap.stroke_path(&skia_path, &paint, &line_style, Transform::identity(), None);
    }

    let png = pixmap
        .encode_png()
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(SignatureArtifact { png })
}
