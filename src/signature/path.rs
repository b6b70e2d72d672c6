use std::fmt::{self, Display, Formatter, Write};

use super::outline::{Outline, Point};

/// Default canvas width of a signature.
pub const CANVAS_WIDTH: u32 = 300;
/// Default canvas height of a signature.
pub const CANVAS_HEIGHT: u32 = 200;

/// Outlines with fewer points than this produce no path.
pub const MIN_OUTLINE_POINTS: usize = 4;

/// A single vector path command, in absolute canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    QuadTo { control: Point, to: Point },
    Close,
}

/// A closed vector path built from one stroke outline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignaturePath {
    commands: Vec<PathCommand>,
}

impl SignaturePath {
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// Build the path for an outline: a quadratic curve through the midpoints
    /// of consecutive outline points, then closed.
    ///
    /// Each segment after the first uses the reflection of the previous
    /// control point, exactly as an SVG `T` command would. All coordinates are
    /// quantised to two decimals so the geometry matches its textual form.
    pub fn from_outline(outline: &Outline) -> Option<Self> {
        let points = outline.points();
        if points.len() < MIN_OUTLINE_POINTS {
            return None;
        }

        let mut commands = Vec::with_capacity(points.len());
        commands.push(PathCommand::MoveTo(quantise(points[0])));

        let mut control = quantise(points[1]);
        let mut to = quantise(midpoint(points[1], points[2]));
        commands.push(PathCommand::QuadTo { control, to });

        for pair in points[2..].windows(2) {
            control = reflect(control, to);
            to = quantise(midpoint(pair[0], pair[1]));
            commands.push(PathCommand::QuadTo { control, to });
        }

        commands.push(PathCommand::Close);
        Some(Self { commands })
    }
}

impl Display for SignaturePath {
    /// SVG path data.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for command in &self.commands {
            if !first {
                f.write_char(' ')?;
            }
            first = false;
            match command {
                PathCommand::MoveTo([x, y]) => write!(f, "M{x:.2},{y:.2}")?,
                PathCommand::QuadTo {
                    control: [cx, cy],
                    to: [x, y],
                } => write!(f, "Q{cx:.2},{cy:.2} {x:.2},{y:.2}")?,
                PathCommand::Close => f.write_char('Z')?,
            }
        }
        Ok(())
    }
}

/// A fixed-size vector image holding every stroke of a signature.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorImage {
    pub width: u32,
    pub height: u32,
    paths: Vec<SignaturePath>,
}

impl VectorImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            paths: Vec::new(),
        }
    }

    /// Add the path of an outline; outlines too short to render are skipped.
    pub fn push_outline(&mut self, outline: &Outline) {
        if let Some(path) = SignaturePath::from_outline(outline) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[SignaturePath] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Standalone SVG document for the image.
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            r#"<svg width="{}" height="{}" xmlns="http://www.w3.org/2000/svg">"#,
            self.width, self.height
        );
        for path in &self.paths {
            svg.push_str(&format!(
                r#"<path d="{path}" fill="black" stroke="black" stroke-width="1"/>"#
            ));
        }
        svg.push_str("</svg>");
        svg
    }
}

impl Default for VectorImage {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}

fn midpoint(a: Point, b: Point) -> Point {
    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0]
}

/// Reflect `control` through `about`.
fn reflect(control: Point, about: Point) -> Point {
    [2.0 * about[0] - control[0], 2.0 * about[1] - control[1]]
}

fn quantise(point: Point) -> Point {
    [round2(point[0]), round2(point[1])]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(points: &[Point]) -> Outline {
        Outline(points.to_vec())
    }

    #[test]
    fn short_outline_has_no_path() {
        assert!(SignaturePath::from_outline(&outline(&[])).is_none());
        assert!(
            SignaturePath::from_outline(&outline(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]])).is_none()
        );
    }

    #[test]
    fn midpoint_curve() {
        let square = outline(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]);
        let path = SignaturePath::from_outline(&square).unwrap();
        assert_eq!(
            path.commands(),
            &[
                PathCommand::MoveTo([0.0, 0.0]),
                PathCommand::QuadTo {
                    control: [10.0, 0.0],
                    to: [10.0, 5.0],
                },
                PathCommand::QuadTo {
                    control: [10.0, 10.0],
                    to: [5.0, 10.0],
                },
                PathCommand::Close,
            ]
        );
        assert_eq!(path.to_string(), "M0.00,0.00 Q10.00,0.00 10.00,5.00 Q10.00,10.00 5.00,10.00 Z");
    }

    #[test]
    fn coordinates_are_quantised() {
        let points = outline(&[
            [0.123, 0.456],
            [1.005, 2.0],
            [3.3333, 4.4444],
            [5.55555, 6.0],
            [7.0, 8.0],
        ]);
        let path = SignaturePath::from_outline(&points).unwrap();
        for command in path.commands() {
            if let PathCommand::QuadTo { to, .. } | PathCommand::MoveTo(to) = command {
                for c in to {
                    assert_eq!(*c, round2(*c));
                }
            }
        }
        assert_eq!(path.commands().len(), 5);
    }

    #[test]
    fn svg_document() {
        let mut image = VectorImage::default();
        image.push_outline(&outline(&[[0.0, 0.0]]));
        assert!(image.is_empty());
        image.push_outline(&outline(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]));
        let svg = image.to_svg();
        assert!(svg.starts_with(r#"<svg width="300" height="200""#));
        assert!(svg.contains(r#"<path d="M0.00,0.00 "#));
        assert!(svg.ends_with("</svg>"));
    }
}
