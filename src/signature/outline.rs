//! Pressure-aware stroke outlining.
//!
//! Turns the raw samples of a stroke into the polygon that encloses the
//! drawn ink. The geometry follows the well known "perfect freehand" outline
//! construction: the input is streamlined towards each new sample, a radius is
//! computed per point from (simulated) pressure, and left/right offset points
//! are emitted along the stroke with round caps at both ends.

use std::f64::consts::PI;

use super::stroke::{Stroke, StrokeSample};

/// Fixed outline parameters for signatures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineOptions {
    pub size: f64,
    pub thinning: f64,
    pub smoothing: f64,
    pub streamline: f64,
    pub simulate_pressure: bool,
    /// The stroke is complete, so the final sample is used as-is.
    pub last: bool,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            size: 4.0,
            thinning: 0.5,
            smoothing: 0.5,
            streamline: 0.5,
            simulate_pressure: true,
            last: true,
        }
    }
}

/// Strokes with fewer samples than this have no outline.
pub const MIN_SAMPLES: usize = 3;

const RATE_OF_PRESSURE_CHANGE: f64 = 0.275;
const FIXED_PI: f64 = PI + 0.0001;
const CAP_STEPS: usize = 13;
const END_CAP_STEPS: usize = 29;

pub type Point = [f64; 2];

/// A closed outline polygon. Empty if the stroke was too short.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline(pub Vec<Point>);

impl Outline {
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outline a stroke with the fixed signature options.
pub fn outline(stroke: &Stroke) -> Outline {
    outline_with(stroke, &OutlineOptions::default())
}

pub fn outline_with(stroke: &Stroke, options: &OutlineOptions) -> Outline {
    if stroke.len() < MIN_SAMPLES || options.size <= 0.0 {
        return Outline::default();
    }
    let points = stroke_points(stroke.samples(), options);
    Outline(outline_points(&points, options))
}

/// A streamlined input point.
#[derive(Debug, Clone, Copy)]
struct StrokePoint {
    point: Point,
    pressure: f64,
    vector: Point,
    distance: f64,
    running_length: f64,
}

fn stroke_points(samples: &[StrokeSample], options: &OutlineOptions) -> Vec<StrokePoint> {
    let t = 0.15 + (1.0 - options.streamline) * 0.85;
    let max = samples.len() - 1;

    let first = &samples[0];
    let mut points = vec![StrokePoint {
        point: [first.x, first.y],
        pressure: first.pressure.filter(|p| *p >= 0.0).unwrap_or(0.25),
        vector: [1.0, 1.0],
        distance: 0.0,
        running_length: 0.0,
    }];

    let mut reached_minimum_length = false;
    let mut running_length = 0.0;
    let mut prev = points[0];
    for (i, sample) in samples.iter().enumerate().skip(1) {
        let target = [sample.x, sample.y];
        let point = if options.last && i == max {
            target
        } else {
            lrp(prev.point, target, t)
        };
        if prev.point == point {
            continue;
        }
        let distance = dist(point, prev.point);
        running_length += distance;
        if i < max && !reached_minimum_length {
            if running_length < options.size {
                continue;
            }
            reached_minimum_length = true;
        }
        prev = StrokePoint {
            point,
            pressure: sample.pressure.filter(|p| *p >= 0.0).unwrap_or(0.5),
            vector: uni(sub(prev.point, point)),
            distance,
            running_length,
        };
        points.push(prev);
    }

    points[0].vector = points.get(1).map(|p| p.vector).unwrap_or([0.0, 0.0]);
    points
}

fn simulated_pressure(previous: f64, distance: f64, size: f64) -> f64 {
    let sp = f64::min(1.0, distance / size);
    let rp = f64::min(1.0, 1.0 - sp);
    f64::min(1.0, previous + (rp - previous) * (sp * RATE_OF_PRESSURE_CHANGE))
}

fn stroke_radius(size: f64, thinning: f64, pressure: f64) -> f64 {
    size * (0.5 - thinning * (0.5 - pressure))
}

fn outline_points(points: &[StrokePoint], options: &OutlineOptions) -> Vec<Point> {
    let size = options.size;
    let total_length = points[points.len() - 1].running_length;
    let min_distance = (size * options.smoothing).powi(2);

    let mut left = Vec::new();
    let mut right = Vec::new();

    let mut prev_pressure = points
        .iter()
        .take(10)
        .fold(points[0].pressure, |acc, curr| {
            let pressure = if options.simulate_pressure {
                simulated_pressure(acc, curr.distance, size)
            } else {
                curr.pressure
            };
            (acc + pressure) / 2.0
        });

    let mut radius = stroke_radius(size, options.thinning, points[points.len() - 1].pressure);
    let mut first_radius = None;
    let mut prev_vector = points[0].vector;
    let mut pl = points[0].point;
    let mut pr = pl;
    let mut prev_sharp_corner = false;

    for (i, sp) in points.iter().enumerate() {
        let is_last = i == points.len() - 1;
        if !is_last && total_length - sp.running_length < 3.0 {
            continue;
        }

        let mut pressure = sp.pressure;
        if options.thinning != 0.0 {
            if options.simulate_pressure {
                pressure = simulated_pressure(prev_pressure, sp.distance, size);
            }
            radius = stroke_radius(size, options.thinning, pressure);
        } else {
            radius = size / 2.0;
        }
        first_radius.get_or_insert(radius);
        radius = f64::max(0.01, radius);

        let next_vector = if is_last { sp.vector } else { points[i + 1].vector };
        let next_dpr = if is_last { 1.0 } else { dpr(sp.vector, next_vector) };
        let prev_dpr = dpr(sp.vector, prev_vector);
        let sharp_corner = prev_dpr < 0.0 && !prev_sharp_corner;
        let next_sharp_corner = next_dpr < 0.0;

        if sharp_corner || next_sharp_corner {
            // Round the corner with a half turn on each side.
            let offset = mul(per(prev_vector), radius);
            for t in steps(CAP_STEPS, 0.0, true) {
                pl = rot_around(sub(sp.point, offset), sp.point, FIXED_PI * t);
                left.push(pl);
                pr = rot_around(add(sp.point, offset), sp.point, FIXED_PI * -t);
                right.push(pr);
            }
            if next_sharp_corner {
                prev_sharp_corner = true;
            }
            continue;
        }
        prev_sharp_corner = false;

        if is_last {
            let offset = mul(per(sp.vector), radius);
            left.push(sub(sp.point, offset));
            right.push(add(sp.point, offset));
            continue;
        }

        let offset = mul(per(lrp(next_vector, sp.vector, next_dpr)), radius);
        let tl = sub(sp.point, offset);
        if i <= 1 || dist2(pl, tl) > min_distance {
            left.push(tl);
            pl = tl;
        }
        let tr = add(sp.point, offset);
        if i <= 1 || dist2(pr, tr) > min_distance {
            right.push(tr);
            pr = tr;
        }

        prev_pressure = pressure;
        prev_vector = sp.vector;
    }

    let first_point = points[0].point;
    let last_point = if points.len() > 1 {
        points[points.len() - 1].point
    } else {
        add(points[0].point, [1.0, 1.0])
    };

    if points.len() == 1 {
        // A lone dot.
        let start = prj(
            first_point,
            uni(per(sub(first_point, last_point))),
            -first_radius.unwrap_or(radius),
        );
        return steps(CAP_STEPS, 1.0 / CAP_STEPS as f64, true)
            .map(|t| rot_around(start, first_point, FIXED_PI * 2.0 * t))
            .collect();
    }

    let start_cap: Vec<Point> = match right.first() {
        Some(&first_right) => steps(CAP_STEPS, 1.0 / CAP_STEPS as f64, true)
            .map(|t| rot_around(first_right, first_point, FIXED_PI * t))
            .collect(),
        None => Vec::new(),
    };

    let direction = per(neg(points[points.len() - 1].vector));
    let end_start = prj(last_point, direction, radius);
    let end_cap = steps(END_CAP_STEPS, 1.0 / END_CAP_STEPS as f64, false)
        .map(|t| rot_around(end_start, last_point, FIXED_PI * 3.0 * t));

    let mut outline = left;
    outline.extend(end_cap);
    outline.extend(right.into_iter().rev());
    outline.extend(start_cap);
    outline
}

/// Parameters `from, from + 1/n, ...` up to 1, accumulated in floating point
/// so the number of steps matches the reference outline exactly.
fn steps(n: usize, from: f64, inclusive: bool) -> impl Iterator<Item = f64> {
    let step = 1.0 / n as f64;
    std::iter::successors(Some(from), move |t| Some(t + step))
        .take_while(move |t| if inclusive { *t <= 1.0 } else { *t < 1.0 })
}

fn add(a: Point, b: Point) -> Point {
    [a[0] + b[0], a[1] + b[1]]
}

fn sub(a: Point, b: Point) -> Point {
    [a[0] - b[0], a[1] - b[1]]
}

fn mul(a: Point, n: f64) -> Point {
    [a[0] * n, a[1] * n]
}

fn neg(a: Point) -> Point {
    [-a[0], -a[1]]
}

/// Perpendicular rotation of a vector.
fn per(a: Point) -> Point {
    [a[1], -a[0]]
}

fn dpr(a: Point, b: Point) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

fn len(a: Point) -> f64 {
    a[0].hypot(a[1])
}

fn uni(a: Point) -> Point {
    let l = len(a);
    [a[0] / l, a[1] / l]
}

fn dist(a: Point, b: Point) -> f64 {
    (a[1] - b[1]).hypot(a[0] - b[0])
}

fn dist2(a: Point, b: Point) -> f64 {
    let d = sub(a, b);
    d[0] * d[0] + d[1] * d[1]
}

fn lrp(a: Point, b: Point, t: f64) -> Point {
    add(a, mul(sub(b, a), t))
}

fn prj(a: Point, b: Point, c: f64) -> Point {
    add(a, mul(b, c))
}

/// Rotate `a` around `c` by `r` radians.
fn rot_around(a: Point, c: Point, r: f64) -> Point {
    let (s, co) = r.sin_cos();
    let px = a[0] - c[0];
    let py = a[1] - c[1];
    [px * co - py * s + c[0], px * s + py * co + c[1]]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[[f64; 2]]) -> Stroke {
        points
            .iter()
            .map(|[x, y]| StrokeSample::with_pressure(*x, *y, 0.5))
            .collect()
    }

    #[test]
    fn short_strokes_have_no_outline() {
        assert!(outline(&Stroke::default()).is_empty());
        assert!(outline(&stroke(&[[1.0, 1.0]])).is_empty());
        assert!(outline(&stroke(&[[1.0, 1.0], [30.0, 30.0]])).is_empty());
    }

    #[test]
    fn square_stroke_outline() {
        let square = stroke(&[[10.0, 10.0], [20.0, 10.0], [20.0, 20.0], [10.0, 20.0]]);
        let first = outline(&square);
        assert!(first.points().len() >= 4);
        assert!(first
            .points()
            .iter()
            .all(|[x, y]| x.is_finite() && y.is_finite()));
        // Ink stays near the drawn path.
        assert!(first
            .points()
            .iter()
            .all(|[x, y]| (0.0..=30.0).contains(x) && (0.0..=30.0).contains(y)));

        assert_eq!(first, outline(&square));
    }

    #[test]
    fn outline_follows_long_stroke() {
        let line = stroke(
            &(0..50)
                .map(|i| [10.0 + 5.0 * i as f64, 100.0])
                .collect::<Vec<_>>(),
        );
        let outline = outline(&line);
        let min_x = outline.points().iter().map(|p| p[0]).fold(f64::MAX, f64::min);
        let max_x = outline.points().iter().map(|p| p[0]).fold(f64::MIN, f64::max);
        assert!(min_x < 12.0);
        assert!(max_x > 250.0);
        // Thin ink: radius never exceeds half the size either side of the line.
        assert!(outline
            .points()
            .iter()
            .all(|p| (p[1] - 100.0).abs() <= OutlineOptions::default().size));
    }
}
