//! Typeface fonts.
//!
//! Fonts are JSON documents mapping each character to an advance width and an
//! outline string made of `m x y`, `l x y`, `q x y cx cy` and
//! `b x y c1x c1y c2x c2y` commands in font units. [`Font::generate_shapes`]
//! turns a string into planar [`Shape`]s ready for extrusion.

use std::collections::HashMap;

use anyhow::{Context as _, anyhow, bail};
use cgmath::{Vector2, vec2};
use serde::Deserialize;

use crate::data_structures::{text::Shape, triangulate};

#[derive(Deserialize)]
struct RawGlyph {
    ha: f32,
    #[serde(default)]
    o: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFont {
    glyphs: HashMap<String, RawGlyph>,
    resolution: f32,
    bounding_box: BoundingBox,
    #[serde(default)]
    underline_thickness: f32,
    #[serde(default)]
    family_name: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Vector2<f32>),
    LineTo(Vector2<f32>),
    QuadTo {
        control: Vector2<f32>,
        to: Vector2<f32>,
    },
    CubicTo {
        control1: Vector2<f32>,
        control2: Vector2<f32>,
        to: Vector2<f32>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub advance: f32,
    pub outline: Vec<PathCommand>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub family_name: String,
    pub resolution: f32,
    pub bounding_box: BoundingBox,
    pub underline_thickness: f32,
    glyphs: HashMap<char, Glyph>,
}

fn parse_outline(outline: &str) -> anyhow::Result<Vec<PathCommand>> {
    let mut tokens = outline.split_whitespace();
    let point = |tokens: &mut std::str::SplitWhitespace| -> anyhow::Result<Vector2<f32>> {
        let mut coord = || -> anyhow::Result<f32> {
            let token = tokens.next().ok_or_else(|| anyhow!("outline ends mid-command"))?;
            token
                .parse::<f32>()
                .with_context(|| format!("bad coordinate {token:?}"))
        };
        Ok(vec2(coord()?, coord()?))
    };

    let mut commands = Vec::new();
    while let Some(action) = tokens.next() {
        let command = match action {
            "m" => PathCommand::MoveTo(point(&mut tokens)?),
            "l" => PathCommand::LineTo(point(&mut tokens)?),
            // end point first, then the control point
            "q" => {
                let to = point(&mut tokens)?;
                let control = point(&mut tokens)?;
                PathCommand::QuadTo { control, to }
            }
            "b" => {
                let to = point(&mut tokens)?;
                let control1 = point(&mut tokens)?;
                let control2 = point(&mut tokens)?;
                PathCommand::CubicTo {
                    control1,
                    control2,
                    to,
                }
            }
            // sub-paths close implicitly on the next `m`
            "z" => continue,
            other => bail!("unknown outline command {other:?}"),
        };
        commands.push(command);
    }
    Ok(commands)
}

fn quadratic(t: f32, p0: Vector2<f32>, p1: Vector2<f32>, p2: Vector2<f32>) -> Vector2<f32> {
    let k = 1.0 - t;
    p0 * (k * k) + p1 * (2.0 * k * t) + p2 * (t * t)
}

fn cubic(
    t: f32,
    p0: Vector2<f32>,
    p1: Vector2<f32>,
    p2: Vector2<f32>,
    p3: Vector2<f32>,
) -> Vector2<f32> {
    let k = 1.0 - t;
    p0 * (k * k * k) + p1 * (3.0 * k * k * t) + p2 * (3.0 * k * t * t) + p3 * (t * t * t)
}

/// One closed outline flattened to points.
#[derive(Default)]
struct SubPath {
    points: Vec<Vector2<f32>>,
}

impl SubPath {
    fn push(&mut self, p: Vector2<f32>) {
        if self.points.last() != Some(&p) {
            self.points.push(p);
        }
    }

    fn cursor(&self) -> Vector2<f32> {
        self.points.last().copied().unwrap_or(vec2(0.0, 0.0))
    }
}

/// Even-odd point-in-polygon test.
fn point_in_polygon(pt: Vector2<f32>, polygon: &[Vector2<f32>]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    let mut q = n.wrapping_sub(1);
    for p in 0..n {
        let (a, b) = (polygon[p], polygon[q]);
        if (a.y > pt.y) != (b.y > pt.y) && pt.x < (b.x - a.x) * (pt.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        q = p;
    }
    inside
}

/// Groups flattened outlines into solids and the holes cut into them.
///
/// Clockwise outlines are solids. A hole belongs to the solid that contains
/// its first point, falling back to the solid that preceded it in the outline.
fn to_shapes(paths: Vec<SubPath>) -> Vec<Shape> {
    let paths: Vec<Vec<Vector2<f32>>> = paths
        .into_iter()
        .map(|p| p.points)
        .filter(|p| p.len() >= 3)
        .collect();

    if paths.len() == 1 {
        return paths.into_iter().map(Shape::new).collect();
    }
    if !paths.iter().any(|p| triangulate::is_clockwise(p)) {
        return paths.into_iter().map(Shape::new).collect();
    }

    let mut shapes: Vec<Shape> = Vec::new();
    let mut orphans: Vec<(Option<usize>, Vec<Vector2<f32>>)> = Vec::new();
    for path in paths {
        if triangulate::is_clockwise(&path) {
            shapes.push(Shape::new(path));
        } else {
            orphans.push((shapes.len().checked_sub(1), path));
        }
    }

    for (preceding, hole) in orphans {
        let container = shapes
            .iter()
            .position(|s| point_in_polygon(hole[0], &s.contour))
            .or(preceding)
            .unwrap_or(0);
        shapes[container].holes.push(hole);
    }
    shapes
}

impl Font {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let raw: RawFont = serde_json::from_str(json).context("malformed typeface json")?;
        if raw.resolution <= 0.0 {
            bail!("font resolution must be positive, got {}", raw.resolution);
        }
        let mut glyphs = HashMap::with_capacity(raw.glyphs.len());
        for (key, glyph) in raw.glyphs {
            let mut chars = key.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                log::debug!("skipping glyph with multi-character key {key:?}");
                continue;
            };
            let outline = match glyph.o.as_deref() {
                Some(o) => parse_outline(o).with_context(|| format!("glyph {ch:?}"))?,
                None => Vec::new(),
            };
            glyphs.insert(
                ch,
                Glyph {
                    advance: glyph.ha,
                    outline,
                },
            );
        }
        Ok(Self {
            family_name: raw.family_name,
            resolution: raw.resolution,
            bounding_box: raw.bounding_box,
            underline_thickness: raw.underline_thickness,
            glyphs,
        })
    }

    /// The glyph for `ch`, or the `?` glyph when the font lacks it.
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch).or_else(|| self.glyphs.get(&'?'))
    }

    pub fn line_height(&self, size: f32) -> f32 {
        let bb = self.bounding_box;
        (bb.y_max - bb.y_min + self.underline_thickness) * size / self.resolution
    }

    /// Width of a single line of `text` at `size`.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        let scale = size / self.resolution;
        text.chars()
            .filter_map(|ch| self.glyph(ch))
            .map(|g| g.advance * scale)
            .sum()
    }

    /// Lays out `text` starting at the origin and flattens every glyph outline
    /// into shapes. Curves are split into `curve_segments` straight pieces.
    pub fn generate_shapes(&self, text: &str, size: f32, curve_segments: u32) -> Vec<Shape> {
        let scale = size / self.resolution;
        let line_height = self.line_height(size);
        let divisions = curve_segments.max(1);

        let mut shapes = Vec::new();
        let mut offset = vec2(0.0f32, 0.0);
        for ch in text.chars() {
            if ch == '\n' {
                offset.x = 0.0;
                offset.y -= line_height;
                continue;
            }
            let Some(glyph) = self.glyph(ch) else {
                log::warn!("font {:?} has no glyph for {ch:?} and no fallback", self.family_name);
                continue;
            };
            shapes.extend(to_shapes(Self::flatten(glyph, scale, offset, divisions)));
            offset.x += glyph.advance * scale;
        }
        shapes
    }

    fn flatten(glyph: &Glyph, scale: f32, offset: Vector2<f32>, divisions: u32) -> Vec<SubPath> {
        let place = |p: Vector2<f32>| p * scale + offset;
        let mut paths: Vec<SubPath> = Vec::new();

        for command in &glyph.outline {
            if !matches!(command, PathCommand::MoveTo(_)) && paths.is_empty() {
                paths.push(SubPath::default());
            }
            match *command {
                PathCommand::MoveTo(p) => {
                    let mut path = SubPath::default();
                    path.push(place(p));
                    paths.push(path);
                }
                PathCommand::LineTo(p) => {
                    if let Some(path) = paths.last_mut() {
                        path.push(place(p));
                    }
                }
                PathCommand::QuadTo { control, to } => {
                    if let Some(path) = paths.last_mut() {
                        let start = path.cursor();
                        let (c, end) = (place(control), place(to));
                        for d in 1..=divisions {
                            path.push(quadratic(d as f32 / divisions as f32, start, c, end));
                        }
                    }
                }
                PathCommand::CubicTo {
                    control1,
                    control2,
                    to,
                } => {
                    if let Some(path) = paths.last_mut() {
                        let start = path.cursor();
                        let (c1, c2, end) = (place(control1), place(control2), place(to));
                        for d in 1..=divisions {
                            path.push(cubic(d as f32 / divisions as f32, start, c1, c2, end));
                        }
                    }
                }
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_WITH_HOLE: &str = r#"{
        "glyphs": {
            "o": { "ha": 1200, "x_min": 0, "x_max": 1000,
                   "o": "m 0 0 l 0 1000 l 1000 1000 l 1000 0 l 0 0 m 250 250 l 750 250 l 750 750 l 250 750 l 250 250" },
            "?": { "ha": 600, "x_min": 0, "x_max": 500,
                   "o": "m 0 0 l 0 500 l 500 500 l 500 0 l 0 0" },
            " ": { "ha": 400 }
        },
        "familyName": "Test",
        "resolution": 1000,
        "boundingBox": { "xMin": 0, "yMin": -200, "xMax": 1000, "yMax": 1000 },
        "underlineThickness": 50
    }"#;

    #[test]
    fn parses_commands_with_end_point_first() {
        let cmds = parse_outline("m 1 2 q 10 20 5 6 b 7 8 1 1 2 2").unwrap();
        assert_eq!(cmds[0], PathCommand::MoveTo(vec2(1.0, 2.0)));
        assert_eq!(
            cmds[1],
            PathCommand::QuadTo {
                control: vec2(5.0, 6.0),
                to: vec2(10.0, 20.0)
            }
        );
        assert!(matches!(cmds[2], PathCommand::CubicTo { to, .. } if to == vec2(7.0, 8.0)));
        assert!(parse_outline("m 1").is_err());
        assert!(parse_outline("x 1 2").is_err());
        assert_eq!(parse_outline("m 0 0 l 1 1 z").unwrap().len(), 2);
    }

    #[test]
    fn hole_is_attached_to_its_solid() {
        let font = Font::from_json(SQUARE_WITH_HOLE).unwrap();
        let shapes = font.generate_shapes("o", 1.0, 12);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].holes.len(), 1);
        assert_eq!(shapes[0].contour.len(), 5);
    }

    #[test]
    fn unknown_characters_fall_back_and_advance() {
        let font = Font::from_json(SQUARE_WITH_HOLE).unwrap();
        let shapes = font.generate_shapes("o#", 1.0, 12);
        assert_eq!(shapes.len(), 2);
        let min_x = shapes[1]
            .contour
            .iter()
            .map(|p| p.x)
            .fold(f32::INFINITY, f32::min);
        assert!((min_x - 1.2).abs() < 1e-5);
        assert!((font.measure("o ", 1.0) - 1.6).abs() < 1e-5);
    }

    #[test]
    fn newline_moves_down_one_line() {
        let font = Font::from_json(SQUARE_WITH_HOLE).unwrap();
        let shapes = font.generate_shapes("?\n?", 1.0, 12);
        let min_y = shapes[1]
            .contour
            .iter()
            .map(|p| p.y)
            .fold(f32::INFINITY, f32::min);
        assert!((min_y + font.line_height(1.0)).abs() < 1e-5);
        assert!((font.line_height(1.0) - 1.25).abs() < 1e-5);
    }
}
