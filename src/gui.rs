//! Debug panel.
//!
//! A small overlay in the top-right corner with one row per [`Checkbox`]. Each
//! checkbox is bound to one material and mirrors its `wireframe` flag. Clicking
//! anywhere on a row flips the box and writes exactly that flag; nothing else
//! in the scene is touched.
//!
//! Layout is done in logical pixels and scaled by the pixel ratio, so the panel
//! keeps its size on high density displays. The panel only lays out its
//! [`Caption`]s; drawing them is up to the text renderer behind the `ui`
//! feature.

use crate::{
    data_structures::{scene::MaterialId, scene::Scene},
    pipelines::gui::GuiVertex,
};

const PANEL_WIDTH: f64 = 245.0;
const PANEL_RIGHT: f64 = 15.0;
const ROW_HEIGHT: f64 = 24.0;
const PADDING: f64 = 8.0;
const BOX_SIZE: f64 = 14.0;
const TEXT_SIZE: f64 = 11.0;
const TITLE: &str = "Controls";

const TITLE_COLOUR: u32 = 0x111111;
const BACKGROUND_COLOUR: u32 = 0x1f1f1f;
const WIDGET_COLOUR: u32 = 0x424242;
pub const TEXT_COLOUR: u32 = 0xebebeb;

/// sRGB hex to linear RGBA, so the sRGB surface shows the colour as written.
fn colour(hex: u32) -> [f32; 4] {
    let channel = |c: u32| {
        let c = c as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [
        channel((hex >> 16) & 0xff),
        channel((hex >> 8) & 0xff),
        channel(hex & 0xff),
        1.0,
    ]
}

/// One line of panel text in physical pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Caption {
    pub text: String,
    /// Top-left corner of the line box.
    pub left: f32,
    pub top: f32,
    /// Font size, which is also the line height.
    pub size: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Checkbox {
    pub label: String,
    pub value: bool,
    pub target: MaterialId,
}

/// Rectangle in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn contains(&self, (px, py): (f64, f64)) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

#[derive(Clone, Debug, Default)]
pub struct DebugPanel {
    pub checkboxes: Vec<Checkbox>,
}

impl DebugPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row bound to `target`. The box starts out showing the material's
    /// current flag.
    pub fn add_checkbox(&mut self, label: impl Into<String>, target: MaterialId, scene: &Scene) -> usize {
        let value = scene.material(target).is_some_and(|m| m.wireframe);
        self.checkboxes.push(Checkbox {
            label: label.into(),
            value,
            target,
        });
        self.checkboxes.len() - 1
    }

    /// Sets checkbox `idx` and writes the value to its material.
    pub fn set(&mut self, idx: usize, value: bool, scene: &mut Scene) {
        let Some(checkbox) = self.checkboxes.get_mut(idx) else {
            log::warn!("no checkbox at index {idx}");
            return;
        };
        checkbox.value = value;
        match scene.material_mut(checkbox.target) {
            Some(material) => material.wireframe = value,
            None => log::warn!("checkbox {:?} is bound to a missing material", checkbox.label),
        }
    }

    /// Flips checkbox `idx` and returns its new value.
    pub fn toggle(&mut self, idx: usize, scene: &mut Scene) -> Option<bool> {
        let value = !self.checkboxes.get(idx)?.value;
        self.set(idx, value, scene);
        Some(value)
    }

    fn frame(&self, surface_width: u32, pixel_ratio: f64) -> Rect {
        let w = PANEL_WIDTH * pixel_ratio;
        Rect {
            x: surface_width as f64 - (PANEL_WIDTH + PANEL_RIGHT) * pixel_ratio,
            y: 0.0,
            w,
            h: ROW_HEIGHT * pixel_ratio * (self.checkboxes.len() + 1) as f64,
        }
    }

    fn row(&self, idx: usize, surface_width: u32, pixel_ratio: f64) -> Rect {
        let frame = self.frame(surface_width, pixel_ratio);
        let h = ROW_HEIGHT * pixel_ratio;
        Rect {
            x: frame.x,
            y: h * (idx + 1) as f64,
            w: frame.w,
            h,
        }
    }

    /// Whether the cursor (physical pixels) is over the panel.
    pub fn contains(&self, cursor: (f64, f64), surface_width: u32, pixel_ratio: f64) -> bool {
        self.frame(surface_width, pixel_ratio).contains(cursor)
    }

    /// Index of the checkbox row under the cursor.
    pub fn hit_test(&self, cursor: (f64, f64), surface_width: u32, pixel_ratio: f64) -> Option<usize> {
        (0..self.checkboxes.len()).find(|&i| self.row(i, surface_width, pixel_ratio).contains(cursor))
    }

    /// The title and one label per row, vertically centred in their bars.
    pub fn captions(&self, surface_width: u32, pixel_ratio: f64) -> Vec<Caption> {
        let frame = self.frame(surface_width, pixel_ratio);
        let pad = PADDING * pixel_ratio;
        let size = TEXT_SIZE * pixel_ratio;
        let caption = |text: &str, row: Rect| Caption {
            text: text.to_string(),
            left: (row.x + pad) as f32,
            top: (row.y + (row.h - size) / 2.0) as f32,
            size: size as f32,
        };

        let title = Rect {
            h: ROW_HEIGHT * pixel_ratio,
            ..frame
        };
        let mut captions = vec![caption(TITLE, title)];
        captions.extend(
            self.checkboxes
                .iter()
                .enumerate()
                .map(|(i, checkbox)| caption(&checkbox.label, self.row(i, surface_width, pixel_ratio))),
        );
        captions
    }

    /// Overlay triangles in normalized device coordinates.
    pub fn mesh(&self, (width, height): (u32, u32), pixel_ratio: f64) -> (Vec<GuiVertex>, Vec<u32>) {
        let mut mesh = OverlayMesh::new(width, height);
        let frame = self.frame(width, pixel_ratio);
        let row_h = ROW_HEIGHT * pixel_ratio;
        let pad = PADDING * pixel_ratio;

        mesh.rect(frame, colour(BACKGROUND_COLOUR));
        mesh.rect(Rect { h: row_h, ..frame }, colour(TITLE_COLOUR));

        for (i, checkbox) in self.checkboxes.iter().enumerate() {
            let row = self.row(i, width, pixel_ratio);
            let size = BOX_SIZE * pixel_ratio;
            let check = Rect {
                x: row.x + row.w - pad - size,
                y: row.y + (row.h - size) / 2.0,
                w: size,
                h: size,
            };
            mesh.rect(check, colour(WIDGET_COLOUR));
            if checkbox.value {
                let inset = size * 0.25;
                let mark = Rect {
                    x: check.x + inset,
                    y: check.y + inset,
                    w: size - 2.0 * inset,
                    h: size - 2.0 * inset,
                };
                mesh.rect(mark, colour(TEXT_COLOUR));
            }
        }
        (mesh.vertices, mesh.indices)
    }
}

struct OverlayMesh {
    width: f64,
    height: f64,
    vertices: Vec<GuiVertex>,
    indices: Vec<u32>,
}

impl OverlayMesh {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1) as f64,
            height: height.max(1) as f64,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    fn ndc(&self, x: f64, y: f64) -> [f32; 2] {
        [
            (x / self.width * 2.0 - 1.0) as f32,
            (1.0 - y / self.height * 2.0) as f32,
        ]
    }

    fn rect(&mut self, r: Rect, color: [f32; 4]) {
        let base = self.vertices.len() as u32;
        for (x, y) in [(r.x, r.y), (r.x, r.y + r.h), (r.x + r.w, r.y + r.h), (r.x + r.w, r.y)] {
            let position = self.ndc(x, y);
            self.vertices.push(GuiVertex { position, color });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::material::Material;

    fn panel() -> (DebugPanel, Scene, MaterialId, MaterialId) {
        let mut scene = Scene::new();
        let moon = scene.add_material(Material::phong([1.0; 3]));
        let other = scene.add_material(Material::standard([1.0; 3]));
        let mut panel = DebugPanel::new();
        panel.add_checkbox("Wireframe", moon, &scene);
        (panel, scene, moon, other)
    }

    #[test]
    fn toggle_writes_only_the_bound_material() {
        let (mut panel, mut scene, moon, other) = panel();
        assert_eq!(panel.toggle(0, &mut scene), Some(true));
        assert!(scene.material(moon).unwrap().wireframe);
        assert!(!scene.material(other).unwrap().wireframe);
        assert_eq!(panel.toggle(0, &mut scene), Some(false));
        assert!(!scene.material(moon).unwrap().wireframe);
        assert_eq!(panel.toggle(3, &mut scene), None);
    }

    #[test]
    fn hit_test_finds_the_row_in_the_top_right_corner() {
        let (panel, _, _, _) = panel();
        // row 0 sits below the title bar
        assert_eq!(panel.hit_test((700.0, 30.0), 800, 1.0), Some(0));
        assert_eq!(panel.hit_test((700.0, 10.0), 800, 1.0), None);
        assert_eq!(panel.hit_test((100.0, 30.0), 800, 1.0), None);
        assert_eq!(panel.hit_test((1400.0, 60.0), 1600, 2.0), Some(0));
        assert!(panel.contains((700.0, 10.0), 800, 1.0));
    }

    #[test]
    fn captions_sit_inside_their_bars() {
        let (panel, _, _, _) = panel();
        let captions = panel.captions(800, 2.0);
        let texts: Vec<_> = captions.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["Controls", "Wireframe"]);

        let row = panel.row(0, 800, 2.0);
        let label = &captions[1];
        assert!(row.contains((label.left as f64, label.top as f64)));
        assert!(row.contains((label.left as f64, (label.top + label.size) as f64)));
        assert!(captions[0].top < label.top);
        assert_eq!(label.size, 22.0);
    }

    #[test]
    fn checked_box_adds_a_mark() {
        let (mut panel, mut scene, _, _) = panel();
        let (unchecked, _) = panel.mesh((800, 600), 1.0);
        panel.set(0, true, &mut scene);
        let (checked, indices) = panel.mesh((800, 600), 1.0);
        assert_eq!(checked.len(), unchecked.len() + 4);
        assert!(indices.iter().all(|&i| (i as usize) < checked.len()));
        assert!(checked.iter().all(|v| v.position[0].abs() <= 1.0 && v.position[1].abs() <= 1.0));
    }
}
