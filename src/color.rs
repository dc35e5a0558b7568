use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct RGB triples using evenly spaced hues.
pub fn generate_rgb(n: usize) -> Vec<[u8; 3]> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0 + 210.0;
            let hsl = Hsl::new(hue, 0.65, 0.5);
            let rgb: Srgb = hsl.into_color();
            [
                (rgb.red * 255.0).round() as u8,
                (rgb.green * 255.0).round() as u8,
                (rgb.blue * 255.0).round() as u8,
            ]
        })
        .collect()
}

/// Same palette as `generate_rgb`, for egui.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    generate_rgb(n)
        .into_iter()
        .map(|[r, g, b]| Color32::from_rgb(r, g, b))
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: category label → colour
// ---------------------------------------------------------------------------

/// Maps the labels of a chart (bars, slices, series) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, [u8; 3]>,
    default_color: [u8; 3],
}

impl ColorMap {
    /// Colours are assigned in the order the labels are given.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let palette = generate_rgb(labels.len());
        let mapping = labels.into_iter().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: [128, 128, 128],
        }
    }

    pub fn rgb_for(&self, label: &str) -> [u8; 3] {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }

    pub fn color_for(&self, label: &str) -> Color32 {
        let [r, g, b] = self.rgb_for(label);
        Color32::from_rgb(r, g, b)
    }
}
