use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use storyboard::{BrushMode, MaskEditor};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeMode {
    #[default]
    Paint,
    Erase,
}

impl From<StrokeMode> for BrushMode {
    fn from(mode: StrokeMode) -> Self {
        match mode {
            StrokeMode::Paint => BrushMode::Paint,
            StrokeMode::Erase => BrushMode::Erase,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stroke {
    #[serde(default)]
    pub mode: StrokeMode,
    pub brush_size: Option<f32>,
    pub points: Vec<[f32; 2]>,
}

/// Recorded pointer strokes. Coordinates are in display space; `display`
/// defaults to the image's native size.
#[derive(Debug, Clone, Deserialize)]
pub struct StrokeFile {
    pub display: Option<[u32; 2]>,
    #[serde(default)]
    pub brush_size: Option<f32>,
    pub strokes: Vec<Stroke>,
}

impl StrokeFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading strokes {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing strokes {}", path.display()))
    }

    /// Replay every stroke as a press, drag and release.
    pub fn replay(&self, editor: &mut MaskEditor) {
        if let Some([w, h]) = self.display {
            editor.set_display_size(w, h);
        }
        if let Some(size) = self.brush_size {
            editor.set_brush_size(size);
        }
        for stroke in &self.strokes {
            let Some(([x, y], rest)) = stroke.points.split_first() else {
                continue;
            };
            editor.set_mode(stroke.mode.into());
            if let Some(size) = stroke.brush_size.or(self.brush_size) {
                editor.set_brush_size(size);
            }
            editor.pointer_down(*x, *y);
            for [x, y] in rest {
                editor.pointer_move(*x, *y);
            }
            editor.pointer_up();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genai::InlineImage;
    use std::io::Cursor;

    fn editor() -> MaskEditor {
        let img = image::RgbaImage::from_pixel(32, 32, image::Rgba([0, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        MaskEditor::open(InlineImage::from_bytes("image/png", &bytes)).unwrap()
    }

    #[test]
    fn replays_paint_then_erase() {
        let file: StrokeFile = serde_json::from_str(
            r#"{
                "brush_size": 6,
                "strokes": [
                    {"points": [[2, 16], [30, 16]]},
                    {"mode": "erase", "brush_size": 10, "points": [[16, 16]]}
                ]
            }"#,
        )
        .unwrap();
        let mut editor = editor();
        file.replay(&mut editor);
        assert!(editor.has_mask());
        assert_eq!(editor.overlay().get_pixel(16, 16)[3], 0);
        assert!(editor.overlay().get_pixel(4, 16)[3] > 0);
        assert!(!editor.is_drawing());
    }
}
