//! Freehand mask editing over a working image.
//!
//! Strokes are drawn on a transparent overlay with the displayed image's
//! dimensions. On generate, the overlay is scaled to the image's native size,
//! composited on top of it, and the single composite is sent for editing.

use genai::{GenerativeBackend, InlineImage};
use image::imageops::{self, FilterType};
use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tracing::{info, warn};

use crate::error::{StoryError, StoryResult};
use crate::images::{CandidateRequest, GeneratedImage};
use crate::prompts;

pub const MASK_COLOR: Rgba<u8> = Rgba([255, 0, 0, 128]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);
pub const MIN_BRUSH_SIZE: f32 = 1.0;
pub const MAX_BRUSH_SIZE: f32 = 200.0;
pub const DEFAULT_BRUSH_SIZE: f32 = 30.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrushMode {
    #[default]
    Paint,
    Erase,
}

#[derive(Debug, Clone)]
pub struct MaskEditor {
    working: InlineImage,
    native_size: (u32, u32),
    overlay: RgbaImage,
    brush_size: f32,
    mode: BrushMode,
    last_point: Option<(f32, f32)>,
    candidates: Vec<GeneratedImage>,
}

fn decode_rgba(image: &InlineImage) -> StoryResult<RgbaImage> {
    Ok(image::load_from_memory(&image.decode()?)?.to_rgba8())
}

fn native_size(image: &InlineImage) -> StoryResult<(u32, u32)> {
    Ok(image::load_from_memory(&image.decode()?)?.dimensions())
}

impl MaskEditor {
    /// Open with the overlay at the image's native size.
    pub fn open(image: InlineImage) -> StoryResult<Self> {
        let (w, h) = native_size(&image)?;
        Self::with_display_size(image, w, h)
    }

    pub fn with_display_size(image: InlineImage, width: u32, height: u32) -> StoryResult<Self> {
        let native_size = native_size(&image)?;
        Ok(Self {
            working: image,
            native_size,
            overlay: RgbaImage::from_pixel(width.max(1), height.max(1), CLEAR),
            brush_size: DEFAULT_BRUSH_SIZE,
            mode: BrushMode::Paint,
            last_point: None,
            candidates: Vec::new(),
        })
    }

    pub fn working_image(&self) -> &InlineImage {
        &self.working
    }

    pub fn native_size(&self) -> (u32, u32) {
        self.native_size
    }

    pub fn overlay(&self) -> &RgbaImage {
        &self.overlay
    }

    pub fn candidates(&self) -> &[GeneratedImage] {
        &self.candidates
    }

    pub fn brush_size(&self) -> f32 {
        self.brush_size
    }

    pub fn set_brush_size(&mut self, size: f32) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: BrushMode) {
        self.mode = mode;
    }

    /// Resizing the display discards the current strokes.
    pub fn set_display_size(&mut self, width: u32, height: u32) {
        self.overlay = RgbaImage::from_pixel(width.max(1), height.max(1), CLEAR);
        self.last_point = None;
    }

    pub fn is_drawing(&self) -> bool {
        self.last_point.is_some()
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.stamp(x, y);
        self.last_point = Some((x, y));
    }

    /// Connects to the previous point while the button is held.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let Some((lx, ly)) = self.last_point else {
            return;
        };
        self.stroke(lx, ly, x, y);
        self.last_point = Some((x, y));
    }

    pub fn pointer_up(&mut self) {
        self.last_point = None;
    }

    pub fn clear(&mut self) {
        for px in self.overlay.pixels_mut() {
            *px = CLEAR;
        }
        self.last_point = None;
    }

    pub fn has_mask(&self) -> bool {
        self.overlay.pixels().any(|px| px[3] > 0)
    }

    fn stroke(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        let spacing = (self.brush_size / 4.0).max(0.5);
        let dist = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let steps = (dist / spacing).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
        }
    }

    fn stamp(&mut self, cx: f32, cy: f32) {
        let radius = self.brush_size / 2.0;
        let color = match self.mode {
            BrushMode::Paint => MASK_COLOR,
            BrushMode::Erase => CLEAR,
        };
        let (w, h) = self.overlay.dimensions();
        let min_x = (cx - radius).floor().max(0.0) as u32;
        let min_y = (cy - radius).floor().max(0.0) as u32;
        let max_x = ((cx + radius).ceil().max(0.0) as u32).min(w.saturating_sub(1));
        let max_y = ((cy + radius).ceil().max(0.0) as u32).min(h.saturating_sub(1));
        if cx + radius < 0.0 || cy + radius < 0.0 || min_x >= w || min_y >= h {
            return;
        }
        let r2 = radius * radius;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.overlay.put_pixel(x, y, color);
                }
            }
        }
    }

    /// Working image at native resolution with the overlay scaled on top.
    pub fn composite(&self) -> StoryResult<InlineImage> {
        let mut base = decode_rgba(&self.working)?;
        let (w, h) = base.dimensions();
        let mask = if self.overlay.dimensions() == (w, h) {
            self.overlay.clone()
        } else {
            imageops::resize(&self.overlay, w, h, FilterType::Nearest)
        };
        imageops::overlay(&mut base, &mask, 0, 0);
        let mut bytes = Vec::new();
        base.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(InlineImage::from_bytes("image/png", &bytes))
    }

    /// Ask for two edited candidates. On failure the working image and the
    /// previous candidates stay as they were.
    pub async fn generate(
        &mut self,
        backend: &dyn GenerativeBackend,
        instruction: &str,
    ) -> StoryResult<&[GeneratedImage]> {
        if instruction.trim().is_empty() {
            return Err(StoryError::EmptyInstruction);
        }
        let request = CandidateRequest {
            scene: 0,
            images: vec![self.composite()?],
            instruction: prompts::mask_edit_instruction(instruction),
        };
        let candidates = request.run(backend).await.map_err(|err| {
            warn!(error = %err, "mask edit failed");
            match err {
                StoryError::NoImageReturned { .. } => StoryError::EditFailed,
                other => other,
            }
        })?;
        info!(count = candidates.len(), "mask edit candidates ready");
        self.candidates = candidates;
        Ok(&self.candidates)
    }

    fn take_candidate(&mut self, index: usize) -> StoryResult<InlineImage> {
        if index >= self.candidates.len() {
            return Err(StoryError::UnknownEditCandidate { index });
        }
        let chosen = self.candidates.swap_remove(index);
        self.candidates.clear();
        Ok(chosen.image)
    }

    /// Adopt a candidate as the new working image and keep editing.
    pub fn accept_and_continue(&mut self, index: usize) -> StoryResult<()> {
        let image = self.take_candidate(index)?;
        self.native_size = native_size(&image)?;
        self.working = image;
        self.clear();
        Ok(())
    }

    /// Adopt a candidate and close the editor, handing the image back.
    pub fn accept_and_finish(mut self, index: usize) -> StoryResult<InlineImage> {
        self.take_candidate(index)
    }

    /// Close without a result; the caller keeps its current image.
    pub fn cancel(self) -> Option<InlineImage> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genai::{MockBackend, MockConfig, MockImageOutcome};

    fn png(w: u32, h: u32) -> InlineImage {
        let img = RgbaImage::from_pixel(w, h, Rgba([0, 0, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        InlineImage::from_bytes("image/png", &bytes)
    }

    #[test]
    fn paint_then_erase() {
        let mut editor = MaskEditor::open(png(40, 40)).unwrap();
        editor.set_brush_size(10.0);
        editor.pointer_down(5.0, 20.0);
        editor.pointer_move(35.0, 20.0);
        editor.pointer_up();
        assert_eq!(editor.overlay().get_pixel(20, 20), &MASK_COLOR);
        assert_eq!(editor.overlay().get_pixel(20, 2), &CLEAR);

        editor.set_mode(BrushMode::Erase);
        editor.pointer_down(20.0, 20.0);
        editor.pointer_up();
        assert_eq!(editor.overlay().get_pixel(20, 20), &CLEAR);
        assert_eq!(editor.overlay().get_pixel(8, 20), &MASK_COLOR);

        editor.clear();
        assert!(!editor.has_mask());
    }

    #[test]
    fn moves_without_button_do_not_draw() {
        let mut editor = MaskEditor::open(png(20, 20)).unwrap();
        editor.pointer_move(10.0, 10.0);
        assert!(!editor.has_mask());
        editor.set_brush_size(5000.0);
        assert_eq!(editor.brush_size(), MAX_BRUSH_SIZE);
    }

    #[test]
    fn composite_is_native_size() {
        let mut editor = MaskEditor::with_display_size(png(80, 40), 40, 20).unwrap();
        editor.set_brush_size(4.0);
        editor.pointer_down(10.0, 10.0);
        editor.pointer_up();
        let composite = editor.composite().unwrap();
        let decoded = image::load_from_memory(&composite.decode().unwrap())
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded.dimensions(), (80, 40));
        let marked = decoded.get_pixel(20, 20);
        assert!(marked[0] > 100, "mask should tint the base red: {marked:?}");
        assert_eq!(decoded.get_pixel(70, 5), &Rgba([0, 0, 255, 255]));
    }

    #[tokio::test]
    async fn continue_replaces_working_image_and_clears_mask() {
        let backend = MockBackend::default();
        let original = png(16, 16);
        let mut editor = MaskEditor::open(original.clone()).unwrap();
        editor.pointer_down(8.0, 8.0);
        editor.pointer_up();
        assert_eq!(editor.generate(&backend, "add a hat").await.unwrap().len(), 2);
        assert_eq!(backend.image_calls().len(), 2);
        editor.accept_and_continue(1).unwrap();
        assert_ne!(editor.working_image(), &original);
        assert!(!editor.has_mask());
        assert!(editor.candidates().is_empty());
        assert_eq!(editor.native_size(), (8, 8));
    }

    #[tokio::test]
    async fn failed_edit_keeps_working_image() {
        let backend = MockBackend::new(MockConfig {
            image_outcomes: vec![MockImageOutcome::Empty, MockImageOutcome::Empty],
            ..MockConfig::default()
        });
        let original = png(16, 16);
        let mut editor = MaskEditor::open(original.clone()).unwrap();
        assert!(matches!(
            editor.generate(&backend, "add a hat").await,
            Err(StoryError::EditFailed)
        ));
        assert_eq!(editor.working_image(), &original);
        assert!(matches!(
            editor.generate(&backend, "   ").await,
            Err(StoryError::EmptyInstruction)
        ));
    }

    #[tokio::test]
    async fn finish_returns_choice_and_cancel_returns_nothing() {
        let backend = MockBackend::default();
        let mut editor = MaskEditor::open(png(16, 16)).unwrap();
        editor.generate(&backend, "make it night").await.unwrap();
        assert!(matches!(
            editor.accept_and_continue(3),
            Err(StoryError::UnknownEditCandidate { index: 3 })
        ));
        assert_eq!(editor.candidates().len(), 2);
        let chosen = editor.candidates()[0].image.clone();
        assert_eq!(editor.accept_and_finish(0).unwrap(), chosen);

        let editor = MaskEditor::open(png(16, 16)).unwrap();
        assert!(editor.cancel().is_none());
    }
}
