use genai::InlineImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::StoryResult;
use crate::scene::Scene;

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "png",
    }
}

pub fn scene_file_name(scene: u32, mime_type: &str) -> String {
    format!("scene_{scene:02}.{}", extension_for_mime(mime_type))
}

/// Write one file per scene into `dir`, creating it if needed.
pub fn save_images(dir: &Path, images: &[(u32, &InlineImage)]) -> StoryResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(images.len());
    for (scene, image) in images {
        let path = dir.join(scene_file_name(*scene, &image.mime_type));
        fs::write(&path, image.decode()?)?;
        info!(scene, path = %path.display(), "saved scene image");
        written.push(path);
    }
    Ok(written)
}

pub fn save_scene_list(path: &Path, scenes: &[Scene]) -> StoryResult<()> {
    let json = serde_json::to_string_pretty(scenes).map_err(std::io::Error::other)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, json)?;
    Ok(())
}
