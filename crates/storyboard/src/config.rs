use genai::InlineImage;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

macro_rules! slug_enum {
    ($name:ident { $($variant:ident => $slug:literal, $label:literal;)+ }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn slug(self) -> &'static str {
                match self {
                    $($name::$variant => $slug,)+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.slug() == wanted)
                    .ok_or_else(|| {
                        let options: Vec<&str> = $name::ALL.iter().map(|v| v.slug()).collect();
                        format!("unknown value '{s}', expected one of: {}", options.join(", "))
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.slug())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoryStyle {
    #[default]
    FairyTale,
    Adventure,
    Comedy,
    Mystery,
    SciFi,
    Drama,
}

slug_enum!(StoryStyle {
    FairyTale => "fairy-tale", "Fairy tale";
    Adventure => "adventure", "Adventure";
    Comedy => "comedy", "Comedy";
    Mystery => "mystery", "Mystery";
    SciFi => "sci-fi", "Science fiction";
    Drama => "drama", "Drama";
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageStyle {
    #[default]
    Photorealistic,
    Cinematic,
    Anime,
    Watercolor,
    OilPainting,
    ComicBook,
    PixelArt,
    Claymation,
    #[serde(rename = "3d-render")]
    Render3d,
}

slug_enum!(ImageStyle {
    Photorealistic => "photorealistic", "Photorealistic";
    Cinematic => "cinematic", "Cinematic film still";
    Anime => "anime", "Anime";
    Watercolor => "watercolor", "Watercolor painting";
    OilPainting => "oil-painting", "Oil painting";
    ComicBook => "comic-book", "Comic book";
    PixelArt => "pixel-art", "Pixel art";
    Claymation => "claymation", "Claymation";
    Render3d => "3d-render", "3D render";
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    #[default]
    Loop,
    Story,
}

slug_enum!(VideoType {
    Loop => "loop", "Seamless loop";
    Story => "story", "Story";
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoLength {
    #[default]
    #[serde(rename = "10s")]
    Short,
    #[serde(rename = "30s")]
    Medium,
    #[serde(rename = "60s")]
    Long,
}

slug_enum!(VideoLength {
    Short => "10s", "10 seconds";
    Medium => "30s", "30 seconds";
    Long => "60s", "60 seconds";
});

/// Everything collected at intake. The reference image is the only field
/// that changes after scenes exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryConfiguration {
    pub idea: String,
    pub story_style: StoryStyle,
    pub image_style: ImageStyle,
    pub video_type: VideoType,
    pub video_length: VideoLength,
    pub(crate) reference_image: Option<InlineImage>,
}

impl StoryConfiguration {
    pub fn reference_image(&self) -> Option<&InlineImage> {
        self.reference_image.as_ref()
    }

    pub fn has_reference_image(&self) -> bool {
        self.reference_image.is_some()
    }

    /// Callers holding generated images must invalidate them; the wizard does.
    pub(crate) fn set_reference_image(&mut self, image: InlineImage) {
        self.reference_image = Some(image);
    }

    pub fn scene_count_range(&self) -> RangeInclusive<usize> {
        match (self.video_type, self.video_length) {
            (VideoType::Loop, _) => 2..=4,
            (VideoType::Story, VideoLength::Short) => 3..=4,
            (VideoType::Story, VideoLength::Medium) => 5..=7,
            (VideoType::Story, VideoLength::Long) => 8..=12,
        }
    }

    /// Expected scene-generation latency, used to pace the progress bar.
    pub fn estimated_generation_time(&self) -> Duration {
        let secs = match (self.video_type, self.video_length) {
            (VideoType::Loop, _) => 30,
            (VideoType::Story, VideoLength::Short) => 30,
            (VideoType::Story, VideoLength::Medium) => 45,
            (VideoType::Story, VideoLength::Long) => 75,
        };
        Duration::from_secs(secs)
    }
}
