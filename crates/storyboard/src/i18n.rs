use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
}

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ko => "ko",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Some(Locale::En),
            "ko" | "ko-kr" | "korean" => Some(Locale::Ko),
            _ => None,
        }
    }
}

const EN: &[(&str, &str)] = &[
    ("step.idea", "Story idea"),
    ("step.generator", "Choose prompts"),
    ("step.overview", "Scene overview"),
    ("action.brainstorm", "Brainstorm"),
    ("action.submit", "Generate scenes"),
    ("action.previous", "Previous"),
    ("action.next", "Next"),
    ("action.finish", "Finish"),
    ("action.back", "Go back"),
    ("action.generate_all", "Generate all"),
    ("action.regenerate", "Regenerate"),
    ("action.download_all", "Download all selected"),
    ("action.sequential", "Generate in sequence"),
    ("action.cancel", "Cancel"),
    ("action.clear_mask", "Clear"),
    ("action.apply_continue", "Apply and keep editing"),
    ("action.apply_finish", "Apply and finish"),
    ("label.image_prompt", "Image prompt"),
    ("label.video_prompt", "Video prompt"),
    ("label.variant", "Option"),
    ("label.progress", "Generating scenes"),
    ("error.empty_idea", "Please enter a story idea."),
    ("error.missing_reference", "Please upload a reference image before generating scenes."),
    ("error.file_type", "Only PNG, JPEG or GIF images can be uploaded."),
    ("error.file_size", "The image must be 10MB or smaller."),
    ("error.missing_credential", "The API key is not configured. Set GEMINI_API_KEY and restart."),
    ("error.brainstorm_failed", "Could not brainstorm an idea. Please try again."),
    ("error.scene_generation_failed", "Scene generation failed. Please try again."),
    ("error.image_generation_failed", "Image generation failed. Please try again."),
    ("error.empty_instruction", "Describe the change you want to make."),
    ("error.edit_failed", "Image edit failed. Please try again."),
    ("error.selection_required", "Select an image for this scene before continuing."),
    ("error.no_scenes", "No scenes were generated. Go back and try again."),
    ("error.sequential_active", "Finish or cancel the sequential generation first."),
    ("error.generic", "Something went wrong. Please try again."),
];

const KO: &[(&str, &str)] = &[
    ("step.idea", "스토리 아이디어"),
    ("step.generator", "프롬프트 선택"),
    ("step.overview", "장면 개요"),
    ("action.brainstorm", "아이디어 구상"),
    ("action.submit", "장면 생성"),
    ("action.previous", "이전"),
    ("action.next", "다음"),
    ("action.finish", "완료"),
    ("action.back", "돌아가기"),
    ("action.generate_all", "전체 생성"),
    ("action.regenerate", "다시 생성"),
    ("action.download_all", "선택한 이미지 모두 다운로드"),
    ("action.sequential", "순차 생성"),
    ("action.cancel", "취소"),
    ("action.clear_mask", "지우기"),
    ("action.apply_continue", "적용 후 계속 편집"),
    ("action.apply_finish", "적용 후 완료"),
    ("label.image_prompt", "이미지 프롬프트"),
    ("label.video_prompt", "비디오 프롬프트"),
    ("label.variant", "옵션"),
    ("label.progress", "장면 생성 중"),
    ("error.empty_idea", "스토리 아이디어를 입력해 주세요."),
    ("error.missing_reference", "장면을 생성하기 전에 참조 이미지를 업로드해 주세요."),
    ("error.file_type", "PNG, JPEG, GIF 이미지만 업로드할 수 있습니다."),
    ("error.file_size", "이미지는 10MB 이하여야 합니다."),
    ("error.missing_credential", "API 키가 설정되지 않았습니다. GEMINI_API_KEY를 설정한 뒤 다시 시작하세요."),
    ("error.brainstorm_failed", "아이디어를 구상하지 못했습니다. 다시 시도해 주세요."),
    ("error.scene_generation_failed", "장면 생성에 실패했습니다. 다시 시도해 주세요."),
    ("error.image_generation_failed", "이미지 생성에 실패했습니다. 다시 시도해 주세요."),
    ("error.empty_instruction", "원하는 변경 사항을 입력해 주세요."),
    ("error.edit_failed", "이미지 편집에 실패했습니다. 다시 시도해 주세요."),
    ("error.selection_required", "계속하려면 이 장면의 이미지를 선택하세요."),
    ("error.no_scenes", "생성된 장면이 없습니다. 돌아가서 다시 시도해 주세요."),
    ("error.sequential_active", "먼저 순차 생성을 완료하거나 취소하세요."),
    ("error.generic", "문제가 발생했습니다. 다시 시도해 주세요."),
];

static TABLES: Lazy<HashMap<Locale, HashMap<&'static str, &'static str>>> = Lazy::new(|| {
    let mut tables = HashMap::new();
    tables.insert(Locale::En, EN.iter().copied().collect());
    tables.insert(Locale::Ko, KO.iter().copied().collect());
    tables
});

/// Look up `key`, falling back to English and then to the key itself.
pub fn tr(locale: Locale, key: &'static str) -> &'static str {
    TABLES
        .get(&locale)
        .and_then(|table| table.get(key))
        .or_else(|| TABLES.get(&Locale::En).and_then(|table| table.get(key)))
        .copied()
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_english_key_has_a_korean_entry() {
        for (key, _) in EN {
            assert!(KO.iter().any(|(k, _)| k == key), "missing ko entry for {key}");
        }
    }

    #[test]
    fn lookup_falls_back() {
        assert_eq!(tr(Locale::Ko, "action.next"), "다음");
        assert_eq!(tr(Locale::En, "action.next"), "Next");
        assert_eq!(tr(Locale::Ko, "no.such.key"), "no.such.key");
        assert_eq!(Locale::parse("KO"), Some(Locale::Ko));
        assert_eq!(Locale::parse("fr"), None);
    }
}
