use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Art,
    Speech,
    Support,
    Community,
    Parkinsons,
    Default,
}

/// Tag to category, highest priority first.
const CATEGORY_PRIORITY: &[(&str, Category)] = &[
    ("art", Category::Art),
    ("speech", Category::Speech),
    ("support", Category::Support),
    ("community", Category::Community),
    ("parkinson\u{2019}s", Category::Parkinsons),
    ("parkinson's", Category::Parkinsons),
    ("parkinsons", Category::Parkinsons),
];

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Art => "art",
            Self::Speech => "speech",
            Self::Support => "support",
            Self::Community => "community",
            Self::Parkinsons => "parkinsons",
            Self::Default => "default",
        }
    }

    pub fn css_class(self) -> String {
        format!("calendar-dot-{}", self.as_str())
    }
}

pub fn resolve_category(tags: &[String]) -> Category {
    let normalized: Vec<String> = tags.iter().map(|tag| tag.trim().to_lowercase()).collect();
    CATEGORY_PRIORITY
        .iter()
        .find(|(tag, _)| normalized.iter().any(|candidate| candidate == tag))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Default)
}
