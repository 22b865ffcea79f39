//! Topic prompts offered before the first user message.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionIcon {
    Target,
    Users,
    Calendar,
    Briefcase,
}

impl SuggestionIcon {
    /// Single-glyph stand-in for text front ends.
    pub fn glyph(&self) -> &'static str {
        match self {
            SuggestionIcon::Target => "◎",
            SuggestionIcon::Users => "👥",
            SuggestionIcon::Calendar => "📅",
            SuggestionIcon::Briefcase => "💼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub icon: SuggestionIcon,
    pub title: &'static str,
    /// Sent verbatim when the suggestion is picked.
    pub prompt: &'static str,
}

pub const SUGGESTIONS: [Suggestion; 4] = [
    Suggestion {
        icon: SuggestionIcon::Target,
        title: "Konsep Dasar",
        prompt: "Jelaskan konsep dasar manajemen proyek dan mengapa penting dalam organisasi",
    },
    Suggestion {
        icon: SuggestionIcon::Users,
        title: "Peran Project Manager",
        prompt: "Apa saja peran dan tanggung jawab seorang project manager?",
    },
    Suggestion {
        icon: SuggestionIcon::Calendar,
        title: "Siklus Hidup Proyek",
        prompt: "Jelaskan tahapan-tahapan dalam siklus hidup proyek beserta karakteristiknya",
    },
    Suggestion {
        icon: SuggestionIcon::Briefcase,
        title: "Metodologi Proyek",
        prompt: "Bandingkan metodologi Waterfall dan Agile dalam manajemen proyek",
    },
];

pub fn get(index: usize) -> Option<&'static Suggestion> {
    SUGGESTIONS.get(index)
}
