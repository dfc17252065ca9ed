use clap::ValueEnum;
use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)([^.!?]+[.!?]+)|([^.!?]+$)").unwrap());

pub const VOICES: &[&str] = &[
    "en-US-JennyNeural",
    "en-US-GuyNeural",
    "en-US-AriaNeural",
    "en-US-DavisNeural",
    "en-US-SaraNeural",
    "en-US-TonyNeural",
    "en-US-ChristopherNeural",
];

pub const THEMES: &[&str] = &[
    "nature landscapes",
    "city timelapse",
    "ocean waves",
    "forest scenes",
    "mountain views",
    "sunset sky",
    "abstract patterns",
    "geometric shapes",
    "colorful gradients",
    "minimalist design",
    "modern architecture",
    "aerial footage",
    "macro photography",
    "light trails",
    "water reflections",
    "space",
    "technology",
    "futuristic",
    "neon lights",
    "liquid art",
];

// keywords -> themes that suit them
const THEME_RULES: &[(&[&str], &[&str])] = &[
    (
        &["nature", "earth", "planet", "environment"],
        &["nature landscapes", "forest scenes", "mountain views"],
    ),
    (
        &["space", "universe", "stars", "galaxy"],
        &["space", "abstract patterns", "colorful gradients"],
    ),
    (
        &["ocean", "sea", "water", "marine"],
        &["ocean waves", "water reflections"],
    ),
    (
        &["city", "urban", "building", "architecture"],
        &["city timelapse", "modern architecture", "aerial footage"],
    ),
    (
        &["technology", "computer", "ai", "robot"],
        &["technology", "futuristic", "neon lights"],
    ),
];

pub const SHORTS_SCRIPT_MAX: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Quality {
    Standard,
    High,
    Premium,
}

/// Rendering knobs that vary with [`Quality`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySettings {
    pub clip_duration: u32,
    pub font_size: u32,
    pub stroke_width: f32,
    pub bgm_volume: f32,
    pub voice_volume: f32,
    pub threads: u32,
}

impl Quality {
    pub fn settings(self) -> QualitySettings {
        match self {
            Quality::Standard => QualitySettings {
                clip_duration: 4,
                font_size: 60,
                stroke_width: 2.0,
                bgm_volume: 0.2,
                voice_volume: 1.0,
                threads: 2,
            },
            Quality::High => QualitySettings {
                clip_duration: 3,
                font_size: 70,
                stroke_width: 2.5,
                bgm_volume: 0.15,
                voice_volume: 1.0,
                threads: 4,
            },
            Quality::Premium => QualitySettings {
                clip_duration: 2,
                font_size: 80,
                stroke_width: 3.0,
                bgm_volume: 0.1,
                voice_volume: 1.0,
                threads: 6,
            },
        }
    }

    /// Courtesy pause between two submissions of a batch.
    pub fn batch_delay(self) -> Duration {
        match self {
            Quality::Premium => Duration::from_secs(15),
            _ => Duration::from_secs(10),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Standard => "standard",
            Quality::High => "high",
            Quality::Premium => "premium",
        }
    }
}

pub fn pick_voice<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    VOICES.choose(rng).copied().unwrap_or(VOICES[0])
}

/// Picks a background theme matching the first keyword group found in the
/// text, or any theme when nothing matches.
pub fn select_theme<R: Rng + ?Sized>(text: &str, rng: &mut R) -> &'static str {
    let words: Vec<String> = WORD
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect();

    let candidates = THEME_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| words.iter().any(|w| w == k)))
        .map(|(_, themes)| *themes)
        .unwrap_or(THEMES);
    candidates.choose(rng).copied().unwrap_or(THEMES[0])
}

/// Shortens a fact to fit a short-form clip, cutting at sentence ends where
/// possible.
pub fn optimize_script(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let sentences: Vec<&str> = SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut out = String::new();
    for s in sentences {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + s.chars().count() > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(s);
    }

    if out.is_empty() {
        warn!("No sentence fits in {} chars; truncating", max_chars);
        let head: String = text.chars().take(max_chars).collect();
        return format!("{}...", head.trim_end());
    }
    out
}
