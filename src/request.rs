//! Typed body for `POST /api/v1/videos`.
//!
//! Every option the rendering service understands is a field here; the
//! builder fills them from a [`ContentItem`] and a [`Style`], and
//! [`GenerationRequest::validate`] runs before anything goes on the wire.

use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;

use crate::error::JobError;
use crate::facts::ContentItem;
use crate::style::{self, Quality};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VideoAspect {
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcatMode {
    Random,
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitionMode {
    None,
    Shuffle,
    FadeIn,
    FadeOut,
    SlideIn,
    SlideOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePosition {
    Top,
    Center,
    Bottom,
}

/// Where the service pulls background footage from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VideoSource {
    Local,
    Pexels,
    Pixabay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub provider: VideoSource,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub video_subject: String,
    pub video_script: String,
    pub video_aspect: VideoAspect,
    pub video_concat_mode: ConcatMode,
    pub video_transition_mode: TransitionMode,
    pub video_clip_duration: u32,
    pub video_count: u32,
    pub video_source: VideoSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_terms: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub video_materials: Vec<Material>,
    pub voice_name: String,
    pub voice_rate: f32,
    pub voice_volume: f32,
    pub bgm_type: String,
    pub bgm_volume: f32,
    pub subtitle_enabled: bool,
    pub subtitle_provider: String,
    pub subtitle_position: SubtitlePosition,
    pub font_size: u32,
    pub text_fore_color: String,
    pub stroke_color: String,
    pub stroke_width: f32,
    pub n_threads: u32,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<(), JobError> {
        let invalid = |msg: String| Err(JobError::InvalidRequest(msg));

        if self.video_subject.trim().is_empty() {
            return invalid("empty subject".into());
        }
        if self.video_script.trim().is_empty() {
            return invalid("empty script".into());
        }
        if self.voice_name.trim().is_empty() {
            return invalid("no voice selected".into());
        }
        if self.video_count == 0 {
            return invalid("video_count must be at least 1".into());
        }
        if self.video_clip_duration == 0 {
            return invalid("clip duration must be at least 1s".into());
        }
        if !(0.0..=2.0).contains(&self.voice_volume) {
            return invalid(format!("voice volume {} out of range", self.voice_volume));
        }
        if !(0.0..=1.0).contains(&self.bgm_volume) {
            return invalid(format!("bgm volume {} out of range", self.bgm_volume));
        }
        for color in [&self.text_fore_color, &self.stroke_color] {
            if !is_hex_color(color) {
                return invalid(format!("bad color {color:?}"));
            }
        }
        match self.video_source {
            VideoSource::Local if self.video_materials.is_empty() => {
                invalid("local source needs at least one material".into())
            }
            VideoSource::Pexels | VideoSource::Pixabay
                if self
                    .video_terms
                    .as_deref()
                    .is_none_or(|t| t.trim().is_empty()) =>
            {
                invalid("stock source needs a search term".into())
            }
            _ => Ok(()),
        }
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Presentation choices for one job. Anything left as `None` is picked per
/// item at build time.
#[derive(Debug, Clone)]
pub struct Style {
    pub quality: Quality,
    pub voice: Option<String>,
    pub source: VideoSource,
    pub theme: Option<String>,
    pub materials: Vec<PathBuf>,
    pub aspect: VideoAspect,
    pub script_max_chars: usize,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            quality: Quality::High,
            voice: None,
            source: VideoSource::Pexels,
            theme: None,
            materials: Vec::new(),
            aspect: VideoAspect::Portrait,
            script_max_chars: style::SHORTS_SCRIPT_MAX,
        }
    }
}

pub struct RequestBuilder<'a> {
    style: &'a Style,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(style: &'a Style) -> Self {
        Self { style }
    }

    pub fn for_item<R: rand::Rng + ?Sized>(
        &self,
        item: &ContentItem,
        rng: &mut R,
    ) -> GenerationRequest {
        let style = self.style;
        let knobs = style.quality.settings();
        let voice = style
            .voice
            .clone()
            .unwrap_or_else(|| style::pick_voice(rng).to_string());

        let (video_terms, video_materials) = match style.source {
            VideoSource::Local => {
                let materials = rand::seq::SliceRandom::choose(style.materials.as_slice(), rng)
                    .map(|p| Material {
                        provider: VideoSource::Local,
                        url: p.display().to_string(),
                    })
                    .into_iter()
                    .collect();
                (None, materials)
            }
            VideoSource::Pexels | VideoSource::Pixabay => {
                let theme = style
                    .theme
                    .clone()
                    .unwrap_or_else(|| style::select_theme(&item.text, rng).to_string());
                (Some(theme), Vec::new())
            }
        };

        GenerationRequest {
            video_subject: item.text.clone(),
            video_script: style::optimize_script(&item.text, style.script_max_chars),
            video_aspect: style.aspect,
            video_concat_mode: ConcatMode::Random,
            video_transition_mode: TransitionMode::FadeIn,
            video_clip_duration: knobs.clip_duration,
            video_count: 1,
            video_source: style.source,
            video_terms,
            video_materials,
            voice_name: voice,
            voice_rate: 1.0,
            voice_volume: knobs.voice_volume,
            bgm_type: "random".into(),
            bgm_volume: knobs.bgm_volume,
            subtitle_enabled: true,
            subtitle_provider: "edge".into(),
            subtitle_position: SubtitlePosition::Bottom,
            font_size: knobs.font_size,
            text_fore_color: "#FFFFFF".into(),
            stroke_color: "#000000".into(),
            stroke_width: knobs.stroke_width,
            n_threads: knobs.threads,
        }
    }
}
