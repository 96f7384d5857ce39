use crate::overlay::crop::CropTuning;
use crate::overlay::model::{BrushStyle, InkColor};
use crate::overlay::preview::PreviewTuning;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Built-in recognition prompt, used when no prompt file exists.
pub const DEFAULT_PROMPT: &str = "\
From the provided image, convert the handwritten mathematics into LaTeX. Follow these rules exactly:

1. Each line of handwritten text must be on its own new line in the output.
2. Enclose each separate line of LaTeX within single dollar signs ($).
3. Your entire response must consist ONLY of the resulting LaTeX code. Do not add any introductory text, explanations, or markdown formatting like ```latex.";

pub const SETTINGS_FILE: &str = "settings.json";

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_prompt_file() -> String {
    "prompt.txt".to_string()
}

fn default_brush_width() -> u32 {
    3
}

fn default_ink_color() -> InkColor {
    InkColor::INK_BLUE
}

fn default_crop_padding() -> i32 {
    30
}

fn default_min_crop_size() -> u32 {
    100
}

fn default_debounce_ms() -> u64 {
    500
}

/// Read-only overlay settings. Every field is tolerant of being absent so an
/// older or hand-edited file still loads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Recognition API key. When missing here and in the environment, the
    /// overlay still opens and conversions fail visibly instead.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Prompt file name, resolved relative to the settings directory.
    #[serde(default = "default_prompt_file")]
    pub prompt_file: String,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default = "default_brush_width")]
    pub brush_width: u32,
    #[serde(default = "default_ink_color")]
    pub ink_color: InkColor,
    #[serde(default = "default_crop_padding")]
    pub crop_padding: i32,
    #[serde(default = "default_min_crop_size")]
    pub min_crop_size: u32,
    #[serde(default = "default_debounce_ms")]
    pub preview_debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            prompt_file: default_prompt_file(),
            debug_logging: false,
            brush_width: default_brush_width(),
            ink_color: default_ink_color(),
            crop_padding: default_crop_padding(),
            min_crop_size: default_min_crop_size(),
            preview_debounce_ms: default_debounce_ms(),
        }
    }
}

impl Settings {
    pub fn config_dir() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("inktex"))
    }

    /// Loads settings from the platform config directory; a missing file is
    /// not an error and yields the defaults.
    pub fn load_default() -> Result<Self> {
        match Self::config_dir() {
            Some(dir) => Self::load(&dir.join(SETTINGS_FILE)),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse settings file {}", path.display()))
    }

    /// Explicit key first, then the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Prompt text for the recognition boundary: the configured prompt file
    /// when it exists, otherwise the built-in default.
    pub fn prompt(&self, config_dir: Option<&Path>) -> String {
        let Some(dir) = config_dir else {
            return DEFAULT_PROMPT.to_string();
        };
        let path = dir.join(&self.prompt_file);
        match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => DEFAULT_PROMPT.to_string(),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "prompt file unavailable, using built-in prompt");
                DEFAULT_PROMPT.to_string()
            }
        }
    }

    pub fn brush(&self) -> BrushStyle {
        BrushStyle {
            width: self.brush_width.max(1),
            color: self.ink_color,
        }
    }

    pub fn crop_tuning(&self) -> CropTuning {
        CropTuning {
            padding: self.crop_padding.max(0),
            min_width: self.min_crop_size,
            min_height: self.min_crop_size,
        }
    }

    pub fn preview_tuning(&self) -> PreviewTuning {
        PreviewTuning {
            debounce: Duration::from_millis(self.preview_debounce_ms),
            ..PreviewTuning::default()
        }
    }
}
