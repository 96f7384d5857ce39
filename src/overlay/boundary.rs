use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::Local;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The sole interaction with the external recognition service: PNG bytes and
/// prompt text in, LaTeX text or an error out. Single attempt per call; the
/// caller decides whether to re-submit.
pub trait RecognitionBoundary: Send + Sync {
    fn recognize(&self, image_png: &[u8], prompt: &str) -> Result<String>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini `generateContent` implementation of the recognition boundary.
pub struct GeminiBoundary {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl GeminiBoundary {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build recognition http client")?;
        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

impl RecognitionBoundary for GeminiBoundary {
    fn recognize(&self, image_png: &[u8], prompt: &str) -> Result<String> {
        let url = format!(
            "{GEMINI_ENDPOINT}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": {
                        "mime_type": "image/png",
                        "data": general_purpose::STANDARD.encode(image_png),
                    }},
                ],
            }],
        });

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .body(serde_json::to_string(&body).context("serialize recognition request")?)
            .send()
            .context("send recognition request")?;

        let status = response.status();
        let text = response.text().context("read recognition response")?;
        if !status.is_success() {
            return Err(anyhow!("recognition service returned {status}"));
        }

        let value: serde_json::Value =
            serde_json::from_str(&text).context("parse recognition response")?;
        let latex = value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| anyhow!("recognition response missing text candidate"))?;
        Ok(latex.trim().to_string())
    }
}

/// Stand-in boundary used when no API key is configured. The overlay still
/// opens; conversion attempts surface this message instead of crashing.
pub struct UnconfiguredBoundary;

impl RecognitionBoundary for UnconfiguredBoundary {
    fn recognize(&self, _image_png: &[u8], _prompt: &str) -> Result<String> {
        Err(anyhow!(
            "no recognition api key configured; set api_key in settings.json or GEMINI_API_KEY"
        ))
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .context("encode cropped image as png")?;
    Ok(bytes)
}

pub const SCRATCH_SUBDIR: &str = "inktex";

pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(SCRATCH_SUBDIR)
}

/// Writes a timestamped scratch copy of the exact image sent for recognition.
pub fn write_scratch_image(
    image: &RgbaImage,
    output_dir: &Path,
    now: chrono::DateTime<Local>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create scratch folder {}", output_dir.display()))?;
    let path = output_dir.join(format!("sketch_{}.png", now.format("%Y%m%d_%H%M%S")));
    image
        .save(&path)
        .with_context(|| format!("write scratch image {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgba;

    #[test]
    fn png_encoding_round_trips_dimensions() {
        let image = RgbaImage::from_pixel(12, 7, Rgba([1, 2, 3, 255]));
        let bytes = encode_png(&image).expect("png bytes");
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!(decoded.width(), 12);
        assert_eq!(decoded.height(), 7);
    }

    #[test]
    fn scratch_image_lands_in_timestamped_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let now = Local
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("date time");

        let path = write_scratch_image(&image, dir.path(), now).expect("scratch path");
        assert!(path.ends_with("sketch_20260102_030405.png"));
        assert!(path.exists());
    }

    #[test]
    fn unconfigured_boundary_reports_missing_key() {
        let err = UnconfiguredBoundary
            .recognize(&[], "prompt")
            .expect_err("must fail");
        assert!(err.to_string().contains("api key"));
    }
}
