use std::time::{Duration, Instant};

/// Preview timing/layout constants. Implementation choices, kept
/// configurable rather than pinned as invariants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewTuning {
    /// A burst of text edits inside this window collapses to one render.
    pub debounce: Duration,
    /// Smallest vertical share a line can legibly occupy; lines that would
    /// fall below it are silently truncated.
    pub min_line_height: f32,
}

impl Default for PreviewTuning {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            min_line_height: 18.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewLine {
    /// Well-formed math, delimiters stripped.
    Math(String),
    /// Fallback for a line that failed math validation; shown verbatim.
    Plain(String),
}

impl PreviewLine {
    pub fn text(&self) -> &str {
        match self {
            Self::Math(text) | Self::Plain(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewDocument {
    /// Nothing to preview. Shown for empty/whitespace-only input, never
    /// treated as an error.
    Placeholder,
    Lines(Vec<PreviewLine>),
}

impl PreviewDocument {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

/// Splits the buffer into non-empty trimmed lines and renders each one
/// standalone. A malformed line degrades to plain text for that line only.
pub fn render(latex: &str) -> PreviewDocument {
    let lines: Vec<&str> = latex
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return PreviewDocument::Placeholder;
    }
    PreviewDocument::Lines(lines.into_iter().map(render_line).collect())
}

fn render_line(line: &str) -> PreviewLine {
    let cleaned = strip_delimiters(line);
    if !cleaned.is_empty() && math_line_is_well_formed(&cleaned) {
        PreviewLine::Math(cleaned)
    } else {
        PreviewLine::Plain(line.to_string())
    }
}

/// Removes `$` markers and `\[ \]` / `\( \)` wrappers so each line renders
/// standalone.
fn strip_delimiters(line: &str) -> String {
    let mut text = line.trim();
    for (open, close) in [("\\[", "\\]"), ("\\(", "\\)")] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            text = inner;
        }
    }
    text.replace('$', "").trim().to_string()
}

/// Cheap well-formedness check: balanced groups, paired `\left`/`\right`,
/// no dangling escape at end of line.
fn math_line_is_well_formed(line: &str) -> bool {
    let mut depth: i32 = 0;
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && line.matches("\\left").count() == line.matches("\\right").count()
}

/// Vertical layout of a rendered document: each line gets an even share of
/// the available height, top-aligned; placement simply stops when lines can
/// no longer fit (no scrolling, no overflow indicator).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineLayout {
    pub step: f32,
    pub visible: usize,
}

pub fn layout_lines(line_count: usize, available_height: f32, tuning: PreviewTuning) -> LineLayout {
    if line_count == 0 || available_height <= 0.0 {
        return LineLayout {
            step: 0.0,
            visible: 0,
        };
    }
    let step = available_height / line_count as f32;
    let visible = if step >= tuning.min_line_height {
        line_count
    } else {
        (available_height / tuning.min_line_height).floor() as usize
    };
    LineLayout { step, visible }
}

/// Collapses a burst of text-change events into a single render of the final
/// state. Driven by an injected clock so the window is testable.
#[derive(Debug)]
pub struct PreviewDebouncer {
    interval: Duration,
    pending: Option<(Instant, String)>,
}

impl PreviewDebouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    pub fn note_edit(&mut self, text: &str, now: Instant) {
        self.pending = Some((now, text.to_string()));
    }

    /// Returns the settled text once the edit burst has been quiet for the
    /// configured interval.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let quiet = match &self.pending {
            Some((last_edit, _)) => now.duration_since(*last_edit) >= self.interval,
            None => false,
        };
        if quiet {
            self.pending.take().map(|(_, text)| text)
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
