//! Marker annotations: sources, label placement and outlined drawing.
//!
//! Marker files hold one marker per line:
//!
//! ```text
//! # latitude longitude "label" [align=left|right|above|below]
//! 40.71 -74.01 "New York" align=above
//! 35.68 139.69 Tokyo
//! ```

use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use thiserror::Error;

use super::color::Color;
use crate::config::BUILTIN_MARKERS;

/// Where a label sits relative to its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerAlign {
    /// Same as [`MarkerAlign::Right`].
    #[default]
    Default,
    Left,
    Right,
    Above,
    Below,
}

impl std::str::FromStr for MarkerAlign {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            other => Err(format!("unknown alignment '{other}'")),
        }
    }
}

/// A single annotated location.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub label: Option<String>,
    pub align: MarkerAlign,
}

impl Marker {
    pub fn new(latitude: f64, longitude: f64, label: Option<&str>, align: MarkerAlign) -> Self {
        Self {
            latitude,
            longitude,
            label: label.map(str::to_string),
            align,
        }
    }
}

/// Supplies the markers to draw; reloaded on every frame.
pub trait MarkerSource {
    fn load(&mut self) -> Result<Vec<Marker>>;
}

/// Compiled-in list of world cities.
pub struct BuiltinMarkers;

const BUILTIN: &[(f64, f64, &str, MarkerAlign)] = &[
    (35.68, 139.69, "Tokyo", MarkerAlign::Default),
    (37.57, 126.98, "Seoul", MarkerAlign::Left),
    (39.90, 116.40, "Beijing", MarkerAlign::Left),
    (1.35, 103.82, "Singapore", MarkerAlign::Default),
    (-6.21, 106.85, "Jakarta", MarkerAlign::Below),
    (28.61, 77.21, "Delhi", MarkerAlign::Default),
    (19.08, 72.88, "Mumbai", MarkerAlign::Left),
    (55.76, 37.62, "Moscow", MarkerAlign::Default),
    (41.01, 28.98, "Istanbul", MarkerAlign::Default),
    (30.04, 31.24, "Cairo", MarkerAlign::Default),
    (-1.29, 36.82, "Nairobi", MarkerAlign::Default),
    (6.52, 3.38, "Lagos", MarkerAlign::Default),
    (-33.92, 18.42, "Cape Town", MarkerAlign::Default),
    (52.52, 13.40, "Berlin", MarkerAlign::Right),
    (48.86, 2.35, "Paris", MarkerAlign::Below),
    (51.51, -0.13, "London", MarkerAlign::Above),
    (40.42, -3.70, "Madrid", MarkerAlign::Left),
    (64.15, -21.94, "Reykjavik", MarkerAlign::Default),
    (40.71, -74.01, "New York", MarkerAlign::Default),
    (19.43, -99.13, "Mexico City", MarkerAlign::Left),
    (34.05, -118.24, "Los Angeles", MarkerAlign::Left),
    (61.22, -149.90, "Anchorage", MarkerAlign::Default),
    (21.31, -157.86, "Honolulu", MarkerAlign::Default),
    (-12.05, -77.04, "Lima", MarkerAlign::Left),
    (-33.45, -70.67, "Santiago", MarkerAlign::Left),
    (-34.60, -58.38, "Buenos Aires", MarkerAlign::Default),
    (-22.91, -43.17, "Rio de Janeiro", MarkerAlign::Default),
    (-33.87, 151.21, "Sydney", MarkerAlign::Default),
    (-36.85, 174.76, "Auckland", MarkerAlign::Default),
];

impl MarkerSource for BuiltinMarkers {
    fn load(&mut self) -> Result<Vec<Marker>> {
        Ok(BUILTIN
            .iter()
            .map(|&(latitude, longitude, label, align)| {
                Marker::new(latitude, longitude, Some(label), align)
            })
            .collect())
    }
}

/// Markers read from a text file.
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MarkerSource for MarkerFile {
    fn load(&mut self) -> Result<Vec<Marker>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read marker file {}", self.path.display()))?;
        parse_markers(&text)
            .with_context(|| format!("Invalid marker file {}", self.path.display()))
    }
}

/// Picks the marker source named by the `markers.file` setting.
pub fn source_for(file: &str) -> Box<dyn MarkerSource> {
    if file == BUILTIN_MARKERS {
        Box::new(BuiltinMarkers)
    } else {
        Box::new(MarkerFile::new(file))
    }
}

/// A malformed marker line.
#[derive(Debug, Error, PartialEq)]
#[error("line {line}: {message}")]
pub struct MarkerParseError {
    pub line: usize,
    pub message: String,
}

/// Parses marker file contents.
pub fn parse_markers(text: &str) -> Result<Vec<Marker>, MarkerParseError> {
    let mut markers = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let fail = |message: String| MarkerParseError { line, message };

        let tokens = tokenize(raw).map_err(fail)?;
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < 2 {
            return Err(fail("expected latitude and longitude".into()));
        }

        let latitude: f64 = tokens[0]
            .text()
            .parse()
            .map_err(|_| fail(format!("invalid latitude '{}'", tokens[0].text())))?;
        let longitude: f64 = tokens[1]
            .text()
            .parse()
            .map_err(|_| fail(format!("invalid longitude '{}'", tokens[1].text())))?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(fail(format!("latitude {latitude} out of range")));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(fail(format!("longitude {longitude} out of range")));
        }

        let mut label = None;
        let mut align = MarkerAlign::Default;
        for token in &tokens[2..] {
            match token {
                Token::Bare(word) => match word.split_once('=') {
                    Some(("align", value)) => align = value.parse().map_err(fail)?,
                    Some((key, _)) => return Err(fail(format!("unknown option '{key}'"))),
                    None if label.is_none() => label = Some(word.clone()),
                    None => return Err(fail(format!("unexpected '{word}'"))),
                },
                Token::Quoted(text) if label.is_none() => label = Some(text.clone()),
                Token::Quoted(text) => return Err(fail(format!("unexpected '\"{text}\"'"))),
            }
        }

        markers.push(Marker {
            latitude,
            longitude,
            label,
            align,
        });
    }

    Ok(markers)
}

/// A word from a marker line; quoted words are always label text.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Bare(String),
    Quoted(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Self::Bare(text) | Self::Quoted(text) => text,
        }
    }
}

/// Splits a line into whitespace-separated tokens, honouring double quotes
/// and stopping at an unquoted `#`.
fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '#' {
            break;
        } else if c == '"' {
            chars.next();
            let mut token = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => token.push(ch),
                    None => return Err("unterminated quote".into()),
                }
            }
            tokens.push(Token::Quoted(token));
        } else {
            let mut token = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == '#' {
                    break;
                }
                token.push(ch);
                chars.next();
            }
            tokens.push(Token::Bare(token));
        }
    }

    Ok(tokens)
}

/// Measured size of a label, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    /// Ink width of the label text
    pub width: f64,
    /// Font ascent above the baseline
    pub ascent: f64,
    /// Font descent below the baseline
    pub descent: f64,
}

/// Baseline origin of a label drawn next to a marker at (`x`, `y`).
pub fn label_anchor(align: MarkerAlign, x: i32, y: i32, metrics: &TextMetrics) -> (i32, i32) {
    let (x, y) = (f64::from(x), f64::from(y));
    let line_height = metrics.ascent + metrics.descent;
    let (ax, ay) = match align {
        MarkerAlign::Left => (x - (metrics.width + 4.0), y + line_height / 3.0),
        MarkerAlign::Right | MarkerAlign::Default => (x + 3.0, y + line_height / 3.0),
        MarkerAlign::Above => (x - metrics.width / 2.0, y - (metrics.descent + 4.0)),
        MarkerAlign::Below => (x - metrics.width / 2.0, y + metrics.ascent + 5.0),
    };
    (ax as i32, ay as i32)
}

/// Colors and font used for the overlay.
#[derive(Debug, Clone)]
pub struct MarkerStyle {
    /// Pango font description, e.g. "Sans 12"
    pub font: String,
    pub highlight: Color,
    pub outline: Color,
}

const OUTLINE_OFFSETS: [(f64, f64); 4] = [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)];

/// Draws one marker circle at (`x`, `y`) plus its label, if any.
pub fn draw_marker(
    ctx: &cairo::Context,
    x: i32,
    y: i32,
    marker: &Marker,
    style: &MarkerStyle,
) -> Result<(), cairo::Error> {
    ctx.save()?;
    draw_outlined_circle(ctx, x, y, style)?;
    if let Some(label) = marker.label.as_deref() {
        draw_label(ctx, x, y, label, marker.align, style)?;
    }
    ctx.restore()
}

fn draw_outlined_circle(
    ctx: &cairo::Context,
    x: i32,
    y: i32,
    style: &MarkerStyle,
) -> Result<(), cairo::Error> {
    let (x, y) = (f64::from(x), f64::from(y));
    ctx.set_antialias(cairo::Antialias::None);
    ctx.set_line_width(1.0);

    ctx.set_source_rgb(style.outline.r, style.outline.g, style.outline.b);
    ctx.new_sub_path();
    ctx.arc(x, y, 4.0, 0.0, 2.0 * PI);
    ctx.stroke()?;
    ctx.new_sub_path();
    ctx.arc(x, y, 2.0, 0.0, 2.0 * PI);
    ctx.stroke()?;

    ctx.set_source_rgb(style.highlight.r, style.highlight.g, style.highlight.b);
    ctx.new_sub_path();
    ctx.arc(x, y, 3.0, 0.0, 2.0 * PI);
    ctx.stroke()
}

fn draw_label(
    ctx: &cairo::Context,
    x: i32,
    y: i32,
    text: &str,
    align: MarkerAlign,
    style: &MarkerStyle,
) -> Result<(), cairo::Error> {
    // Crisp, unhinted glyphs read better over the busy map than smoothed ones.
    let mut options = cairo::FontOptions::new()?;
    options.set_hint_style(cairo::HintStyle::None);
    options.set_antialias(cairo::Antialias::None);
    ctx.set_font_options(&options);

    let layout = pangocairo::functions::create_layout(ctx);
    let font_desc = pango::FontDescription::from_string(&style.font);
    layout.set_font_description(Some(&font_desc));
    layout.set_text(text);

    let scale = f64::from(pango::SCALE);
    let font_metrics = layout.context().metrics(Some(&font_desc), None);
    let (ink_rect, _logical_rect) = layout.pixel_extents();
    let metrics = TextMetrics {
        width: f64::from(ink_rect.width()),
        ascent: f64::from(font_metrics.ascent()) / scale,
        descent: f64::from(font_metrics.descent()) / scale,
    };

    let (ax, ay) = label_anchor(align, x, y, &metrics);
    // Pango positions layouts by their top-left corner, not the baseline.
    let baseline = f64::from(layout.baseline()) / scale;
    let (ax, top) = (f64::from(ax), f64::from(ay) - baseline);

    ctx.set_source_rgb(style.outline.r, style.outline.g, style.outline.b);
    for (dx, dy) in OUTLINE_OFFSETS {
        ctx.move_to(ax + dx, top + dy);
        pangocairo::functions::show_layout(ctx, &layout);
    }

    ctx.set_source_rgb(style.highlight.r, style.highlight.g, style.highlight.b);
    ctx.move_to(ax, top);
    pangocairo::functions::show_layout(ctx, &layout);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const METRICS: TextMetrics = TextMetrics {
        width: 30.0,
        ascent: 9.0,
        descent: 3.0,
    };

    #[test]
    fn label_anchor_follows_alignment() {
        assert_eq!(label_anchor(MarkerAlign::Left, 100, 50, &METRICS), (66, 54));
        assert_eq!(label_anchor(MarkerAlign::Right, 100, 50, &METRICS), (103, 54));
        assert_eq!(label_anchor(MarkerAlign::Default, 100, 50, &METRICS), (103, 54));
        assert_eq!(label_anchor(MarkerAlign::Above, 100, 50, &METRICS), (85, 43));
        assert_eq!(label_anchor(MarkerAlign::Below, 100, 50, &METRICS), (85, 64));
    }

    #[test]
    fn parses_quoted_labels_alignment_and_comments() {
        let text = "# cities\n\n40.71 -74.01 \"New York\" align=above\n35.68 139.69 Tokyo # capital\n-33.9 151.2\n";
        let markers = parse_markers(text).unwrap();

        assert_eq!(
            markers,
            vec![
                Marker::new(40.71, -74.01, Some("New York"), MarkerAlign::Above),
                Marker::new(35.68, 139.69, Some("Tokyo"), MarkerAlign::Default),
                Marker::new(-33.9, 151.2, None, MarkerAlign::Default),
            ]
        );
    }

    #[test]
    fn quoted_labels_may_contain_equals_signs() {
        let text = "10 20 \"E=mc2\" align=below\n30 40 \"align=left\"\n";
        let markers = parse_markers(text).unwrap();
        assert_eq!(
            markers,
            vec![
                Marker::new(10.0, 20.0, Some("E=mc2"), MarkerAlign::Below),
                Marker::new(30.0, 40.0, Some("align=left"), MarkerAlign::Default),
            ]
        );

        let err = parse_markers("10 20 E=mc2\n").unwrap_err();
        assert!(err.message.contains("unknown option 'E'"));
    }

    #[test]
    fn tokenizer_tags_quoted_words() {
        assert_eq!(
            tokenize("1 2 \"a b\" c=d # x").unwrap(),
            vec![
                Token::Bare("1".into()),
                Token::Bare("2".into()),
                Token::Quoted("a b".into()),
                Token::Bare("c=d".into()),
            ]
        );
    }

    #[test]
    fn parse_errors_report_line_numbers() {
        let err = parse_markers("10 20 ok\nabc 20 \"bad\"\n").unwrap_err();
        assert_eq!(err.line, 2);

        let err = parse_markers("10 20 \"x\" align=sideways\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("sideways"));

        let err = parse_markers("95 20\n").unwrap_err();
        assert!(err.message.contains("out of range"));

        assert!(parse_markers("1 2 \"open\n").is_err());
    }

    #[test]
    fn builtin_markers_are_labelled_and_in_range() {
        let markers = BuiltinMarkers.load().unwrap();
        assert!(!markers.is_empty());
        for marker in &markers {
            assert!(marker.label.is_some());
            assert!((-90.0..=90.0).contains(&marker.latitude));
            assert!((-180.0..=180.0).contains(&marker.longitude));
        }
    }

    #[test]
    fn marker_file_source_reads_from_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("markers.txt");
        fs::write(&path, "0 0 \"Null Island\" align=below\n").unwrap();

        let mut source = MarkerFile::new(&path);
        let markers = source.load().unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].align, MarkerAlign::Below);

        let mut missing = MarkerFile::new(temp.path().join("absent.txt"));
        assert!(missing.load().is_err());
    }
}
