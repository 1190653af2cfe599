use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Advance used per character when no font can be found.
const FALLBACK_CHAR_RATIO: f32 = 0.56;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of a single line of text. Falls back to a fixed per-character
/// advance when the family cannot be resolved.
pub fn text_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    if text.is_empty() || font_size <= 0.0 {
        return 0.0;
    }
    let measured = TEXT_MEASURER
        .lock()
        .ok()
        .and_then(|mut guard| guard.measure(text, font_size, font_family));
    measured.unwrap_or_else(|| fallback_width(text, font_size))
}

/// Width and height of a possibly multi-line label.
pub fn label_extent(text: &str, font_size: f32, font_family: &str, line_height: f32) -> (f32, f32) {
    let lines: Vec<&str> = text.lines().collect();
    let width = lines
        .iter()
        .map(|line| text_width(line, font_size, font_family))
        .fold(0.0, f32::max);
    let height = lines.len().max(1) as f32 * font_size * line_height;
    (width, height)
}

fn fallback_width(text: &str, font_size: f32) -> f32 {
    text.chars().filter(|ch| *ch != '\n').count() as f32 * font_size * FALLBACK_CHAR_RATIO
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontData>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_string();
        if !self.cache.contains_key(&key) {
            let loaded = self.load(font_family);
            self.cache.insert(key.clone(), loaded);
        }
        self.cache.get(&key)?.as_ref()?.measure(text, font_size)
    }

    fn load(&mut self, font_family: &str) -> Option<FontData> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                "monospace" | "ui-monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontData::new(data.to_vec(), index))
            .flatten()
    }
}

/// Raw face bytes plus a precomputed ASCII advance table.
struct FontData {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    ascii_advances: [u16; 128],
}

impl FontData {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1) as f32;
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
        })
    }

    fn measure(&self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * FALLBACK_CHAR_RATIO;
        let advance = |units: u16| {
            if units == 0 {
                fallback
            } else {
                units as f32 * scale
            }
        };

        if text.is_ascii() {
            let width: f32 = text
                .bytes()
                .filter(|byte| *byte != b'\n')
                .map(|byte| advance(self.ascii_advances[byte as usize]))
                .sum();
            return Some(width);
        }

        let face = Face::parse(&self.data, self.index).ok()?;
        let width: f32 = text
            .chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                let units = face
                    .glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .unwrap_or(0);
                advance(units)
            })
            .sum();
        Some(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(text_width("", 14.0, "sans-serif"), 0.0);
        assert_eq!(text_width("abc", 0.0, "sans-serif"), 0.0);
    }

    #[test]
    fn wider_text_measures_wider() {
        let short = text_width("ab", 14.0, "sans-serif");
        let long = text_width("abcdefgh", 14.0, "sans-serif");
        assert!(long > short);
        assert!(short > 0.0);
    }

    #[test]
    fn multi_line_labels_stack() {
        let (_, one) = label_extent("a", 10.0, "sans-serif", 1.5);
        let (_, two) = label_extent("a\nb", 10.0, "sans-serif", 1.5);
        assert_eq!(one, 15.0);
        assert_eq!(two, 30.0);
    }

    #[test]
    fn fallback_scales_with_length() {
        assert_eq!(fallback_width("abcd", 10.0), 4.0 * 10.0 * FALLBACK_CHAR_RATIO);
    }
}
