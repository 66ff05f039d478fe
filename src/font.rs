// Helvetica AFM advance widths in 1/1000 em for printable ASCII. Latin-1
// letters borrow the width of their unaccented base letter.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :;<=>?@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [\]^_`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {|}~
];

const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    333, 333, 584, 584, 584, 611, 975, // :;<=>?@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    333, 278, 333, 584, 556, 333, // [\]^_`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a-m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n-z
    389, 280, 389, 584, // {|}~
];

const FALLBACK_WIDTH: u16 = 556;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
}

impl FontFace {
    pub fn from_name(name: &str) -> Self {
        if name.to_ascii_lowercase().contains("bold") {
            FontFace::Bold
        } else {
            FontFace::Regular
        }
    }

    fn table(self) -> &'static [u16; 95] {
        match self {
            FontFace::Regular => &HELVETICA_ASCII,
            FontFace::Bold => &HELVETICA_BOLD_ASCII,
        }
    }
}

fn base_letter(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        'º' | 'ª' => 'o',
        other => other,
    }
}

pub fn char_width(face: FontFace, ch: char) -> u16 {
    let ch = base_letter(ch);
    let code = ch as u32;
    if (32..=126).contains(&code) {
        face.table()[(code - 32) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

/// Width of `text` in the same unit as `font_size`.
pub fn measure_text_width(face: FontFace, font_size: f32, text: &str) -> f32 {
    let units: u32 = text.chars().map(|ch| char_width(face, ch) as u32).sum();
    units as f32 * font_size / 1000.0
}

/// Greedy word wrap. Words longer than `max_width` are broken by character.
pub fn wrap_text(face: FontFace, font_size: f32, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if measure_text_width(face, font_size, &candidate) <= max_width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if measure_text_width(face, font_size, word) <= max_width {
                line = word.to_string();
                continue;
            }
            for ch in word.chars() {
                let mut next = line.clone();
                next.push(ch);
                if !line.is_empty() && measure_text_width(face, font_size, &next) > max_width {
                    lines.push(std::mem::take(&mut line));
                    line.push(ch);
                } else {
                    line = next;
                }
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_widths_match_afm() {
        assert_eq!(char_width(FontFace::Regular, ' '), 278);
        assert_eq!(char_width(FontFace::Regular, 'W'), 944);
        assert_eq!(char_width(FontFace::Regular, 'i'), 222);
        assert_eq!(char_width(FontFace::Bold, 'i'), 278);
        assert_eq!(char_width(FontFace::Bold, '~'), 584);
    }

    #[test]
    fn accented_letters_use_base_width() {
        assert_eq!(
            char_width(FontFace::Bold, 'Ó'),
            char_width(FontFace::Bold, 'O')
        );
        assert_eq!(
            char_width(FontFace::Regular, 'ñ'),
            char_width(FontFace::Regular, 'n')
        );
    }

    #[test]
    fn measures_scaled_by_font_size() {
        let width = measure_text_width(FontFace::Regular, 10.0, "00");
        assert!((width - 11.12).abs() < 1e-4);
    }

    #[test]
    fn face_from_name() {
        assert_eq!(FontFace::from_name("Helvetica-Bold"), FontFace::Bold);
        assert_eq!(FontFace::from_name("Helvetica"), FontFace::Regular);
    }

    #[test]
    fn wrap_respects_width_and_paragraphs() {
        let lines = wrap_text(FontFace::Regular, 10.0, "uno dos tres\n\ncuatro", 30.0);
        assert!(lines.len() >= 4);
        assert!(lines.contains(&String::new()));
        for line in &lines {
            assert!(measure_text_width(FontFace::Regular, 10.0, line) <= 30.0);
        }
        assert_eq!(lines.last().map(String::as_str), Some("cuatro"));
    }

    #[test]
    fn wrap_breaks_overlong_words() {
        let lines = wrap_text(FontFace::Regular, 10.0, "MMMMMMMMMM", 20.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "MMMMMMMMMM");
    }
}
