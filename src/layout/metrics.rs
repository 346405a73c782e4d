//! Advance widths of the builtin Helvetica faces.
//!
//! Values are the AFM widths in thousandths of an em for the WinAnsi characters the report
//! prints.  Characters outside the table count as a full em so measured text never comes out
//! narrower than what is drawn.

const MM_PER_POINT: f64 = 25.4 / 72.0;

const FALLBACK_WIDTH: u16 = 1000;

/// Helvetica, U+0020 to U+007E.
#[rustfmt::skip]
const REGULAR_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica, U+00A0 to U+00FF.
#[rustfmt::skip]
const REGULAR_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// Helvetica-Bold, U+0020 to U+007E.
#[rustfmt::skip]
const BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Helvetica-Bold, U+00A0 to U+00FF.
#[rustfmt::skip]
const BOLD_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// Width of `ch` in thousandths of an em.
pub fn char_units(ch: char, bold: bool) -> u16 {
    let (ascii, latin1) = if bold {
        (&BOLD_ASCII, &BOLD_LATIN1)
    } else {
        (&REGULAR_ASCII, &REGULAR_LATIN1)
    };

    match u32::from(ch) {
        code @ 0x20..=0x7e => ascii[(code - 0x20) as usize],
        code @ 0xa0..=0xff => latin1[(code - 0xa0) as usize],
        _ => match ch {
            '\u{2018}' | '\u{2019}' | '\u{201a}' => {
                if bold {
                    278
                } else {
                    222
                }
            }
            '\u{201c}' | '\u{201d}' | '\u{201e}' => {
                if bold {
                    500
                } else {
                    333
                }
            }
            '\u{2013}' | '\u{20ac}' => 556,
            '\u{2022}' => 350,
            _ => FALLBACK_WIDTH,
        },
    }
}

/// Width of `ch` in millimetres at `font_size` points.
pub fn char_width_mm(ch: char, font_size: f64, bold: bool) -> f64 {
    f64::from(char_units(ch, bold)) / 1000.0 * font_size * MM_PER_POINT
}

/// Width of `text` in millimetres at `font_size` points.
pub fn text_width_mm(text: &str, font_size: f64, bold: bool) -> f64 {
    text.chars()
        .map(|ch| char_width_mm(ch, font_size, bold))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitals_are_wider_than_lowercase() {
        assert_eq!(char_units('W', false), 944);
        assert_eq!(char_units('i', false), 222);
        assert_eq!(char_units('ç', false), char_units('c', false));
        assert_eq!(char_units('Ã', true), char_units('A', true));
        assert_eq!(char_units('\u{4e2d}', false), FALLBACK_WIDTH);
    }

    #[test]
    fn width_scales_with_font_size() {
        let width = text_width_mm("MM", 10.0, false);
        assert!((width - 2.0 * 0.833 * 10.0 * MM_PER_POINT).abs() < 1e-9);
        assert!((text_width_mm("MM", 20.0, false) - 2.0 * width).abs() < 1e-9);
        assert!(text_width_mm("abc", 10.0, true) > text_width_mm("abc", 10.0, false));
    }
}
