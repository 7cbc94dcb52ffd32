//! mIRC formatting codes
//!
//! Formatting is a de-facto subprotocol layered on message text: single control
//! characters toggle attributes or set colors for the text that follows them.
//! [`parse_formatting`] removes the codes and describes their effect as
//! [`TextStyle`] spans over what remains.
//!
//! ```text
//! \x02  bold          \x0F  reset all
//! \x1D  italic        \x16  reverse colors
//! \x1F  underline     \x03[fg[,bg]]  colors, 1-2 digits each
//! ```

use std::iter::Peekable;
use std::str::Chars;

use crate::style::{Attribute, Color, TextStyle};

const BOLD: char = '\u{02}';
const COLOR: char = '\u{03}';
const RESET: char = '\u{0F}';
const REVERSE: char = '\u{16}';
const ITALIC: char = '\u{1D}';
const UNDERLINE: char = '\u{1F}';

/// Text with formatting codes removed, plus the spans they described
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Formatted {
    pub text: String,
    pub styles: Vec<TextStyle>,
}

enum Code {
    Toggle(Attribute),
    Colors(Option<Color>, Option<Color>),
    Reverse,
    Reset,
}

/// Strip formatting codes from `input` and derive the style spans.
///
/// Spans are ordered, never overlap, and never plain: text that no code
/// applies to has no span. Unformatted input yields no spans at all.
pub fn parse_formatting(input: &str) -> Formatted {
    let mut text = String::with_capacity(input.len());
    let mut visible = 0usize;
    let mut styles = Vec::new();
    let mut current = TextStyle::new(0, 0);
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        let code = match c {
            BOLD => Code::Toggle(Attribute::Bold),
            ITALIC => Code::Toggle(Attribute::Italic),
            UNDERLINE => Code::Toggle(Attribute::Underlined),
            RESET => Code::Reset,
            REVERSE => Code::Reverse,
            COLOR => read_colors(&mut chars),
            _ => {
                text.push(c);
                visible += 1;
                continue;
            }
        };

        // Codes with no text between them accumulate into the same span
        if visible > current.start() {
            let next = current.carry_forward(visible);
            emit(&mut styles, current, visible);
            current = next;
        }

        match code {
            Code::Toggle(attribute) => current.toggle(attribute),
            Code::Colors(foreground, background) => current.set_colors(foreground, background),
            Code::Reverse => current.reverse_colors(),
            Code::Reset => current.clear(),
        }
    }

    emit(&mut styles, current, visible);

    Formatted { text, styles }
}

fn emit(styles: &mut Vec<TextStyle>, mut style: TextStyle, end: usize) {
    style.close_at(end);
    if !style.is_empty() && !style.is_plain() {
        styles.push(style);
    }
}

/// Read the optional `fg[,bg]` digits after a color code. The comma is only
/// consumed when a digit follows it.
fn read_colors(chars: &mut Peekable<Chars<'_>>) -> Code {
    let foreground = read_color_index(chars);

    let mut lookahead = chars.clone();
    let background = if lookahead.next() == Some(',')
        && lookahead.next().is_some_and(|c| c.is_ascii_digit())
    {
        chars.next();
        read_color_index(chars)
    } else {
        None
    };

    Code::Colors(foreground, background)
}

fn read_color_index(chars: &mut Peekable<Chars<'_>>) -> Option<Color> {
    let mut index: Option<u8> = None;
    for _ in 0..2 {
        match chars.peek().and_then(|c| c.to_digit(10)) {
            Some(digit) => {
                chars.next();
                // At most two digits, so this cannot overflow
                index = Some(index.unwrap_or(0) * 10 + digit as u8);
            }
            None => break,
        }
    }
    index.and_then(Color::from_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &str) -> (String, TextStyle) {
        let formatted = parse_formatting(input);
        assert_eq!(formatted.styles.len(), 1, "styles: {:?}", formatted.styles);
        (formatted.text, formatted.styles[0].clone())
    }

    #[test]
    fn test_plain_text_has_no_spans() {
        let formatted = parse_formatting("Test");
        assert_eq!(formatted.text, "Test");
        assert!(formatted.styles.is_empty());
    }

    #[test]
    fn test_bold() {
        let (text, style) = single("\u{02}Test");
        assert_eq!(text, "Test");
        assert_eq!((style.start(), style.end()), (0, 4));
        assert!(style.is(Attribute::Bold));
        assert!(!style.is(Attribute::Italic));
    }

    #[test]
    fn test_stacked_codes_share_one_span() {
        let (text, style) = single("\u{02}\u{1D}\u{1F}Test");
        assert_eq!(text, "Test");
        assert_eq!((style.start(), style.end()), (0, 4));
        assert!(style.is(Attribute::Bold));
        assert!(style.is(Attribute::Italic));
        assert!(style.is(Attribute::Underlined));
    }

    #[test]
    fn test_style_added_mid_text_opens_new_span() {
        let formatted = parse_formatting("\u{02}Hello \u{1D}World");
        assert_eq!(formatted.text, "Hello World");
        assert_eq!(formatted.styles.len(), 2);

        let first = &formatted.styles[0];
        assert_eq!((first.start(), first.end()), (0, 6));
        assert!(first.is(Attribute::Bold));
        assert!(!first.is(Attribute::Italic));

        let second = &formatted.styles[1];
        assert_eq!((second.start(), second.end()), (6, 11));
        assert!(second.is(Attribute::Bold));
        assert!(second.is(Attribute::Italic));
    }

    #[test]
    fn test_reset_ends_formatting() {
        let formatted = parse_formatting("\u{02}Hello \u{0F}World");
        assert_eq!(formatted.text, "Hello World");
        assert_eq!(formatted.styles.len(), 1);
        assert_eq!((formatted.styles[0].start(), formatted.styles[0].end()), (0, 6));
    }

    #[test]
    fn test_reset_clears_colors() {
        let formatted = parse_formatting("\u{03}04,02Hello \u{0F}World");
        assert_eq!(formatted.text, "Hello World");
        assert_eq!(formatted.styles.len(), 1);
        let style = &formatted.styles[0];
        assert_eq!((style.start(), style.end()), (0, 6));
        assert_eq!(style.foreground(), Some(Color::Red));
        assert_eq!(style.background(), Some(Color::Blue));
    }

    #[test]
    fn test_foreground_color() {
        let (text, style) = single("\u{03}00Hello World");
        assert_eq!(text, "Hello World");
        assert_eq!((style.start(), style.end()), (0, 11));
        assert_eq!(style.foreground(), Some(Color::White));
        assert_eq!(style.background(), None);
    }

    #[test]
    fn test_background_color_only() {
        let (text, style) = single("\u{03},00Hello World");
        assert_eq!(text, "Hello World");
        assert_eq!((style.start(), style.end()), (0, 11));
        assert_eq!(style.foreground(), None);
        assert_eq!(style.background(), Some(Color::White));
    }

    #[test]
    fn test_foreground_and_background() {
        let (_, style) = single("\u{03}04,02Hello World");
        assert_eq!(style.foreground(), Some(Color::Red));
        assert_eq!(style.background(), Some(Color::Blue));
    }

    #[test]
    fn test_single_digit_colors() {
        let (text, style) = single("\u{03}4,2Hi");
        assert_eq!(text, "Hi");
        assert_eq!(style.foreground(), Some(Color::Red));
        assert_eq!(style.background(), Some(Color::Blue));
    }

    #[test]
    fn test_bare_color_code_restores_defaults() {
        let (text, style) = single("\u{03}Hello World");
        assert_eq!(text, "Hello World");
        assert!(!style.is_plain());
        assert_eq!(style.foreground(), None);
        assert_eq!(style.background(), None);
    }

    #[test]
    fn test_unknown_color_is_default() {
        let (text, style) = single("\u{03}04,99Hello World");
        assert_eq!(text, "Hello World");
        assert_eq!(style.foreground(), Some(Color::Red));
        assert_eq!(style.background(), None);
    }

    #[test]
    fn test_comma_without_digit_is_text() {
        let (text, style) = single("\u{03}04,Hi");
        assert_eq!(text, ",Hi");
        assert_eq!(style.foreground(), Some(Color::Red));
        assert_eq!((style.start(), style.end()), (0, 3));
    }

    #[test]
    fn test_third_digit_is_text() {
        let (text, style) = single("\u{03}123");
        assert_eq!(text, "3");
        assert_eq!(style.foreground(), Some(Color::LightBlue));
    }

    #[test]
    fn test_reverse_colors() {
        let (_, style) = single("\u{16}swap");
        assert_eq!(style.foreground(), Some(Color::White));
        assert_eq!(style.background(), Some(Color::Black));
    }

    #[test]
    fn test_code_at_end_is_ignored() {
        let formatted = parse_formatting("Hello World\u{02}");
        assert_eq!(formatted.text, "Hello World");
        assert!(formatted.styles.is_empty());
    }

    #[test]
    fn test_span_starts_at_first_code() {
        let (text, style) = single("Hello \u{02}World");
        assert_eq!(text, "Hello World");
        assert_eq!((style.start(), style.end()), (6, 11));
        assert!(style.is(Attribute::Bold));
    }

    #[test]
    fn test_toggle_off_leaves_plain_suffix_unstyled() {
        let (text, style) = single("\u{1F}under\u{1F} plain");
        assert_eq!(text, "under plain");
        assert_eq!((style.start(), style.end()), (0, 5));
        assert!(style.is(Attribute::Underlined));
    }

    #[test]
    fn test_offsets_count_characters() {
        let (text, style) = single("héllo \u{02}wörld");
        assert_eq!(text, "héllo wörld");
        assert_eq!((style.start(), style.end()), (6, 11));
    }
}
