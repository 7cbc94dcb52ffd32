//! Style spans for formatted message text

use serde::Serialize;
use std::fmt;

/// The mIRC color table, in code order (`\x0304` is [`Color::Red`])
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Color {
    White,
    Black,
    Blue,
    Green,
    Red,
    Brown,
    Purple,
    Orange,
    Yellow,
    LightGreen,
    Teal,
    LightCyan,
    LightBlue,
    Pink,
    Grey,
    LightGrey,
}

impl Color {
    pub const ALL: [Color; 16] = [
        Color::White,
        Color::Black,
        Color::Blue,
        Color::Green,
        Color::Red,
        Color::Brown,
        Color::Purple,
        Color::Orange,
        Color::Yellow,
        Color::LightGreen,
        Color::Teal,
        Color::LightCyan,
        Color::LightBlue,
        Color::Pink,
        Color::Grey,
        Color::LightGrey,
    ];

    /// Look up a color by its code. Codes past the table have no color.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// RGB value as rendered by mIRC
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Color::White => (255, 255, 255),
            Color::Black => (0, 0, 0),
            Color::Blue => (0, 0, 127),
            Color::Green => (0, 147, 0),
            Color::Red => (255, 0, 0),
            Color::Brown => (127, 0, 0),
            Color::Purple => (156, 0, 156),
            Color::Orange => (252, 127, 0),
            Color::Yellow => (255, 255, 0),
            Color::LightGreen => (0, 252, 0),
            Color::Teal => (0, 147, 147),
            Color::LightCyan => (0, 255, 255),
            Color::LightBlue => (0, 0, 252),
            Color::Pink => (255, 0, 255),
            Color::Grey => (127, 127, 127),
            Color::LightGrey => (210, 210, 210),
        }
    }
}

/// Boolean text attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Attribute {
    Bold,
    Italic,
    Underlined,
}

/// Foreground/background pair. `None` on either side is the client's default color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ColorPair {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
}

/// A half-open range `[start, end)` of visible text sharing one formatting state.
///
/// Offsets count characters of the text with formatting codes removed. A span
/// that set a color pair is not plain even when both sides are the default
/// color: it still records that colors were reset at that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextStyle {
    start: usize,
    end: usize,
    bold: bool,
    italic: bool,
    underlined: bool,
    colors: Option<ColorPair>,
}

impl TextStyle {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self {
            start,
            end,
            bold: false,
            italic: false,
            underlined: false,
            colors: None,
        }
    }

    /// Toggle `attribute` on this span
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.toggle(attribute);
        self
    }

    /// Set the color pair of this span
    pub fn with_colors(mut self, foreground: Option<Color>, background: Option<Color>) -> Self {
        self.set_colors(foreground, background);
        self
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Bold => self.bold,
            Attribute::Italic => self.italic,
            Attribute::Underlined => self.underlined,
        }
    }

    /// True when the span carries no attribute and no color pair
    pub fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.underlined) && self.colors.is_none()
    }

    pub fn colors(&self) -> Option<ColorPair> {
        self.colors
    }

    pub fn foreground(&self) -> Option<Color> {
        self.colors.and_then(|c| c.foreground)
    }

    pub fn background(&self) -> Option<Color> {
        self.colors.and_then(|c| c.background)
    }

    pub(crate) fn toggle(&mut self, attribute: Attribute) {
        let flag = match attribute {
            Attribute::Bold => &mut self.bold,
            Attribute::Italic => &mut self.italic,
            Attribute::Underlined => &mut self.underlined,
        };
        *flag = !*flag;
    }

    pub(crate) fn set_colors(&mut self, foreground: Option<Color>, background: Option<Color>) {
        self.colors = Some(ColorPair {
            foreground,
            background,
        });
    }

    /// Swap the color pair; a default foreground becomes a white background
    /// and a default background becomes a black foreground.
    pub(crate) fn reverse_colors(&mut self) {
        let foreground = self.foreground();
        let background = self.background();
        self.set_colors(
            Some(background.unwrap_or(Color::White)),
            Some(foreground.unwrap_or(Color::Black)),
        );
    }

    pub(crate) fn clear(&mut self) {
        self.bold = false;
        self.italic = false;
        self.underlined = false;
        self.colors = None;
    }

    /// Start a new span at `start` carrying the same formatting
    pub(crate) fn carry_forward(&self, start: usize) -> Self {
        Self {
            start,
            end: start,
            ..self.clone()
        }
    }

    pub(crate) fn close_at(&mut self, end: usize) {
        self.end = end;
    }
}

impl fmt::Display for TextStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)?;
        for attribute in [Attribute::Bold, Attribute::Italic, Attribute::Underlined] {
            if self.is(attribute) {
                write!(f, " {:?}", attribute)?;
            }
        }
        if let Some(pair) = self.colors {
            let side = |c: Option<Color>| c.map_or_else(|| "default".to_string(), |c| format!("{:?}", c));
            write!(f, " {}/{}", side(pair.foreground), side(pair.background))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_table_order() {
        assert_eq!(Color::from_index(0), Some(Color::White));
        assert_eq!(Color::from_index(4), Some(Color::Red));
        assert_eq!(Color::from_index(15), Some(Color::LightGrey));
        assert_eq!(Color::from_index(16), None);
        assert_eq!(Color::LightBlue.index(), 12);
    }

    #[test]
    fn test_toggle_twice_is_plain() {
        let mut style = TextStyle::new(0, 3);
        style.toggle(Attribute::Bold);
        assert!(style.is(Attribute::Bold));
        style.toggle(Attribute::Bold);
        assert!(style.is_plain());
    }

    #[test]
    fn test_default_colors_are_not_plain() {
        let style = TextStyle::new(0, 3).with_colors(None, None);
        assert!(!style.is_plain());
        assert_eq!(style.foreground(), None);
    }

    #[test]
    fn test_reverse_fills_defaults() {
        let mut style = TextStyle::new(0, 1);
        style.reverse_colors();
        assert_eq!(style.foreground(), Some(Color::White));
        assert_eq!(style.background(), Some(Color::Black));

        let mut style = TextStyle::new(0, 1).with_colors(Some(Color::Red), Some(Color::Blue));
        style.reverse_colors();
        assert_eq!(style.foreground(), Some(Color::Blue));
        assert_eq!(style.background(), Some(Color::Red));
    }

    #[test]
    fn test_carry_forward_copies_formatting() {
        let style = TextStyle::new(0, 5)
            .with(Attribute::Italic)
            .with_colors(Some(Color::Teal), None);
        let next = style.carry_forward(5);
        assert_eq!(next.start(), 5);
        assert!(next.is_empty());
        assert!(next.is(Attribute::Italic));
        assert_eq!(next.foreground(), Some(Color::Teal));
    }

    #[test]
    fn test_display() {
        let style = TextStyle::new(6, 11)
            .with(Attribute::Bold)
            .with_colors(None, Some(Color::White));
        assert_eq!(style.to_string(), "[6, 11) Bold default/White");
    }
}
