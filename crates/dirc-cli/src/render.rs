//! Terminal rendering of events

use colored::*;
use dirc_core::{Attribute, TextStyle};
use dirc_protocol::{Event, EventKind};

/// One transcript line for an event
pub fn render_event(event: &Event) -> String {
    let text = styled_text(&event.message, &event.styles);
    match &event.kind {
        EventKind::MotdStart | EventKind::Motd | EventKind::MotdEnd => text,
        EventKind::Notice => format!("{} {}", format!("-{}-", event.recipient).magenta(), text),
        EventKind::Quit { nickname } => format!(
            "{} {} has quit ({})",
            "<--".red(),
            nickname.as_deref().unwrap_or("*").bold(),
            text
        ),
        EventKind::Ping { servername } => format!("{} {}", "PING".dimmed(), servername),
        EventKind::ServerInfo => format!("{} {}", "*".cyan(), text),
    }
}

/// Apply style spans to `text` as ANSI escapes. Span offsets are in
/// characters; spans that overlap an earlier one are skipped.
pub fn styled_text(text: &str, styles: &[TextStyle]) -> String {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let byte_offset = |chars: usize| boundaries.get(chars).copied().unwrap_or(text.len());

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for style in styles {
        let start = byte_offset(style.start());
        let end = byte_offset(style.end());
        if start < cursor || end <= start {
            continue;
        }
        out.push_str(&text[cursor..start]);
        out.push_str(&paint(&text[start..end], style).to_string());
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Colors are given as the palette's RGB value. `colored` writes 24-bit
/// escapes only when `COLORTERM` advertises truecolor and falls back to the
/// nearest of the 16 ANSI colors otherwise.
fn paint(text: &str, style: &TextStyle) -> ColoredString {
    let mut painted = text.normal();
    if style.is(Attribute::Bold) {
        painted = painted.bold();
    }
    if style.is(Attribute::Italic) {
        painted = painted.italic();
    }
    if style.is(Attribute::Underlined) {
        painted = painted.underline();
    }
    if let Some(color) = style.foreground() {
        let (r, g, b) = color.rgb();
        painted = painted.truecolor(r, g, b);
    }
    if let Some(color) = style.background() {
        let (r, g, b) = color.rgb();
        painted = painted.on_truecolor(r, g, b);
    }
    painted
}
