//! IRC message parser
//!
//! A character-level state machine. Bytes are decoded with the connection's
//! character set as they arrive, so the machine can stop anywhere in a line
//! and resume when more data is fed.

use dirc_core::{parse_formatting, TextStyle};
use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};
use tracing::{debug, warn};

use crate::error::{ParseError, ProtocolResult};
use crate::message::{Message, Prefix, MAX_PARAMS};

/// Longest accepted line, excluding the terminator
const MAX_LINE_LENGTH: usize = 8191;

/// After this many middle parameters the rest of the line is trailing (RFC 2812 2.3.1)
const MAX_MIDDLE_PARAMS: usize = MAX_PARAMS - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Prefix,
    Command,
    Parameters,
    MiddleParameter,
    TrailingParameter,
    Done,
    Error,
}

impl State {
    fn next(self, c: char, acc: &mut Accumulator) -> State {
        match self {
            State::Init => match c {
                ':' => State::Prefix,
                c if is_command_char(c) => {
                    acc.token.push(c);
                    State::Command
                }
                c if is_line_end(c) => State::Init,
                c => acc.fail(ParseError::UnexpectedStart(c), c),
            },
            State::Prefix => match c {
                ' ' => match acc.consume_prefix() {
                    Ok(()) => State::Command,
                    Err(e) => acc.fail(e, c),
                },
                c if is_line_end(c) => acc.fail(ParseError::MissingCommand, c),
                c => {
                    acc.token.push(c);
                    State::Prefix
                }
            },
            State::Command => match c {
                c if is_command_char(c) => {
                    acc.token.push(c);
                    State::Command
                }
                ' ' | '\r' | '\n' => match acc.consume_command() {
                    Ok(()) if c == ' ' => State::Parameters,
                    Ok(()) => State::Done,
                    Err(e) => acc.fail(e, c),
                },
                c => {
                    let mut token = std::mem::take(&mut acc.token);
                    token.push(c);
                    acc.fail(ParseError::InvalidCommand(token), c)
                }
            },
            State::Parameters => match c {
                ':' => State::TrailingParameter,
                ' ' => State::Parameters,
                c if is_line_end(c) => State::Done,
                c => {
                    acc.token.push(c);
                    if acc.params.len() == MAX_MIDDLE_PARAMS {
                        State::TrailingParameter
                    } else {
                        State::MiddleParameter
                    }
                }
            },
            State::MiddleParameter => match c {
                ' ' => {
                    acc.consume_middle();
                    State::Parameters
                }
                c if is_line_end(c) => {
                    acc.consume_middle();
                    State::Done
                }
                c => {
                    acc.token.push(c);
                    State::MiddleParameter
                }
            },
            State::TrailingParameter => match c {
                c if is_line_end(c) => {
                    acc.consume_trailing();
                    State::Done
                }
                c => {
                    acc.token.push(c);
                    State::TrailingParameter
                }
            },
            State::Done => State::Done,
            State::Error => {
                if is_line_end(c) {
                    State::Init
                } else {
                    State::Error
                }
            }
        }
    }
}

fn is_command_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

fn is_line_end(c: char) -> bool {
    c == '\r' || c == '\n'
}

/// Fields of the message currently being parsed
#[derive(Debug, Default)]
struct Accumulator {
    token: String,
    line_len: usize,
    prefix: Option<Prefix>,
    command: String,
    params: Vec<String>,
    styles: Vec<TextStyle>,
    error: Option<ParseError>,
}

impl Accumulator {
    /// Record why the line is rejected. If the rejecting character already
    /// ends the line there is nothing left to skip.
    fn fail(&mut self, error: ParseError, c: char) -> State {
        self.error = Some(error);
        if is_line_end(c) {
            State::Init
        } else {
            State::Error
        }
    }

    fn consume_prefix(&mut self) -> Result<(), ParseError> {
        let token = std::mem::take(&mut self.token);
        match parse_prefix(&token) {
            Some(prefix) => {
                self.prefix = Some(prefix);
                Ok(())
            }
            None => Err(ParseError::InvalidPrefix(token)),
        }
    }

    fn consume_command(&mut self) -> Result<(), ParseError> {
        let token = std::mem::take(&mut self.token);
        if is_valid_command(&token) {
            self.command = token;
            Ok(())
        } else {
            Err(ParseError::InvalidCommand(token))
        }
    }

    fn consume_middle(&mut self) {
        let token = std::mem::take(&mut self.token);
        self.params.push(token);
    }

    fn consume_trailing(&mut self) {
        let token = std::mem::take(&mut self.token);
        let formatted = parse_formatting(&token);
        self.params.push(formatted.text);
        self.styles = formatted.styles;
    }

    fn take_message(&mut self) -> Message {
        let message = Message::parsed(
            self.prefix.take(),
            std::mem::take(&mut self.command),
            std::mem::take(&mut self.params),
            std::mem::take(&mut self.styles),
        );
        self.reset();
        message
    }

    fn reset(&mut self) {
        self.token.clear();
        self.line_len = 0;
        self.prefix = None;
        self.command.clear();
        self.params.clear();
        self.styles.clear();
    }
}

/// Advance the machine by one character, enforcing the line length limit and
/// clearing the accumulator whenever a new line starts.
fn step(state: State, c: char, acc: &mut Accumulator) -> State {
    if state != State::Error && !is_line_end(c) {
        acc.line_len += 1;
        if acc.line_len > MAX_LINE_LENGTH {
            return acc.fail(
                ParseError::LineTooLong {
                    max: MAX_LINE_LENGTH,
                },
                c,
            );
        }
    }

    let next = state.next(c, acc);
    if next == State::Init && state != State::Init {
        acc.reset();
    }
    next
}

/// `servername` or `nickname [ [ "!" user ] "@" host ]`
fn parse_prefix(token: &str) -> Option<Prefix> {
    if is_servername(token) {
        return Some(Prefix::Server(token.to_string()));
    }

    let (rest, host) = match token.split_once('@') {
        Some((rest, host)) => (rest, Some(host)),
        None => (token, None),
    };
    let (nickname, user) = match rest.split_once('!') {
        Some((nickname, user)) => (nickname, Some(user)),
        None => (rest, None),
    };

    // A user is only meaningful together with a host
    if user.is_some() && host.is_none() {
        return None;
    }
    let valid_part = |part: &str| !part.is_empty() && !part.contains(['!', '@']);
    if !is_nickname(nickname) || !user.map_or(true, valid_part) || !host.map_or(true, valid_part) {
        return None;
    }

    Some(Prefix::User {
        nickname: nickname.to_string(),
        user: user.map(str::to_string),
        host: host.map(str::to_string),
    })
}

/// Dotted host name: at least two labels, each starting and ending with an
/// alphanumeric character
fn is_servername(token: &str) -> bool {
    let is_label = |label: &str| {
        let bytes = label.as_bytes();
        match (bytes.first(), bytes.last()) {
            (Some(first), Some(last)) => {
                first.is_ascii_alphanumeric()
                    && last.is_ascii_alphanumeric()
                    && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
            }
            _ => false,
        }
    };
    token.contains('.') && token.split('.').all(is_label)
}

/// RFC 2812 nickname: a letter or special first, then up to 8 letters,
/// digits, specials or `-`
fn is_nickname(token: &str) -> bool {
    // [ ] \ ` _ ^ { | }
    let is_special = |c: char| matches!(c, '\x5B'..='\x60' | '\x7B'..='\x7D');
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || is_special(first) => {}
        _ => return false,
    }
    token.chars().count() <= 9 && chars.all(|c| c.is_ascii_alphanumeric() || is_special(c) || c == '-')
}

/// One or more letters, or exactly three digits
fn is_valid_command(token: &str) -> bool {
    let all_alpha = !token.is_empty() && token.chars().all(|c| c.is_ascii_alphabetic());
    let numeric = token.len() == 3 && token.chars().all(|c| c.is_ascii_digit());
    all_alpha || numeric
}

/// Streaming IRC message parser.
///
/// Feed it bytes as they arrive from the server and pull complete messages
/// out with [`Parser::next_message`]. Malformed lines are dropped: the parser
/// logs why and picks up again at the next line.
pub struct Parser {
    decoder: Decoder,
    decoded: String,
    cursor: usize,
    state: State,
    acc: Accumulator,
}

impl Parser {
    /// Parser for a UTF-8 stream
    pub fn new() -> Self {
        Self::with_encoding(UTF_8)
    }

    pub fn with_encoding(encoding: &'static Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder_without_bom_handling(),
            decoded: String::with_capacity(4096),
            cursor: 0,
            state: State::Init,
            acc: Accumulator::default(),
        }
    }

    /// Add raw bytes to the parser. A character split across two calls is
    /// decoded once its remaining bytes arrive.
    pub fn feed(&mut self, data: &[u8]) {
        if self.cursor > 0 {
            self.decoded.drain(..self.cursor);
            self.cursor = 0;
        }

        let mut remaining = data;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(remaining.len())
                .unwrap_or(remaining.len());
            self.decoded.reserve(needed);

            let (result, read, _) = self.decoder.decode_to_string(remaining, &mut self.decoded, false);
            remaining = &remaining[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
    }

    /// Take the next complete message out of the fed data, or `None` if more
    /// data is needed.
    pub fn next_message(&mut self) -> Option<Message> {
        let pending = &self.decoded[self.cursor..];
        for c in pending.chars() {
            self.cursor += c.len_utf8();
            self.state = step(self.state, c, &mut self.acc);

            if let Some(error) = self.acc.error.take() {
                match error {
                    ParseError::LineTooLong { max } => warn!(max, "Discarding oversized line"),
                    error => debug!(error = %error, "Discarding malformed line"),
                }
            }

            if self.state == State::Done {
                self.state = State::Init;
                return Some(self.acc.take_message());
            }
        }

        self.decoded.clear();
        self.cursor = 0;
        None
    }

    /// True if a line has been started but not finished
    pub fn has_partial_line(&self) -> bool {
        self.state != State::Init || self.cursor < self.decoded.len()
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a single line; the terminator is optional
pub(crate) fn parse_line(line: &str) -> ProtocolResult<Message> {
    let mut acc = Accumulator::default();
    let mut state = State::Init;

    for c in line.chars().chain(std::iter::once('\n')) {
        state = step(state, c, &mut acc);
        if let Some(error) = acc.error.take() {
            return Err(error.into());
        }
        if state == State::Done {
            return Ok(acc.take_message());
        }
    }

    Err(ParseError::Empty.into())
}
