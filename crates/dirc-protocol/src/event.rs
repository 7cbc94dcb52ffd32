//! Classification of server messages into client events

use std::fmt;

use dirc_core::TextStyle;
use serde::Serialize;

use crate::message::Message;

/// Numeric replies the classifier knows about
pub mod reply {
    pub const RPL_WELCOME: &str = "001";
    pub const RPL_YOURHOST: &str = "002";
    pub const RPL_CREATED: &str = "003";
    pub const RPL_MYINFO: &str = "004";
    pub const RPL_ISUPPORT: &str = "005";
    pub const RPL_STATSCONN: &str = "250";
    pub const RPL_LUSERCLIENT: &str = "251";
    pub const RPL_LUSEROP: &str = "252";
    pub const RPL_LUSERUNKNOWN: &str = "253";
    pub const RPL_LUSERCHANNELS: &str = "254";
    pub const RPL_LUSERME: &str = "255";
    pub const RPL_LOCALUSERS: &str = "265";
    pub const RPL_GLOBALUSERS: &str = "266";
    pub const RPL_MOTD: &str = "372";
    pub const RPL_MOTDSTART: &str = "375";
    pub const RPL_ENDOFMOTD: &str = "376";
}

/// Who an event is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    /// A nickname or channel
    Target(String),
    /// No specific recipient, written `*`
    Unspecified,
}

impl Recipient {
    fn from_param(param: &str) -> Self {
        match param {
            "" | "*" => Recipient::Unspecified,
            target => Recipient::Target(target.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Recipient::Target(target) => target,
            Recipient::Unspecified => "*",
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified server message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub recipient: Recipient,
    pub message: String,
    /// Style spans over `message`; empty for kinds that do not carry formatting
    pub styles: Vec<TextStyle>,
}

/// All event kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// 375 RPL_MOTDSTART
    MotdStart,
    /// 372 RPL_MOTD
    Motd,
    /// 376 RPL_ENDOFMOTD
    MotdEnd,
    /// NOTICE <target> :<text>
    Notice,
    /// :<nick> QUIT :<reason>
    Quit { nickname: Option<String> },
    /// PING <servername>
    Ping { servername: String },
    /// Any other reply, rendered as text
    ServerInfo,
}

impl Event {
    fn styled(kind: EventKind, message: &Message) -> Self {
        Event {
            kind,
            recipient: Recipient::from_param(message.param(0)),
            message: message.last_param().to_string(),
            styles: message.styles().to_vec(),
        }
    }

    fn server_info(recipient: Recipient, message: String) -> Self {
        Event {
            kind: EventKind::ServerInfo,
            recipient,
            message,
            styles: Vec::new(),
        }
    }
}

/// Map a server message to an event.
///
/// Alphabetic commands match case-insensitively; numeric replies exactly.
/// Anything unrecognised becomes [`EventKind::ServerInfo`] with all parameters
/// joined.
pub fn classify(message: &Message) -> Event {
    use reply::*;

    match message.command().to_ascii_uppercase().as_str() {
        "QUIT" => Event {
            kind: EventKind::Quit {
                nickname: message.nickname().map(str::to_string),
            },
            recipient: Recipient::Unspecified,
            message: message.last_param().to_string(),
            styles: Vec::new(),
        },
        "NOTICE" => Event::styled(EventKind::Notice, message),
        "PING" => Event {
            kind: EventKind::Ping {
                servername: message.param(0).to_string(),
            },
            recipient: Recipient::Unspecified,
            message: String::new(),
            styles: Vec::new(),
        },
        "JOIN" | RPL_WELCOME | RPL_YOURHOST | RPL_CREATED | RPL_STATSCONN | RPL_LUSERCLIENT
        | RPL_LUSERME | RPL_LOCALUSERS | RPL_GLOBALUSERS => Event::server_info(
            Recipient::from_param(message.param(0)),
            message.last_param().to_string(),
        ),
        RPL_MYINFO | RPL_ISUPPORT | RPL_LUSEROP | RPL_LUSERUNKNOWN | RPL_LUSERCHANNELS => {
            Event::server_info(Recipient::from_param(message.param(0)), message.joined_params(1))
        }
        RPL_MOTDSTART => Event::styled(EventKind::MotdStart, message),
        RPL_MOTD => Event::styled(EventKind::Motd, message),
        RPL_ENDOFMOTD => Event::styled(EventKind::MotdEnd, message),
        _ => Event::server_info(Recipient::Unspecified, message.joined_params(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirc_core::Attribute;

    fn classify_line(line: &str) -> Event {
        classify(&line.parse::<Message>().unwrap())
    }

    #[test]
    fn test_motd_start_keeps_styles() {
        let event = classify_line(":irc.example.net 375 joe :\u{02}Message\u{02} of the day");
        assert_eq!(event.kind, EventKind::MotdStart);
        assert_eq!(event.recipient, Recipient::Target("joe".into()));
        assert_eq!(event.message, "Message of the day");
        assert_eq!(event.styles.len(), 1);
        assert!(event.styles[0].is(Attribute::Bold));
        assert_eq!(event.styles[0].end(), 7);
    }

    #[test]
    fn test_motd_lines() {
        let event = classify_line("372 joe :- Welcome");
        assert_eq!(event.kind, EventKind::Motd);
        assert_eq!(event.message, "- Welcome");
        assert!(event.styles.is_empty());

        let event = classify_line("376 joe :End of /MOTD command.");
        assert_eq!(event.kind, EventKind::MotdEnd);
        assert_eq!(event.message, "End of /MOTD command.");
    }

    #[test]
    fn test_notice() {
        let event = classify_line(":irc.example.net notice * :\u{1F}Looking\u{1F} up your hostname");
        assert_eq!(event.kind, EventKind::Notice);
        assert_eq!(event.recipient, Recipient::Unspecified);
        assert_eq!(event.message, "Looking up your hostname");
        assert_eq!(event.styles.len(), 1);
    }

    #[test]
    fn test_quit() {
        let event = classify_line(":joe!bob@foo.net QUIT :Gone fishing");
        assert_eq!(
            event.kind,
            EventKind::Quit {
                nickname: Some("joe".into())
            }
        );
        assert_eq!(event.recipient.to_string(), "*");
        assert_eq!(event.message, "Gone fishing");
    }

    #[test]
    fn test_ping() {
        let event = classify_line("PING :irc.example.net");
        assert_eq!(
            event.kind,
            EventKind::Ping {
                servername: "irc.example.net".into()
            }
        );
    }

    #[test]
    fn test_last_param_replies() {
        for code in ["001", "002", "003", "250", "251", "255", "265", "266"] {
            let event = classify_line(&format!("{} joe some thing :Welcome to IRC", code));
            assert_eq!(event.kind, EventKind::ServerInfo, "{}", code);
            assert_eq!(event.recipient, Recipient::Target("joe".into()));
            assert_eq!(event.message, "Welcome to IRC");
        }

        let event = classify_line(":joe!bob@foo.net JOIN #rust");
        assert_eq!(event.recipient, Recipient::Target("#rust".into()));
        assert_eq!(event.message, "#rust");
    }

    #[test]
    fn test_joined_replies() {
        let event = classify_line("005 joe CHANTYPES=# NICKLEN=9 :are supported by this server");
        assert_eq!(event.kind, EventKind::ServerInfo);
        assert_eq!(event.recipient, Recipient::Target("joe".into()));
        assert_eq!(event.message, "CHANTYPES=# NICKLEN=9 are supported by this server");

        for code in ["004", "252", "253", "254"] {
            let event = classify_line(&format!("{} joe 12 :channels formed", code));
            assert_eq!(event.message, "12 channels formed", "{}", code);
        }
    }

    #[test]
    fn test_unknown_falls_through() {
        let event = classify_line(":joe!bob@foo.net PRIVMSG #rust :hi there");
        assert_eq!(event.kind, EventKind::ServerInfo);
        assert_eq!(event.recipient, Recipient::Unspecified);
        assert_eq!(event.message, "#rust hi there");

        let event = classify_line("421 joe FOO :Unknown command");
        assert_eq!(event.message, "joe FOO Unknown command");
    }

    #[test]
    fn test_event_json() {
        let event = classify_line(":joe!bob@foo.net QUIT :bye");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["type"], "quit");
        assert_eq!(json["kind"]["nickname"], "joe");
        assert_eq!(json["recipient"], "unspecified");
    }
}
