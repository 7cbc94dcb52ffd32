//! Outbound client commands

use crate::message::Message;

impl Message {
    /// NICK <nickname>
    pub fn nick(nickname: &str) -> Self {
        Message::new("NICK", [nickname])
    }

    /// USER <username> 0 * <realname>
    pub fn user_command(username: &str, realname: &str) -> Self {
        Message::new("USER", [username, "0", "*", realname])
    }

    /// QUIT [reason]
    pub fn quit(reason: Option<&str>) -> Self {
        Message::new("QUIT", reason)
    }

    /// JOIN <channel>
    pub fn join(channel: &str) -> Self {
        Message::new("JOIN", [channel])
    }

    /// PONG <servername>
    pub fn pong(servername: &str) -> Self {
        Message::new("PONG", [servername])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shapes() {
        let cases = [
            (Message::nick("joe"), "NICK joe\r\n"),
            (Message::user_command("guest", "John Q. Public"), "USER guest 0 * :John Q. Public\r\n"),
            (Message::quit(None), "QUIT\r\n"),
            (Message::quit(Some("bye now")), "QUIT :bye now\r\n"),
            (Message::join("#rust"), "JOIN #rust\r\n"),
            (Message::pong("irc.example.net"), "PONG irc.example.net\r\n"),
            (Message::pong(""), "PONG :\r\n"),
        ];
        for (message, wire) in cases {
            assert_eq!(message.serialize().unwrap(), wire);
        }
    }

    #[test]
    fn test_bad_username_is_rejected() {
        assert!(Message::user_command("john q", "John").serialize().is_err());
    }
}
