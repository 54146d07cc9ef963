//! Guard checks the transport adapters run before anything enters the hub.

use crate::{config::Limits, error::NameError, notice};

const LINE_ENDINGS: &[char] = &['\n', '\r'];
const HELP_COMMAND: &str = "/help";

/// Outcome of screening one inbound unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screened {
    /// Forward this text to the hub as a chat message.
    Admit(String),
    /// Answer the sender privately; nothing reaches the hub.
    Reply(String),
    /// Drop silently.
    Skip,
}

pub fn screen_message(raw: &str, limits: &Limits) -> Screened {
    let text = raw.trim_end_matches(LINE_ENDINGS);
    if text.trim().is_empty() {
        return Screened::Skip;
    }

    if text.trim() == HELP_COMMAND {
        return Screened::Reply(notice::HELP.to_string());
    }

    // Line-based peers would see the pieces as separate messages.
    if text.contains(LINE_ENDINGS) {
        return Screened::Reply(notice::SINGLE_LINE_ONLY.to_string());
    }

    if text.chars().count() > limits.max_message_len {
        return Screened::Reply(notice::message_too_long(limits.max_message_len));
    }

    Screened::Admit(text.to_string())
}

/// Normalizes a requested display name, refusing empty or over-long ones.
pub fn validate_name(raw: &str, limits: &Limits) -> Result<String, NameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.chars().count() > limits.max_name_len {
        return Err(NameError::TooLong {
            max: limits.max_name_len,
        });
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_message_len: usize) -> Limits {
        Limits {
            max_message_len,
            ..Limits::default()
        }
    }

    #[test]
    fn admits_text_verbatim_without_line_terminator() {
        assert_eq!(
            screen_message("  hi there \r\n", &limits(64)),
            Screened::Admit("  hi there ".into())
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(screen_message("\r\n", &limits(64)), Screened::Skip);
        assert_eq!(screen_message("   ", &limits(64)), Screened::Skip);
    }

    #[test]
    fn help_is_answered_privately() {
        assert_eq!(
            screen_message("/help\n", &limits(64)),
            Screened::Reply(notice::HELP.to_string())
        );
    }

    #[test]
    fn over_long_messages_are_rejected() {
        assert_eq!(
            screen_message("0123456789x", &limits(10)),
            Screened::Reply(notice::message_too_long(10))
        );
        assert_eq!(
            screen_message("0123456789", &limits(10)),
            Screened::Admit("0123456789".into())
        );
    }

    #[test]
    fn embedded_line_breaks_are_refused() {
        assert_eq!(
            screen_message("one\ntwo", &limits(64)),
            Screened::Reply(notice::SINGLE_LINE_ONLY.to_string())
        );
        assert_eq!(
            screen_message("one\rtwo\n", &limits(64)),
            Screened::Reply(notice::SINGLE_LINE_ONLY.to_string())
        );
    }

    #[test]
    fn limits_count_characters_not_bytes() {
        assert_eq!(
            screen_message("héllo", &limits(5)),
            Screened::Admit("héllo".into())
        );
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        let limits = Limits {
            max_name_len: 5,
            ..Limits::default()
        };
        assert_eq!(validate_name(" alice \n", &limits), Ok("alice".into()));
        assert_eq!(validate_name("  \r\n", &limits), Err(NameError::Empty));
        assert_eq!(
            validate_name("mallory", &limits),
            Err(NameError::TooLong { max: 5 })
        );
    }
}
