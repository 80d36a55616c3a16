//! Session commands.
//!
//! Keyboard input and voice transcripts both resolve to [`SessionCommand`]s
//! and travel over the same channel into the session loop; there is no
//! second mutation path into session state.

/// A user command polled once per rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Capture the current frame and enroll it into the gallery.
    Enroll,
    /// End the session loop.
    Quit,
}

impl SessionCommand {
    /// Parse a command from raw user input (a key press or a transcript).
    ///
    /// Tolerant of case and surrounding whitespace; anything unrecognized
    /// is `None` and the caller drops it.
    pub fn parse(input: &str) -> Option<SessionCommand> {
        match input.trim().to_ascii_lowercase().as_str() {
            "s" | "save" | "capture" | "enroll" => Some(SessionCommand::Enroll),
            "q" | "quit" | "exit" | "stop" => Some(SessionCommand::Quit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_keys() {
        assert_eq!(SessionCommand::parse("s"), Some(SessionCommand::Enroll));
        assert_eq!(SessionCommand::parse("q"), Some(SessionCommand::Quit));
    }

    #[test]
    fn test_parse_word_forms() {
        assert_eq!(SessionCommand::parse("Save"), Some(SessionCommand::Enroll));
        assert_eq!(SessionCommand::parse(" QUIT \n"), Some(SessionCommand::Quit));
        assert_eq!(SessionCommand::parse("capture"), Some(SessionCommand::Enroll));
    }

    #[test]
    fn test_parse_rejects_noise() {
        assert_eq!(SessionCommand::parse(""), None);
        assert_eq!(SessionCommand::parse("hello there"), None);
        assert_eq!(SessionCommand::parse("squit"), None);
    }
}
