//! Interactive input commands.

/// What one line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Exit,
    ClearHistory,
    ToggleHistory,
    ShowHistory,
    /// Blank line
    Empty,
    /// Anything else, trimmed
    Query(String),
}

impl SessionCommand {
    /// Commands match case-insensitively and ignore surrounding and
    /// repeated whitespace.
    pub fn parse(line: &str) -> Self {
        let normalized = line
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match normalized.as_str() {
            "" => Self::Empty,
            "exit" | "quit" => Self::Exit,
            "clear history" => Self::ClearHistory,
            "toggle history" => Self::ToggleHistory,
            "history" => Self::ShowHistory,
            _ => Self::Query(line.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_recognized() {
        assert_eq!(SessionCommand::parse("exit"), SessionCommand::Exit);
        assert_eq!(SessionCommand::parse("  QUIT \n"), SessionCommand::Exit);
        assert_eq!(SessionCommand::parse("Clear   History"), SessionCommand::ClearHistory);
        assert_eq!(SessionCommand::parse("toggle history"), SessionCommand::ToggleHistory);
        assert_eq!(SessionCommand::parse("history"), SessionCommand::ShowHistory);
        assert_eq!(SessionCommand::parse("   "), SessionCommand::Empty);
    }

    #[test]
    fn everything_else_is_a_query() {
        assert_eq!(
            SessionCommand::parse("  What is the capital of France? "),
            SessionCommand::Query("What is the capital of France?".into())
        );
        assert_eq!(
            SessionCommand::parse("exit strategy for startups"),
            SessionCommand::Query("exit strategy for startups".into())
        );
    }
}
