//! Parsing of lines typed at the prompt

/// What a typed line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Publish the text
    Say(String),
    /// Send a keepalive ping
    Ping,
    /// Leave the chat
    Quit,
    /// Blank line; nothing to do
    Empty,
}

/// Parse one line of user input
///
/// Only `/quit` (or `/exit`) and `/ping` are commands. Any other text,
/// even if it starts with `/`, is sent as a message.
pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    match trimmed.trim() {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/ping" => Input::Ping,
        _ => Input::Say(trimmed.to_string()),
    }
}
