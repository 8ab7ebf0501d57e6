//! Bot command parsing.

/// A command sent to the bot in a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` or `/help`
    Start,
    /// `/add NAME`
    Add(String),
    /// `/del KEY`
    Delete(String),
    /// `/list`
    List,
    /// `/info KEY`
    Info(String),
    /// `/run KEY`
    Run(String),
    /// `/stop KEY`
    Stop(String),
}

impl Command {
    /// Parse a message text. Returns `None` for plain text and unknown commands.
    ///
    /// Accepts the `/cmd@botname` form Telegram uses in group chats.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;
        let (head, argument) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        let argument = argument.to_string();

        match name.as_str() {
            "start" | "help" => Some(Self::Start),
            "add" => Some(Self::Add(argument)),
            "del" => Some(Self::Delete(argument)),
            "list" => Some(Self::List),
            "info" => Some(Self::Info(argument)),
            "run" => Some(Self::Run(argument)),
            "stop" => Some(Self::Stop(argument)),
            _ => None,
        }
    }

    /// Command as typed by the user, for prompts and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "/start",
            Self::Add(_) => "/add",
            Self::Delete(_) => "/del",
            Self::List => "/list",
            Self::Info(_) => "/info",
            Self::Run(_) => "/run",
            Self::Stop(_) => "/stop",
        }
    }
}
