//! Reply texts (Telegram Markdown).

use crate::db::{StreamRecord, StreamStatus};

const COMMANDS_HELP: &str = "`/add NAME` _Add stream_\n\
`/del KEY` _Delete stream_\n\
`/info KEY` _Info about stream_\n\
`/run KEY` _Run stream_\n\
`/stop KEY` _Stop stream_";

/// Escape user-supplied text for legacy Markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn usage() -> String {
    format!(
        "This bot provide you a simple way to produce reasonably insecure notifications. \
         You can notify yourself by making custom HTTP request with the KEY and message provided:\n\
         1) Add new notification stream (/add)\n\
         2) Copy your personal Link (/info)\n\
         3) Use this Link with your message\n\n\
         *Commands List:*\n\
         `/list` _List all your streams_\n\
         {COMMANDS_HELP}"
    )
}

fn status_badge(status: StreamStatus) -> &'static str {
    match status {
        StreamStatus::Active => "🟢 active",
        StreamStatus::Stopped => "🔴 stopped",
    }
}

fn status_dot(status: StreamStatus) -> &'static str {
    match status {
        StreamStatus::Active => "🟢",
        StreamStatus::Stopped => "🔴",
    }
}

/// The user's streams, ordered by creation.
pub fn stream_list(streams: &[StreamRecord]) -> String {
    let mut message = if streams.is_empty() {
        "*You have no streams yet.*".to_string()
    } else {
        let mut sorted: Vec<&StreamRecord> = streams.iter().collect();
        sorted.sort_by_key(|s| s.id);
        let mut message = "Your streams list:".to_string();
        for stream in sorted {
            message.push_str(&format!(
                "\n {} *{}:* {}",
                status_dot(stream.status),
                escape_markdown(&stream.name),
                stream.secret
            ));
        }
        message
    };
    message.push_str("\n\n");
    message.push_str(COMMANDS_HELP);
    message
}

pub fn stream_info(stream: &StreamRecord, link: &str) -> String {
    format!(
        "*Stream:* {}\n*Status:* {}\n*Key:* {}\n*Link:* {link}",
        escape_markdown(&stream.name),
        status_badge(stream.status),
        stream.secret
    )
}

pub fn stream_created(name: &str, secret: &str, link: &str) -> String {
    format!(
        "*New stream has been created:* {}\n*Key:* {secret}\n*Link:* {link}",
        escape_markdown(name)
    )
}

pub fn enter_name() -> String {
    "Enter stream name in command: `/add NAME`".to_string()
}

pub fn enter_key(command: &str) -> String {
    format!("Enter stream key in command: `{command} KEY`")
}

pub fn not_found(secret: &str) -> String {
    format!("*Stream was not found.*\n{}", escape_markdown(secret))
}

pub fn add_failed() -> String {
    "*Failed to add new stream!*\nPlease, try again later…".to_string()
}

pub fn deleted(secret: &str) -> String {
    format!("*Stream has been deleted.*\n{secret}")
}

pub fn delete_failed() -> String {
    "*Failed to delete stream!* Try again later…".to_string()
}

pub fn already_active(secret: &str) -> String {
    format!("*Stream is already active*.\n{secret}")
}

pub fn activated(secret: &str) -> String {
    format!("*Stream has been activated*.\n{secret}")
}

pub fn activate_failed() -> String {
    "*Failed to activate stream!* Try again later…".to_string()
}

pub fn already_stopped(secret: &str) -> String {
    format!("*Stream is already stopped*.\n{secret}")
}

pub fn stopped(secret: &str) -> String {
    format!("*Stream has been stopped*.\n{secret}")
}

pub fn stop_failed() -> String {
    "*Failed to stop stream!* Try again later…".to_string()
}
