//! Bot Command Handlers
//!
//! Turns chat commands into registry calls and replies to the user.
//! Streams are scoped to their owner here: a stream that belongs to someone
//! else is answered exactly like a missing one.

mod command;
pub mod replies;

use tracing::{debug, info, warn};

pub use command::Command;

use crate::api::AppState;
use crate::db::{StreamRecord, StreamStatus};
use crate::telegram::{SendOptions, Update};

/// Handle one webhook update.
#[tracing::instrument(skip(state, update), fields(update_id = update.update_id))]
pub async fn handle_update(state: &AppState, update: Update) {
    let Some(message) = update.message else {
        debug!("Ignoring update without a message");
        return;
    };
    let Some(from) = message.from else {
        debug!("Ignoring message without a sender");
        return;
    };
    let Some(command) = message.text.as_deref().and_then(Command::parse) else {
        debug!(user_id = from.id, "Ignoring message that is not a command");
        return;
    };

    let ctx = CommandContext {
        state,
        user_id: from.id.to_string(),
    };
    ctx.run(command).await;
}

/// One command invocation by one user.
struct CommandContext<'a> {
    state: &'a AppState,
    user_id: String,
}

impl CommandContext<'_> {
    async fn run(&self, command: Command) {
        debug!(user_id = %self.user_id, command = command.name(), "Handling command");
        match command {
            Command::Start => self.reply(&replies::usage(), SendOptions::markdown()).await,
            Command::Add(name) => self.add(&name).await,
            Command::Delete(secret) => self.delete(&secret).await,
            Command::List => self.list().await,
            Command::Info(secret) => self.info(&secret).await,
            Command::Run(secret) => self.set_status(&secret, StreamStatus::Active).await,
            Command::Stop(secret) => self.set_status(&secret, StreamStatus::Stopped).await,
        }
    }

    async fn reply(&self, text: &str, options: SendOptions) {
        if let Err(e) = self
            .state
            .messenger
            .send_message(&self.user_id, text, options)
            .await
        {
            warn!(user_id = %self.user_id, error = %e, "Failed to send reply");
        }
    }

    async fn add(&self, name: &str) {
        if name.is_empty() {
            self.reply(&replies::enter_name(), SendOptions::markdown())
                .await;
            return;
        }

        match self.state.registry.add(&self.user_id, name).await {
            Ok(secret) => {
                let link = self.state.config.stream_link(&secret);
                self.reply(
                    &replies::stream_created(name, &secret, &link),
                    SendOptions::markdown().without_preview(),
                )
                .await;
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Failed to add stream");
                self.reply(&replies::add_failed(), SendOptions::markdown())
                    .await;
            }
        }
    }

    async fn delete(&self, secret: &str) {
        let Some(stream) = self.owned_stream(secret, "/del").await else {
            return;
        };

        let text = match self.state.registry.delete(&stream.secret).await {
            Ok(_) => replies::deleted(&stream.secret),
            Err(e) => {
                warn!(secret = %stream.secret, error = %e, "Failed to delete stream");
                replies::delete_failed()
            }
        };
        self.reply(&text, SendOptions::markdown()).await;
    }

    async fn list(&self) {
        let streams = self.state.registry.get_all_for_owner(&self.user_id);
        self.reply(&replies::stream_list(&streams), SendOptions::markdown())
            .await;
    }

    async fn info(&self, secret: &str) {
        let Some(stream) = self.owned_stream(secret, "/info").await else {
            return;
        };
        let link = self.state.config.stream_link(&stream.secret);
        self.reply(
            &replies::stream_info(&stream, &link),
            SendOptions::markdown().without_preview(),
        )
        .await;
    }

    async fn set_status(&self, secret: &str, status: StreamStatus) {
        let command = match status {
            StreamStatus::Active => "/run",
            StreamStatus::Stopped => "/stop",
        };
        let Some(stream) = self.owned_stream(secret, command).await else {
            return;
        };

        if stream.status == status {
            let text = match status {
                StreamStatus::Active => replies::already_active(&stream.secret),
                StreamStatus::Stopped => replies::already_stopped(&stream.secret),
            };
            self.reply(&text, SendOptions::markdown()).await;
            return;
        }

        let text = match (self.state.registry.set_status(&stream, status).await, status) {
            (Ok(()), StreamStatus::Active) => replies::activated(&stream.secret),
            (Ok(()), StreamStatus::Stopped) => replies::stopped(&stream.secret),
            (Err(e), _) => {
                warn!(secret = %stream.secret, error = %e, "Failed to change stream status");
                match status {
                    StreamStatus::Active => replies::activate_failed(),
                    StreamStatus::Stopped => replies::stop_failed(),
                }
            }
        };
        self.reply(&text, SendOptions::markdown()).await;
    }

    /// The stream with `secret` if it exists and belongs to the caller.
    async fn owned_stream(&self, secret: &str, command: &str) -> Option<StreamRecord> {
        if secret.is_empty() {
            self.reply(&replies::enter_key(command), SendOptions::markdown())
                .await;
            return None;
        }

        let Some(stream) = self.state.registry.get(secret) else {
            info!(user_id = %self.user_id, secret, command, "Stream was not found");
            self.reply(&replies::not_found(secret), SendOptions::markdown())
                .await;
            return None;
        };

        if stream.owner_id != self.user_id {
            warn!(
                command,
                user_id = %self.user_id,
                owner_id = %stream.owner_id,
                "Attempt to access someone else's stream"
            );
            self.reply(&replies::not_found(secret), SendOptions::markdown())
                .await;
            return None;
        }

        Some(stream)
    }
}
