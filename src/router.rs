use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::commands::{self, CommandContext};
use crate::error::AppError;
use crate::gateway::{Event, InboundMessage, MembershipChange};
use crate::helpers::{contains_link, epoch_now, mention_tag, truncate};
use crate::media::MediaStore;
use crate::scheduler::ReminderScheduler;
use crate::store::Store;
use crate::transport::{MembershipAction, TextOptions, Transport};

pub(crate) struct Router {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) store: Store,
    pub(crate) media: MediaStore,
    pub(crate) scheduler: Arc<ReminderScheduler>,
    pub(crate) account: String,
    pub(crate) started_at: Instant,
}

impl Router {
    pub(crate) async fn handle_event(&self, event: Event) {
        match event {
            Event::Message(msg) => {
                let chat = msg.group.clone().unwrap_or_else(|| msg.sender.clone());
                if let Err(e) = self.handle_message(&msg).await {
                    error!(sender = %msg.sender, "Error handling message: {e}");
                    let _ = self
                        .send(&chat, "An error occurred while processing your command.")
                        .await;
                }
            }
            Event::Membership(change) => {
                if let Err(e) = self.handle_membership(&change).await {
                    error!(group = %change.group, "Error handling membership update: {e}");
                }
            }
            Event::Pairing { code } => {
                info!("Pairing code: {code} (link this device from your phone)");
            }
            Event::Closed { .. } => {}
        }
    }

    pub(crate) async fn handle_message(&self, msg: &InboundMessage) -> Result<(), AppError> {
        let chat = msg.group.as_deref().unwrap_or(&msg.sender);
        info!(sender = %msg.sender, chat = %chat, "Message: {}", truncate(&msg.text, 80));

        if let Some(group) = msg.group.as_deref() {
            self.store.ensure_group(group);
        }

        let was_afk = self.store.update(|d| {
            let user = d.users.entry(msg.sender.clone()).or_default();
            user.last_seen = epoch_now();
            let was = user.afk;
            if was {
                user.afk = false;
                user.afk_reason.clear();
            }
            was
        });
        if was_afk {
            self.send(chat, "Your AFK status has been removed.").await?;
        }

        let prefix = self.store.prefix();
        if !msg.text.starts_with(&prefix) {
            return self.passive_scan(msg, chat).await;
        }

        let body = msg.text[prefix.len()..].trim();
        let mut parts = body.split_whitespace();
        let Some(first) = parts.next() else {
            return Ok(());
        };
        let command = first.to_lowercase();
        let args: Vec<String> = parts.map(str::to_string).collect();

        let is_bot_admin = self.store.is_admin(&msg.sender);
        if self.store.user(&msg.sender).banned && !is_bot_admin {
            return self.send(chat, "You are banned from using the bot.").await;
        }

        let roster = match msg.group.as_deref() {
            Some(group) => match self.transport.group_roster(group).await {
                Ok(roster) => roster,
                Err(e) => {
                    warn!(group = %group, "Failed to fetch roster: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let is_group_admin = roster.iter().any(|p| p.id == msg.sender && p.admin);

        if let Some(group) = msg.group.as_deref() {
            let settings = self.store.group(group);
            let admin = is_bot_admin || is_group_admin;
            if !settings.bot_enabled && !admin {
                return Ok(());
            }
            if settings.muted && !admin {
                return Ok(());
            }
        }

        let ctx = CommandContext {
            transport: &self.transport,
            store: &self.store,
            media: &self.media,
            scheduler: &self.scheduler,
            account: &self.account,
            started_at: self.started_at,
            msg,
            chat,
            roster: &roster,
            is_bot_admin,
            is_group_admin,
        };
        commands::dispatch(&ctx, &command, &args).await
    }

    /// Listeners for non-command text: the anti-link scan and AFK mention
    /// notices.
    async fn passive_scan(&self, msg: &InboundMessage, chat: &str) -> Result<(), AppError> {
        if let Some(group) = msg.group.as_deref() {
            let settings = self.store.group(group);
            if !settings.bot_enabled {
                return Ok(());
            }
            if settings.anti_link && contains_link(&msg.text) {
                self.anti_link(msg, group).await?;
            }
        }
        for target in &msg.mentions {
            let user = self.store.user(target);
            if user.afk {
                self.transport
                    .send_text(
                        chat,
                        &format!(
                            "{} is currently AFK: {}",
                            mention_tag(target),
                            user.afk_reason
                        ),
                        TextOptions {
                            mentions: vec![target.clone()],
                            ..TextOptions::default()
                        },
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn anti_link(&self, msg: &InboundMessage, group: &str) -> Result<(), AppError> {
        if self.store.is_admin(&msg.sender) {
            return Ok(());
        }
        // a roster failure must not get anyone kicked
        let roster = match self.transport.group_roster(group).await {
            Ok(roster) => roster,
            Err(e) => {
                warn!(group = %group, "Failed to fetch roster for anti-link scan: {e}");
                return Ok(());
            }
        };
        if roster.iter().any(|p| p.id == msg.sender && p.admin) {
            return Ok(());
        }

        info!(group = %group, sender = %msg.sender, "Link detected, removing sender");
        self.send(group, "Links are not allowed in this group.").await?;
        match self
            .transport
            .update_membership(group, &[msg.sender.clone()], MembershipAction::Remove)
            .await
        {
            Ok(()) => {
                self.transport
                    .send_text(
                        group,
                        &format!(
                            "{} has been removed for sending links.",
                            mention_tag(&msg.sender)
                        ),
                        TextOptions {
                            mentions: vec![msg.sender.clone()],
                            ..TextOptions::default()
                        },
                    )
                    .await
            }
            Err(e) => {
                error!(group = %group, "Failed to remove link sender: {e}");
                self.send(group, "Failed to remove the link sender.").await
            }
        }
    }

    /// Welcome and goodbye notices. Groups the store has never seen stay
    /// silent, as do muted or disabled ones.
    pub(crate) async fn handle_membership(
        &self,
        change: &MembershipChange,
    ) -> Result<(), AppError> {
        let Some(settings) = self.store.with(|d| d.groups.get(&change.group).cloned()) else {
            return Ok(());
        };
        if settings.muted || !settings.bot_enabled {
            return Ok(());
        }
        let template = match change.action {
            MembershipAction::Add => &settings.welcome,
            MembershipAction::Remove => &settings.goodbye,
        };
        for user in &change.users {
            let text = template.replace("@user", &mention_tag(user));
            self.transport
                .send_text(
                    &change.group,
                    &text,
                    TextOptions {
                        mentions: vec![user.clone()],
                        ..TextOptions::default()
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn send(&self, target: &str, text: &str) -> Result<(), AppError> {
        self.transport
            .send_text(target, text, TextOptions::default())
            .await
    }
}
