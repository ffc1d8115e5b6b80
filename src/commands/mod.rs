mod admin;
mod fun;
mod general;
mod group;
mod media_cmds;
mod moderation;
mod quotes;
mod util_cmds;


use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tracing::error;

use crate::error::AppError;
use crate::gateway::InboundMessage;
use crate::media::MediaStore;
use crate::scheduler::ReminderScheduler;
use crate::store::Store;
use crate::transport::{RosterEntry, TextOptions, Transport};

/// Everything a handler may touch for one invocation. Handlers reply through
/// the transport and mutate only the store; they are otherwise pure with
/// respect to the router.
pub(crate) struct CommandContext<'a> {
    pub(crate) transport: &'a Arc<dyn Transport>,
    pub(crate) store: &'a Store,
    pub(crate) media: &'a MediaStore,
    pub(crate) scheduler: &'a Arc<ReminderScheduler>,
    pub(crate) account: &'a str,
    pub(crate) started_at: Instant,
    pub(crate) msg: &'a InboundMessage,
    /// Reply target: the group for group messages, the sender otherwise.
    pub(crate) chat: &'a str,
    pub(crate) roster: &'a [RosterEntry],
    pub(crate) is_bot_admin: bool,
    pub(crate) is_group_admin: bool,
}

impl CommandContext<'_> {
    pub(crate) async fn reply(&self, text: &str) -> Result<(), AppError> {
        self.transport
            .send_text(
                self.chat,
                text,
                TextOptions {
                    quoted_id: Some(self.msg.id.clone()),
                    ..TextOptions::default()
                },
            )
            .await
    }

    pub(crate) async fn reply_mentioning(
        &self,
        text: &str,
        mentions: Vec<String>,
    ) -> Result<(), AppError> {
        self.transport
            .send_text(
                self.chat,
                text,
                TextOptions {
                    mentions,
                    quoted_id: Some(self.msg.id.clone()),
                },
            )
            .await
    }

    pub(crate) fn group(&self) -> Option<&str> {
        self.msg.group.as_deref()
    }

    pub(crate) fn first_mention(&self) -> Option<&String> {
        self.msg.mentions.first()
    }

    pub(crate) fn is_any_admin(&self) -> bool {
        self.is_bot_admin || self.is_group_admin
    }
}

type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>>;
type Handler = for<'a> fn(&'a CommandContext<'a>, &'a [String]) -> HandlerFuture<'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    /// Anyone may run it.
    None,
    /// Group admin or bot admin.
    GroupAdmin,
    /// Bot admin only; a group admin flag does not count.
    BotAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Area {
    General,
    Group,
    Moderation,
    Media,
    Fun,
    Utility,
    Admin,
}

pub(crate) struct CommandSpec {
    pub(crate) name: &'static str,
    pub(crate) area: Area,
    pub(crate) gate: Gate,
    pub(crate) group_only: bool,
    pub(crate) usage: &'static str,
    pub(crate) blurb: &'static str,
    run: Handler,
}

macro_rules! command {
    ($name:literal, $area:expr, $gate:expr, $group_only:expr, $usage:literal, $blurb:literal, $handler:path) => {{
        fn wrap<'a>(ctx: &'a CommandContext<'a>, args: &'a [String]) -> HandlerFuture<'a> {
            Box::pin($handler(ctx, args))
        }
        CommandSpec {
            name: $name,
            area: $area,
            gate: $gate,
            group_only: $group_only,
            usage: $usage,
            blurb: $blurb,
            run: wrap,
        }
    }};
}

pub(crate) static COMMANDS: &[CommandSpec] = &[
    command!("help", Area::General, Gate::None, false, "help", "Show this help message", general::help),
    command!("ping", Area::General, Gate::None, false, "ping", "Check if the bot is online", general::ping),
    command!("info", Area::General, Gate::None, false, "info", "Bot information", general::info),
    command!("profile", Area::General, Gate::None, false, "profile", "View your profile", general::profile),
    command!("afk", Area::General, Gate::None, false, "afk [reason]", "Set AFK status", general::afk),
    command!("groupinfo", Area::General, Gate::None, true, "groupinfo", "Show group information", general::groupinfo),
    command!("savequote", Area::General, Gate::None, true, "savequote <text>", "Save a quote", quotes::savequote),
    command!("getquote", Area::General, Gate::None, true, "getquote", "Get a random saved quote", quotes::getquote),
    command!("tagall", Area::Group, Gate::GroupAdmin, true, "tagall [message]", "Tag all group members", group::tagall),
    command!("mute", Area::Group, Gate::GroupAdmin, true, "mute", "Mute the bot in this group", group::mute),
    command!("unmute", Area::Group, Gate::GroupAdmin, true, "unmute", "Unmute the bot in this group", group::unmute),
    command!("kick", Area::Group, Gate::GroupAdmin, true, "kick @user", "Remove a user from the group", group::kick),
    command!("add", Area::Group, Gate::GroupAdmin, true, "add <number>", "Add a user to the group", group::add),
    command!("promote", Area::Group, Gate::GroupAdmin, true, "promote @user", "Promote a user to admin", group::promote),
    command!("demote", Area::Group, Gate::GroupAdmin, true, "demote @user", "Demote a user from admin", group::demote),
    command!("welcome", Area::Group, Gate::GroupAdmin, true, "welcome [message]", "Show or set the welcome message", group::welcome),
    command!("goodbye", Area::Group, Gate::GroupAdmin, true, "goodbye [message]", "Show or set the goodbye message", group::goodbye),
    command!("rules", Area::Group, Gate::None, true, "rules [text]", "Show or set the group rules", group::rules),
    command!("antilink", Area::Group, Gate::GroupAdmin, true, "antilink on/off", "Toggle anti-link protection", group::antilink),
    command!("bot", Area::Group, Gate::GroupAdmin, true, "bot on/off", "Enable or disable the bot in this group", group::bot),
    command!("warn", Area::Moderation, Gate::GroupAdmin, true, "warn @user", "Warn a user", moderation::warn),
    command!("unwarn", Area::Moderation, Gate::GroupAdmin, true, "unwarn @user", "Remove a warning from a user", moderation::unwarn),
    command!("ban", Area::Moderation, Gate::BotAdmin, false, "ban @user", "Ban a user from using the bot", moderation::ban),
    command!("unban", Area::Moderation, Gate::BotAdmin, false, "unban @user", "Unban a user", moderation::unban),
    command!("save", Area::Media, Gate::None, false, "save", "Reply to a message with media to save it", media_cmds::save),
    command!("joke", Area::Fun, Gate::None, false, "joke", "Get a random joke", fun::joke),
    command!("fact", Area::Fun, Gate::None, false, "fact", "Get a random fact", fun::fact),
    command!("8ball", Area::Fun, Gate::None, false, "8ball <question>", "Ask the magic 8-ball", fun::eightball),
    command!("flip", Area::Fun, Gate::None, false, "flip", "Flip a coin", fun::flip),
    command!("roll", Area::Fun, Gate::None, false, "roll [sides]", "Roll a dice", fun::roll),
    command!("calculate", Area::Utility, Gate::None, false, "calculate <expression>", "Calculate a mathematical expression", util_cmds::calculate),
    command!("remind", Area::Utility, Gate::None, false, "remind <time> <message>", "Set a reminder (10s, 5m, 2h)", util_cmds::remind),
    command!("reminders", Area::Utility, Gate::None, false, "reminders", "List your pending reminders", util_cmds::reminders),
    command!("cancelreminder", Area::Utility, Gate::None, false, "cancelreminder <id>", "Cancel a reminder", util_cmds::cancelreminder),
    command!("setprefix", Area::Admin, Gate::BotAdmin, false, "setprefix <prefix>", "Change the command prefix", admin::setprefix),
    command!("broadcast", Area::Admin, Gate::BotAdmin, false, "broadcast <message>", "Broadcast a message to all groups", admin::broadcast),
    command!("restart", Area::Admin, Gate::BotAdmin, false, "restart", "Restart the bot", admin::restart),
];

pub(crate) fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Look up and run one command. Authorization is driven by the requirement
/// each table entry declares for itself; an unknown command gets a usage hint,
/// which is a defined response rather than an error.
pub(crate) async fn dispatch(
    ctx: &CommandContext<'_>,
    command: &str,
    args: &[String],
) -> Result<(), AppError> {
    let Some(spec) = find(command) else {
        let prefix = ctx.store.prefix();
        return ctx
            .reply(&format!(
                "Unknown command: {command}. Use {prefix}help to see available commands."
            ))
            .await;
    };

    if spec.group_only && ctx.group().is_none() {
        return ctx.reply("This command can only be used in groups.").await;
    }
    match spec.gate {
        Gate::None => {}
        Gate::GroupAdmin => {
            if !ctx.is_any_admin() {
                return ctx.reply("Only admins can use this command.").await;
            }
        }
        Gate::BotAdmin => {
            if !ctx.is_bot_admin {
                return ctx.reply("Only bot admins can use this command.").await;
            }
        }
    }

    if let Err(e) = (spec.run)(ctx, args).await {
        error!(command = spec.name, "Command failed: {e}");
        ctx.reply(&format!("Failed to run the {} command.", spec.name))
            .await?;
    }
    Ok(())
}
