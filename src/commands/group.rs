use tracing::{error, info};

use super::CommandContext;
use crate::error::AppError;
use crate::helpers::mention_tag;
use crate::transport::{MembershipAction, RoleChange};

pub(super) async fn tagall(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let message = if args.is_empty() {
        "Hey everyone!".to_string()
    } else {
        args.join(" ")
    };
    let mut text = format!("*Attention Everyone!*\n\n{message}\n\n");
    let mentions: Vec<String> = ctx.roster.iter().map(|p| p.id.clone()).collect();
    for id in &mentions {
        text.push_str(&mention_tag(id));
        text.push('\n');
    }
    ctx.reply_mentioning(text.trim_end(), mentions).await
}

pub(super) async fn mute(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let group = ctx.group().unwrap_or_default();
    ctx.store.update(|d| {
        d.groups.entry(group.to_string()).or_default().muted = true;
    });
    ctx.reply("Bot has been muted in this group.").await
}

pub(super) async fn unmute(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let group = ctx.group().unwrap_or_default();
    ctx.store.update(|d| {
        d.groups.entry(group.to_string()).or_default().muted = false;
    });
    ctx.reply("Bot has been unmuted in this group.").await
}

pub(super) async fn kick(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let Some(target) = ctx.first_mention() else {
        return ctx.reply("Please mention the user you want to kick.").await;
    };
    if target == ctx.account {
        return ctx.reply("I am not going to kick myself.").await;
    }
    let group = ctx.group().unwrap_or_default();
    match ctx
        .transport
        .update_membership(group, &[target.clone()], MembershipAction::Remove)
        .await
    {
        Ok(()) => {
            info!(group = %group, target = %target, "User kicked");
            ctx.reply_mentioning(
                &format!("{} has been kicked from the group.", mention_tag(target)),
                vec![target.clone()],
            )
            .await
        }
        Err(e) => {
            error!(group = %group, "Kick failed: {e}");
            ctx.reply(&format!("Failed to kick user: {e}")).await
        }
    }
}

pub(super) async fn add(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let Some(raw) = args.first() else {
        return ctx.reply("Please provide a number to add.").await;
    };
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return ctx.reply("Please provide a valid number to add.").await;
    }
    let user = format!("{digits}@s.whatsapp.net");
    let group = ctx.group().unwrap_or_default();
    match ctx
        .transport
        .update_membership(group, &[user], MembershipAction::Add)
        .await
    {
        Ok(()) => ctx.reply(&format!("User {raw} has been added to the group.")).await,
        Err(e) => {
            error!(group = %group, "Add failed: {e}");
            ctx.reply(&format!("Failed to add user: {e}")).await
        }
    }
}

async fn change_role(
    ctx: &CommandContext<'_>,
    change: RoleChange,
    done: &str,
) -> Result<(), AppError> {
    let Some(target) = ctx.first_mention() else {
        return ctx
            .reply(&format!(
                "Please mention the user you want to {}.",
                change.as_str()
            ))
            .await;
    };
    let group = ctx.group().unwrap_or_default();
    match ctx.transport.set_role(group, target, change).await {
        Ok(()) => {
            ctx.reply_mentioning(
                &format!("{} has been {done}.", mention_tag(target)),
                vec![target.clone()],
            )
            .await
        }
        Err(e) => {
            error!(group = %group, "Role change failed: {e}");
            ctx.reply(&format!("Failed to {} user: {e}", change.as_str()))
                .await
        }
    }
}

pub(super) async fn promote(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    change_role(ctx, RoleChange::Promote, "promoted to admin").await
}

pub(super) async fn demote(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    change_role(ctx, RoleChange::Demote, "demoted from admin").await
}

pub(super) async fn welcome(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let group = ctx.group().unwrap_or_default();
    if args.is_empty() {
        let current = ctx.store.group(group).welcome;
        return ctx.reply(&format!("Current welcome message: {current}")).await;
    }
    let message = args.join(" ");
    ctx.store.update(|d| {
        d.groups.entry(group.to_string()).or_default().welcome = message;
    });
    ctx.reply("Welcome message has been set.").await
}

pub(super) async fn goodbye(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let group = ctx.group().unwrap_or_default();
    if args.is_empty() {
        let current = ctx.store.group(group).goodbye;
        return ctx.reply(&format!("Current goodbye message: {current}")).await;
    }
    let message = args.join(" ");
    ctx.store.update(|d| {
        d.groups.entry(group.to_string()).or_default().goodbye = message;
    });
    ctx.reply("Goodbye message has been set.").await
}

/// Anyone may read the rules; setting them is admin-gated here rather than in
/// the table so the read path stays open.
pub(super) async fn rules(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let group = ctx.group().unwrap_or_default();
    if args.is_empty() {
        let current = ctx.store.group(group).rules;
        return ctx.reply(&format!("*Group Rules:*\n{current}")).await;
    }
    if !ctx.is_any_admin() {
        return ctx.reply("Only admins can set rules.").await;
    }
    let text = args.join(" ");
    ctx.store.update(|d| {
        d.groups.entry(group.to_string()).or_default().rules = text;
    });
    ctx.reply("Group rules have been set.").await
}

pub(super) async fn antilink(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let group = ctx.group().unwrap_or_default();
    match args.first().map(String::as_str) {
        None => {
            let enabled = ctx.store.group(group).anti_link;
            ctx.reply(&format!(
                "Anti-link is currently {}.",
                if enabled { "enabled" } else { "disabled" }
            ))
            .await
        }
        Some("on") => {
            ctx.store.update(|d| {
                d.groups.entry(group.to_string()).or_default().anti_link = true;
            });
            ctx.reply("Anti-link has been enabled.").await
        }
        Some("off") => {
            ctx.store.update(|d| {
                d.groups.entry(group.to_string()).or_default().anti_link = false;
            });
            ctx.reply("Anti-link has been disabled.").await
        }
        Some(_) => ctx.reply("Invalid option. Use \"on\" or \"off\".").await,
    }
}

pub(super) async fn bot(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let group = ctx.group().unwrap_or_default();
    match args.first().map(String::as_str) {
        None => {
            let enabled = ctx.store.group(group).bot_enabled;
            ctx.reply(&format!(
                "The bot is currently {} in this group.",
                if enabled { "enabled" } else { "disabled" }
            ))
            .await
        }
        Some("on") => {
            ctx.store.update(|d| {
                d.groups.entry(group.to_string()).or_default().bot_enabled = true;
            });
            ctx.reply("The bot has been enabled in this group.").await
        }
        Some("off") => {
            ctx.store.update(|d| {
                d.groups.entry(group.to_string()).or_default().bot_enabled = false;
            });
            ctx.reply("The bot has been disabled in this group.").await
        }
        Some(_) => ctx.reply("Invalid option. Use \"on\" or \"off\".").await,
    }
}
