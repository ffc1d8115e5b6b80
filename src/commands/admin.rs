use tracing::{error, info};

use super::CommandContext;
use crate::error::AppError;
use crate::transport::TextOptions;

pub(super) async fn setprefix(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let Some(prefix) = args.first() else {
        let current = ctx.store.prefix();
        return ctx.reply(&format!("Current prefix is: {current}")).await;
    };
    ctx.store.update(|d| {
        d.settings.prefix = prefix.clone();
    });
    info!(prefix = %prefix, "Command prefix changed");
    ctx.reply(&format!("Prefix has been changed to: {prefix}"))
        .await
}

pub(super) async fn broadcast(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    if args.is_empty() {
        return ctx.reply("Please provide a message to broadcast.").await;
    }
    let message = format!("*Broadcast Message*\n\n{}", args.join(" "));
    let groups: Vec<String> = ctx.store.with(|d| d.groups.keys().cloned().collect());
    let mut delivered = 0usize;
    for group in &groups {
        match ctx
            .transport
            .send_text(group, &message, TextOptions::default())
            .await
        {
            Ok(()) => delivered += 1,
            Err(e) => error!(group = %group, "Broadcast delivery failed: {e}"),
        }
    }
    ctx.reply(&format!("Broadcast sent to {delivered} groups."))
        .await
}

/// Deliberate, clean exit; a process manager restarts the bot.
pub(super) async fn restart(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    ctx.reply("Restarting bot...").await?;
    info!(sender = %ctx.msg.sender, "Restart requested, shutting down");
    ctx.store.save();
    ctx.scheduler.shutdown();
    std::process::exit(0);
}
