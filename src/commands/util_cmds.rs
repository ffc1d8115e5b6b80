use std::sync::Arc;

use super::CommandContext;
use crate::calc;
use crate::error::AppError;
use crate::helpers::{format_duration_human, parse_duration};

pub(super) async fn calculate(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    if args.is_empty() {
        return ctx.reply("Please provide a mathematical expression.").await;
    }
    let expression = args.join(" ");
    match calc::eval(&expression) {
        Ok(value) => ctx.reply(&format!("{expression} = {value}")).await,
        Err(_) => ctx.reply("Invalid expression. Please try again.").await,
    }
}

pub(super) async fn remind(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    if args.len() < 2 {
        return ctx
            .reply("Usage: remind <time> <message>. Example: remind 5m Check the oven")
            .await;
    }
    let Some(delay) = parse_duration(&args[0]) else {
        return ctx
            .reply(&format!(
                "Invalid time format: '{}'. Use 10s, 5m, 2h.",
                args[0]
            ))
            .await;
    };
    let message = args[1..].join(" ");
    let id = ctx.scheduler.schedule(
        Arc::clone(ctx.transport),
        ctx.chat,
        &message,
        delay,
    );
    let human = format_duration_human(delay.as_secs());
    ctx.reply(&format!("Reminder #{id} set for {human} from now: {message}"))
        .await
}

pub(super) async fn reminders(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let pending = ctx.scheduler.pending_for(ctx.chat);
    if pending.is_empty() {
        return ctx.reply("No pending reminders.").await;
    }
    let now = crate::helpers::epoch_now();
    let mut lines = vec![format!("Pending reminders ({}):", pending.len())];
    for (id, message, due_at) in &pending {
        let remaining = (*due_at - now).max(0) as u64;
        lines.push(format!(
            "#{id} - {message} (in {})",
            format_duration_human(remaining)
        ));
    }
    ctx.reply(&lines.join("\n")).await
}

pub(super) async fn cancelreminder(
    ctx: &CommandContext<'_>,
    args: &[String],
) -> Result<(), AppError> {
    let Some(id) = args.first().and_then(|raw| raw.parse::<u64>().ok()) else {
        return ctx.reply("Usage: cancelreminder <id>").await;
    };
    if ctx.scheduler.cancel(id, ctx.chat) {
        ctx.reply(&format!("Reminder #{id} cancelled.")).await
    } else {
        ctx.reply(&format!("No pending reminder #{id} found for this chat."))
            .await
    }
}
