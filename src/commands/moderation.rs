use tracing::{error, info};

use super::CommandContext;
use crate::error::AppError;
use crate::helpers::mention_tag;
use crate::moderation::{self, WarnOutcome, WARN_LIMIT};
use crate::transport::MembershipAction;

fn is_roster_admin(ctx: &CommandContext<'_>, user: &str) -> bool {
    ctx.roster.iter().any(|p| p.id == user && p.admin)
}

pub(super) async fn warn(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let Some(target) = ctx.first_mention() else {
        return ctx.reply("Please mention the user you want to warn.").await;
    };
    if target == ctx.account {
        return ctx.reply("I am not going to warn myself.").await;
    }
    if is_roster_admin(ctx, target) {
        return ctx.reply("I am not going to warn a group admin.").await;
    }

    let group = ctx.group().unwrap_or_default();
    match moderation::warn(ctx.store, target) {
        WarnOutcome::Warned(count) => {
            info!(group = %group, target = %target, count, "User warned");
            ctx.reply_mentioning(
                &format!(
                    "{} has been warned. ({count}/{WARN_LIMIT} warnings)",
                    mention_tag(target)
                ),
                vec![target.clone()],
            )
            .await
        }
        WarnOutcome::Flagged => {
            info!(group = %group, target = %target, "Warning limit reached, removing user");
            ctx.reply_mentioning(
                &format!(
                    "{} has been warned. ({WARN_LIMIT}/{WARN_LIMIT} warnings)",
                    mention_tag(target)
                ),
                vec![target.clone()],
            )
            .await?;
            match ctx
                .transport
                .update_membership(group, &[target.clone()], MembershipAction::Remove)
                .await
            {
                Ok(()) => {
                    ctx.reply_mentioning(
                        &format!(
                            "{} has been removed for reaching {WARN_LIMIT} warnings.",
                            mention_tag(target)
                        ),
                        vec![target.clone()],
                    )
                    .await
                }
                Err(e) => {
                    error!(group = %group, target = %target, "Removal failed: {e}");
                    ctx.reply(&format!("Failed to remove the warned user: {e}"))
                        .await
                }
            }
        }
        WarnOutcome::AlreadyFlagged => {
            ctx.reply_mentioning(
                &format!(
                    "{} is already at the warning limit.",
                    mention_tag(target)
                ),
                vec![target.clone()],
            )
            .await
        }
    }
}

pub(super) async fn unwarn(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let Some(target) = ctx.first_mention() else {
        return ctx
            .reply("Please mention the user you want to unwarn.")
            .await;
    };
    match moderation::unwarn(ctx.store, target) {
        Some(count) => {
            ctx.reply_mentioning(
                &format!(
                    "A warning has been removed from {}. ({count}/{WARN_LIMIT} warnings)",
                    mention_tag(target)
                ),
                vec![target.clone()],
            )
            .await
        }
        None => {
            ctx.reply_mentioning(
                &format!("{} has no warnings.", mention_tag(target)),
                vec![target.clone()],
            )
            .await
        }
    }
}

pub(super) async fn ban(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let Some(target) = ctx.first_mention() else {
        return ctx.reply("Please mention the user you want to ban.").await;
    };
    if target == ctx.account {
        return ctx.reply("I am not going to ban myself.").await;
    }
    if moderation::set_banned(ctx.store, target, true) {
        info!(target = %target, "User banned");
        ctx.reply_mentioning(
            &format!("{} has been banned from using the bot.", mention_tag(target)),
            vec![target.clone()],
        )
        .await
    } else {
        ctx.reply_mentioning(
            &format!("{} is already banned.", mention_tag(target)),
            vec![target.clone()],
        )
        .await
    }
}

pub(super) async fn unban(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let Some(target) = ctx.first_mention() else {
        return ctx.reply("Please mention the user you want to unban.").await;
    };
    if moderation::set_banned(ctx.store, target, false) {
        info!(target = %target, "User unbanned");
        ctx.reply_mentioning(
            &format!("{} has been unbanned.", mention_tag(target)),
            vec![target.clone()],
        )
        .await
    } else {
        ctx.reply_mentioning(
            &format!("{} is not banned.", mention_tag(target)),
            vec![target.clone()],
        )
        .await
    }
}
