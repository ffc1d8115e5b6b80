use super::{Area, CommandContext, COMMANDS};
use crate::error::AppError;
use crate::helpers::{format_epoch, local_part};

pub(super) async fn help(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let prefix = ctx.store.prefix();
    let sections = [
        (Area::General, "General"),
        (Area::Group, "Group Management"),
        (Area::Moderation, "Moderation"),
        (Area::Media, "Media"),
        (Area::Fun, "Fun"),
        (Area::Utility, "Utility"),
        (Area::Admin, "Admin"),
    ];
    let mut out = String::from("*WhatsApp Bot Commands*\n");
    for (area, title) in sections {
        out.push_str(&format!("\n*{title}:*\n"));
        for spec in COMMANDS.iter().filter(|spec| spec.area == area) {
            out.push_str(&format!("{prefix}{} - {}\n", spec.usage, spec.blurb));
        }
    }
    out.push_str("\nAdmin commands can only be used by group admins.");
    ctx.reply(&out).await
}

pub(super) async fn ping(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    ctx.reply("Pong! Bot is online and ready!").await
}

pub(super) async fn info(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let uptime = ctx.started_at.elapsed();
    let hours = uptime.as_secs() / 3600;
    let mins = (uptime.as_secs() % 3600) / 60;
    let (prefix, groups, users) = ctx
        .store
        .with(|d| (d.settings.prefix.clone(), d.groups.len(), d.users.len()));
    ctx.reply(&format!(
        "*Bot Information*\n\
         Uptime: {hours}h {mins}m\n\
         Prefix: {prefix}\n\
         Groups: {groups}\n\
         Users: {users}"
    ))
    .await
}

pub(super) async fn profile(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let user = ctx.store.user(&ctx.msg.sender);
    let mut out = format!(
        "*User Profile*\n\
         Number: {}\n\
         Warnings: {}\n\
         Banned: {}\n\
         Last Seen: {}\n\
         AFK: {}",
        local_part(&ctx.msg.sender),
        user.warnings,
        if user.banned { "Yes" } else { "No" },
        format_epoch(user.last_seen),
        if user.afk { "Yes" } else { "No" },
    );
    if user.afk {
        out.push_str(&format!("\nAFK Reason: {}", user.afk_reason));
    }
    ctx.reply(&out).await
}

pub(super) async fn afk(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let reason = if args.is_empty() {
        "No reason specified".to_string()
    } else {
        args.join(" ")
    };
    ctx.store.update(|d| {
        let user = d.users.entry(ctx.msg.sender.clone()).or_default();
        user.afk = true;
        user.afk_reason = reason.clone();
    });
    ctx.reply(&format!("You are now AFK: {reason}")).await
}

pub(super) async fn groupinfo(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let group = ctx.group().unwrap_or_default();
    let settings = ctx.store.group(group);
    let admins = ctx.roster.iter().filter(|p| p.admin).count();
    let quotes = ctx
        .store
        .with(|d| d.quotes.get(group).map(Vec::len).unwrap_or(0));
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    ctx.reply(&format!(
        "*Group Information*\n\
         ID: {group}\n\
         Members: {}\n\
         Admins: {admins}\n\
         Saved quotes: {quotes}\n\
         Bot: {}\n\
         Muted: {}\n\
         Anti-link: {}",
        ctx.roster.len(),
        on_off(settings.bot_enabled),
        on_off(settings.muted),
        on_off(settings.anti_link),
    ))
    .await
}
