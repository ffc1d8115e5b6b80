use rand::seq::SliceRandom;

use super::CommandContext;
use crate::error::AppError;
use crate::helpers::{epoch_now, mention_tag};
use crate::store::Quote;

pub(super) async fn savequote(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    if args.is_empty() {
        return ctx.reply("Please provide a quote to save.").await;
    }
    let group = ctx.group().unwrap_or_default();
    let quote = Quote {
        text: args.join(" "),
        author: ctx.msg.sender.clone(),
        saved_at: epoch_now(),
    };
    ctx.store.update(|d| {
        d.quotes.entry(group.to_string()).or_default().push(quote);
    });
    ctx.reply("Quote saved.").await
}

pub(super) async fn getquote(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let group = ctx.group().unwrap_or_default();
    let picked = ctx.store.with(|d| {
        let quotes = d.quotes.get(group)?;
        quotes.choose(&mut rand::thread_rng()).cloned()
    });
    match picked {
        Some(quote) => {
            ctx.reply_mentioning(
                &format!(
                    "*Random Quote:*\n\n\"{}\"\n\n- saved by {}",
                    quote.text,
                    mention_tag(&quote.author)
                ),
                vec![quote.author.clone()],
            )
            .await
        }
        None => ctx.reply("No quotes saved for this group.").await,
    }
}
