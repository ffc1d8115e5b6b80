use tracing::error;

use super::CommandContext;
use crate::error::AppError;
use crate::transport::MediaPayload;

/// Save the media from the quoted message and echo it back to the chat.
pub(super) async fn save(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let Some(quoted) = &ctx.msg.quoted else {
        return ctx.reply("Please reply to a message to save it.").await;
    };
    let Some(attachment) = quoted.attachments.first() else {
        return ctx.reply("No media found in the quoted message.").await;
    };

    let saved = match ctx
        .media
        .save_from(ctx.transport.as_ref(), attachment, &ctx.msg.sender)
        .await
    {
        Ok(saved) => saved,
        Err(e) => {
            error!(attachment = %attachment.id, "Media save failed: {e}");
            return ctx.reply(&format!("Failed to save media: {e}")).await;
        }
    };

    ctx.reply("Media saved successfully.").await?;
    let caption = format!("Here's your saved {}!", saved.kind.as_str());
    if let Err(e) = ctx
        .transport
        .send_media(
            ctx.chat,
            MediaPayload {
                path: saved.path.clone(),
                kind: saved.kind,
                caption: Some(caption),
                mimetype: Some(saved.mimetype.clone()),
            },
        )
        .await
    {
        error!(path = %saved.path.display(), "Media echo failed: {e}");
        ctx.reply("Saved the media, but failed to send it back.").await?;
    }
    Ok(())
}
