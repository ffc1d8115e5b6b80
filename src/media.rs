use std::path::PathBuf;

use tracing::debug;

use crate::error::AppError;
use crate::helpers::{epoch_millis, local_part};
use crate::transport::{Attachment, MediaKind, Transport};

#[derive(Debug, Clone)]
pub(crate) struct SavedMedia {
    pub(crate) path: PathBuf,
    pub(crate) mimetype: String,
    pub(crate) kind: MediaKind,
}

/// Writes fetched attachments into the media directory under
/// `<epoch-millis>_<requester>.<ext>` names.
pub(crate) struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(MediaStore { dir })
    }

    pub(crate) async fn save_from(
        &self,
        transport: &dyn Transport,
        attachment: &Attachment,
        requester: &str,
    ) -> Result<SavedMedia, AppError> {
        let bytes = transport.fetch_attachment(attachment).await?;
        let name = format!(
            "{}_{}.{}",
            epoch_millis(),
            local_part(requester),
            extension_for(&attachment.mimetype)
        );
        let path = self.dir.join(name);
        std::fs::write(&path, &bytes)?;
        debug!(
            kind = attachment.kind.as_str(),
            "Saved media to {}",
            path.display()
        );
        Ok(SavedMedia {
            path,
            mimetype: attachment.mimetype.clone(),
            kind: attachment.kind,
        })
    }
}

/// Derive a file extension from the declared MIME type; subtype with a few
/// conventional renames, "bin" when the type is unusable.
pub(crate) fn extension_for(mime: &str) -> &str {
    match mime {
        "image/jpeg" => "jpg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        _ => mime
            .split('/')
            .nth(1)
            .map(|s| s.split(';').next().unwrap_or(s))
            .filter(|s| !s.is_empty())
            .unwrap_or("bin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("audio/mpeg"), "mp3");
        assert_eq!(extension_for("video/mp4"), "mp4");
        assert_eq!(extension_for("application/pdf"), "pdf");
        assert_eq!(extension_for("audio/ogg; codecs=opus"), "ogg");
        assert_eq!(extension_for("garbage"), "bin");
        assert_eq!(extension_for("image/"), "bin");
    }

    #[tokio::test]
    async fn test_save_from_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = MediaStore::new(dir.path().join("media")).expect("media dir");

        let mut transport = MockTransport::new();
        transport
            .expect_fetch_attachment()
            .returning(|_| Ok(vec![1, 2, 3, 4]));

        let attachment = Attachment {
            id: "att1".to_string(),
            kind: MediaKind::Image,
            mimetype: "image/png".to_string(),
        };
        let saved = media
            .save_from(&transport, &attachment, "77111@s.whatsapp.net")
            .await
            .expect("save");

        assert_eq!(saved.kind, MediaKind::Image);
        assert_eq!(saved.mimetype, "image/png");
        let name = saved.path.file_name().expect("name").to_string_lossy().to_string();
        assert!(name.ends_with(".png"));
        assert!(name.contains("_77111"));
        assert_eq!(std::fs::read(&saved.path).expect("read"), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_save_from_surfaces_fetch_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = MediaStore::new(dir.path().join("media")).expect("media dir");

        let mut transport = MockTransport::new();
        transport
            .expect_fetch_attachment()
            .returning(|_| Err(AppError::Gateway("download failed".to_string())));

        let attachment = Attachment {
            id: "att2".to_string(),
            kind: MediaKind::Video,
            mimetype: "video/mp4".to_string(),
        };
        let result = media
            .save_from(&transport, &attachment, "u@s.whatsapp.net")
            .await;
        assert!(result.is_err());
    }
}
