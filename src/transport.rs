use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl MediaKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
            MediaKind::Sticker => "sticker",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            "document" => Some(MediaKind::Document),
            "sticker" => Some(MediaKind::Sticker),
            _ => None,
        }
    }

    /// Fallback classification when the envelope omits the content kind.
    pub(crate) fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else if mime.starts_with("audio/") {
            Some(MediaKind::Audio)
        } else if mime.starts_with("application/") || mime.starts_with("text/") {
            Some(MediaKind::Document)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Attachment {
    pub(crate) id: String,
    pub(crate) kind: MediaKind,
    pub(crate) mimetype: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TextOptions {
    pub(crate) mentions: Vec<String>,
    pub(crate) quoted_id: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct MediaPayload {
    pub(crate) path: PathBuf,
    pub(crate) kind: MediaKind,
    pub(crate) caption: Option<String>,
    pub(crate) mimetype: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RosterEntry {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MembershipAction {
    Add,
    Remove,
}

impl MembershipAction {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            MembershipAction::Add => "add",
            MembershipAction::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoleChange {
    Promote,
    Demote,
}

impl RoleChange {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RoleChange::Promote => "promote",
            RoleChange::Demote => "demote",
        }
    }
}

/// The narrow surface the core depends on. The gateway adapter implements it
/// for the real daemon; tests mock it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait Transport: Send + Sync {
    async fn send_text(&self, target: &str, text: &str, opts: TextOptions)
        -> Result<(), AppError>;

    async fn send_media(&self, target: &str, media: MediaPayload) -> Result<(), AppError>;

    async fn group_roster(&self, group: &str) -> Result<Vec<RosterEntry>, AppError>;

    async fn update_membership(
        &self,
        group: &str,
        users: &[String],
        action: MembershipAction,
    ) -> Result<(), AppError>;

    async fn set_role(&self, group: &str, user: &str, change: RoleChange)
        -> Result<(), AppError>;

    /// Fetch an attachment's full contents into memory.
    async fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(MediaKind::from_name("image"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_name("sticker"), Some(MediaKind::Sticker));
        assert_eq!(MediaKind::from_name("gif"), None);
    }

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_mime("video/mp4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_mime("audio/ogg"), Some(MediaKind::Audio));
        assert_eq!(
            MediaKind::from_mime("application/pdf"),
            Some(MediaKind::Document)
        );
        assert_eq!(MediaKind::from_mime("model/gltf"), None);
    }
}
