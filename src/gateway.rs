//! Adapter for the WhatsApp gateway daemon: JSON REST calls out, a WebSocket
//! event stream in. Everything gateway-specific stays here; the rest of the
//! crate sees only `transport` types and `Event`s.

use async_trait::async_trait;
use base64::Engine;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::router::Router;
use crate::transport::{
    Attachment, MediaKind, MediaPayload, MembershipAction, RoleChange, RosterEntry, TextOptions,
    Transport,
};

#[derive(Debug)]
pub(crate) enum Event {
    Message(InboundMessage),
    Membership(MembershipChange),
    Pairing { code: String },
    Closed { logged_out: bool },
}

#[derive(Debug, Clone)]
pub(crate) struct InboundMessage {
    pub(crate) id: String,
    pub(crate) sender: String,
    pub(crate) group: Option<String>,
    pub(crate) text: String,
    pub(crate) mentions: Vec<String>,
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) quoted: Option<QuotedMessage>,
}

#[derive(Debug, Clone)]
pub(crate) struct QuotedMessage {
    pub(crate) id: String,
    pub(crate) attachments: Vec<Attachment>,
}

#[derive(Debug, Clone)]
pub(crate) struct MembershipChange {
    pub(crate) group: String,
    pub(crate) users: Vec<String>,
    pub(crate) action: MembershipAction,
}

/// Parse one gateway envelope. Returns None for envelopes the core ignores
/// (receipts, typing notifications, unknown event types).
pub(crate) fn parse_envelope(envelope: &Value) -> Option<Event> {
    match envelope["event"].as_str()? {
        "message" => parse_message(&envelope["message"]).map(Event::Message),
        "membership" => {
            let group = non_empty(envelope["group"].as_str())?;
            let users = string_list(&envelope["users"]);
            if users.is_empty() {
                return None;
            }
            let action = match envelope["action"].as_str()? {
                "add" => MembershipAction::Add,
                "remove" => MembershipAction::Remove,
                _ => return None,
            };
            Some(Event::Membership(MembershipChange {
                group,
                users,
                action,
            }))
        }
        "pairing" => {
            let code = non_empty(envelope["code"].as_str())?;
            Some(Event::Pairing { code })
        }
        "disconnected" => Some(Event::Closed {
            logged_out: envelope["reason"].as_str() == Some("logged_out"),
        }),
        _ => None,
    }
}

fn parse_message(m: &Value) -> Option<InboundMessage> {
    let sender = non_empty(m["sender"].as_str())?;
    let text = m["text"].as_str().unwrap_or_default().trim().to_string();
    let attachments = parse_attachments(&m["attachments"]);
    let quoted = parse_quoted(&m["quoted"]);
    if text.is_empty() && attachments.is_empty() && quoted.is_none() {
        return None;
    }
    Some(InboundMessage {
        id: m["id"].as_str().unwrap_or_default().to_string(),
        sender,
        group: non_empty(m["group"].as_str()),
        text,
        mentions: string_list(&m["mentions"]),
        attachments,
        quoted,
    })
}

fn parse_quoted(q: &Value) -> Option<QuotedMessage> {
    let id = non_empty(q["id"].as_str())?;
    Some(QuotedMessage {
        id,
        attachments: parse_attachments(&q["attachments"]),
    })
}

fn parse_attachments(v: &Value) -> Vec<Attachment> {
    let Some(list) = v.as_array() else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|a| {
            let id = non_empty(a["id"].as_str())?;
            let mimetype = a["mimetype"]
                .as_str()
                .unwrap_or("application/octet-stream")
                .to_string();
            let kind = a["kind"]
                .as_str()
                .and_then(MediaKind::from_name)
                .or_else(|| MediaKind::from_mime(&mimetype))?;
            Some(Attachment { id, kind, mimetype })
        })
        .collect()
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}

fn string_list(v: &Value) -> Vec<String> {
    v.as_array()
        .map(|list| {
            list.iter()
                .filter_map(|s| s.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) struct HttpGateway {
    http: Client,
    api_url: String,
    account: String,
}

impl HttpGateway {
    pub(crate) fn new(api_url: String, account: String) -> Self {
        HttpGateway {
            http: Client::new(),
            api_url,
            account,
        }
    }

    async fn post_json(&self, url: String, body: Value, action: &str) -> Result<(), AppError> {
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Gateway {action} failed");
            return Err(AppError::Gateway(format!("{action} failed: {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpGateway {
    async fn send_text(
        &self,
        target: &str,
        text: &str,
        opts: TextOptions,
    ) -> Result<(), AppError> {
        let url = format!("{}/v1/send/text", self.api_url);
        let mut body = serde_json::json!({
            "account": self.account,
            "to": target,
            "text": text,
        });
        if !opts.mentions.is_empty() {
            body["mentions"] = serde_json::json!(opts.mentions);
        }
        if let Some(quoted_id) = opts.quoted_id {
            body["quoted_id"] = serde_json::json!(quoted_id);
        }
        self.post_json(url, body, "send").await
    }

    async fn send_media(&self, target: &str, media: MediaPayload) -> Result<(), AppError> {
        let data = std::fs::read(&media.path)?;
        let b64 = base64::engine::general_purpose::STANDARD.encode(data);
        let filename = media
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "media.bin".to_string());
        let url = format!("{}/v1/send/media", self.api_url);
        let mut body = serde_json::json!({
            "account": self.account,
            "to": target,
            "kind": media.kind.as_str(),
            "filename": filename,
            "data": b64,
        });
        if let Some(caption) = media.caption {
            body["caption"] = serde_json::json!(caption);
        }
        if let Some(mimetype) = media.mimetype {
            body["mimetype"] = serde_json::json!(mimetype);
        }
        self.post_json(url, body, "media send").await
    }

    async fn group_roster(&self, group: &str) -> Result<Vec<RosterEntry>, AppError> {
        let url = format!("{}/v1/groups/{}/roster", self.api_url, group);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Gateway(format!(
                "roster fetch failed: {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }

    async fn update_membership(
        &self,
        group: &str,
        users: &[String],
        action: MembershipAction,
    ) -> Result<(), AppError> {
        let url = format!("{}/v1/groups/{}/membership", self.api_url, group);
        let body = serde_json::json!({
            "users": users,
            "action": action.as_str(),
        });
        self.post_json(url, body, "membership update").await
    }

    async fn set_role(
        &self,
        group: &str,
        user: &str,
        change: RoleChange,
    ) -> Result<(), AppError> {
        let url = format!("{}/v1/groups/{}/role", self.api_url, group);
        let body = serde_json::json!({
            "user": user,
            "action": change.as_str(),
        });
        self.post_json(url, body, "role change").await
    }

    async fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, AppError> {
        let url = format!("{}/v1/attachments/{}", self.api_url, attachment.id);
        let mut resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Gateway(format!(
                "attachment fetch failed: {}",
                resp.status()
            )));
        }
        let mut buffer = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            buffer.extend_from_slice(&chunk);
        }
        debug!(
            attachment = %attachment.id,
            bytes = buffer.len(),
            "Fetched attachment"
        );
        Ok(buffer)
    }
}

/// Why a session ended. `LoggedOut` is terminal: the supervisor must not
/// reconnect, a new pairing is required.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    LoggedOut,
    Dropped,
}

/// Read gateway events until the stream ends. Events are handled to
/// completion one at a time; the gateway queues while a handler runs.
pub(crate) async fn connect_and_listen(
    router: &Router,
    api_url: &str,
    account: &str,
) -> Result<SessionEnd, AppError> {
    let ws_url = format!("{}/v1/events/{}", api_url.replacen("http", "ws", 1), account);
    info!("Connecting to {ws_url}");

    let (ws, _) = tokio_tungstenite::connect_async(&ws_url).await?;
    info!("Gateway connected");

    let (_, mut read) = ws.split();

    while let Some(msg) = read.next().await {
        let msg = msg?;
        if !msg.is_text() {
            continue;
        }
        let text = msg.into_text()?;
        let envelope: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to parse envelope: {e}");
                continue;
            }
        };
        match parse_envelope(&envelope) {
            Some(Event::Closed { logged_out: true }) => return Ok(SessionEnd::LoggedOut),
            Some(Event::Closed { logged_out: false }) => return Ok(SessionEnd::Dropped),
            Some(event) => router.handle_event(event).await,
            None => {}
        }
    }

    Ok(SessionEnd::Dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_group_message() {
        let envelope = serde_json::json!({
            "event": "message",
            "message": {
                "id": "m1",
                "sender": "alice@s.whatsapp.net",
                "group": "g1@g.us",
                "text": "  !ping  ",
                "mentions": ["bob@s.whatsapp.net"],
            }
        });
        let Some(Event::Message(msg)) = parse_envelope(&envelope) else {
            panic!("expected a message event");
        };
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.sender, "alice@s.whatsapp.net");
        assert_eq!(msg.group.as_deref(), Some("g1@g.us"));
        assert_eq!(msg.text, "!ping");
        assert_eq!(msg.mentions, vec!["bob@s.whatsapp.net"]);
        assert!(msg.attachments.is_empty());
        assert!(msg.quoted.is_none());
    }

    #[test]
    fn test_parse_direct_message_has_no_group() {
        let envelope = serde_json::json!({
            "event": "message",
            "message": {"id": "m2", "sender": "alice@s.whatsapp.net", "text": "hi"}
        });
        let Some(Event::Message(msg)) = parse_envelope(&envelope) else {
            panic!("expected a message event");
        };
        assert!(msg.group.is_none());
    }

    #[test]
    fn test_empty_message_is_skipped() {
        let envelope = serde_json::json!({
            "event": "message",
            "message": {"id": "m3", "sender": "alice@s.whatsapp.net", "text": ""}
        });
        assert!(parse_envelope(&envelope).is_none());
    }

    #[test]
    fn test_missing_sender_is_skipped() {
        let envelope = serde_json::json!({
            "event": "message",
            "message": {"id": "m4", "text": "hello"}
        });
        assert!(parse_envelope(&envelope).is_none());
    }

    #[test]
    fn test_parse_attachment_kinds() {
        let envelope = serde_json::json!({
            "event": "message",
            "message": {
                "id": "m5",
                "sender": "alice@s.whatsapp.net",
                "text": "",
                "attachments": [
                    {"id": "a1", "kind": "sticker", "mimetype": "image/webp"},
                    {"id": "a2", "mimetype": "video/mp4"},
                    {"id": "a3", "mimetype": "mystery"}
                ]
            }
        });
        let Some(Event::Message(msg)) = parse_envelope(&envelope) else {
            panic!("expected a message event");
        };
        assert_eq!(msg.attachments.len(), 2, "unclassifiable attachment dropped");
        assert_eq!(msg.attachments[0].kind, MediaKind::Sticker);
        assert_eq!(msg.attachments[1].kind, MediaKind::Video);
    }

    #[test]
    fn test_parse_quoted_attachments() {
        let envelope = serde_json::json!({
            "event": "message",
            "message": {
                "id": "m6",
                "sender": "alice@s.whatsapp.net",
                "text": "!save",
                "quoted": {
                    "id": "orig1",
                    "attachments": [{"id": "a9", "kind": "image", "mimetype": "image/jpeg"}]
                }
            }
        });
        let Some(Event::Message(msg)) = parse_envelope(&envelope) else {
            panic!("expected a message event");
        };
        let quoted = msg.quoted.expect("quoted");
        assert_eq!(quoted.id, "orig1");
        assert_eq!(quoted.attachments.len(), 1);
    }

    #[test]
    fn test_parse_membership() {
        let envelope = serde_json::json!({
            "event": "membership",
            "group": "g1@g.us",
            "users": ["new@s.whatsapp.net"],
            "action": "add"
        });
        let Some(Event::Membership(change)) = parse_envelope(&envelope) else {
            panic!("expected a membership event");
        };
        assert_eq!(change.group, "g1@g.us");
        assert_eq!(change.action, MembershipAction::Add);
    }

    #[test]
    fn test_parse_pairing_and_disconnect() {
        let pairing = serde_json::json!({"event": "pairing", "code": "ABCD-1234"});
        assert!(matches!(
            parse_envelope(&pairing),
            Some(Event::Pairing { code }) if code == "ABCD-1234"
        ));

        let logged_out = serde_json::json!({"event": "disconnected", "reason": "logged_out"});
        assert!(matches!(
            parse_envelope(&logged_out),
            Some(Event::Closed { logged_out: true })
        ));

        let dropped = serde_json::json!({"event": "disconnected", "reason": "stream error"});
        assert!(matches!(
            parse_envelope(&dropped),
            Some(Event::Closed { logged_out: false })
        ));
    }

    #[test]
    fn test_unknown_event_is_skipped() {
        let envelope = serde_json::json!({"event": "receipt", "id": "m1"});
        assert!(parse_envelope(&envelope).is_none());
    }
}
