use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::error;

fn default_prefix() -> String {
    "!".to_string()
}

fn default_welcome() -> String {
    "Welcome to the group, @user!".to_string()
}

fn default_goodbye() -> String {
    "Goodbye, @user!".to_string()
}

fn default_rules() -> String {
    "No rules set yet.".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct GlobalSettings {
    #[serde(default = "default_prefix")]
    pub(crate) prefix: String,
    #[serde(default)]
    pub(crate) admins: BTreeSet<String>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        GlobalSettings {
            prefix: default_prefix(),
            admins: BTreeSet::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct GroupSettings {
    #[serde(default)]
    pub(crate) muted: bool,
    #[serde(default = "default_welcome")]
    pub(crate) welcome: String,
    #[serde(default = "default_goodbye")]
    pub(crate) goodbye: String,
    #[serde(default = "default_rules")]
    pub(crate) rules: String,
    #[serde(default)]
    pub(crate) anti_link: bool,
    #[serde(default = "default_true")]
    pub(crate) bot_enabled: bool,
}

impl Default for GroupSettings {
    fn default() -> Self {
        GroupSettings {
            muted: false,
            welcome: default_welcome(),
            goodbye: default_goodbye(),
            rules: default_rules(),
            anti_link: false,
            bot_enabled: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct UserRecord {
    #[serde(default)]
    pub(crate) warnings: u32,
    #[serde(default)]
    pub(crate) banned: bool,
    #[serde(default)]
    pub(crate) afk: bool,
    #[serde(default)]
    pub(crate) afk_reason: String,
    #[serde(default)]
    pub(crate) last_seen: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Quote {
    pub(crate) text: String,
    pub(crate) author: String,
    pub(crate) saved_at: i64,
}

/// The whole persisted state. One JSON file, rewritten wholesale after every
/// mutation; BTree maps keep the serialized form deterministic.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct Document {
    #[serde(default)]
    pub(crate) settings: GlobalSettings,
    #[serde(default)]
    pub(crate) groups: BTreeMap<String, GroupSettings>,
    #[serde(default)]
    pub(crate) users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    pub(crate) quotes: BTreeMap<String, Vec<Quote>>,
}

pub(crate) struct Store {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl Store {
    /// Read the document from disk. A missing file is a fresh start; an
    /// unreadable or unparsable one is logged and replaced by the default
    /// document rather than failing startup.
    pub(crate) fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(doc) => doc,
                Err(e) => {
                    error!(
                        "Failed to parse {}: {e}; starting with an empty document",
                        path.display()
                    );
                    Document::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => {
                error!(
                    "Failed to read {}: {e}; starting with an empty document",
                    path.display()
                );
                Document::default()
            }
        };
        Store {
            path,
            doc: Mutex::new(doc),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serialize the whole document and overwrite the file. Failures are
    /// logged; the in-memory state stays authoritative until the next save.
    pub(crate) fn save(&self) {
        let json = serde_json::to_string_pretty(&*self.lock());
        match json {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    error!("Failed to save state to {}: {e}", self.path.display());
                }
            }
            Err(e) => error!("Failed to serialize state: {e}"),
        }
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.lock())
    }

    /// Read-modify-write: apply `f` under the lock, then persist.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let out = {
            let mut doc = self.lock();
            f(&mut doc)
        };
        self.save();
        out
    }

    pub(crate) fn prefix(&self) -> String {
        self.with(|d| d.settings.prefix.clone())
    }

    pub(crate) fn is_admin(&self, id: &str) -> bool {
        self.with(|d| d.settings.admins.contains(id))
    }

    pub(crate) fn user(&self, id: &str) -> UserRecord {
        self.with(|d| d.users.get(id).cloned().unwrap_or_default())
    }

    pub(crate) fn group(&self, id: &str) -> GroupSettings {
        self.with(|d| d.groups.get(id).cloned().unwrap_or_default())
    }

    /// Lazily create a group's settings on its first observed message.
    pub(crate) fn ensure_group(&self, id: &str) {
        let known = self.with(|d| d.groups.contains_key(id));
        if !known {
            self.update(|d| {
                d.groups.entry(id.to_string()).or_default();
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::load(dir.path().join("state.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_gives_default_document() {
        let (_dir, store) = temp_store();
        store.with(|d| {
            assert_eq!(d.settings.prefix, "!");
            assert!(d.groups.is_empty());
            assert!(d.users.is_empty());
        });
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ this is not json").expect("write");
        let store = Store::load(&path);
        store.with(|d| assert_eq!(*d, Document::default()));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let store = Store::load(&path);
        store.update(|d| {
            d.settings.prefix = ".".to_string();
            d.settings.admins.insert("boss@s.whatsapp.net".to_string());
            let group = d.groups.entry("g@g.us".to_string()).or_default();
            group.anti_link = true;
            group.rules = "be kind".to_string();
            let user = d.users.entry("u@s.whatsapp.net".to_string()).or_default();
            user.warnings = 2;
            user.afk = true;
            user.afk_reason = "lunch".to_string();
            d.quotes.entry("g@g.us".to_string()).or_default().push(Quote {
                text: "hello".to_string(),
                author: "u@s.whatsapp.net".to_string(),
                saved_at: 1700000000,
            });
        });

        let reloaded = Store::load(&path);
        let original = store.with(|d| d.clone());
        let round_tripped = reloaded.with(|d| d.clone());
        assert_eq!(original, round_tripped);
    }

    #[test]
    fn test_save_is_deterministic() {
        let (_dir, store) = temp_store();
        store.update(|d| {
            d.groups.entry("b@g.us".to_string()).or_default();
            d.groups.entry("a@g.us".to_string()).or_default();
        });
        let first = serde_json::to_string_pretty(&store.with(|d| d.clone())).expect("json");
        let second = serde_json::to_string_pretty(&store.with(|d| d.clone())).expect("json");
        assert_eq!(first, second);
    }

    #[test]
    fn test_ensure_group_creates_defaults_once() {
        let (_dir, store) = temp_store();
        store.ensure_group("g@g.us");
        let settings = store.group("g@g.us");
        assert!(!settings.muted);
        assert!(!settings.anti_link);
        assert!(settings.bot_enabled);

        store.update(|d| d.groups.get_mut("g@g.us").expect("group").muted = true);
        store.ensure_group("g@g.us");
        assert!(store.group("g@g.us").muted, "ensure_group must not reset");
    }

    #[test]
    fn test_old_document_missing_fields_deserializes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"settings":{"prefix":"."},"groups":{"g@g.us":{"muted":true}}}"#,
        )
        .expect("write");
        let store = Store::load(&path);
        let group = store.group("g@g.us");
        assert!(group.muted);
        assert_eq!(group.welcome, "Welcome to the group, @user!");
        assert!(group.bot_enabled);
        assert_eq!(store.prefix(), ".");
    }
}
