//! Normalized artifact records handed to the output sinks.
//!
//! Records are created during parse, mutated only while decrypting, and
//! immutable once they reach a sink. Ciphertext never appears here; the
//! readers keep it in their transient row types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct LoginRecord {
    pub login_url: String,
    pub username: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct CookieRecord {
    pub host: String,
    pub path: String,
    pub name: String,
    pub value: String,
    pub is_secure: bool,
    pub is_http_only: bool,
    pub has_expire: bool,
    pub is_persistent: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct HistoryRecord {
    pub url: String,
    pub title: String,
    pub visit_count: u32,
    pub last_visit_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkType {
    Url,
    Folder,
}

impl fmt::Display for BookmarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkType::Url => write!(f, "url"),
            BookmarkType::Folder => write!(f, "folder"),
        }
    }
}

impl BookmarkType {
    /// `moz_bookmarks.type`: 1 is a URL bookmark; folders and separators
    /// both map to `folder` since neither carries a URL.
    pub fn from_moz(raw: i64) -> Self {
        match raw {
            1 => BookmarkType::Url,
            _ => BookmarkType::Folder,
        }
    }

    pub fn from_chromium(raw: &str) -> Self {
        match raw {
            "url" => BookmarkType::Url,
            _ => BookmarkType::Folder,
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct BookmarkRecord {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    #[tabled(rename = "type")]
    pub kind: BookmarkType,
    pub url: String,
    pub added_at: DateTime<Utc>,
}

impl BookmarkRecord {
    /// Folders never carry a URL; anything without a URL is a folder.
    pub fn new(
        id: i64,
        name: String,
        kind: BookmarkType,
        url: String,
        added_at: DateTime<Utc>,
    ) -> Self {
        let url = match kind {
            BookmarkType::Folder => String::new(),
            BookmarkType::Url => url,
        };
        Self {
            id,
            name,
            kind,
            url,
            added_at,
        }
    }
}

/// One artifact kind's worth of records, typed.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecordSet {
    Logins(Vec<LoginRecord>),
    Cookies(Vec<CookieRecord>),
    History(Vec<HistoryRecord>),
    Bookmarks(Vec<BookmarkRecord>),
}

impl RecordSet {
    pub fn len(&self) -> usize {
        match self {
            RecordSet::Logins(v) => v.len(),
            RecordSet::Cookies(v) => v.len(),
            RecordSet::History(v) => v.len(),
            RecordSet::Bookmarks(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
