//! Row-level readers for the Firefox stores.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rusqlite::Connection;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{HarvestError, HarvestResult};
use crate::records::{BookmarkRecord, BookmarkType, CookieRecord, HistoryRecord, LoginRecord};
use crate::timestamp;

pub const PLACES_FILE: &str = "places.sqlite";
pub const COOKIES_FILE: &str = "cookies.sqlite";
pub const LOGINS_FILE: &str = "logins.json";

#[derive(Debug)]
pub struct RawCookie {
    pub name: String,
    pub value: String,
    pub host: String,
    pub path: String,
    pub creation_time: i64,
    pub expiry: i64,
    pub is_secure: i64,
    pub is_http_only: i64,
}

pub fn read_cookies(conn: &Connection) -> HarvestResult<Vec<RawCookie>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, value, host, path, creationTime, expiry, isSecure, isHttpOnly \
             FROM moz_cookies",
        )
        .map_err(|e| HarvestError::SchemaMismatch(format!("moz_cookies table: {e}")))?;

    let rows = stmt.query_map([], |row| {
        Ok(RawCookie {
            name: row.get(0)?,
            value: row.get(1).unwrap_or_default(),
            host: row.get(2)?,
            path: row.get(3).unwrap_or_default(),
            creation_time: row.get(4).unwrap_or_default(),
            expiry: row.get(5).unwrap_or_default(),
            is_secure: row.get(6).unwrap_or_default(),
            is_http_only: row.get(7).unwrap_or_default(),
        })
    })?;

    Ok(rows.filter_map(Result::ok).collect())
}

/// Firefox cookie values are plaintext on disk; only the timestamps and
/// flags need normalizing. `creationTime` is Unix microseconds, `expiry`
/// Unix seconds. Rows with an empty host are dropped.
pub fn normalize_cookies(raw: Vec<RawCookie>) -> Vec<CookieRecord> {
    raw.into_iter()
        .filter(|r| {
            if r.host.is_empty() {
                debug!("dropping cookie {:?} with empty host", r.name);
                return false;
            }
            true
        })
        .map(|r| CookieRecord {
            host: r.host,
            path: r.path,
            name: r.name,
            value: r.value,
            is_secure: r.is_secure != 0,
            is_http_only: r.is_http_only != 0,
            has_expire: r.expiry != 0,
            is_persistent: r.expiry != 0,
            created_at: timestamp::from_unix_us(r.creation_time),
            expires_at: timestamp::from_unix_s(r.expiry),
        })
        .collect()
}

#[derive(Debug)]
pub struct RawPlace {
    pub id: i64,
    pub url: String,
    pub last_visit_date: i64,
    pub title: String,
    pub visit_count: i64,
}

pub fn read_places(conn: &Connection) -> HarvestResult<Vec<RawPlace>> {
    let mut stmt = conn
        .prepare("SELECT id, url, last_visit_date, title, visit_count FROM moz_places")
        .map_err(|e| HarvestError::SchemaMismatch(format!("moz_places table: {e}")))?;

    let rows = stmt.query_map([], |row| {
        Ok(RawPlace {
            id: row.get(0)?,
            url: row.get(1).unwrap_or_default(),
            last_visit_date: row.get(2).unwrap_or_default(),
            title: row.get(3).unwrap_or_default(),
            visit_count: row.get(4).unwrap_or_default(),
        })
    })?;

    Ok(rows.filter_map(Result::ok).collect())
}

pub fn normalize_history(raw: Vec<RawPlace>) -> Vec<HistoryRecord> {
    raw.into_iter()
        .map(|r| HistoryRecord {
            url: r.url,
            title: r.title,
            visit_count: r.visit_count.max(0) as u32,
            last_visit_at: timestamp::from_unix_us(r.last_visit_date),
        })
        .collect()
}

/// `id → url` index over `moz_places`, resolved before bookmarks are
/// emitted so that `moz_bookmarks.fk` references land on real URLs.
pub fn places_url_index(places: &[RawPlace]) -> HashMap<i64, String> {
    places
        .iter()
        .map(|p| (p.id, p.url.clone()))
        .collect()
}

#[derive(Debug)]
pub struct RawBookmark {
    pub id: i64,
    pub fk: Option<i64>,
    pub node_type: i64,
    pub date_added: i64,
    pub title: String,
}

pub fn read_bookmarks(conn: &Connection) -> HarvestResult<Vec<RawBookmark>> {
    let mut stmt = conn
        .prepare("SELECT id, fk, type, dateAdded, title FROM moz_bookmarks")
        .map_err(|e| HarvestError::SchemaMismatch(format!("moz_bookmarks table: {e}")))?;

    let rows = stmt.query_map([], |row| {
        Ok(RawBookmark {
            id: row.get(0)?,
            fk: row.get(1).unwrap_or_default(),
            node_type: row.get(2).unwrap_or_default(),
            date_added: row.get(3).unwrap_or_default(),
            title: row.get(4).unwrap_or_default(),
        })
    })?;

    Ok(rows.filter_map(Result::ok).collect())
}

pub fn normalize_bookmarks(
    raw: Vec<RawBookmark>,
    url_index: &HashMap<i64, String>,
) -> Vec<BookmarkRecord> {
    raw.into_iter()
        .map(|r| {
            let url = r
                .fk
                .and_then(|fk| url_index.get(&fk).cloned())
                .unwrap_or_default();
            BookmarkRecord::new(
                r.id,
                r.title,
                BookmarkType::from_moz(r.node_type),
                url,
                timestamp::from_unix_us(r.date_added),
            )
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct LoginsFile {
    logins: Vec<LoginEntry>,
}

#[derive(Debug, Deserialize)]
struct LoginEntry {
    #[serde(rename = "formSubmitURL", default)]
    form_submit_url: Option<String>,
    #[serde(rename = "encryptedUsername", default)]
    encrypted_username: String,
    #[serde(rename = "encryptedPassword", default)]
    encrypted_password: String,
    #[serde(rename = "timeCreated", default)]
    time_created: i64,
}

#[derive(Debug)]
pub struct RawLogin {
    pub form_submit_url: String,
    pub enc_username: Vec<u8>,
    pub enc_password: Vec<u8>,
    /// Unix milliseconds.
    pub time_created: i64,
}

/// Parse `logins.json` and base64-decode the credential envelopes. Entries
/// with undecodable fields are dropped here; cipher failures are handled
/// later, per record.
pub fn read_logins(path: &Path) -> HarvestResult<Vec<RawLogin>> {
    let content = std::fs::read_to_string(path)?;
    let file: LoginsFile = serde_json::from_str(&content)
        .map_err(|e| HarvestError::SchemaMismatch(format!("logins.json: {e}")))?;

    let mut logins = Vec::new();
    for entry in file.logins {
        let enc_username = match BASE64.decode(entry.encrypted_username.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("skipping login with undecodable username: {e}");
                continue;
            }
        };
        let enc_password = match BASE64.decode(entry.encrypted_password.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("skipping login with undecodable password: {e}");
                continue;
            }
        };

        logins.push(RawLogin {
            form_submit_url: entry.form_submit_url.unwrap_or_default(),
            enc_username,
            enc_password,
            time_created: entry.time_created,
        });
    }

    Ok(logins)
}

pub fn normalize_login(raw: RawLogin, username: String, password: String) -> LoginRecord {
    LoginRecord {
        login_url: raw.form_submit_url,
        username,
        password,
        created_at: timestamp::from_unix_ms(raw.time_created),
    }
}
