//! Row-level readers for the Chromium stores.
//!
//! SQLite readers yield raw rows with ciphertext and wire-format integers
//! still in place; the orchestrator decrypts and normalizes them. The
//! `Bookmarks` file is JSON and carries no ciphertext, so its reader emits
//! finished records straight off the tree walk.

use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;

use crate::error::{HarvestError, HarvestResult};
use crate::records::{BookmarkRecord, BookmarkType, CookieRecord, HistoryRecord, LoginRecord};
use crate::timestamp;

pub const LOGIN_DATA_FILE: &str = "Login Data";
pub const HISTORY_FILE: &str = "History";
pub const COOKIES_FILE: &str = "Cookies";
pub const BOOKMARKS_FILE: &str = "Bookmarks";
pub const LOCAL_STATE_FILE: &str = "Local State";

#[derive(Debug)]
pub struct RawLogin {
    pub origin_url: String,
    pub username: String,
    pub enc_password: Vec<u8>,
    pub date_created: i64,
}

pub fn read_logins(conn: &Connection) -> HarvestResult<Vec<RawLogin>> {
    let mut stmt = conn
        .prepare("SELECT origin_url, username_value, password_value, date_created FROM logins")
        .map_err(|e| HarvestError::SchemaMismatch(format!("logins table: {e}")))?;

    let rows = stmt.query_map([], |row| {
        Ok(RawLogin {
            origin_url: row.get(0)?,
            username: row.get(1).unwrap_or_default(),
            enc_password: row.get(2).unwrap_or_default(),
            date_created: row.get(3).unwrap_or_default(),
        })
    })?;

    Ok(rows.filter_map(Result::ok).collect())
}

/// Finish a login row once the password ciphertext has been replaced.
pub fn normalize_login(raw: RawLogin, password: String) -> LoginRecord {
    LoginRecord {
        login_url: raw.origin_url,
        username: raw.username,
        password,
        created_at: timestamp::from_chromium_date_created(raw.date_created),
    }
}

#[derive(Debug)]
pub struct RawCookie {
    pub name: String,
    pub enc_value: Vec<u8>,
    pub host_key: String,
    pub path: String,
    pub creation_utc: i64,
    pub expires_utc: i64,
    pub is_secure: i64,
    pub is_httponly: i64,
    pub has_expires: i64,
    pub is_persistent: i64,
}

pub fn read_cookies(conn: &Connection) -> HarvestResult<Vec<RawCookie>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, encrypted_value, host_key, path, creation_utc, expires_utc, \
             is_secure, is_httponly, has_expires, is_persistent FROM cookies",
        )
        .map_err(|e| HarvestError::SchemaMismatch(format!("cookies table: {e}")))?;

    let rows = stmt.query_map([], |row| {
        Ok(RawCookie {
            name: row.get(0)?,
            enc_value: row.get(1).unwrap_or_default(),
            host_key: row.get(2)?,
            path: row.get(3).unwrap_or_default(),
            creation_utc: row.get(4).unwrap_or_default(),
            expires_utc: row.get(5).unwrap_or_default(),
            is_secure: row.get(6).unwrap_or_default(),
            is_httponly: row.get(7).unwrap_or_default(),
            has_expires: row.get(8).unwrap_or_default(),
            is_persistent: row.get(9).unwrap_or_default(),
        })
    })?;

    Ok(rows.filter_map(Result::ok).collect())
}

pub fn normalize_cookie(raw: RawCookie, value: String) -> CookieRecord {
    CookieRecord {
        host: raw.host_key,
        path: raw.path,
        name: raw.name,
        value,
        is_secure: raw.is_secure != 0,
        is_http_only: raw.is_httponly != 0,
        has_expire: raw.has_expires != 0,
        is_persistent: raw.is_persistent != 0,
        created_at: timestamp::from_webkit_us(raw.creation_utc),
        expires_at: timestamp::from_webkit_us(raw.expires_utc),
    }
}

#[derive(Debug)]
pub struct RawHistory {
    pub url: String,
    pub title: String,
    pub visit_count: i64,
    pub last_visit_time: i64,
}

pub fn read_history(conn: &Connection) -> HarvestResult<Vec<RawHistory>> {
    let mut stmt = conn
        .prepare("SELECT url, title, visit_count, last_visit_time FROM urls")
        .map_err(|e| HarvestError::SchemaMismatch(format!("urls table: {e}")))?;

    let rows = stmt.query_map([], |row| {
        Ok(RawHistory {
            url: row.get(0)?,
            title: row.get(1).unwrap_or_default(),
            visit_count: row.get(2).unwrap_or_default(),
            last_visit_time: row.get(3).unwrap_or_default(),
        })
    })?;

    Ok(rows.filter_map(Result::ok).collect())
}

pub fn normalize_history(raw: Vec<RawHistory>) -> Vec<HistoryRecord> {
    raw.into_iter()
        .map(|r| HistoryRecord {
            url: r.url,
            title: r.title,
            visit_count: r.visit_count.max(0) as u32,
            last_visit_at: timestamp::from_webkit_us(r.last_visit_time),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct BookmarkNode {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    node_type: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    date_added: String,
    #[serde(default)]
    children: Vec<BookmarkNode>,
}

/// Depth-first walk over the `roots` tree, one record per node.
pub fn read_bookmarks(path: &Path) -> HarvestResult<Vec<BookmarkRecord>> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let roots = value
        .get("roots")
        .and_then(|r| r.as_object())
        .ok_or_else(|| HarvestError::SchemaMismatch("Bookmarks has no roots object".into()))?;

    let mut records = Vec::new();
    for root in roots.values() {
        if root.is_object() {
            let node: BookmarkNode = serde_json::from_value(root.clone())?;
            walk_bookmarks(&node, &mut records);
        }
    }

    Ok(records)
}

fn walk_bookmarks(node: &BookmarkNode, out: &mut Vec<BookmarkRecord>) {
    let added: i64 = node.date_added.parse().unwrap_or_default();
    out.push(BookmarkRecord::new(
        node.id.parse().unwrap_or_default(),
        node.name.clone(),
        BookmarkType::from_chromium(&node.node_type),
        node.url.clone(),
        timestamp::from_webkit_us(added),
    ));

    for child in &node.children {
        walk_bookmarks(child, out);
    }
}
