//! Per-artifact orchestration: snapshot, parse, decrypt, normalize, emit.
//!
//! One dispatcher covers all four artifact kinds; per-kind differences
//! (source file, whether a decrypt stage runs, sort order) are data. The
//! snapshot guard releases scratch files on every exit path, so a failed
//! stage still cleans up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::chromium::{keyring, reader as chromium_reader, ChromiumConfig};
use crate::error::HarvestResult;
use crate::gecko::{asn1pbe::LoginEnvelope, key as gecko_key, reader as gecko_reader};
use crate::records::{CookieRecord, RecordSet};
use crate::snapshot::Snapshot;
use crate::{BrowserFamily, BrowserKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Passwords,
    Cookies,
    History,
    Bookmarks,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Passwords,
        ArtifactKind::Cookies,
        ArtifactKind::History,
        ArtifactKind::Bookmarks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Passwords => "passwords",
            ArtifactKind::Cookies => "cookies",
            ArtifactKind::History => "history",
            ArtifactKind::Bookmarks => "bookmarks",
        }
    }
}

/// One browser profile being harvested.
#[derive(Debug, Clone)]
pub struct BrowserTarget {
    pub browser: BrowserKind,
    pub profile_dir: PathBuf,
}

impl BrowserTarget {
    /// Chromium keeps `Local State` one level above the profile.
    fn user_data_dir(&self) -> &Path {
        self.profile_dir.parent().unwrap_or(&self.profile_dir)
    }
}

/// Run the full pipeline for one artifact kind and return the sorted
/// records. Key-provider and schema failures surface here; per-record
/// cipher failures have already been downgraded to empty plaintext.
pub fn harvest(
    target: &BrowserTarget,
    kind: ArtifactKind,
    scratch_dir: &Path,
) -> HarvestResult<RecordSet> {
    let namespace = format!("{}_{}", target.browser.label(), kind.name());

    let records = match target.browser.family() {
        BrowserFamily::Gecko => match kind {
            ArtifactKind::Passwords => gecko_passwords(target, scratch_dir, &namespace)?,
            ArtifactKind::Cookies => gecko_cookies(target, scratch_dir, &namespace)?,
            ArtifactKind::History => gecko_history(target, scratch_dir, &namespace)?,
            ArtifactKind::Bookmarks => gecko_bookmarks(target, scratch_dir, &namespace)?,
        },
        BrowserFamily::Chromium(config) => match kind {
            ArtifactKind::Passwords => chromium_passwords(target, &config, scratch_dir, &namespace)?,
            ArtifactKind::Cookies => chromium_cookies(target, &config, scratch_dir, &namespace)?,
            ArtifactKind::History => chromium_history(target, scratch_dir, &namespace)?,
            ArtifactKind::Bookmarks => chromium_bookmarks(target, scratch_dir, &namespace)?,
        },
    };

    Ok(sort_records(records))
}

fn chromium_passwords(
    target: &BrowserTarget,
    config: &ChromiumConfig,
    scratch_dir: &Path,
    namespace: &str,
) -> HarvestResult<RecordSet> {
    let source = target.profile_dir.join(chromium_reader::LOGIN_DATA_FILE);
    let snapshot = Snapshot::take(&source, scratch_dir, namespace)?;
    let conn = snapshot.open_db()?;
    let rows = chromium_reader::read_logins(&conn)?;

    let key = keyring::provide_key(config, target.user_data_dir())?;

    let records = rows
        .into_iter()
        .map(|row| {
            let password = keyring::decrypt_value(key.as_ref(), &row.enc_password);
            chromium_reader::normalize_login(row, password)
        })
        .collect();

    Ok(RecordSet::Logins(records))
}

fn chromium_cookies(
    target: &BrowserTarget,
    config: &ChromiumConfig,
    scratch_dir: &Path,
    namespace: &str,
) -> HarvestResult<RecordSet> {
    let source = target.profile_dir.join(chromium_reader::COOKIES_FILE);
    let snapshot = Snapshot::take(&source, scratch_dir, namespace)?;
    let conn = snapshot.open_db()?;
    let rows = chromium_reader::read_cookies(&conn)?;

    let key = keyring::provide_key(config, target.user_data_dir())?;

    let records = rows
        .into_iter()
        .map(|row| {
            let value = keyring::decrypt_value(key.as_ref(), &row.enc_value);
            chromium_reader::normalize_cookie(row, value)
        })
        .collect();

    Ok(RecordSet::Cookies(records))
}

fn chromium_history(
    target: &BrowserTarget,
    scratch_dir: &Path,
    namespace: &str,
) -> HarvestResult<RecordSet> {
    let source = target.profile_dir.join(chromium_reader::HISTORY_FILE);
    let snapshot = Snapshot::take(&source, scratch_dir, namespace)?;
    let conn = snapshot.open_db()?;
    let rows = chromium_reader::read_history(&conn)?;
    Ok(RecordSet::History(chromium_reader::normalize_history(rows)))
}

fn chromium_bookmarks(
    target: &BrowserTarget,
    scratch_dir: &Path,
    namespace: &str,
) -> HarvestResult<RecordSet> {
    let source = target.profile_dir.join(chromium_reader::BOOKMARKS_FILE);
    let snapshot = Snapshot::take(&source, scratch_dir, namespace)?;
    let records = chromium_reader::read_bookmarks(snapshot.path())?;
    Ok(RecordSet::Bookmarks(records))
}

fn gecko_passwords(
    target: &BrowserTarget,
    scratch_dir: &Path,
    namespace: &str,
) -> HarvestResult<RecordSet> {
    let master_key = gecko_key::provide_key(&target.profile_dir, scratch_dir, namespace, b"")?;

    let source = target.profile_dir.join(gecko_reader::LOGINS_FILE);
    let snapshot = Snapshot::take(&source, scratch_dir, namespace)?;
    let rows = gecko_reader::read_logins(snapshot.path())?;

    let records = rows
        .into_iter()
        .map(|row| {
            let username = decrypt_login_field(&master_key, &row.enc_username);
            let password = decrypt_login_field(&master_key, &row.enc_password);
            gecko_reader::normalize_login(row, username, password)
        })
        .collect();

    Ok(RecordSet::Logins(records))
}

fn decrypt_login_field(key: &gecko_key::MasterKey, blob: &[u8]) -> String {
    let result = LoginEnvelope::parse(blob).and_then(|envelope| envelope.decrypt(key.as_bytes()));
    match result {
        Ok(plain) => match String::from_utf8(plain) {
            Ok(text) => text,
            Err(_) => {
                debug!("undecryptable login field: plaintext is not valid UTF-8");
                String::new()
            }
        },
        Err(e) => {
            debug!("undecryptable login field: {e}");
            String::new()
        }
    }
}

fn gecko_cookies(
    target: &BrowserTarget,
    scratch_dir: &Path,
    namespace: &str,
) -> HarvestResult<RecordSet> {
    let source = target.profile_dir.join(gecko_reader::COOKIES_FILE);
    let snapshot = Snapshot::take(&source, scratch_dir, namespace)?;
    let conn = snapshot.open_db()?;
    let rows = gecko_reader::read_cookies(&conn)?;
    Ok(RecordSet::Cookies(gecko_reader::normalize_cookies(rows)))
}

fn gecko_history(
    target: &BrowserTarget,
    scratch_dir: &Path,
    namespace: &str,
) -> HarvestResult<RecordSet> {
    let source = target.profile_dir.join(gecko_reader::PLACES_FILE);
    let snapshot = Snapshot::take(&source, scratch_dir, namespace)?;
    let conn = snapshot.open_db()?;
    let rows = gecko_reader::read_places(&conn)?;
    Ok(RecordSet::History(gecko_reader::normalize_history(rows)))
}

fn gecko_bookmarks(
    target: &BrowserTarget,
    scratch_dir: &Path,
    namespace: &str,
) -> HarvestResult<RecordSet> {
    let source = target.profile_dir.join(gecko_reader::PLACES_FILE);
    let snapshot = Snapshot::take(&source, scratch_dir, namespace)?;
    let conn = snapshot.open_db()?;

    let places = gecko_reader::read_places(&conn)?;
    let url_index = gecko_reader::places_url_index(&places);
    let rows = gecko_reader::read_bookmarks(&conn)?;

    Ok(RecordSet::Bookmarks(gecko_reader::normalize_bookmarks(
        rows, &url_index,
    )))
}

/// Passwords newest first, history most visited first, bookmarks by id,
/// cookies in insertion order grouped by host.
fn sort_records(records: RecordSet) -> RecordSet {
    match records {
        RecordSet::Logins(mut v) => {
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            RecordSet::Logins(v)
        }
        RecordSet::History(mut v) => {
            v.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
            RecordSet::History(v)
        }
        RecordSet::Bookmarks(mut v) => {
            v.sort_by_key(|r| r.id);
            RecordSet::Bookmarks(v)
        }
        RecordSet::Cookies(v) => RecordSet::Cookies(group_by_host(v)),
    }
}

fn group_by_host(cookies: Vec<CookieRecord>) -> Vec<CookieRecord> {
    let mut host_rank: HashMap<String, usize> = HashMap::new();
    for cookie in &cookies {
        let next = host_rank.len();
        host_rank.entry(cookie.host.clone()).or_insert(next);
    }

    let mut indexed: Vec<(usize, usize, CookieRecord)> = cookies
        .into_iter()
        .enumerate()
        .map(|(i, c)| (host_rank[&c.host], i, c))
        .collect();
    indexed.sort_by_key(|(rank, index, _)| (*rank, *index));
    indexed.into_iter().map(|(_, _, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BookmarkRecord, BookmarkType, HistoryRecord, LoginRecord};
    use crate::testutil::{build_login_envelope, des3_cbc_encrypt_padded, write_key4};
    use crate::timestamp;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    const NSS_DEFAULT_KEY_ID: [u8; 16] = [
        0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x01,
    ];

    fn cookie(host: &str, name: &str) -> CookieRecord {
        CookieRecord {
            host: host.into(),
            path: "/".into(),
            name: name.into(),
            value: String::new(),
            is_secure: false,
            is_http_only: false,
            has_expire: false,
            is_persistent: false,
            created_at: chrono::DateTime::UNIX_EPOCH,
            expires_at: chrono::DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn passwords_sort_newest_first() {
        let records = vec![
            LoginRecord {
                login_url: "a".into(),
                username: String::new(),
                password: String::new(),
                created_at: timestamp::from_unix_s(100),
            },
            LoginRecord {
                login_url: "b".into(),
                username: String::new(),
                password: String::new(),
                created_at: timestamp::from_unix_s(300),
            },
            LoginRecord {
                login_url: "c".into(),
                username: String::new(),
                password: String::new(),
                created_at: timestamp::from_unix_s(200),
            },
        ];

        let RecordSet::Logins(sorted) = sort_records(RecordSet::Logins(records)) else {
            panic!("variant changed");
        };
        let times: Vec<i64> = sorted.iter().map(|r| r.created_at.timestamp()).collect();
        assert_eq!(times, vec![300, 200, 100]);
    }

    #[test]
    fn history_sorts_by_visit_count_descending() {
        let records = vec![
            HistoryRecord {
                url: "a".into(),
                title: String::new(),
                visit_count: 1,
                last_visit_at: chrono::DateTime::UNIX_EPOCH,
            },
            HistoryRecord {
                url: "b".into(),
                title: String::new(),
                visit_count: 9,
                last_visit_at: chrono::DateTime::UNIX_EPOCH,
            },
        ];

        let RecordSet::History(sorted) = sort_records(RecordSet::History(records)) else {
            panic!("variant changed");
        };
        assert_eq!(sorted[0].visit_count, 9);
        assert_eq!(sorted[1].visit_count, 1);
    }

    #[test]
    fn bookmarks_sort_by_id_ascending() {
        let records = vec![
            BookmarkRecord::new(
                5,
                "b".into(),
                BookmarkType::Url,
                "https://b".into(),
                chrono::DateTime::UNIX_EPOCH,
            ),
            BookmarkRecord::new(
                1,
                "a".into(),
                BookmarkType::Folder,
                String::new(),
                chrono::DateTime::UNIX_EPOCH,
            ),
        ];

        let RecordSet::Bookmarks(sorted) = sort_records(RecordSet::Bookmarks(records)) else {
            panic!("variant changed");
        };
        assert_eq!(sorted[0].id, 1);
        assert_eq!(sorted[1].id, 5);
    }

    #[test]
    fn cookies_group_by_host_in_insertion_order() {
        let records = vec![
            cookie(".b.com", "1"),
            cookie(".a.com", "2"),
            cookie(".b.com", "3"),
            cookie(".a.com", "4"),
        ];

        let RecordSet::Cookies(sorted) = sort_records(RecordSet::Cookies(records)) else {
            panic!("variant changed");
        };
        let order: Vec<(&str, &str)> = sorted
            .iter()
            .map(|c| (c.host.as_str(), c.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(".b.com", "1"), (".b.com", "3"), (".a.com", "2"), (".a.com", "4")]
        );
    }

    #[test]
    fn firefox_password_pipeline_end_to_end() {
        let profile = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let global_salt = [0u8; 20];
        let master_key: Vec<u8> = (0..24).collect();
        write_key4(profile.path(), &global_salt, &master_key, &NSS_DEFAULT_KEY_ID);

        let iv = [3u8; 8];
        let user_ct = des3_cbc_encrypt_padded(&master_key, &iv, b"alice");
        let pass_ct = des3_cbc_encrypt_padded(&master_key, &iv, b"hunter2");
        let user_env = BASE64.encode(build_login_envelope(&[0xf8; 16], &iv, &user_ct));
        let pass_env = BASE64.encode(build_login_envelope(&[0xf8; 16], &iv, &pass_ct));

        std::fs::write(
            profile.path().join("logins.json"),
            format!(
                r#"{{"logins":[{{"formSubmitURL":"https://a","encryptedUsername":"{user_env}",
                     "encryptedPassword":"{pass_env}","timeCreated":1600000000000}}]}}"#
            ),
        )
        .unwrap();

        let target = BrowserTarget {
            browser: BrowserKind::Firefox,
            profile_dir: profile.path().to_path_buf(),
        };
        let records = harvest(&target, ArtifactKind::Passwords, scratch.path()).unwrap();

        let RecordSet::Logins(logins) = records else {
            panic!("expected logins");
        };
        assert_eq!(logins.len(), 1);
        assert_eq!(logins[0].login_url, "https://a");
        assert_eq!(logins[0].username, "alice");
        assert_eq!(logins[0].password, "hunter2");
        assert_eq!(logins[0].created_at.timestamp(), 1_600_000_000);
    }

    #[test]
    fn firefox_bookmark_pipeline_resolves_urls() {
        let profile = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let conn = rusqlite::Connection::open(profile.path().join("places.sqlite")).unwrap();
        conn.execute_batch(
            "CREATE TABLE moz_places (id INTEGER, url TEXT, last_visit_date INTEGER, \
             title TEXT, visit_count INTEGER);
             CREATE TABLE moz_bookmarks (id INTEGER, fk INTEGER, type INTEGER, \
             dateAdded INTEGER, title TEXT);
             INSERT INTO moz_places VALUES (7, 'https://x', 1600000000000000, 'X', 3);
             INSERT INTO moz_bookmarks VALUES (2, 7, 1, 1600000000000000, 'X');
             INSERT INTO moz_bookmarks VALUES (1, NULL, 2, 1600000000000000, 'menu');",
        )
        .unwrap();
        drop(conn);

        let target = BrowserTarget {
            browser: BrowserKind::Firefox,
            profile_dir: profile.path().to_path_buf(),
        };
        let records = harvest(&target, ArtifactKind::Bookmarks, scratch.path()).unwrap();

        let RecordSet::Bookmarks(bookmarks) = records else {
            panic!("expected bookmarks");
        };
        assert_eq!(bookmarks.len(), 2);
        assert_eq!(bookmarks[0].id, 1);
        assert_eq!(bookmarks[0].kind, BookmarkType::Folder);
        assert_eq!(bookmarks[1].id, 2);
        assert_eq!(bookmarks[1].url, "https://x");
    }

    #[test]
    fn missing_store_fails_without_leaving_snapshots() {
        let profile = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let target = BrowserTarget {
            browser: BrowserKind::Chrome,
            profile_dir: profile.path().to_path_buf(),
        };
        assert!(harvest(&target, ArtifactKind::History, scratch.path()).is_err());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
