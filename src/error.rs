use std::fmt;
use thiserror::Error;

pub type HarvestResult<T> = Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("I/O error: {0}")]
    StdIo(#[from] std::io::Error),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Malformed ASN.1 data: {0}")]
    MalformedAsn1(String),

    #[error("Unknown OID: {0}")]
    UnknownOid(String),

    #[error("Unknown NSS key id")]
    UnknownKeyId,

    #[error("Master password validation failed (password-check absent)")]
    WrongMasterPassword,

    #[error("Invalid PKCS#5 padding")]
    BadPadding,

    #[error("AES-GCM authentication failed")]
    AuthFail,

    #[error("OS data protection unavailable on this platform")]
    UnprotectUnavailable,

    #[error("Invalid key length: {0}")]
    InvalidKeyLength(String),

    #[error("No data found")]
    NoDataFound,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Base64 decode error")]
    Base64,

    #[error("CSV error: {0}")]
    Csv(String),

    #[error(transparent)]
    Other(#[from] color_eyre::eyre::Error),
}

impl HarvestError {
    pub fn with_info(self, info: impl fmt::Display) -> Self {
        tracing::error!("{}: {}", self, info);
        self
    }
}
