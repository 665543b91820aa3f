#![forbid(unsafe_code)]

/// Errors produced by the nftsign NFTS signing library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("malformed field {field}: {value:?}")]
    MalformedField { field: &'static str, value: String },

    #[error("credential has no private key")]
    NoPrivateKey,

    #[error("credential has no public key")]
    NoPublicKey,

    #[error("signing backend error: {0}")]
    SigningBackend(String),

    #[error("verification backend error: {0}")]
    VerificationBackend(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a malformed-field error carrying the raw source value.
    pub fn malformed(field: &'static str, value: &str) -> Self {
        Error::MalformedField {
            field,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
