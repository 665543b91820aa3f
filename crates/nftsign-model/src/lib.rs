#![forbid(unsafe_code)]

//! In-memory model of an NFTS tax document, plus the two XML faces it has:
//! parsing from a received submission and serializing back into the
//! `NFTS` submission element.
//!
//! The canonical signing form is a third, distinct serialization and lives
//! in `nftsign-canonical`.

pub mod document;
pub mod parse;
pub mod taxid;
pub mod wrapper;

pub use document::{
    Address, Client, DocumentKey, DocumentTypeCode, Provider, Status, TaxDocument, TaxationType,
};
pub use parse::{parse_document, parse_documents, parse_nfts};
pub use taxid::TaxId;
pub use wrapper::wrapper_xml;
