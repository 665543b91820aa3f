#![forbid(unsafe_code)]

//! The NFTS tax-document record and its sub-structures.
//!
//! Optional fields are `Option<T>`; an absent value means the element is
//! omitted entirely from both serializations, never emitted empty.

use chrono::NaiveDate;
use nftsign_core::{normalize, Error, Result};

use crate::taxid::TaxId;

/// Document type code (`TipoDocumento`), restricted to 1..=3 by the
/// municipal schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentTypeCode(u8);

impl DocumentTypeCode {
    pub fn new(code: u8) -> Result<Self> {
        if (1..=3).contains(&code) {
            Ok(DocumentTypeCode(code))
        } else {
            Err(Error::MalformedField {
                field: "TipoDocumento",
                value: code.to_string(),
            })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Document status (`StatusNFTS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Normal,
    Cancelled,
}

impl Status {
    /// The 1-character schema code.
    pub fn code(self) -> &'static str {
        match self {
            Status::Normal => "N",
            Status::Cancelled => "C",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match normalize::plain(raw).as_str() {
            "N" => Ok(Status::Normal),
            "C" => Ok(Status::Cancelled),
            _ => Err(Error::malformed("StatusNFTS", raw)),
        }
    }
}

/// Taxation regime code (`TributacaoNFTS`). The authority's letter codes
/// are kept verbatim: T (taxed in São Paulo), I (exempt), J (suspended by
/// court order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxationType {
    T,
    I,
    J,
}

impl TaxationType {
    pub fn code(self) -> &'static str {
        match self {
            TaxationType::T => "T",
            TaxationType::I => "I",
            TaxationType::J => "J",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match normalize::plain(raw).as_str() {
            "T" => Ok(TaxationType::T),
            "I" => Ok(TaxationType::I),
            "J" => Ok(TaxationType::J),
            _ => Err(Error::malformed("TributacaoNFTS", raw)),
        }
    }
}

/// The document key (`ChaveDocumento`): municipal registration of the
/// issuer, series, and document number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    pub municipal_registration: u64,
    /// Series string, stored trimmed, never zero-padded.
    pub series: String,
    pub document_number: u64,
}

/// Street address block (`Endereco`). Every field is optional; an address
/// with no populated field is not represented (use `None` at the call
/// site instead).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub street_type: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    /// Municipal city code (`Cidade`), digits.
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.street_type.is_none()
            && self.street.is_none()
            && self.number.is_none()
            && self.complement.is_none()
            && self.district.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
    }
}

/// Service provider block (`Prestador`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub tax_id: TaxId,
    /// Municipal registration, kept verbatim. Unlike the registration in
    /// `ChaveDocumento` this one is NOT zero-stripped in the canonical
    /// form, so it is stored and emitted exactly as given.
    pub municipal_registration: Option<String>,
    pub legal_name: String,
    pub address: Option<Address>,
    pub email: Option<String>,
}

/// Service client block (`Tomador`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub tax_id: Option<TaxId>,
    pub legal_name: String,
}

/// One NFTS record: a service-tax invoice submission.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxDocument {
    pub document_type: DocumentTypeCode,
    pub key: DocumentKey,
    pub service_date: NaiveDate,
    pub status: Status,
    pub taxation: TaxationType,
    pub service_value: f64,
    pub deductions_value: f64,
    pub service_code: u32,
    pub sub_item_code: Option<u32>,
    pub service_tax_rate: f64,
    pub withholding_by_client: bool,
    pub withholding_by_intermediary: Option<bool>,
    pub provider: Provider,
    pub tax_regime: u8,
    pub payment_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub document_category: u8,
    pub client: Option<Client>,
    /// Raw RSA signature over the canonical byte form. Populated by the
    /// signer; excluded from the bytes it signs.
    pub signature: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_range() {
        assert_eq!(DocumentTypeCode::new(1).unwrap().get(), 1);
        assert_eq!(DocumentTypeCode::new(3).unwrap().get(), 3);
        assert!(DocumentTypeCode::new(0).is_err());
        assert!(DocumentTypeCode::new(4).is_err());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Normal.code(), "N");
        assert_eq!(Status::Cancelled.code(), "C");
        assert_eq!(Status::parse(" N ").unwrap(), Status::Normal);
        assert!(Status::parse("X").is_err());
        assert!(Status::parse("").is_err());
    }

    #[test]
    fn test_taxation_codes() {
        assert_eq!(TaxationType::parse("T").unwrap().code(), "T");
        assert_eq!(TaxationType::parse("J").unwrap(), TaxationType::J);
        assert!(TaxationType::parse("Z").is_err());
    }

    #[test]
    fn test_empty_address_detection() {
        assert!(Address::default().is_empty());
        let addr = Address {
            city: Some("3550308".to_string()),
            ..Address::default()
        };
        assert!(!addr.is_empty());
    }
}
