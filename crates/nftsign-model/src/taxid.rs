#![forbid(unsafe_code)]

//! Brazilian taxpayer identifiers (CPF and CNPJ).

use nftsign_core::names::node;
use nftsign_core::{normalize, Error, Result};

/// A taxpayer identifier: CPF for an individual (11 digits) or CNPJ for a
/// company (14 digits). A party is identified by exactly one of the two.
///
/// The stored string keeps the full fixed width, leading zeros included —
/// that is the submission-wrapper spelling. The canonical signing form
/// strips leading zeros on emission; both spellings name the same taxpayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxId {
    Cpf(String),
    Cnpj(String),
}

impl TaxId {
    /// Build a CPF from a digit string. Shorter all-digit input (a
    /// canonical-form spelling with leading zeros stripped) is padded back
    /// to the 11-digit stored width.
    pub fn cpf(raw: &str) -> Result<Self> {
        Ok(TaxId::Cpf(fixed_width_digits("CPF", raw, 11)?))
    }

    /// Build a CNPJ from a digit string, padded to the 14-digit width.
    pub fn cnpj(raw: &str) -> Result<Self> {
        Ok(TaxId::Cnpj(fixed_width_digits("CNPJ", raw, 14)?))
    }

    /// The stored fixed-width digit string.
    pub fn digits(&self) -> &str {
        match self {
            TaxId::Cpf(d) | TaxId::Cnpj(d) => d,
        }
    }

    /// Element name used inside the `CPFCNPJ` wrapper element.
    pub fn element_name(&self) -> &'static str {
        match self {
            TaxId::Cpf(_) => node::CPF,
            TaxId::Cnpj(_) => node::CNPJ,
        }
    }
}

fn fixed_width_digits(field: &'static str, raw: &str, width: usize) -> Result<String> {
    let s = normalize::plain(raw);
    if s.is_empty() || s.len() > width || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::malformed(field, raw));
    }
    Ok(format!("{s:0>width$}"))
}
