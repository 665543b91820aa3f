#![forbid(unsafe_code)]

//! The canonical builder: a [`TaxDocument`] in, the exact `tpNFTS` byte
//! sequence out.
//!
//! Emission rules, per the authority's manual:
//! - fixed element order, independent of anything about the input document;
//! - an absent optional field produces no tag at all, never an empty tag;
//! - a block with zero remaining children is dropped entirely;
//! - numeric identifiers lose leading zeros; the provider's municipal
//!   registration is the one deliberate exception and passes through
//!   verbatim;
//! - the signature field is never part of the output.

use nftsign_core::names::node;
use nftsign_core::{normalize, Error, Result};
use nftsign_model::{Address, TaxDocument};

use crate::escape;

/// Build the canonical byte form of `doc`.
///
/// The output is what gets hashed and signed; the `Assinatura` value never
/// feeds back into it.
pub fn canonical_bytes(doc: &TaxDocument) -> Result<Vec<u8>> {
    let mut out = Vec::new();

    leaf(&mut out, node::TIPO_DOCUMENTO, &doc.document_type.get().to_string());

    let mut key = Vec::new();
    leaf(
        &mut key,
        node::INSCRICAO_MUNICIPAL,
        &doc.key.municipal_registration.to_string(),
    );
    leaf(&mut key, node::SERIE_NFTS, &normalize::series(&doc.key.series));
    leaf(
        &mut key,
        node::NUMERO_DOCUMENTO,
        &doc.key.document_number.to_string(),
    );
    block(&mut out, node::CHAVE_DOCUMENTO, key);

    leaf(
        &mut out,
        node::DATA_PRESTACAO,
        &normalize::format_date(doc.service_date),
    );
    leaf(&mut out, node::STATUS_NFTS, doc.status.code());
    leaf(&mut out, node::TRIBUTACAO_NFTS, doc.taxation.code());
    leaf(
        &mut out,
        node::VALOR_SERVICOS,
        &monetary(node::VALOR_SERVICOS, doc.service_value)?,
    );
    leaf(
        &mut out,
        node::VALOR_DEDUCOES,
        &monetary(node::VALOR_DEDUCOES, doc.deductions_value)?,
    );
    leaf(&mut out, node::CODIGO_SERVICO, &doc.service_code.to_string());
    if let Some(code) = doc.sub_item_code {
        leaf(&mut out, node::CODIGO_SUB_ITEM, &code.to_string());
    }
    leaf(
        &mut out,
        node::ALIQUOTA_SERVICOS,
        &rate(node::ALIQUOTA_SERVICOS, doc.service_tax_rate)?,
    );
    leaf(
        &mut out,
        node::ISS_RETIDO_TOMADOR,
        normalize::format_boolean(doc.withholding_by_client),
    );
    if let Some(v) = doc.withholding_by_intermediary {
        leaf(
            &mut out,
            node::ISS_RETIDO_INTERMEDIARIO,
            normalize::format_boolean(v),
        );
    }

    let mut provider = Vec::new();
    let mut cpfcnpj = Vec::new();
    leaf(
        &mut cpfcnpj,
        doc.provider.tax_id.element_name(),
        &normalize::numeric_identifier(doc.provider.tax_id.digits()),
    );
    block(&mut provider, node::CPF_CNPJ, cpfcnpj);
    if let Some(reg) = &doc.provider.municipal_registration {
        // Verbatim by the manual: the provider registration keeps its
        // leading zeros, unlike the one inside ChaveDocumento.
        leaf(&mut provider, node::INSCRICAO_MUNICIPAL, &normalize::plain(reg));
    }
    leaf(
        &mut provider,
        node::RAZAO_SOCIAL_PRESTADOR,
        &normalize::plain(&doc.provider.legal_name),
    );
    if let Some(addr) = &doc.provider.address {
        address_block(&mut provider, addr);
    }
    if let Some(email) = &doc.provider.email {
        leaf(&mut provider, node::EMAIL, &normalize::plain(email));
    }
    block(&mut out, node::PRESTADOR, provider);

    leaf(
        &mut out,
        node::REGIME_TRIBUTACAO,
        &doc.tax_regime.to_string(),
    );
    if let Some(date) = doc.payment_date {
        leaf(&mut out, node::DATA_PAGAMENTO, &normalize::format_date(date));
    }
    if let Some(text) = &doc.description {
        leaf(&mut out, node::DISCRIMINACAO, &normalize::plain(text));
    }
    leaf(&mut out, node::TIPO_NFTS, &doc.document_category.to_string());

    if let Some(client) = &doc.client {
        let mut tomador = Vec::new();
        if let Some(id) = &client.tax_id {
            let mut wrapper = Vec::new();
            leaf(
                &mut wrapper,
                id.element_name(),
                &normalize::numeric_identifier(id.digits()),
            );
            block(&mut tomador, node::CPF_CNPJ, wrapper);
        }
        leaf(
            &mut tomador,
            node::RAZAO_SOCIAL,
            &normalize::plain(&client.legal_name),
        );
        block(&mut out, node::TOMADOR, tomador);
    }

    // Required fields guarantee a non-empty body, so the root always emits.
    let mut root = Vec::with_capacity(out.len() + 16);
    block(&mut root, node::TP_NFTS, out);
    Ok(root)
}

fn address_block(out: &mut Vec<u8>, addr: &Address) {
    let mut endereco = Vec::new();
    opt_plain(&mut endereco, node::TIPO_LOGRADOURO, &addr.street_type);
    opt_plain(&mut endereco, node::LOGRADOURO, &addr.street);
    opt_plain(&mut endereco, node::NUMERO_ENDERECO, &addr.number);
    opt_plain(&mut endereco, node::COMPLEMENTO_ENDERECO, &addr.complement);
    opt_plain(&mut endereco, node::BAIRRO, &addr.district);
    if let Some(city) = &addr.city {
        // City codes are numeric and zero-stripped like any identifier.
        leaf(&mut endereco, node::CIDADE, &normalize::numeric_identifier(city));
    }
    opt_plain(&mut endereco, node::UF, &addr.state);
    opt_plain(&mut endereco, node::CEP, &addr.postal_code);
    block(out, node::ENDERECO, endereco);
}

// ── Field renderers ──────────────────────────────────────────────────

fn monetary(field: &'static str, value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(Error::MalformedField {
            field,
            value: value.to_string(),
        });
    }
    Ok(normalize::format_monetary(value))
}

fn rate(field: &'static str, value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(Error::MalformedField {
            field,
            value: value.to_string(),
        });
    }
    Ok(normalize::format_rate(value))
}

// ── Emission helpers ─────────────────────────────────────────────────

/// Emit `<name>escaped-text</name>`, or nothing when the text is empty.
fn leaf(out: &mut Vec<u8>, name: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    out.extend_from_slice(b"<");
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b">");
    out.extend_from_slice(escape::escape_text(text).as_bytes());
    out.extend_from_slice(b"</");
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b">");
}

fn opt_plain(out: &mut Vec<u8>, name: &str, value: &Option<String>) {
    if let Some(text) = value {
        leaf(out, name, &normalize::plain(text));
    }
}

/// Emit a wrapped block, or nothing when it has no children.
fn block(out: &mut Vec<u8>, name: &str, children: Vec<u8>) {
    if children.is_empty() {
        return;
    }
    out.extend_from_slice(b"<");
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b">");
    out.extend_from_slice(&children);
    out.extend_from_slice(b"</");
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b">");
}
