#![forbid(unsafe_code)]

//! Serialization of a [`TaxDocument`] into the `NFTS` submission element.
//!
//! This is the wire spelling the municipal schema expects: fixed-width
//! zero-padded identifiers and a trailing `Assinatura` element. It is NOT
//! the canonical signing form (`tpNFTS`), which strips the padding; the two
//! are distinct serializations of the same record and must never be mixed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use nftsign_core::names::node;
use nftsign_core::normalize;

use crate::document::{Address, TaxDocument};

/// Serialize `doc` as an `NFTS` element, children in schema order, with
/// the signature (when present) Base64-encoded on a single line at the end.
///
/// Parsing the output back yields a document whose canonical bytes are
/// identical to the original's.
pub fn wrapper_xml(doc: &TaxDocument) -> String {
    let mut out = String::new();
    open(&mut out, node::NFTS);

    leaf(&mut out, node::TIPO_DOCUMENTO, &format!("{:02}", doc.document_type.get()));

    open(&mut out, node::CHAVE_DOCUMENTO);
    leaf(
        &mut out,
        node::INSCRICAO_MUNICIPAL,
        &format!("{:08}", doc.key.municipal_registration),
    );
    opt_leaf(&mut out, node::SERIE_NFTS, &doc.key.series);
    leaf(
        &mut out,
        node::NUMERO_DOCUMENTO,
        &doc.key.document_number.to_string(),
    );
    close(&mut out, node::CHAVE_DOCUMENTO);

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
        &normalize::format_monetary(doc.service_value),
    );
    leaf(
        &mut out,
        node::VALOR_DEDUCOES,
        &normalize::format_monetary(doc.deductions_value),
    );
    leaf(
        &mut out,
        node::CODIGO_SERVICO,
        &format!("{:04}", doc.service_code),
    );
    if let Some(code) = doc.sub_item_code {
        leaf(&mut out, node::CODIGO_SUB_ITEM, &format!("{code:03}"));
    }
    leaf(
        &mut out,
        node::ALIQUOTA_SERVICOS,
        &normalize::format_rate(doc.service_tax_rate),
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

    open(&mut out, node::PRESTADOR);
    open(&mut out, node::CPF_CNPJ);
    leaf(
        &mut out,
        doc.provider.tax_id.element_name(),
        doc.provider.tax_id.digits(),
    );
    close(&mut out, node::CPF_CNPJ);
    if let Some(reg) = &doc.provider.municipal_registration {
        opt_leaf(&mut out, node::INSCRICAO_MUNICIPAL, reg);
    }
    opt_leaf(&mut out, node::RAZAO_SOCIAL_PRESTADOR, &doc.provider.legal_name);
    if let Some(addr) = &doc.provider.address {
        address_block(&mut out, addr);
    }
    if let Some(email) = &doc.provider.email {
        opt_leaf(&mut out, node::EMAIL, email);
    }
    close(&mut out, node::PRESTADOR);

    leaf(
        &mut out,
        node::REGIME_TRIBUTACAO,
        &doc.tax_regime.to_string(),
    );
    if let Some(date) = doc.payment_date {
        leaf(&mut out, node::DATA_PAGAMENTO, &normalize::format_date(date));
    }
    if let Some(text) = &doc.description {
        opt_leaf(&mut out, node::DISCRIMINACAO, text);
    }
    leaf(&mut out, node::TIPO_NFTS, &doc.document_category.to_string());

    if let Some(client) = &doc.client {
        let mut block = String::new();
        if let Some(id) = &client.tax_id {
            open(&mut block, node::CPF_CNPJ);
            leaf(&mut block, id.element_name(), id.digits());
            close(&mut block, node::CPF_CNPJ);
        }
        opt_leaf(&mut block, node::RAZAO_SOCIAL, &client.legal_name);
        if !block.is_empty() {
            open(&mut out, node::TOMADOR);
            out.push_str(&block);
            close(&mut out, node::TOMADOR);
        }
    }

    if let Some(sig) = &doc.signature {
        leaf(&mut out, node::ASSINATURA, &BASE64.encode(sig));
    }

    close(&mut out, node::NFTS);
    out
}

fn address_block(out: &mut String, addr: &Address) {
    let mut block = String::new();
    let fields = [
        (node::TIPO_LOGRADOURO, &addr.street_type),
        (node::LOGRADOURO, &addr.street),
        (node::NUMERO_ENDERECO, &addr.number),
        (node::COMPLEMENTO_ENDERECO, &addr.complement),
        (node::BAIRRO, &addr.district),
        (node::CIDADE, &addr.city),
        (node::UF, &addr.state),
        (node::CEP, &addr.postal_code),
    ];
    for (name, value) in fields {
        if let Some(text) = value {
            opt_leaf(&mut block, name, text);
        }
    }
    if !block.is_empty() {
        open(out, node::ENDERECO);
        out.push_str(&block);
        close(out, node::ENDERECO);
    }
}

// ── Emission helpers ─────────────────────────────────────────────────

fn open(out: &mut String, name: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
}

fn close(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn leaf(out: &mut String, name: &str, text: &str) {
    open(out, name);
    escape_into(out, text);
    close(out, name);
}

/// Emit a leaf only when its text is non-empty. Empty tags are never
/// written in either serialization.
fn opt_leaf(out: &mut String, name: &str, text: &str) {
    if !text.is_empty() {
        leaf(out, name, text);
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Client, DocumentKey, DocumentTypeCode, Provider, Status, TaxationType};
    use crate::parse::parse_document;
    use crate::taxid::TaxId;
    use chrono::NaiveDate;

    fn sample() -> TaxDocument {
        TaxDocument {
            document_type: DocumentTypeCode::new(1).unwrap(),
            key: DocumentKey {
                municipal_registration: 98765,
                series: "A".to_string(),
                document_number: 123,
            },
            service_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            status: Status::Normal,
            taxation: TaxationType::T,
            service_value: 1500.30,
            deductions_value: 1300.30,
            service_code: 1001,
            sub_item_code: None,
            service_tax_rate: 5.0,
            withholding_by_client: false,
            withholding_by_intermediary: None,
            provider: Provider {
                tax_id: TaxId::cnpj("04733431000156").unwrap(),
                municipal_registration: Some("00098765".to_string()),
                legal_name: "Empresa Exemplo LTDA".to_string(),
                address: None,
                email: None,
            },
            tax_regime: 0,
            payment_date: None,
            description: Some("Consultoria".to_string()),
            document_category: 1,
            client: Some(Client {
                tax_id: Some(TaxId::cpf("12345678909").unwrap()),
                legal_name: "Fulano de Tal".to_string(),
            }),
            signature: None,
        }
    }

    #[test]
    fn test_wrapper_fixed_widths() {
        let xml = wrapper_xml(&sample());
        assert!(xml.starts_with("<NFTS><TipoDocumento>01</TipoDocumento>"));
        assert!(xml.contains("<InscricaoMunicipal>00098765</InscricaoMunicipal>"));
        assert!(xml.contains("<CodigoServico>1001</CodigoServico>"));
        assert!(xml.contains("<CNPJ>04733431000156</CNPJ>"));
        assert!(xml.contains("<CPF>12345678909</CPF>"));
        assert!(xml.ends_with("</NFTS>"));
    }

    #[test]
    fn test_wrapper_sub_item_padded() {
        let mut doc = sample();
        doc.sub_item_code = Some(1);
        doc.service_code = 101;
        let xml = wrapper_xml(&doc);
        assert!(xml.contains("<CodigoServico>0101</CodigoServico>"));
        assert!(xml.contains("<CodigoSubItem>001</CodigoSubItem>"));
    }

    #[test]
    fn test_wrapper_omits_absent_optionals() {
        let xml = wrapper_xml(&sample());
        assert!(!xml.contains("CodigoSubItem"));
        assert!(!xml.contains("ISSRetidoIntermediario"));
        assert!(!xml.contains("DataPagamento"));
        assert!(!xml.contains("Endereco"));
        assert!(!xml.contains("Assinatura"));
    }

    #[test]
    fn test_wrapper_signature_single_line() {
        let mut doc = sample();
        doc.signature = Some(vec![0u8; 64]);
        let xml = wrapper_xml(&doc);
        let start = xml.find("<Assinatura>").unwrap();
        let end = xml.find("</Assinatura>").unwrap();
        let b64 = &xml[start + "<Assinatura>".len()..end];
        assert!(!b64.contains(char::is_whitespace));
        assert_eq!(end + "</Assinatura>".len() + "</NFTS>".len(), xml.len());
    }

    #[test]
    fn test_wrapper_escapes_text() {
        let mut doc = sample();
        doc.provider.legal_name = "Foo & Bar <SA>".to_string();
        let xml = wrapper_xml(&doc);
        assert!(xml.contains("<RazaoSocialPrestador>Foo &amp; Bar &lt;SA&gt;</RazaoSocialPrestador>"));
    }

    #[test]
    fn test_wrapper_parse_round_trip() {
        let mut doc = sample();
        doc.signature = Some(b"not a real signature".to_vec());
        doc.sub_item_code = Some(2);
        doc.withholding_by_intermediary = Some(true);
        doc.payment_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        let xml = wrapper_xml(&doc);
        let parsed = parse_document(&xml).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_wrapper_rate_keeps_float_form() {
        let xml = wrapper_xml(&sample());
        assert!(xml.contains("<AliquotaServicos>5.0</AliquotaServicos>"));
    }

    #[test]
    fn test_wrapper_children_follow_schema_order() {
        use nftsign_core::names::NFTS_CHILD_ORDER;

        let mut doc = sample();
        doc.sub_item_code = Some(2);
        doc.withholding_by_intermediary = Some(false);
        doc.payment_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        doc.signature = Some(vec![1, 2, 3]);
        let xml = wrapper_xml(&doc);

        let tree = roxmltree::Document::parse(&xml).unwrap();
        let emitted: Vec<&str> = tree
            .root_element()
            .children()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .collect();
        let expected: Vec<&str> = NFTS_CHILD_ORDER
            .iter()
            .copied()
            .filter(|name| emitted.contains(name))
            .collect();
        assert_eq!(emitted, expected);
        assert_eq!(emitted.last(), Some(&"Assinatura"));
    }
}
