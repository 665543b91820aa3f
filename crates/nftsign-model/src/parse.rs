#![forbid(unsafe_code)]

//! Building a [`TaxDocument`] from received submission XML.
//!
//! Upstream producers are inconsistent about namespaces: some qualify every
//! element with the municipal namespace, some emit bare local names. Lookup
//! therefore tries an exact-namespace match first and falls back to a
//! local-name match.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use roxmltree::Node;

use nftsign_core::names::{node, NS_NFTS};
use nftsign_core::{normalize, Error, Result};

use crate::document::{
    Address, Client, DocumentKey, DocumentTypeCode, Provider, Status, TaxDocument, TaxationType,
};
use crate::taxid::TaxId;

/// Find a direct child element by name: exact municipal-namespace match
/// first, then any-namespace local-name match.
pub fn find_child<'a, 'input>(parent: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    parent
        .children()
        .find(|n| {
            n.is_element()
                && n.tag_name().name() == name
                && n.tag_name().namespace() == Some(NS_NFTS)
        })
        .or_else(|| {
            parent
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == name)
        })
}

/// Parse the first `NFTS` element found in `xml` into a [`TaxDocument`].
pub fn parse_document(xml: &str) -> Result<TaxDocument> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| Error::XmlParse(e.to_string()))?;
    let nfts = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == node::NFTS)
        .ok_or_else(|| Error::MissingElement(node::NFTS.to_string()))?;
    parse_nfts(nfts)
}

/// Parse every `NFTS` element found in `xml`, in document order.
///
/// Errors if there is none, or if any of them fails to parse.
pub fn parse_documents(xml: &str) -> Result<Vec<TaxDocument>> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| Error::XmlParse(e.to_string()))?;
    let parsed: Vec<TaxDocument> = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == node::NFTS)
        .map(parse_nfts)
        .collect::<Result<_>>()?;
    if parsed.is_empty() {
        return Err(Error::MissingElement(node::NFTS.to_string()));
    }
    Ok(parsed)
}

/// Parse one `NFTS` element into a [`TaxDocument`].
pub fn parse_nfts(nfts: Node) -> Result<TaxDocument> {
    let document_type = parse_document_type(nfts)?;
    let key = parse_key(required_child(nfts, node::CHAVE_DOCUMENTO)?)?;
    let service_date = normalize::parse_date(
        node::DATA_PRESTACAO,
        required_text(nfts, node::DATA_PRESTACAO)?,
    )?;
    let status = Status::parse(required_text(nfts, node::STATUS_NFTS)?)?;
    let taxation = TaxationType::parse(required_text(nfts, node::TRIBUTACAO_NFTS)?)?;
    let service_value = required_decimal(nfts, node::VALOR_SERVICOS)?;
    let deductions_value = required_decimal(nfts, node::VALOR_DEDUCOES)?;
    let service_code = parse_number::<u32>(node::CODIGO_SERVICO, required_text(nfts, node::CODIGO_SERVICO)?)?;

    let sub_item_code = match optional_text(nfts, node::CODIGO_SUB_ITEM) {
        Some(raw) => Some(parse_number::<u32>(node::CODIGO_SUB_ITEM, &raw)?),
        None => None,
    };

    let service_tax_rate = required_decimal(nfts, node::ALIQUOTA_SERVICOS)?;

    let withholding_by_client = match find_child(nfts, node::ISS_RETIDO_TOMADOR) {
        Some(n) => normalize::parse_boolean(n.text().unwrap_or("")),
        None => return Err(Error::MissingElement(node::ISS_RETIDO_TOMADOR.to_string())),
    };
    let withholding_by_intermediary = find_child(nfts, node::ISS_RETIDO_INTERMEDIARIO)
        .map(|n| normalize::parse_boolean(n.text().unwrap_or("")));

    let provider = parse_provider(required_child(nfts, node::PRESTADOR)?)?;
    let tax_regime = parse_number::<u8>(
        node::REGIME_TRIBUTACAO,
        required_text(nfts, node::REGIME_TRIBUTACAO)?,
    )?;

    let payment_date = match optional_text(nfts, node::DATA_PAGAMENTO) {
        Some(raw) => Some(normalize::parse_date(node::DATA_PAGAMENTO, &raw)?),
        None => None,
    };
    let description = optional_text(nfts, node::DISCRIMINACAO);
    let document_category =
        parse_number::<u8>(node::TIPO_NFTS, required_text(nfts, node::TIPO_NFTS)?)?;

    let client = match find_child(nfts, node::TOMADOR) {
        Some(n) => parse_client(n)?,
        None => None,
    };
    let signature = parse_signature(nfts)?;

    Ok(TaxDocument {
        document_type,
        key,
        service_date,
        status,
        taxation,
        service_value,
        deductions_value,
        service_code,
        sub_item_code,
        service_tax_rate,
        withholding_by_client,
        withholding_by_intermediary,
        provider,
        tax_regime,
        payment_date,
        description,
        document_category,
        client,
        signature,
    })
}

// ── Block parsers ────────────────────────────────────────────────────

fn parse_document_type(nfts: Node) -> Result<DocumentTypeCode> {
    let raw = required_text(nfts, node::TIPO_DOCUMENTO)?;
    let code = parse_number::<u8>(node::TIPO_DOCUMENTO, raw)?;
    DocumentTypeCode::new(code)
}

fn parse_key(key: Node) -> Result<DocumentKey> {
    Ok(DocumentKey {
        municipal_registration: parse_number::<u64>(
            node::INSCRICAO_MUNICIPAL,
            required_text(key, node::INSCRICAO_MUNICIPAL)?,
        )?,
        series: normalize::series(child_text(key, node::SERIE_NFTS).unwrap_or("")),
        document_number: parse_number::<u64>(
            node::NUMERO_DOCUMENTO,
            required_text(key, node::NUMERO_DOCUMENTO)?,
        )?,
    })
}

fn parse_provider(prestador: Node) -> Result<Provider> {
    let wrapper = required_child(prestador, node::CPF_CNPJ)?;
    // Providers are identified by CNPJ whenever one is present.
    let tax_id = parse_tax_id(wrapper, true)?
        .ok_or_else(|| Error::MissingElement(node::CPF_CNPJ.to_string()))?;

    let address = match find_child(prestador, node::ENDERECO) {
        Some(n) => parse_address(n),
        None => None,
    };

    Ok(Provider {
        tax_id,
        municipal_registration: optional_text(prestador, node::INSCRICAO_MUNICIPAL),
        legal_name: normalize::plain(required_text(prestador, node::RAZAO_SOCIAL_PRESTADOR)?),
        address,
        email: optional_text(prestador, node::EMAIL),
    })
}

fn parse_address(endereco: Node) -> Option<Address> {
    let addr = Address {
        street_type: optional_text(endereco, node::TIPO_LOGRADOURO),
        street: optional_text(endereco, node::LOGRADOURO),
        number: optional_text(endereco, node::NUMERO_ENDERECO),
        complement: optional_text(endereco, node::COMPLEMENTO_ENDERECO),
        district: optional_text(endereco, node::BAIRRO),
        city: optional_text(endereco, node::CIDADE),
        state: optional_text(endereco, node::UF),
        postal_code: optional_text(endereco, node::CEP),
    };
    if addr.is_empty() {
        None
    } else {
        Some(addr)
    }
}

fn parse_client(tomador: Node) -> Result<Option<Client>> {
    // Clients are identified by CPF whenever one is present.
    let tax_id = match find_child(tomador, node::CPF_CNPJ) {
        Some(wrapper) => parse_tax_id(wrapper, false)?,
        None => None,
    };
    let legal_name = child_text(tomador, node::RAZAO_SOCIAL)
        .map(normalize::plain)
        .unwrap_or_default();

    if tax_id.is_none() && legal_name.is_empty() {
        return Ok(None);
    }
    Ok(Some(Client {
        tax_id,
        legal_name,
    }))
}

fn parse_tax_id(wrapper: Node, prefer_cnpj: bool) -> Result<Option<TaxId>> {
    let cnpj = optional_text(wrapper, node::CNPJ);
    let cpf = optional_text(wrapper, node::CPF);
    let id = match (prefer_cnpj, cnpj, cpf) {
        (true, Some(d), _) => Some(TaxId::cnpj(&d)?),
        (false, _, Some(d)) => Some(TaxId::cpf(&d)?),
        (_, Some(d), _) => Some(TaxId::cnpj(&d)?),
        (_, _, Some(d)) => Some(TaxId::cpf(&d)?),
        _ => None,
    };
    Ok(id)
}

fn parse_signature(nfts: Node) -> Result<Option<Vec<u8>>> {
    let Some(n) = find_child(nfts, node::ASSINATURA) else {
        return Ok(None);
    };
    // Whitespace and line wrapping inside the element are tolerated.
    let compact: String = n.text().unwrap_or("").split_whitespace().collect();
    if compact.is_empty() {
        return Ok(None);
    }
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| Error::Base64(e.to_string()))?;
    Ok(Some(bytes))
}

// ── Lookup helpers ───────────────────────────────────────────────────

fn child_text<'a>(parent: Node<'a, '_>, name: &str) -> Option<&'a str> {
    find_child(parent, name).and_then(|n| n.text())
}

fn required_child<'a, 'input>(parent: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>> {
    find_child(parent, name).ok_or_else(|| Error::MissingElement(name.to_string()))
}

/// Child text for a required element. An absent element and an empty one
/// are both missing.
fn required_text<'a>(parent: Node<'a, '_>, name: &str) -> Result<&'a str> {
    child_text(parent, name)
        .filter(|t| !normalize::plain(t).is_empty())
        .ok_or_else(|| Error::MissingElement(name.to_string()))
}

fn optional_text(parent: Node, name: &str) -> Option<String> {
    child_text(parent, name)
        .map(normalize::plain)
        .filter(|s| !s.is_empty())
}

fn required_decimal(parent: Node, name: &'static str) -> Result<f64> {
    let raw = required_text(parent, name)?;
    normalize::parse_decimal(name, raw)?.ok_or_else(|| Error::MissingElement(name.to_string()))
}

/// Parse an integer field after numeric-identifier normalization, so
/// zero-padded wrapper spellings and zero-stripped canonical spellings
/// both land on the same value.
fn parse_number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T> {
    normalize::numeric_identifier(raw)
        .parse::<T>()
        .map_err(|_| Error::malformed(field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FULL: &str = r#"<PedidoEnvioLoteNFTS xmlns="http://www.prefeitura.sp.gov.br/nfts">
<Cabecalho><Versao>2</Versao></Cabecalho>
<NFTS>
  <TipoDocumento>02</TipoDocumento>
  <ChaveDocumento>
    <InscricaoMunicipal>010259627</InscricaoMunicipal>
    <SerieNFTS>A</SerieNFTS>
    <NumeroDocumento>000123</NumeroDocumento>
  </ChaveDocumento>
  <DataPrestacao>2024-05-10T00:00:00</DataPrestacao>
  <StatusNFTS>N</StatusNFTS>
  <TributacaoNFTS>T</TributacaoNFTS>
  <ValorServicos>1500,30</ValorServicos>
  <ValorDeducoes>0</ValorDeducoes>
  <CodigoServico>0101</CodigoServico>
  <AliquotaServicos>5</AliquotaServicos>
  <ISSRetidoTomador>sim</ISSRetidoTomador>
  <Prestador>
    <CPFCNPJ><CNPJ>04733431000156</CNPJ></CPFCNPJ>
    <InscricaoMunicipal>00098765</InscricaoMunicipal>
    <RazaoSocialPrestador>Empresa&#160;Exemplo LTDA</RazaoSocialPrestador>
    <Endereco>
      <Logradouro>Rua das Flores</Logradouro>
      <NumeroEndereco>100</NumeroEndereco>
      <Cidade>3550308</Cidade>
      <UF>SP</UF>
      <CEP>01001000</CEP>
    </Endereco>
    <Email>fiscal@exemplo.com.br</Email>
  </Prestador>
  <RegimeTributacao>0</RegimeTributacao>
  <Discriminacao>Consultoria em sistemas</Discriminacao>
  <TipoNFTS>1</TipoNFTS>
  <Tomador>
    <CPFCNPJ><CPF>12345678909</CPF></CPFCNPJ>
    <RazaoSocial>Fulano de Tal</RazaoSocial>
  </Tomador>
</NFTS>
</PedidoEnvioLoteNFTS>"#;

    #[test]
    fn test_parse_full_document() {
        let doc = parse_document(FULL).unwrap();
        assert_eq!(doc.document_type.get(), 2);
        assert_eq!(doc.key.municipal_registration, 10259627);
        assert_eq!(doc.key.series, "A");
        assert_eq!(doc.key.document_number, 123);
        assert_eq!(
            doc.service_date,
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
        );
        assert_eq!(doc.status, Status::Normal);
        assert_eq!(doc.taxation, TaxationType::T);
        assert_eq!(doc.service_value, 1500.30);
        assert_eq!(doc.deductions_value, 0.0);
        assert_eq!(doc.service_code, 101);
        assert_eq!(doc.sub_item_code, None);
        assert_eq!(doc.service_tax_rate, 5.0);
        assert!(doc.withholding_by_client);
        assert_eq!(doc.withholding_by_intermediary, None);
        assert_eq!(doc.provider.tax_id, TaxId::Cnpj("04733431000156".into()));
        assert_eq!(
            doc.provider.municipal_registration.as_deref(),
            Some("00098765")
        );
        // NBSP in the source collapses to a regular space.
        assert_eq!(doc.provider.legal_name, "Empresa Exemplo LTDA");
        let addr = doc.provider.address.as_ref().unwrap();
        assert_eq!(addr.street.as_deref(), Some("Rua das Flores"));
        assert_eq!(addr.street_type, None);
        assert_eq!(doc.tax_regime, 0);
        assert_eq!(doc.payment_date, None);
        assert_eq!(doc.description.as_deref(), Some("Consultoria em sistemas"));
        assert_eq!(doc.document_category, 1);
        let client = doc.client.as_ref().unwrap();
        assert_eq!(client.tax_id, Some(TaxId::Cpf("12345678909".into())));
        assert_eq!(client.legal_name, "Fulano de Tal");
        assert_eq!(doc.signature, None);
    }

    #[test]
    fn test_parse_without_namespace() {
        // Same document with bare local names parses identically.
        let bare = FULL.replace(r#" xmlns="http://www.prefeitura.sp.gov.br/nfts""#, "");
        let a = parse_document(FULL).unwrap();
        let b = parse_document(&bare).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_documents_in_order() {
        let second = FULL
            .replace("<NumeroDocumento>000123</NumeroDocumento>", "<NumeroDocumento>000124</NumeroDocumento>");
        let nfts_start = second.find("<NFTS>").unwrap();
        let nfts_end = second.find("</NFTS>").unwrap() + "</NFTS>".len();
        let batch = FULL.replace(
            "</PedidoEnvioLoteNFTS>",
            &format!("{}</PedidoEnvioLoteNFTS>", &second[nfts_start..nfts_end]),
        );
        let docs = parse_documents(&batch).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].key.document_number, 123);
        assert_eq!(docs[1].key.document_number, 124);

        let err = parse_documents("<Outro/>").unwrap_err();
        assert!(matches!(err, Error::MissingElement(ref name) if name == "NFTS"));
    }

    #[test]
    fn test_missing_required_element() {
        let xml = r#"<NFTS><TipoDocumento>1</TipoDocumento></NFTS>"#;
        let err = parse_document(xml).unwrap_err();
        assert!(matches!(err, Error::MissingElement(ref name) if name == "ChaveDocumento"));
    }

    #[test]
    fn test_no_nfts_element() {
        let err = parse_document("<Outro/>").unwrap_err();
        assert!(matches!(err, Error::MissingElement(ref name) if name == "NFTS"));
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse_document("<NFTS>").unwrap_err();
        assert!(matches!(err, Error::XmlParse(_)));
    }

    #[test]
    fn test_malformed_date() {
        let xml = FULL.replace("2024-05-10T00:00:00", "10/05/2024");
        let err = parse_document(&xml).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedField {
                field: "DataPrestacao",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_decimal() {
        let xml = FULL.replace("1500,30", "abc");
        let err = parse_document(&xml).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedField {
                field: "ValorServicos",
                ..
            }
        ));
    }

    #[test]
    fn test_provider_prefers_cnpj() {
        let xml = FULL.replace(
            "<CPFCNPJ><CNPJ>04733431000156</CNPJ></CPFCNPJ>",
            "<CPFCNPJ><CPF>12345678909</CPF><CNPJ>04733431000156</CNPJ></CPFCNPJ>",
        );
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.provider.tax_id, TaxId::Cnpj("04733431000156".into()));
    }

    #[test]
    fn test_client_prefers_cpf() {
        let xml = FULL.replace(
            "<CPFCNPJ><CPF>12345678909</CPF></CPFCNPJ>",
            "<CPFCNPJ><CNPJ>04733431000156</CNPJ><CPF>12345678909</CPF></CPFCNPJ>",
        );
        let doc = parse_document(&xml).unwrap();
        assert_eq!(
            doc.client.unwrap().tax_id,
            Some(TaxId::Cpf("12345678909".into()))
        );
    }

    #[test]
    fn test_signature_whitespace_tolerated() {
        let xml = FULL.replace(
            "</Tomador>",
            "</Tomador><Assinatura>aGVs\n  bG8=</Assinatura>",
        );
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.signature.as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_signature_invalid_base64() {
        let xml = FULL.replace("</Tomador>", "</Tomador><Assinatura>@@@@</Assinatura>");
        let err = parse_document(&xml).unwrap_err();
        assert!(matches!(err, Error::Base64(_)));
    }

    #[test]
    fn test_blank_signature_is_none() {
        let xml = FULL.replace("</Tomador>", "</Tomador><Assinatura>  </Assinatura>");
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.signature, None);
    }

    #[test]
    fn test_empty_tomador_collapses() {
        let xml = FULL.replace(
            "<Tomador>\n    <CPFCNPJ><CPF>12345678909</CPF></CPFCNPJ>\n    <RazaoSocial>Fulano de Tal</RazaoSocial>\n  </Tomador>",
            "<Tomador></Tomador>",
        );
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.client, None);
    }

    #[test]
    fn test_optional_boolean_parsed() {
        let xml = FULL.replace(
            "<ISSRetidoTomador>sim</ISSRetidoTomador>",
            "<ISSRetidoTomador>nao</ISSRetidoTomador><ISSRetidoIntermediario>1</ISSRetidoIntermediario>",
        );
        let doc = parse_document(&xml).unwrap();
        assert!(!doc.withholding_by_client);
        assert_eq!(doc.withholding_by_intermediary, Some(true));
    }
}
