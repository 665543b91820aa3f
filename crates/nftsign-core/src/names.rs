#![forbid(unsafe_code)]

//! Element-name and namespace constants for NFTS documents.
//!
//! Names follow the municipal schema verbatim (Portuguese element names);
//! the constants exist so the rest of the workspace never spells them twice.

/// São Paulo NFTS schema namespace
pub const NS_NFTS: &str = "http://www.prefeitura.sp.gov.br/nfts";

/// SOAP 1.1 envelope namespace
pub const NS_SOAP: &str = "http://schemas.xmlsoap.org/soap/envelope/";

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    /// Document element in the submission schema.
    pub const NFTS: &str = "NFTS";
    /// Root element of the canonical signing form. The authority's manual
    /// signs `tpNFTS`, not `NFTS`.
    pub const TP_NFTS: &str = "tpNFTS";

    pub const TIPO_DOCUMENTO: &str = "TipoDocumento";
    pub const CHAVE_DOCUMENTO: &str = "ChaveDocumento";
    pub const INSCRICAO_MUNICIPAL: &str = "InscricaoMunicipal";
    pub const SERIE_NFTS: &str = "SerieNFTS";
    pub const NUMERO_DOCUMENTO: &str = "NumeroDocumento";
    pub const DATA_PRESTACAO: &str = "DataPrestacao";
    pub const STATUS_NFTS: &str = "StatusNFTS";
    pub const TRIBUTACAO_NFTS: &str = "TributacaoNFTS";
    pub const VALOR_SERVICOS: &str = "ValorServicos";
    pub const VALOR_DEDUCOES: &str = "ValorDeducoes";
    pub const CODIGO_SERVICO: &str = "CodigoServico";
    pub const CODIGO_SUB_ITEM: &str = "CodigoSubItem";
    pub const ALIQUOTA_SERVICOS: &str = "AliquotaServicos";
    pub const ISS_RETIDO_TOMADOR: &str = "ISSRetidoTomador";
    pub const ISS_RETIDO_INTERMEDIARIO: &str = "ISSRetidoIntermediario";
    pub const PRESTADOR: &str = "Prestador";
    pub const CPF_CNPJ: &str = "CPFCNPJ";
    pub const CPF: &str = "CPF";
    pub const CNPJ: &str = "CNPJ";
    pub const RAZAO_SOCIAL_PRESTADOR: &str = "RazaoSocialPrestador";
    pub const RAZAO_SOCIAL: &str = "RazaoSocial";
    pub const ENDERECO: &str = "Endereco";
    pub const TIPO_LOGRADOURO: &str = "TipoLogradouro";
    pub const LOGRADOURO: &str = "Logradouro";
    pub const NUMERO_ENDERECO: &str = "NumeroEndereco";
    pub const COMPLEMENTO_ENDERECO: &str = "ComplementoEndereco";
    pub const BAIRRO: &str = "Bairro";
    pub const CIDADE: &str = "Cidade";
    pub const UF: &str = "UF";
    pub const CEP: &str = "CEP";
    pub const EMAIL: &str = "Email";
    pub const REGIME_TRIBUTACAO: &str = "RegimeTributacao";
    pub const DATA_PAGAMENTO: &str = "DataPagamento";
    pub const DISCRIMINACAO: &str = "Discriminacao";
    pub const TIPO_NFTS: &str = "TipoNFTS";
    pub const TOMADOR: &str = "Tomador";
    pub const ASSINATURA: &str = "Assinatura";

    // SOAP test-submission request
    pub const ENVELOPE: &str = "Envelope";
    pub const BODY: &str = "Body";
    pub const TESTE_ENVIO_LOTE_REQUEST: &str = "TesteEnvioLoteNFTSRequest";
    pub const VERSAO_SCHEMA: &str = "VersaoSchema";
    pub const MENSAGEM_XML: &str = "MensagemXML";
}

/// Child order of the `NFTS` submission element.
///
/// The municipal schema is order-sensitive. Re-emission keeps exactly these
/// children, in this order; anything else under `NFTS` is dropped.
pub const NFTS_CHILD_ORDER: &[&str] = &[
    node::TIPO_DOCUMENTO,
    node::CHAVE_DOCUMENTO,
    node::DATA_PRESTACAO,
    node::STATUS_NFTS,
    node::TRIBUTACAO_NFTS,
    node::VALOR_SERVICOS,
    node::VALOR_DEDUCOES,
    node::CODIGO_SERVICO,
    node::CODIGO_SUB_ITEM,
    node::ALIQUOTA_SERVICOS,
    node::ISS_RETIDO_TOMADOR,
    node::ISS_RETIDO_INTERMEDIARIO,
    node::PRESTADOR,
    node::REGIME_TRIBUTACAO,
    node::DATA_PAGAMENTO,
    node::DISCRIMINACAO,
    node::TIPO_NFTS,
    node::TOMADOR,
    node::ASSINATURA,
];
