#![forbid(unsafe_code)]

//! SOAP test-submission envelope (`TesteEnvioLoteNFTS`).

use nftsign_core::names::{node, NS_NFTS, NS_SOAP};

/// Wrap a signed batch document in the authority's test-submission SOAP
/// request.
///
/// The batch XML travels inside a CDATA section. A `]]>` sequence in the
/// payload would terminate the section early, so it is split across two
/// adjacent CDATA sections.
pub fn build_soap_envelope(message_xml: &str) -> String {
    let payload = message_xml.replace("]]>", "]]]]><![CDATA[>");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <soap:Envelope xmlns:soap=\"{NS_SOAP}\">\n\
         {i}<soap:Body>\n\
         {i}{i}<{request} xmlns=\"{NS_NFTS}\">\n\
         {i}{i}{i}<{version}>2</{version}>\n\
         {i}{i}{i}<{message}><![CDATA[{payload}]]></{message}>\n\
         {i}{i}</{request}>\n\
         {i}</soap:Body>\n\
         </soap:Envelope>\n",
        i = "  ",
        request = node::TESTE_ENVIO_LOTE_REQUEST,
        version = node::VERSAO_SCHEMA,
        message = node::MENSAGEM_XML,
    )
}
