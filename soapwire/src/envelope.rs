//! Fragments d'enveloppe SOAP 1.1.
//!
//! Le corps du message est assemblé par le code généré; cette couche fige
//! seulement le contrat de l'enveloppe: préfixes `soap-env`, `soap` et `xsi`
//! liés à leurs URIs standard, tag d'ouverture du Body portant les
//! déclarations de namespaces fournies par l'appelant.

pub const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const WSDL_SOAP_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/soap/";

/// Ouvre une enveloppe SOAP 1.1: déclaration XML, Envelope avec les trois
/// préfixes fixes, Body ouvert portant `namespace_attributes` tels quels.
pub fn begin_soap11_envelope(namespace_attributes: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soap-env:Envelope xmlns:soap-env="http://schemas.xmlsoap.org/soap/envelope/""#,
            r#" xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/""#,
            r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#,
            "><soap-env:Body {}>"
        ),
        namespace_attributes
    )
}

/// Ferme le Body puis l'Envelope.
pub fn end_soap11_envelope() -> &'static str {
    "</soap-env:Body></soap-env:Envelope>"
}

/// Échappe `&`, `<` et `>` pour insertion en contenu texte.
pub fn escape_xml_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
