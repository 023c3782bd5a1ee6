//! SOAP-over-HTTP client transport layer.
//!
//! Drives the request/response exchange for web-service clients generated
//! from WSDL: a [`TransportClient`] per operation binding sends a serialized
//! envelope through an injected [`Transport`] handle and delivers exactly
//! one success-or-error outcome per request via registered handlers. The
//! addressing side (namespace resolution, `xs:any` wildcard matching) lives
//! in the companion `soapxml` crate.
//!
//! # Example
//!
//! ```no_run
//! use soapwire::{
//!     ClientConfig, HttpTransportFactory, SoapRequest, TransportClient,
//!     begin_soap11_envelope, end_soap11_envelope,
//! };
//!
//! let config = ClientConfig {
//!     soap_action: "\"urn:example#Ping\"".to_string(),
//!     ..ClientConfig::default()
//! };
//! let mut client = TransportClient::new(config, Box::new(HttpTransportFactory::new()));
//! client.on_success(|doc| println!("ok: {:?}", doc.root()));
//! client.on_error(|failure| eprintln!("failed: {failure}"));
//!
//! let body = format!(
//!     "{}<tns:Ping xmlns:tns=\"urn:example\"/>{}",
//!     begin_soap11_envelope(""),
//!     end_soap11_envelope()
//! );
//! client.request(SoapRequest {
//!     url: "http://localhost:8080/service".to_string(),
//!     body: Some(body),
//!     synchronous: true,
//!     ..SoapRequest::default()
//! }).unwrap();
//! ```

pub mod client;
pub mod envelope;
pub mod errors;
pub mod http;
pub mod transport;

pub use client::{
    ClientConfig, ErrorHandler, InFlightPolicy, SoapRequest, SuccessHandler, TransportClient,
};
pub use envelope::{
    SOAP_ENVELOPE_NAMESPACE, WSDL_SOAP_NAMESPACE, begin_soap11_envelope, end_soap11_envelope,
    escape_xml_text,
};
pub use errors::{ExchangeFailure, ResponseDiagnostic, TransportError};
pub use http::{HttpTransport, HttpTransportFactory};
pub use transport::{ReadyState, Transport, TransportFactory};
