//! Appel SOAP synchrone contre un endpoint passé en argument.
//!
//! ```text
//! cargo run --example call_service -- http://localhost:8080/service "\"urn:example#Ping\""
//! ```

use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use soapwire::{
    ClientConfig, ExchangeFailure, HttpTransportFactory, SoapRequest, TransportClient,
    begin_soap11_envelope, end_soap11_envelope,
};
use soapxml::{display_name, first_element_child};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().context("usage: call_service <url> [soap-action]")?;
    let soap_action = args.next().unwrap_or_default();

    let body = format!(
        "{}<tns:Ping xmlns:tns=\"urn:example\"/>{}",
        begin_soap11_envelope(""),
        end_soap11_envelope()
    );

    let config = ClientConfig {
        soap_action,
        ..ClientConfig::default()
    };
    let factory = HttpTransportFactory::with_timeout(Duration::from_secs(30));
    let mut client = TransportClient::new(config, Box::new(factory));

    let (tx, rx) = mpsc::channel();
    let done = tx.clone();
    client.on_success(move |doc| {
        let summary = match first_element_child(&doc, doc.root()) {
            Ok(Some(root)) => display_name(&doc, root),
            _ => "<empty response>".to_string(),
        };
        let _ = done.send(format!("response: {summary}"));
    });
    client.on_error(move |failure| {
        let line = match &failure {
            ExchangeFailure::Application(diag) => {
                format!("call failed: {diag}\n{}", diag.body)
            }
            ExchangeFailure::Transport(err) => format!("call failed: {err}"),
        };
        let _ = tx.send(line);
    });

    client.request(SoapRequest {
        url,
        body: Some(body),
        synchronous: true,
        ..SoapRequest::default()
    })?;

    println!("{}", rx.recv()?);
    Ok(())
}
