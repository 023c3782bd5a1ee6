//! Transport HTTP bloquant au-dessus de ureq.
//!
//! L'agent est configuré avec `http_status_as_error(false)`: un 500 portant
//! un SOAP Fault doit rester lisible, pas devenir une `Error::StatusCode`.
//! Le corps est lu en entier quel que soit le statut. En mode asynchrone
//! l'échange part sur un thread dédié et les transitions d'état arrivent
//! par canal; en mode synchrone tout se joue dans `send`.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use soapxml::Document;
use tracing::debug;
use ureq::Agent;

use crate::errors::TransportError;
use crate::transport::{ReadyState, Transport, TransportFactory};

const SUPPORTED_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "HEAD"];

#[derive(Debug, Clone)]
struct OpenParams {
    method: String,
    url: String,
    asynchronous: bool,
}

#[derive(Debug, Default)]
enum Outcome {
    #[default]
    Pending,
    /// Échec de connexion: aucun statut HTTP n'existe.
    Failed(String),
    Response {
        status: u16,
        status_text: String,
        headers: Vec<(String, String)>,
        body: String,
    },
}

#[derive(Debug)]
struct Shared {
    state: ReadyState,
    outcome: Outcome,
}

pub struct HttpTransport {
    timeout: Option<Duration>,
    opened: Option<OpenParams>,
    request_headers: Vec<(String, String)>,
    shared: Arc<Mutex<Shared>>,
    events_tx: Sender<ReadyState>,
    events_rx: Receiver<ReadyState>,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            timeout,
            opened: None,
            request_headers: Vec::new(),
            shared: Arc::new(Mutex::new(Shared {
                state: ReadyState::Uninitialized,
                outcome: Outcome::Pending,
            })),
            events_tx,
            events_rx,
        }
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, Shared>, TransportError> {
        self.shared
            .lock()
            .map_err(|_| TransportError::Http("transport state poisoned".to_string()))
    }
}

fn set_state(shared: &Mutex<Shared>, events: &Sender<ReadyState>, state: ReadyState) {
    if let Ok(mut guard) = shared.lock() {
        guard.state = state;
    }
    // le récepteur peut avoir disparu, la transition est alors sans témoin
    let _ = events.send(state);
}

impl Transport for HttpTransport {
    fn open(
        &mut self,
        method: &str,
        url: &str,
        asynchronous: bool,
    ) -> Result<(), TransportError> {
        let method = method.to_ascii_uppercase();
        if !SUPPORTED_METHODS.contains(&method.as_str()) {
            return Err(TransportError::Http(format!(
                "unsupported HTTP method: {method}"
            )));
        }
        self.opened = Some(OpenParams {
            method,
            url: url.to_string(),
            asynchronous,
        });
        set_state(&self.shared, &self.events_tx, ReadyState::Loading);
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.request_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.request_headers
            .push((name.to_string(), value.to_string()));
    }

    fn send(&mut self, body: Option<&str>) -> Result<(), TransportError> {
        let params = self.opened.clone().ok_or(TransportError::NotOpen)?;
        let headers = self.request_headers.clone();
        let body = body.map(str::to_string);
        let timeout = self.timeout;

        if params.asynchronous {
            let shared = Arc::clone(&self.shared);
            let events = self.events_tx.clone();
            thread::Builder::new()
                .name("soapwire-http".to_string())
                .spawn(move || {
                    perform_exchange(&params, &headers, body, timeout, &shared, &events);
                })
                .map_err(|err| {
                    TransportError::Http(format!("failed to spawn transport thread: {err}"))
                })?;
        } else {
            perform_exchange(
                &params,
                &headers,
                body,
                timeout,
                &self.shared,
                &self.events_tx,
            );
        }
        Ok(())
    }

    fn state_events(&self) -> Receiver<ReadyState> {
        self.events_rx.clone()
    }

    fn ready_state(&self) -> ReadyState {
        self.shared
            .lock()
            .map(|guard| guard.state)
            .unwrap_or(ReadyState::Uninitialized)
    }

    fn status(&self) -> Result<u16, TransportError> {
        match &self.locked()?.outcome {
            Outcome::Response { status, .. } => Ok(*status),
            Outcome::Failed(message) => Err(TransportError::Connection(message.clone())),
            Outcome::Pending => Err(TransportError::Pending),
        }
    }

    fn status_text(&self) -> String {
        match self.locked() {
            Ok(guard) => match &guard.outcome {
                Outcome::Response { status_text, .. } => status_text.clone(),
                _ => String::new(),
            },
            Err(_) => String::new(),
        }
    }

    fn response_headers(&self) -> Vec<(String, String)> {
        match self.locked() {
            Ok(guard) => match &guard.outcome {
                Outcome::Response { headers, .. } => headers.clone(),
                _ => Vec::new(),
            },
            Err(_) => Vec::new(),
        }
    }

    fn response_text(&self) -> String {
        match self.locked() {
            Ok(guard) => match &guard.outcome {
                Outcome::Response { body, .. } => body.clone(),
                _ => String::new(),
            },
            Err(_) => String::new(),
        }
    }

    fn response_document(&self) -> Result<Document, TransportError> {
        match &self.locked()?.outcome {
            Outcome::Response { body, .. } => Ok(Document::parse(body)?),
            Outcome::Failed(message) => Err(TransportError::Connection(message.clone())),
            Outcome::Pending => Err(TransportError::Pending),
        }
    }
}

fn perform_exchange(
    params: &OpenParams,
    headers: &[(String, String)],
    body: Option<String>,
    timeout: Option<Duration>,
    shared: &Mutex<Shared>,
    events: &Sender<ReadyState>,
) {
    debug!("about to send {} {}", params.method, params.url);
    set_state(shared, events, ReadyState::Loaded);

    let outcome = run_http(params, headers, body, timeout);

    set_state(shared, events, ReadyState::Interactive);
    if let Ok(mut guard) = shared.lock() {
        guard.outcome = outcome;
    }
    set_state(shared, events, ReadyState::Done);
}

fn run_http(
    params: &OpenParams,
    headers: &[(String, String)],
    body: Option<String>,
    timeout: Option<Duration>,
) -> Outcome {
    let mut config = Agent::config_builder().http_status_as_error(false);
    if let Some(timeout) = timeout {
        config = config.timeout_global(Some(timeout));
    }
    let agent: Agent = config.build().into();

    let url = params.url.as_str();
    let result = match params.method.as_str() {
        "GET" | "HEAD" | "DELETE" => {
            let mut builder = match params.method.as_str() {
                "GET" => agent.get(url),
                "HEAD" => agent.head(url),
                _ => agent.delete(url),
            };
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        "POST" | "PUT" => {
            let mut builder = if params.method == "POST" {
                agent.post(url)
            } else {
                agent.put(url)
            };
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.send(body.as_deref().unwrap_or(""))
        }
        other => return Outcome::Failed(format!("unsupported HTTP method: {other}")),
    };

    match result {
        Err(err) => Outcome::Failed(err.to_string()),
        Ok(mut response) => {
            let status = response.status();
            let status_text = status.canonical_reason().unwrap_or("").to_string();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            match response.body_mut().read_to_string() {
                Ok(body) => Outcome::Response {
                    status: status.as_u16(),
                    status_text,
                    headers,
                    body,
                },
                Err(err) => Outcome::Failed(format!("failed to read response body: {err}")),
            }
        }
    }
}

/// Factory du transport de production.
#[derive(Debug, Clone, Default)]
pub struct HttpTransportFactory {
    timeout: Option<Duration>,
}

impl HttpTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(HttpTransport::new(self.timeout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_before_open_is_rejected() {
        let mut transport = HttpTransport::new(None);
        assert!(matches!(
            transport.send(None),
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    fn unknown_method_is_rejected_at_open() {
        let mut transport = HttpTransport::new(None);
        assert!(matches!(
            transport.open("BREW", "http://localhost/", false),
            Err(TransportError::Http(_))
        ));
    }

    #[test]
    fn headers_replace_on_same_name() {
        let mut transport = HttpTransport::new(None);
        transport.set_request_header("SOAPAction", "a");
        transport.set_request_header("soapaction", "b");
        assert_eq!(
            transport.request_headers,
            vec![("soapaction".to_string(), "b".to_string())]
        );
    }

    #[test]
    fn status_before_completion_is_pending() {
        let transport = HttpTransport::new(None);
        assert!(matches!(transport.status(), Err(TransportError::Pending)));
    }

    #[test]
    fn connection_failure_makes_status_unreadable() {
        // port 9 (discard) non ouvert: échec de connexion, pas de statut
        let mut transport = HttpTransport::new(Some(Duration::from_millis(200)));
        transport
            .open("GET", "http://127.0.0.1:9/unreachable", false)
            .unwrap();
        transport.send(None).unwrap();
        assert_eq!(transport.ready_state(), ReadyState::Done);
        assert!(matches!(
            transport.status(),
            Err(TransportError::Connection(_))
        ));
    }
}
