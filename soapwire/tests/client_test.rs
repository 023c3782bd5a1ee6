//! Machine à états de complétion du client, pilotée par un transport scripté.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use soapwire::{
    ClientConfig, ExchangeFailure, InFlightPolicy, ReadyState, SoapRequest, Transport,
    TransportClient, TransportError, TransportFactory,
};
use soapxml::Document;

#[derive(Default)]
struct CallLog {
    opens: Vec<(String, String, bool)>,
    headers: Vec<(String, String)>,
    sent: Vec<Option<String>>,
}

struct MockTransport {
    status: Result<u16, String>,
    status_text: String,
    response_headers: Vec<(String, String)>,
    body: String,
    /// Quand vrai, `send` n'émet pas `Done`: le test le pousse lui-même.
    hold_completion: bool,
    /// Erreur synchrone rendue par `send` avant toute transition.
    send_error: Option<String>,
    state: ReadyState,
    log: Arc<Mutex<CallLog>>,
    events_tx: Sender<ReadyState>,
    events_rx: Receiver<ReadyState>,
}

impl MockTransport {
    fn new(status: Result<u16, String>, body: &str) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            status,
            status_text: "Mock".to_string(),
            response_headers: vec![("Content-Type".to_string(), "text/xml".to_string())],
            body: body.to_string(),
            hold_completion: false,
            send_error: None,
            state: ReadyState::Uninitialized,
            log: Arc::new(Mutex::new(CallLog::default())),
            events_tx,
            events_rx,
        }
    }

    fn held(mut self) -> Self {
        self.hold_completion = true;
        self
    }

    fn failing_send(mut self, message: &str) -> Self {
        self.send_error = Some(message.to_string());
        self
    }

    fn completion_sender(&self) -> Sender<ReadyState> {
        self.events_tx.clone()
    }

    fn call_log(&self) -> Arc<Mutex<CallLog>> {
        Arc::clone(&self.log)
    }
}

impl Transport for MockTransport {
    fn open(
        &mut self,
        method: &str,
        url: &str,
        asynchronous: bool,
    ) -> Result<(), TransportError> {
        self.log
            .lock()
            .unwrap()
            .opens
            .push((method.to_string(), url.to_string(), asynchronous));
        self.state = ReadyState::Loading;
        let _ = self.events_tx.send(ReadyState::Loading);
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.log
            .lock()
            .unwrap()
            .headers
            .push((name.to_string(), value.to_string()));
    }

    fn send(&mut self, body: Option<&str>) -> Result<(), TransportError> {
        if let Some(message) = &self.send_error {
            return Err(TransportError::Http(message.clone()));
        }
        self.log.lock().unwrap().sent.push(body.map(str::to_string));
        let _ = self.events_tx.send(ReadyState::Loaded);
        let _ = self.events_tx.send(ReadyState::Interactive);
        if !self.hold_completion {
            self.state = ReadyState::Done;
            let _ = self.events_tx.send(ReadyState::Done);
        }
        Ok(())
    }

    fn state_events(&self) -> Receiver<ReadyState> {
        self.events_rx.clone()
    }

    fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn status(&self) -> Result<u16, TransportError> {
        self.status
            .clone()
            .map_err(TransportError::Connection)
    }

    fn status_text(&self) -> String {
        self.status_text.clone()
    }

    fn response_headers(&self) -> Vec<(String, String)> {
        self.response_headers.clone()
    }

    fn response_text(&self) -> String {
        self.body.clone()
    }

    fn response_document(&self) -> Result<Document, TransportError> {
        Ok(Document::parse(&self.body)?)
    }
}

/// Factory rendant des transports scriptés préparés par le test.
struct QueueFactory {
    transports: Mutex<Vec<MockTransport>>,
}

impl QueueFactory {
    fn new(transports: Vec<MockTransport>) -> Self {
        Self {
            transports: Mutex::new(transports),
        }
    }
}

impl TransportFactory for QueueFactory {
    fn create(&self) -> Result<Box<dyn Transport>, TransportError> {
        self.transports
            .lock()
            .unwrap()
            .pop()
            .map(|transport| Box::new(transport) as Box<dyn Transport>)
            .ok_or_else(|| TransportError::Unavailable("no scripted transport left".to_string()))
    }
}

/// Factory qui échoue toujours (chemin de construction cassé).
struct BrokenFactory(&'static str);

impl TransportFactory for BrokenFactory {
    fn create(&self) -> Result<Box<dyn Transport>, TransportError> {
        Err(TransportError::Unavailable(self.0.to_string()))
    }
}

#[derive(Default)]
struct Recorded {
    successes: Vec<String>,
    failures: Vec<ExchangeFailure>,
}

fn recording_client(
    config: ClientConfig,
    factory: Box<dyn TransportFactory>,
) -> (TransportClient, Arc<Mutex<Recorded>>) {
    let mut client = TransportClient::new(config, factory);
    let recorded = attach_recorders(&mut client);
    (client, recorded)
}

fn attach_recorders(client: &mut TransportClient) -> Arc<Mutex<Recorded>> {
    let recorded = Arc::new(Mutex::new(Recorded::default()));

    let sink = Arc::clone(&recorded);
    client.on_success(move |doc| {
        let root = doc.first_child(doc.root()).unwrap().unwrap();
        sink.lock()
            .unwrap()
            .successes
            .push(doc.name(root).unwrap().to_string());
    });

    let sink = Arc::clone(&recorded);
    client.on_error(move |failure| {
        sink.lock().unwrap().failures.push(failure);
    });

    recorded
}

fn sync_request(url: &str) -> SoapRequest {
    SoapRequest {
        url: url.to_string(),
        body: Some("<soap-env:Envelope/>".to_string()),
        synchronous: true,
        ..SoapRequest::default()
    }
}

#[test]
fn status_200_delivers_parsed_body_to_on_success_exactly_once() {
    let transport = MockTransport::new(Ok(200), "<ok><value>42</value></ok>");
    let (mut client, recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![transport])),
    );

    client.request(sync_request("http://svc/op")).unwrap();

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.successes, vec!["ok".to_string()]);
    assert!(recorded.failures.is_empty());
}

#[test]
fn status_0_counts_as_success() {
    let transport = MockTransport::new(Ok(0), "<local/>");
    let (mut client, recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![transport])),
    );

    client.request(sync_request("file:///local")).unwrap();

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.successes, vec!["local".to_string()]);
    assert!(recorded.failures.is_empty());
}

#[test]
fn status_500_delivers_diagnostic_to_on_error_exactly_once() {
    let mut transport = MockTransport::new(Ok(500), "<soap-env:Fault/>");
    transport.status_text = "Internal Server Error".to_string();
    let (mut client, recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![transport])),
    );

    client.request(sync_request("http://svc/op")).unwrap();

    let recorded = recorded.lock().unwrap();
    assert!(recorded.successes.is_empty());
    assert_eq!(recorded.failures.len(), 1);
    match &recorded.failures[0] {
        ExchangeFailure::Application(diag) => {
            assert_eq!(diag.status, 500);
            assert_eq!(diag.status_text, "Internal Server Error");
            assert_eq!(diag.body, "<soap-env:Fault/>");
            assert!(!diag.headers.is_empty());
        }
        other => panic!("expected application failure, got {other:?}"),
    }
}

#[test]
fn unreadable_status_delivers_the_caught_condition() {
    let transport = MockTransport::new(Err("connection refused".to_string()), "");
    let (mut client, recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![transport])),
    );

    client.request(sync_request("http://down/op")).unwrap();

    let recorded = recorded.lock().unwrap();
    assert!(recorded.successes.is_empty());
    assert_eq!(recorded.failures.len(), 1);
    match &recorded.failures[0] {
        ExchangeFailure::Transport(TransportError::Connection(message)) => {
            assert_eq!(message, "connection refused");
        }
        other => panic!("expected connection failure, got {other:?}"),
    }
}

#[test]
fn success_status_with_unparseable_body_goes_to_on_error() {
    let transport = MockTransport::new(Ok(200), "not xml <<<");
    let (mut client, recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![transport])),
    );

    client.request(sync_request("http://svc/op")).unwrap();

    let recorded = recorded.lock().unwrap();
    assert!(recorded.successes.is_empty());
    assert_eq!(recorded.failures.len(), 1);
    assert!(matches!(
        recorded.failures[0],
        ExchangeFailure::Transport(TransportError::Xml(_))
    ));
}

#[test]
fn fixed_headers_are_applied_last_and_win_collisions() {
    let transport = MockTransport::new(Ok(200), "<ok/>");
    let log = transport.call_log();
    let config = ClientConfig {
        soap_action: "\"urn:svc#Op\"".to_string(),
        message_type: "CALL".to_string(),
        ..ClientConfig::default()
    };
    let (mut client, _recorded) =
        recording_client(config, Box::new(QueueFactory::new(vec![transport])));

    let mut request = sync_request("http://svc/op");
    request.headers = vec![
        ("X-Custom".to_string(), "yes".to_string()),
        ("SOAPAction".to_string(), "\"caller-supplied\"".to_string()),
    ];
    client.request(request).unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.headers[0], ("Content-Type".to_string(), "application/xml".to_string()));
    assert!(log.headers.contains(&("X-Custom".to_string(), "yes".to_string())));

    // la dernière pose de SOAPAction est celle du binding, après celle de
    // l'appelant
    let soap_actions: Vec<&str> = log
        .headers
        .iter()
        .filter(|(name, _)| name == "SOAPAction")
        .map(|(_, value)| value.as_str())
        .collect();
    assert_eq!(soap_actions, vec!["\"caller-supplied\"", "\"urn:svc#Op\""]);

    let last = log.headers.last().unwrap();
    assert_eq!(last, &("MessageType".to_string(), "CALL".to_string()));
}

#[test]
fn method_defaults_to_post_with_body_and_get_without() {
    let with_body = MockTransport::new(Ok(200), "<ok/>");
    let with_body_log = with_body.call_log();
    let without_body = MockTransport::new(Ok(200), "<ok/>");
    let without_body_log = without_body.call_log();

    // la queue rend les transports en ordre inverse
    let (mut client, _recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![without_body, with_body])),
    );

    client.request(sync_request("http://svc/op")).unwrap();
    client
        .request(SoapRequest {
            url: "http://svc/wsdl".to_string(),
            synchronous: true,
            ..SoapRequest::default()
        })
        .unwrap();

    assert_eq!(
        with_body_log.lock().unwrap().opens[0],
        ("POST".to_string(), "http://svc/op".to_string(), false)
    );
    assert_eq!(
        without_body_log.lock().unwrap().opens[0],
        ("GET".to_string(), "http://svc/wsdl".to_string(), false)
    );
}

#[test]
fn asynchronous_request_returns_immediately_then_delivers() {
    let transport = MockTransport::new(Ok(200), "<ok/>").held();
    let completion = transport.completion_sender();
    let (mut client, recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![transport])),
    );

    let mut request = sync_request("http://svc/op");
    request.synchronous = false;
    client.request(request).unwrap();

    assert!(client.is_pending());
    assert!(recorded.lock().unwrap().successes.is_empty());

    completion.send(ReadyState::Done).unwrap();
    client.wait();

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.successes, vec!["ok".to_string()]);
    assert!(recorded.failures.is_empty());
}

#[test]
fn reject_policy_refuses_a_second_request_in_flight() {
    let first = MockTransport::new(Ok(200), "<ok/>").held();
    let completion = first.completion_sender();
    let second = MockTransport::new(Ok(200), "<ok/>");
    let (mut client, _recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![second, first])),
    );

    let mut request = sync_request("http://svc/op");
    request.synchronous = false;
    client.request(request.clone()).unwrap();

    assert!(matches!(
        client.request(request),
        Err(TransportError::RequestInFlight)
    ));

    completion.send(ReadyState::Done).unwrap();
    client.wait();
}

#[test]
fn replace_policy_detaches_the_previous_exchange() {
    let first = MockTransport::new(Ok(200), "<first/>").held();
    let first_completion = first.completion_sender();
    let second = MockTransport::new(Ok(200), "<second/>").held();
    let second_completion = second.completion_sender();

    let config = ClientConfig {
        in_flight: InFlightPolicy::Replace,
        ..ClientConfig::default()
    };
    let mut client = TransportClient::new(
        config,
        Box::new(QueueFactory::new(vec![second, first])),
    );

    let (delivered_tx, delivered_rx) = unbounded();
    client.on_success(move |doc| {
        let root = doc.first_child(doc.root()).unwrap().unwrap();
        let _ = delivered_tx.send(doc.name(root).unwrap().to_string());
    });

    let mut request = sync_request("http://svc/op");
    request.synchronous = false;
    client.request(request.clone()).unwrap();
    client.request(request).unwrap();

    // l'échange remplacé n'est pas annulé: ses callbacks restent possibles
    first_completion.send(ReadyState::Done).unwrap();
    second_completion.send(ReadyState::Done).unwrap();

    let mut delivered = vec![
        delivered_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        delivered_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
    ];
    delivered.sort();
    assert_eq!(delivered, vec!["first".to_string(), "second".to_string()]);
}

#[test]
fn fallback_factory_is_consulted_when_the_primary_fails() {
    let transport = MockTransport::new(Ok(200), "<ok/>");
    let mut client = TransportClient::new(
        ClientConfig::default(),
        Box::new(BrokenFactory("primary down")),
    )
    .with_fallback(Box::new(QueueFactory::new(vec![transport])));
    let recorded = attach_recorders(&mut client);

    client.request(sync_request("http://svc/op")).unwrap();

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.successes, vec!["ok".to_string()]);
}

#[test]
fn synchronous_send_error_propagates_and_bypasses_handlers() {
    let transport = MockTransport::new(Ok(200), "<ok/>").failing_send("socket write failed");
    let (mut client, recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![transport])),
    );

    let result = client.request(sync_request("http://svc/op"));
    match result {
        Err(TransportError::Http(message)) => assert_eq!(message, "socket write failed"),
        other => panic!("expected the send error back, got {other:?}"),
    }

    let recorded = recorded.lock().unwrap();
    assert!(recorded.successes.is_empty());
    assert!(recorded.failures.is_empty());
}

#[test]
fn both_factories_failing_raise_unavailable_naming_both_causes() {
    let mut client = TransportClient::new(
        ClientConfig::default(),
        Box::new(BrokenFactory("primary down")),
    )
    .with_fallback(Box::new(BrokenFactory("fallback down")));
    let recorded = attach_recorders(&mut client);

    let error = client.request(sync_request("http://svc/op")).unwrap_err();
    match error {
        TransportError::Unavailable(message) => {
            assert!(message.contains("primary down"));
            assert!(message.contains("fallback down"));
        }
        other => panic!("expected unavailable, got {other:?}"),
    }

    let recorded = recorded.lock().unwrap();
    assert!(recorded.successes.is_empty());
    assert!(recorded.failures.is_empty());
}

#[test]
fn handler_registration_survives_a_panicked_handler() {
    let first = MockTransport::new(Ok(200), "<boom/>");
    let second = MockTransport::new(Ok(200), "<ok/>");
    let mut client = TransportClient::new(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![second, first])),
    );

    client.on_success(|_| panic!("handler blew up"));
    let mut request = sync_request("http://svc/op");
    request.synchronous = false;
    client.request(request).unwrap();
    // le thread de dispatch panique dans le handler et empoisonne le mutex
    client.wait();

    let (delivered_tx, delivered_rx) = unbounded();
    client.on_success(move |doc| {
        let root = doc.first_child(doc.root()).unwrap().unwrap();
        let _ = delivered_tx.send(doc.name(root).unwrap().to_string());
    });

    client.request(sync_request("http://svc/op")).unwrap();
    assert_eq!(
        delivered_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        "ok".to_string()
    );
}

#[test]
fn setup_failure_is_synchronous_and_bypasses_handlers() {
    let (mut client, recorded) = recording_client(
        ClientConfig::default(),
        Box::new(BrokenFactory("primary down")),
    );

    let result = client.request(sync_request("http://svc/op"));
    assert!(matches!(result, Err(TransportError::Unavailable(_))));

    let recorded = recorded.lock().unwrap();
    assert!(recorded.successes.is_empty());
    assert!(recorded.failures.is_empty());
}

#[test]
fn handlers_persist_across_requests() {
    let first = MockTransport::new(Ok(200), "<a/>");
    let second = MockTransport::new(Ok(200), "<b/>");
    let (mut client, recorded) = recording_client(
        ClientConfig::default(),
        Box::new(QueueFactory::new(vec![second, first])),
    );

    client.request(sync_request("http://svc/op")).unwrap();
    client.request(sync_request("http://svc/op")).unwrap();

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.successes, vec!["a".to_string(), "b".to_string()]);
}
