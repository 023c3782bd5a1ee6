//! SOAP request/response driver.
//!
//! One `TransportClient` per operation binding, reusable across calls. Each
//! call acquires a fresh transport handle from the injected factory (with an
//! optional fallback construction path), fires the exchange and delivers the
//! outcome through the registered `on_success`/`on_error` handlers: exactly
//! one of the two, exactly once per completed request, only after the
//! terminal ready state. The single exception is the setup failure (no
//! handle could be constructed), which is raised synchronously and bypasses
//! the handler protocol entirely, as does any error the transport raises
//! synchronously during send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use soapxml::Document;
use tracing::{debug, trace, warn};

use crate::errors::{ExchangeFailure, ResponseDiagnostic, TransportError};
use crate::transport::{ReadyState, Transport, TransportFactory};

pub type SuccessHandler = Box<dyn FnMut(Document) + Send>;
pub type ErrorHandler = Box<dyn FnMut(ExchangeFailure) + Send>;

#[derive(Default)]
struct Handlers {
    on_success: Option<SuccessHandler>,
    on_error: Option<ErrorHandler>,
}

/// Que faire d'une nouvelle requête quand une autre est déjà en vol sur ce
/// client. L'instance ne gère qu'un handle à la fois: les appelants doivent
/// sérialiser leurs appels ou utiliser une instance par appel en vol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InFlightPolicy {
    /// Refuser la nouvelle requête avec [`TransportError::RequestInFlight`].
    #[default]
    Reject,
    /// Détacher l'échange en cours sans l'annuler et le remplacer. Les
    /// callbacks de l'ancien échange peuvent encore se déclencher.
    Replace,
}

/// Configuration d'un binding d'opération.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Valeur du header `SOAPAction`, figée pour ce binding.
    pub soap_action: String,
    /// Valeur du header `MessageType`, figée pour ce binding.
    pub message_type: String,
    pub in_flight: InFlightPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            soap_action: String::new(),
            message_type: "CALL".to_string(),
            in_flight: InFlightPolicy::default(),
        }
    }
}

/// Descripteur d'une requête, construit à chaque appel.
#[derive(Debug, Clone, Default)]
pub struct SoapRequest {
    pub url: String,
    /// Enveloppe SOAP sérialisée. L'appelant ne doit pas combiner `GET`
    /// explicite et body: ce n'est pas validé ici.
    pub body: Option<String>,
    /// Méthode HTTP explicite; sinon POST avec body, GET sans.
    pub method: Option<String>,
    /// En mode synchrone, `request` ne rend la main qu'après la livraison
    /// de l'issue (le protocole de handlers s'applique quand même).
    pub synchronous: bool,
    /// Headers additionnels. `SOAPAction` et `MessageType` sont posés en
    /// dernier et gagnent en cas de collision de nom.
    pub headers: Vec<(String, String)>,
}

struct PendingExchange {
    done: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

pub struct TransportClient {
    config: ClientConfig,
    factory: Box<dyn TransportFactory>,
    fallback: Option<Box<dyn TransportFactory>>,
    handlers: Arc<Mutex<Handlers>>,
    pending: Option<PendingExchange>,
}

impl TransportClient {
    pub fn new(config: ClientConfig, factory: Box<dyn TransportFactory>) -> Self {
        Self {
            config,
            factory,
            fallback: None,
            handlers: Arc::new(Mutex::new(Handlers::default())),
            pending: None,
        }
    }

    /// Chemin de construction de repli, tenté quand la factory principale
    /// échoue.
    pub fn with_fallback(mut self, fallback: Box<dyn TransportFactory>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Slot `on_success`. Persiste d'un appel à l'autre (pas de remise à
    /// zéro automatique); reçoit le corps de réponse parsé. Un mutex
    /// empoisonné par un handler paniqué est récupéré: l'enregistrement
    /// n'est jamais perdu.
    pub fn on_success(&mut self, handler: impl FnMut(Document) + Send + 'static) {
        let mut guard = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        guard.on_success = Some(Box::new(handler));
    }

    /// Slot `on_error`. À enregistrer avant toute requête dont l'échec
    /// importe: sans handler, l'échec n'est que loggé.
    pub fn on_error(&mut self, handler: impl FnMut(ExchangeFailure) + Send + 'static) {
        let mut guard = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        guard.on_error = Some(Box::new(handler));
    }

    /// Une requête asynchrone est-elle encore en vol sur ce client?
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.done.load(Ordering::SeqCst))
    }

    /// Attend la fin de l'échange asynchrone en cours, s'il y en a un.
    pub fn wait(&mut self) {
        if let Some(mut pending) = self.pending.take() {
            if let Some(worker) = pending.worker.take() {
                let _ = worker.join();
            }
        }
    }

    /// Lance l'échange décrit par `request`.
    ///
    /// En mode asynchrone, rend la main immédiatement: toutes les issues de
    /// l'échange lui-même arrivent plus tard via les handlers. Seules les
    /// erreurs de setup (aucun transport constructible, erreur synchrone du
    /// transport pendant l'envoi) remontent ici, et elles ne passent jamais
    /// par `on_error`.
    pub fn request(&mut self, request: SoapRequest) -> Result<(), TransportError> {
        let method = resolve_method(&request);
        debug!("request {} {}", method, request.url);

        if self.is_pending() {
            match self.config.in_flight {
                InFlightPolicy::Reject => return Err(TransportError::RequestInFlight),
                InFlightPolicy::Replace => {
                    warn!(
                        "replacing in-flight request to {} without cancelling it",
                        request.url
                    );
                }
            }
        }
        self.pending = None;

        let mut transport = self.create_transport()?;

        transport.open(&method, &request.url, !request.synchronous)?;

        transport.set_request_header("Content-Type", "application/xml");
        for (name, value) in &request.headers {
            transport.set_request_header(name, value);
        }
        // posés en dernier: gagnent sur les headers de l'appelant
        transport.set_request_header("SOAPAction", &self.config.soap_action);
        transport.set_request_header("MessageType", &self.config.message_type);

        let events = transport.state_events();

        transport.send(request.body.as_deref())?;

        if request.synchronous {
            run_completion(transport.as_ref(), &events, &self.handlers);
        } else {
            let handlers = Arc::clone(&self.handlers);
            let done = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&done);
            let worker = thread::Builder::new()
                .name("soapwire-dispatch".to_string())
                .spawn(move || {
                    run_completion(transport.as_ref(), &events, &handlers);
                    flag.store(true, Ordering::SeqCst);
                })
                .map_err(|err| {
                    TransportError::Http(format!("failed to spawn dispatch thread: {err}"))
                })?;
            self.pending = Some(PendingExchange {
                done,
                worker: Some(worker),
            });
        }
        Ok(())
    }

    fn create_transport(&self) -> Result<Box<dyn Transport>, TransportError> {
        match self.factory.create() {
            Ok(transport) => Ok(transport),
            Err(primary) => {
                debug!("primary transport construction failed: {primary}");
                match &self.fallback {
                    Some(fallback) => fallback.create().map_err(|err| {
                        TransportError::Unavailable(format!(
                            "primary: {primary}; fallback: {err}"
                        ))
                    }),
                    None => Err(TransportError::Unavailable(primary.to_string())),
                }
            }
        }
    }
}

fn resolve_method(request: &SoapRequest) -> String {
    match &request.method {
        Some(method) => method.clone(),
        None if request.body.is_some() => "POST".to_string(),
        None => "GET".to_string(),
    }
}

/// Consomme les transitions d'état jusqu'à l'état terminal, puis classe et
/// livre l'issue. Les transitions intermédiaires sont observées, pas agies.
fn run_completion(
    transport: &dyn Transport,
    events: &crossbeam_channel::Receiver<ReadyState>,
    handlers: &Mutex<Handlers>,
) {
    while let Ok(state) = events.recv() {
        trace!("ready state {:?}", state);
        if state == ReadyState::Done {
            dispatch(transport, handlers);
            return;
        }
    }
    // canal fermé sans état terminal: transport abandonné, rien à livrer
}

/// Classification à l'état terminal. Lire le statut est défensif: pour une
/// pure erreur de connexion il n'y a pas de réponse HTTP et la lecture
/// échoue elle-même, ce qui part en `on_error` avec la condition attrapée.
/// Statut 200 ou 0 (pas de vraie couche HTTP, accès local) => succès; tout
/// autre statut => diagnostic complet en erreur.
fn dispatch(transport: &dyn Transport, handlers: &Mutex<Handlers>) {
    let failure = match transport.status() {
        Err(err) => Some(ExchangeFailure::Transport(err)),
        Ok(status) if status == 200 || status == 0 => match transport.response_document() {
            Ok(document) => {
                debug!("request completed with status {status}");
                fire_success(handlers, document);
                None
            }
            Err(err) => Some(ExchangeFailure::Transport(err)),
        },
        Ok(status) => Some(ExchangeFailure::Application(ResponseDiagnostic {
            status,
            status_text: transport.status_text(),
            headers: transport.response_headers(),
            body: transport.response_text(),
        })),
    };

    if let Some(failure) = failure {
        fire_error(handlers, failure);
    }
}

fn fire_success(handlers: &Mutex<Handlers>, document: Document) {
    let mut guard = handlers.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.on_success.as_mut() {
        Some(handler) => handler(document),
        None => debug!("request succeeded with no success handler registered"),
    }
}

fn fire_error(handlers: &Mutex<Handlers>, failure: ExchangeFailure) {
    let mut guard = handlers.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.on_error.as_mut() {
        Some(handler) => handler(failure),
        None => warn!("request failed with no error handler registered: {failure}"),
    }
}
