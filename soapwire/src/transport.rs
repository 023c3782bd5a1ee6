//! Transport capability consumed by the client.
//!
//! The client never talks HTTP itself: it drives an injected handle through
//! this trait (open / headers / send / completion / response accessors), so
//! the exchange can be backed by ureq in production and by a scripted mock
//! in tests. A handle is single-use: one `open` + `send` per instance,
//! factories build a fresh one per request.

use crossbeam_channel::Receiver;
use soapxml::Document;

use crate::errors::TransportError;

/// Phase du cycle de vie d'une requête asynchrone, `Done` étant terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Uninitialized = 0,
    Loading = 1,
    Loaded = 2,
    Interactive = 3,
    Done = 4,
}

pub trait Transport: Send {
    /// Prépare l'échange. Les erreurs (méthode inconnue, etc.) remontent de
    /// façon synchrone à l'appelant.
    fn open(&mut self, method: &str, url: &str, asynchronous: bool)
    -> Result<(), TransportError>;

    /// Pose un header de requête; un nom déjà posé est remplacé (le dernier
    /// appel gagne).
    fn set_request_header(&mut self, name: &str, value: &str);

    /// Démarre l'échange. En mode synchrone, bloque jusqu'à l'état terminal.
    /// Une erreur synchrone remonte à l'appelant, jamais via les callbacks.
    fn send(&mut self, body: Option<&str>) -> Result<(), TransportError>;

    /// Transitions d'état, `Done` en dernier. Le canal est à consommateur
    /// unique: un seul abonné par échange.
    fn state_events(&self) -> Receiver<ReadyState>;

    fn ready_state(&self) -> ReadyState;

    /// Statut HTTP de la réponse. Échoue pour les pures erreurs de connexion
    /// (aucune couche HTTP n'a répondu) — c'est le signal TransportFailure.
    fn status(&self) -> Result<u16, TransportError>;

    fn status_text(&self) -> String;

    fn response_headers(&self) -> Vec<(String, String)>;

    fn response_text(&self) -> String;

    /// Corps de réponse parsé en [`Document`].
    fn response_document(&self) -> Result<Document, TransportError>;
}

/// Construction d'un handle, un par requête. Peut échouer: le client tente
/// alors sa factory de repli avant d'abandonner.
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Transport>, TransportError>;
}
