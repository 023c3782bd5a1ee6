use std::fmt;

use soapxml::XmlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Aucun handle de transport n'a pu être construit (échec de setup,
    /// levé de façon synchrone, jamais via le protocole de callbacks).
    #[error("no transport handle could be constructed: {0}")]
    Unavailable(String),

    #[error("transport used before open()")]
    NotOpen,

    /// Une requête est déjà en vol et la politique est `Reject`.
    #[error("a request is already in flight on this client")]
    RequestInFlight,

    /// La connexion a échoué avant qu'un statut HTTP ne soit disponible:
    /// lire le statut est lui-même une erreur.
    #[error("connection failed before any HTTP status was available: {0}")]
    Connection(String),

    #[error("HTTP transport error: {0}")]
    Http(String),

    /// Accès au résultat avant l'état terminal.
    #[error("response is not available yet")]
    Pending,

    #[error("response is not well-formed XML: {0}")]
    Xml(#[from] XmlError),
}

/// Diagnostic remis à `on_error` pour un statut HTTP hors succès: de quoi
/// décider d'un retry côté appelant, cette couche ne retentant jamais.
#[derive(Debug)]
pub struct ResponseDiagnostic {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl fmt::Display for ResponseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} {}", self.status, self.status_text)
    }
}

/// Issue d'échec d'un échange, remise à `on_error` (exactement une des deux
/// issues possibles par requête complétée).
#[derive(Debug, Error)]
pub enum ExchangeFailure {
    /// Échec au niveau transport: statut illisible, corps illisible,
    /// réponse non parsable.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Le serveur a répondu avec un statut hors {200, 0}.
    #[error("application failure: {0}")]
    Application(ResponseDiagnostic),
}
