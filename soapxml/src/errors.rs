use thiserror::Error;

/// Erreurs du modèle de document et des résolveurs.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Un `NodeId` périmé ou venant d'un autre document a été passé à un
    /// accesseur qui exige un nœud valide.
    #[error("node handle {0} does not belong to this document")]
    UnknownNode(usize),

    #[error("a listed wildcard requires at least one namespace entry")]
    EmptyNamespaceList,
}
