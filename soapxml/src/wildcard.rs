//! Contraintes de namespace des wildcards `xs:any`
//!
//! Un wildcard de schéma restreint les namespaces admis pour un élément d'un
//! slot `xs:any`. Les quatre styles (`##any`, `##other`, `##local`, liste
//! explicite) deviennent un enum fermé; seule la liste LISTED conserve le
//! token littéral `"##local"` parmi ses entrées.

use crate::errors::XmlError;

/// Entrée littérale admise dans la liste d'un wildcard LISTED.
pub const LOCAL_ENTRY: &str = "##local";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardStyle {
    /// Tout namespace convient.
    Any,
    /// Tout sauf le target namespace du schéma.
    Other,
    /// Uniquement les éléments sans namespace.
    Local,
    /// Liste ordonnée de namespaces admis.
    Listed,
}

/// Contrainte de namespace d'une occurrence de wildcard, construite une fois
/// par occurrence dans le schéma et jamais mutée.
#[derive(Debug, Clone)]
pub struct NamespaceWildcard {
    style: WildcardStyle,
    target_namespace: Option<String>,
    namespaces: Vec<String>,
    next_local_part: Option<String>,
}

impl NamespaceWildcard {
    pub fn any() -> Self {
        Self {
            style: WildcardStyle::Any,
            target_namespace: None,
            namespaces: Vec::new(),
            next_local_part: None,
        }
    }

    pub fn other(target_namespace: impl Into<String>) -> Self {
        Self {
            style: WildcardStyle::Other,
            target_namespace: Some(target_namespace.into()),
            namespaces: Vec::new(),
            next_local_part: None,
        }
    }

    pub fn local() -> Self {
        Self {
            style: WildcardStyle::Local,
            target_namespace: None,
            namespaces: Vec::new(),
            next_local_part: None,
        }
    }

    /// Wildcard à liste explicite. `next_local_part` est le local name de
    /// l'élément qui termine le run du wildcard dans le content model: une
    /// entrée `"##local"` ne doit pas l'avaler.
    pub fn listed(
        namespaces: Vec<String>,
        next_local_part: Option<String>,
    ) -> Result<Self, XmlError> {
        if namespaces.is_empty() {
            return Err(XmlError::EmptyNamespaceList);
        }
        Ok(Self {
            style: WildcardStyle::Listed,
            target_namespace: None,
            namespaces,
            next_local_part,
        })
    }

    pub fn style(&self) -> WildcardStyle {
        self.style
    }

    /// L'élément `(namespace_uri, local_name)` satisfait-il la contrainte?
    ///
    /// Namespace absent et namespace vide sont équivalents. La liste LISTED
    /// est scannée dans l'ordre, premier match gagnant: ce n'est pas une
    /// union d'ensembles à cause de l'exclusion `next_local_part` des
    /// entrées `"##local"`.
    pub fn matches(&self, namespace_uri: Option<&str>, local_name: &str) -> bool {
        let absent = namespace_uri.map_or(true, str::is_empty);
        match self.style {
            WildcardStyle::Any => true,
            WildcardStyle::Other => namespace_uri != self.target_namespace.as_deref(),
            WildcardStyle::Local => absent,
            WildcardStyle::Listed => {
                for entry in &self.namespaces {
                    if entry == LOCAL_ENTRY {
                        if absent
                            && self
                                .next_local_part
                                .as_deref()
                                .is_some_and(|next| local_name != next)
                        {
                            return true;
                        }
                    } else if Some(entry.as_str()) == namespace_uri {
                        return true;
                    }
                }
                false
            }
        }
    }
}
