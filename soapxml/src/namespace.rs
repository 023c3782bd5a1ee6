//! Résolution de namespaces par remontée d'ancêtres
//!
//! Certains hôtes parsent sans aucune conscience des namespaces: les
//! déclarations `xmlns` restent alors de simples attributs. Ce résolveur
//! reconstruit le binding visible depuis un nœud en scannant ses attributs
//! puis ceux de ses ancêtres, et doit être utilisé même quand l'hôte expose
//! un champ namespace natif, pour un comportement uniforme.
//!
//! Aucune mise en cache: l'arbre peut muter entre deux appels et le volume
//! d'appels reste faible.

use crate::document::{Document, NodeId, NodeKind};
use crate::errors::XmlError;
use crate::helpers::{qualified_local, qualified_prefix};

/// Namespace XML Schema instance (attributs `xsi:nil`, `xsi:type`).
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Résout `prefix` depuis `node` en remontant vers la racine.
///
/// - `prefix == None` cherche la déclaration par défaut (attribut `xmlns`).
/// - `prefix == Some(p)` cherche `xmlns:p`.
///
/// Le nœud document est la base de la récursion et rend `None`; un nœud sans
/// binding local délègue à son parent, donc la résolution depuis un enfant
/// sans déclaration équivaut à la résolution depuis son parent.
pub fn resolve_namespace_uri(
    doc: &Document,
    node: NodeId,
    prefix: Option<&str>,
) -> Result<Option<String>, XmlError> {
    if doc.kind(node)? == NodeKind::Document {
        return Ok(None);
    }
    if let Some(uri) = find_declaration(doc, node, prefix)? {
        return Ok(Some(uri));
    }
    match doc.parent(node)? {
        Some(parent) => resolve_namespace_uri(doc, parent, prefix),
        None => Ok(None),
    }
}

/// Scanne les attributs propres de `node` pour un binding de `prefix`.
fn find_declaration(
    doc: &Document,
    node: NodeId,
    prefix: Option<&str>,
) -> Result<Option<String>, XmlError> {
    for (name, value) in doc.attributes(node)? {
        let attribute_prefix = qualified_prefix(name);
        let attribute_local = qualified_local(name);
        let bound = match prefix {
            None => attribute_prefix.is_none() && attribute_local == "xmlns",
            Some(p) => attribute_prefix == Some("xmlns") && attribute_local == p,
        };
        if bound {
            return Ok(Some(value.clone()));
        }
    }
    Ok(None)
}

/// Namespace de l'élément lui-même: son préfixe (partie avant le premier
/// `:` du nom qualifié, ou la déclaration par défaut sinon) est résolu par
/// [`resolve_namespace_uri`].
pub fn element_namespace_uri(doc: &Document, node: NodeId) -> Result<Option<String>, XmlError> {
    let prefix = qualified_prefix(doc.name(node)?);
    resolve_namespace_uri(doc, node, prefix)
}
