//! Helpers de structure et de texte
//!
//! Petites fonctions pures sur `(&Document, NodeId)` utilisées par les
//! résolveurs et par le code (dé)sérialiseur généré: split préfixe/local,
//! traversée en sautant les nœuds non-élément, concaténation des fragments
//! de texte (certains hôtes découpent les longs runs en plusieurs nœuds),
//! détection de `xsi:nil`.

use crate::document::{Document, NodeId, NodeKind};
use crate::errors::XmlError;
use crate::namespace::{XSI_NAMESPACE, element_namespace_uri, resolve_namespace_uri};

/// Partie avant le premier `:` d'un nom qualifié, `None` sans préfixe.
pub fn qualified_prefix(name: &str) -> Option<&str> {
    name.find(':').map(|index| &name[..index])
}

/// Partie après le premier `:` d'un nom qualifié, le nom entier sinon.
pub fn qualified_local(name: &str) -> &str {
    match name.find(':') {
        Some(index) => &name[index + 1..],
        None => name,
    }
}

/// Local name d'un nœud: le champ dédié de l'hôte quand il existe, sinon
/// la partie locale du nom qualifié.
pub fn node_local_name(doc: &Document, node: NodeId) -> Result<&str, XmlError> {
    if let Some(local) = doc.local_name(node)? {
        return Ok(local);
    }
    Ok(qualified_local(doc.name(node)?))
}

/// Premier enfant élément, en sautant textes, commentaires et PI.
pub fn first_element_child(doc: &Document, node: NodeId) -> Result<Option<NodeId>, XmlError> {
    let mut next = doc.first_child(node)?;
    while let Some(id) = next {
        if doc.kind(id)? == NodeKind::Element {
            return Ok(Some(id));
        }
        next = doc.next_sibling(id)?;
    }
    Ok(None)
}

/// Frère élément suivant, `None` quand aucun ne qualifie.
pub fn next_element_sibling(doc: &Document, node: NodeId) -> Result<Option<NodeId>, XmlError> {
    let mut next = doc.next_sibling(node)?;
    while let Some(id) = next {
        if doc.kind(id)? == NodeKind::Element {
            return Ok(Some(id));
        }
        next = doc.next_sibling(id)?;
    }
    Ok(None)
}

/// Concatène, dans l'ordre du document, les valeurs des enfants directs
/// porteurs de texte. Les hôtes fragmentent parfois un long run de texte en
/// plusieurs nœuds consécutifs.
pub fn node_text(doc: &Document, node: NodeId) -> Result<String, XmlError> {
    let mut text = String::new();
    for &child in doc.children(node)? {
        if doc.kind(child)? == NodeKind::Text {
            if let Some(value) = doc.value(child)? {
                text.push_str(value);
            }
        }
    }
    Ok(text)
}

/// L'élément porte-t-il `xsi:nil="true"`?
///
/// Recherche d'abord un attribut de local name `nil` dont le préfixe se
/// résout vers le namespace schema-instance. Le repli sur l'attribut
/// littéral `xsi:nil` ne joue que si le préfixe conventionnel `xsi` n'est
/// lié nulle part: un `xsi` lié à un autre namespace n'est pas un nil.
pub fn is_element_nil(doc: &Document, node: NodeId) -> Result<bool, XmlError> {
    for (name, value) in doc.attributes(node)? {
        if qualified_local(name) != "nil" {
            continue;
        }
        if let Some(prefix) = qualified_prefix(name) {
            if let Some(uri) = resolve_namespace_uri(doc, node, Some(prefix))? {
                if uri == XSI_NAMESPACE {
                    return Ok(value == "true");
                }
            }
        }
    }
    if resolve_namespace_uri(doc, node, Some("xsi"))?.is_some() {
        return Ok(false);
    }
    Ok(matches!(doc.attribute(node, "xsi:nil")?, Some("true")))
}

/// Teste nom qualifié complet (namespace + local name) d'un élément.
/// Namespace absent et namespace vide sont équivalents.
pub fn is_node_named(
    doc: &Document,
    node: NodeId,
    namespace_uri: Option<&str>,
    local_name: &str,
) -> Result<bool, XmlError> {
    let node_namespace = element_namespace_uri(doc, node)?;
    let wanted_absent = namespace_uri.map_or(true, str::is_empty);
    let node_absent = node_namespace.as_deref().map_or(true, str::is_empty);
    if wanted_absent {
        Ok(node_absent && node_local_name(doc, node)? == local_name)
    } else {
        Ok(node_namespace.as_deref() == namespace_uri
            && node_local_name(doc, node)? == local_name)
    }
}

/// Forme `{namespace}local` pour les logs. Infaillible: un handle inconnu
/// donne un marqueur plutôt qu'une erreur.
pub fn display_name(doc: &Document, node: NodeId) -> String {
    let Ok(local) = node_local_name(doc, node) else {
        return "<unknown node>".to_string();
    };
    match element_namespace_uri(doc, node) {
        Ok(Some(uri)) if !uri.is_empty() => format!("{{{}}}{}", uri, local),
        _ => local.to_string(),
    }
}
