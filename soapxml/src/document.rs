//! Modèle de document XML en arène
//!
//! Les réponses SOAP arrivent parfois de parseurs qui ignorent les namespaces:
//! ce modèle ne résout donc *aucun* namespace au parsing. Les déclarations
//! `xmlns`/`xmlns:p` restent des attributs ordinaires et les runs de texte
//! restent fragmentés tels que le parseur les émet. La résolution se fait
//! après coup via [`crate::namespace`].
//!
//! Les nœuds sont identifiés par des [`NodeId`] opaques; l'arbre est en
//! lecture seule pour les consommateurs (le parent est une back-référence,
//! jamais un droit de mutation).

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::errors::XmlError;

/// Handle opaque vers un nœud d'un [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Genre de nœud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Racine du document (base de la récursion des résolveurs).
    Document,
    Element,
    /// Texte ou CDATA (porteur de valeur).
    Text,
    /// Commentaire, processing instruction, etc.
    Other,
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    /// Nom qualifié (avec préfixe éventuel) pour les éléments, vide sinon.
    name: String,
    /// Local name fourni par un constructeur namespace-aware, si disponible.
    local_name: Option<String>,
    /// Valeur des nœuds texte/CDATA/commentaire.
    value: Option<String>,
    /// Attributs dans l'ordre du document, déclarations xmlns comprises.
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            name: String::new(),
            local_name: None,
            value: None,
            attributes: Vec::new(),
            parent,
            children: Vec::new(),
        }
    }
}

/// Arbre XML possédé, accessible uniquement en lecture via [`NodeId`].
#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Document vide, réduit à son nœud racine.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document, None)],
        }
    }

    /// Parse un document sans résolution de namespaces.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut document = Self::new();
        let mut reader = Reader::from_str(xml);
        let mut stack = vec![document.root()];

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let parent = *stack.last().unwrap_or(&document.root());
                    let id = document.push_element(parent, &e)?;
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let parent = *stack.last().unwrap_or(&document.root());
                    document.push_element(parent, &e)?;
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(e) => {
                    let text = e
                        .decode()
                        .map_err(quick_xml::Error::Encoding)?
                        .into_owned();
                    if !text.is_empty() {
                        let parent = *stack.last().unwrap_or(&document.root());
                        document.push_value(parent, NodeKind::Text, text);
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    let parent = *stack.last().unwrap_or(&document.root());
                    document.push_value(parent, NodeKind::Text, text);
                }
                // les références d'entités arrivent en événements séparés et
                // fragmentent donc les runs de texte, comme certains hôtes
                Event::GeneralRef(e) => {
                    let name = String::from_utf8_lossy(&e).into_owned();
                    let parent = *stack.last().unwrap_or(&document.root());
                    document.push_value(parent, NodeKind::Text, resolve_general_ref(&name));
                }
                Event::Comment(e) => {
                    let value = String::from_utf8_lossy(&e).into_owned();
                    let parent = *stack.last().unwrap_or(&document.root());
                    document.push_value(parent, NodeKind::Other, value);
                }
                Event::PI(e) => {
                    let value = String::from_utf8_lossy(&e).into_owned();
                    let parent = *stack.last().unwrap_or(&document.root());
                    document.push_value(parent, NodeKind::Other, value);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(document)
    }

    fn push_element(
        &mut self,
        parent: NodeId,
        start: &quick_xml::events::BytesStart<'_>,
    ) -> Result<NodeId, XmlError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let id = self.append_node(parent, NodeKind::Element);
        self.nodes[id.0].name = name;
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = String::from_utf8_lossy(&attribute.value).into_owned();
            self.nodes[id.0].attributes.push((key, value));
        }
        Ok(id)
    }

    fn push_value(&mut self, parent: NodeId, kind: NodeKind, value: String) -> NodeId {
        let id = self.append_node(parent, kind);
        self.nodes[id.0].value = Some(value);
        id
    }

    fn append_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn get(&self, id: NodeId) -> Result<&NodeData, XmlError> {
        self.nodes.get(id.0).ok_or(XmlError::UnknownNode(id.0))
    }

    /// Nœud racine (genre [`NodeKind::Document`]).
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind, XmlError> {
        Ok(self.get(id)?.kind)
    }

    /// Nom qualifié de l'élément, préfixe compris.
    pub fn name(&self, id: NodeId) -> Result<&str, XmlError> {
        Ok(self.get(id)?.name.as_str())
    }

    /// Local name stocké par un constructeur namespace-aware, s'il existe.
    /// Les documents issus de [`Document::parse`] n'en ont jamais.
    pub fn local_name(&self, id: NodeId) -> Result<Option<&str>, XmlError> {
        Ok(self.get(id)?.local_name.as_deref())
    }

    pub fn value(&self, id: NodeId) -> Result<Option<&str>, XmlError> {
        Ok(self.get(id)?.value.as_deref())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, XmlError> {
        Ok(self.get(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], XmlError> {
        Ok(self.get(id)?.children.as_slice())
    }

    /// Attributs dans l'ordre du document, déclarations xmlns comprises.
    pub fn attributes(&self, id: NodeId) -> Result<&[(String, String)], XmlError> {
        Ok(self.get(id)?.attributes.as_slice())
    }

    /// Valeur de l'attribut portant exactement ce nom qualifié.
    pub fn attribute(&self, id: NodeId, name: &str) -> Result<Option<&str>, XmlError> {
        Ok(self
            .get(id)?
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str()))
    }

    pub fn first_child(&self, id: NodeId) -> Result<Option<NodeId>, XmlError> {
        Ok(self.get(id)?.children.first().copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Result<Option<NodeId>, XmlError> {
        let Some(parent) = self.get(id)?.parent else {
            return Ok(None);
        };
        let siblings = &self.get(parent)?.children;
        let position = siblings.iter().position(|&child| child == id);
        Ok(position.and_then(|index| siblings.get(index + 1)).copied())
    }

    // --- construction manuelle (hôtes et tests) ---

    /// Ajoute un élément en fin de liste des enfants de `parent`.
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> Result<NodeId, XmlError> {
        self.get(parent)?;
        let id = self.append_node(parent, NodeKind::Element);
        self.nodes[id.0].name = name.to_string();
        Ok(id)
    }

    /// Ajoute un nœud texte.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, XmlError> {
        self.get(parent)?;
        Ok(self.push_value(parent, NodeKind::Text, text.to_string()))
    }

    /// Ajoute un nœud non-élément non-texte (commentaire, PI).
    pub fn append_other(&mut self, parent: NodeId, value: &str) -> Result<NodeId, XmlError> {
        self.get(parent)?;
        Ok(self.push_value(parent, NodeKind::Other, value.to_string()))
    }

    /// Pose ou remplace un attribut, en préservant l'ordre d'insertion.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), XmlError> {
        self.get(id)?;
        let attributes = &mut self.nodes[id.0].attributes;
        if let Some(slot) = attributes.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value.to_string();
        } else {
            attributes.push((name.to_string(), value.to_string()));
        }
        Ok(())
    }

    /// Renseigne le local name dédié (constructeurs namespace-aware).
    pub fn set_local_name(&mut self, id: NodeId, local_name: &str) -> Result<(), XmlError> {
        self.get(id)?;
        self.nodes[id.0].local_name = Some(local_name.to_string());
        Ok(())
    }
}

/// Résout une référence d'entité générale (`&name;`) en texte.
///
/// Les cinq entités prédéfinies et les références de caractères sont
/// résolues; une entité inconnue est conservée sous sa forme source.
fn resolve_general_ref(name: &str) -> String {
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                None
            };
            match code.and_then(char::from_u32) {
                Some(c) => c.to_string(),
                None => format!("&{name};"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_builds_tree_with_parents() {
        let doc = Document::parse(
            r#"<a:root xmlns:a="urn:a"><child attr="1">text</child></a:root>"#,
        )
        .unwrap();

        let root = doc.root();
        assert_eq!(doc.kind(root).unwrap(), NodeKind::Document);

        let elem = doc.first_child(root).unwrap().unwrap();
        assert_eq!(doc.name(elem).unwrap(), "a:root");
        assert_eq!(
            doc.attributes(elem).unwrap(),
            &[("xmlns:a".to_string(), "urn:a".to_string())]
        );

        let child = doc.first_child(elem).unwrap().unwrap();
        assert_eq!(doc.name(child).unwrap(), "child");
        assert_eq!(doc.attribute(child, "attr").unwrap(), Some("1"));
        assert_eq!(doc.parent(child).unwrap(), Some(elem));

        let text = doc.first_child(child).unwrap().unwrap();
        assert_eq!(doc.kind(text).unwrap(), NodeKind::Text);
        assert_eq!(doc.value(text).unwrap(), Some("text"));
    }

    #[test]
    fn parse_keeps_text_fragments_separate() {
        let doc = Document::parse("<e>abc<![CDATA[def]]>ghi</e>").unwrap();
        let elem = doc.first_child(doc.root()).unwrap().unwrap();
        let children = doc.children(elem).unwrap();
        assert_eq!(children.len(), 3);
        for &child in children {
            assert_eq!(doc.kind(child).unwrap(), NodeKind::Text);
        }
    }

    #[test]
    fn entity_references_become_text_fragments() {
        let doc = Document::parse("<e>a&amp;b&#65;</e>").unwrap();
        let elem = doc.first_child(doc.root()).unwrap().unwrap();
        let pieces: Vec<_> = doc
            .children(elem)
            .unwrap()
            .iter()
            .map(|&c| doc.value(c).unwrap().unwrap_or("").to_string())
            .collect();
        assert_eq!(pieces.concat(), "a&bA");
        assert!(pieces.len() > 1);
    }

    #[test]
    fn next_sibling_walks_in_document_order() {
        let doc = Document::parse("<e><x/><y/><z/></e>").unwrap();
        let elem = doc.first_child(doc.root()).unwrap().unwrap();
        let x = doc.first_child(elem).unwrap().unwrap();
        let y = doc.next_sibling(x).unwrap().unwrap();
        let z = doc.next_sibling(y).unwrap().unwrap();
        assert_eq!(doc.name(y).unwrap(), "y");
        assert_eq!(doc.name(z).unwrap(), "z");
        assert_eq!(doc.next_sibling(z).unwrap(), None);
    }

    #[test]
    fn stale_handle_is_rejected() {
        let doc = Document::parse("<e/>").unwrap();
        let other = Document::parse("<f><g/><h/><i/></f>").unwrap();
        let deep = other.children(other.first_child(other.root()).unwrap().unwrap()).unwrap()[2];
        assert!(matches!(doc.kind(deep), Err(XmlError::UnknownNode(_))));
    }

    #[test]
    fn set_attribute_replaces_in_place() {
        let mut doc = Document::new();
        let elem = doc.append_element(doc.root(), "e").unwrap();
        doc.set_attribute(elem, "a", "1").unwrap();
        doc.set_attribute(elem, "b", "2").unwrap();
        doc.set_attribute(elem, "a", "3").unwrap();
        assert_eq!(
            doc.attributes(elem).unwrap(),
            &[
                ("a".to_string(), "3".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }
}
