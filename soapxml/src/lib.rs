//! # soapxml - Adressage XML pour clients SOAP
//!
//! Couche d'adressage des clients web-service générés depuis WSDL: modèle de
//! document en lecture seule, résolution de namespaces par préfixe et
//! contraintes de wildcard `xs:any`.
//!
//! ## Fonctionnalités
//!
//! - Arbre XML en arène, parsé sans résolution de namespaces (`xmlns` reste
//!   un attribut ordinaire), avec back-références parent
//! - Résolution récursive de namespace par remontée d'ancêtres, même sur les
//!   documents issus de parseurs namespace-unaware
//! - Matching des contraintes `xs:any` (`##any`, `##other`, `##local`,
//!   liste explicite avec exclusion du terminateur)
//! - Helpers de traversée et de texte (fragments concaténés, `xsi:nil`)
//! - Porteurs `xs:any` (valeur typée / XML brut / XML brut typé)
//!
//! ## Example
//!
//! ```
//! use soapxml::{Document, NamespaceWildcard, element_namespace_uri};
//!
//! let doc = Document::parse(
//!     r#"<root xmlns:a="urn:a"><a:item/></root>"#,
//! ).unwrap();
//! let root = doc.first_child(doc.root()).unwrap().unwrap();
//! let item = doc.first_child(root).unwrap().unwrap();
//!
//! let ns = element_namespace_uri(&doc, item).unwrap();
//! assert_eq!(ns.as_deref(), Some("urn:a"));
//!
//! let wildcard = NamespaceWildcard::other("urn:tns");
//! assert!(wildcard.matches(ns.as_deref(), "item"));
//! ```

pub mod document;
pub mod errors;
pub mod helpers;
pub mod holder;
pub mod namespace;
pub mod wildcard;

pub use document::{Document, NodeId, NodeKind};
pub use errors::XmlError;
pub use helpers::{
    display_name, first_element_child, is_element_nil, is_node_named, next_element_sibling,
    node_local_name, node_text, qualified_local, qualified_prefix,
};
pub use holder::AnyHolder;
pub use namespace::{XSI_NAMESPACE, element_namespace_uri, resolve_namespace_uri};
pub use wildcard::{LOCAL_ENTRY, NamespaceWildcard, WildcardStyle};
