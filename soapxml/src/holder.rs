//! Porteurs de contenu `xs:any`
//!
//! Le code généré transporte le contenu d'un slot `xs:any` sous trois formes:
//! un objet typé identifié par l'élément global du schéma, du XML brut à
//! insérer tel quel, ou du XML brut accompagné de l'identité d'élément (qui
//! vaut alors un attribut `xsi:type` à l'émission). Union fermée, jamais
//! discriminée par une chaîne marqueur.

/// Contenu d'un slot `xs:any`. `T` est le type des valeurs typées produites
/// par le (dé)sérialiseur généré; un `xs:any` répété met le tableau dans `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyHolder<T> {
    /// Valeur typée pour l'élément global `{namespace_uri}local_name`.
    Typed {
        namespace_uri: String,
        local_name: String,
        value: T,
    },
    /// XML inséré tel quel dans le message.
    Raw { xml: String },
    /// XML inséré tel quel, avec identité d'élément (émet `xsi:type`).
    RawTyped {
        namespace_uri: String,
        local_name: String,
        xml: String,
    },
}

impl<T> AnyHolder<T> {
    pub fn typed(
        namespace_uri: impl Into<String>,
        local_name: impl Into<String>,
        value: T,
    ) -> Self {
        AnyHolder::Typed {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
            value,
        }
    }

    pub fn raw(xml: impl Into<String>) -> Self {
        AnyHolder::Raw { xml: xml.into() }
    }

    pub fn raw_typed(
        namespace_uri: impl Into<String>,
        local_name: impl Into<String>,
        xml: impl Into<String>,
    ) -> Self {
        AnyHolder::RawTyped {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
            xml: xml.into(),
        }
    }

    /// Nom qualifié `{namespace}local` quand l'identité d'élément est connue.
    pub fn qname(&self) -> Option<String> {
        match self {
            AnyHolder::Typed {
                namespace_uri,
                local_name,
                ..
            }
            | AnyHolder::RawTyped {
                namespace_uri,
                local_name,
                ..
            } => Some(format!("{{{}}}{}", namespace_uri, local_name)),
            AnyHolder::Raw { .. } => None,
        }
    }

    /// Le contenu est-il du XML brut (à insérer sans sérialisation)?
    pub fn is_raw(&self) -> bool {
        !matches!(self, AnyHolder::Typed { .. })
    }

    /// Faut-il émettre un attribut `xsi:type` avec le XML brut?
    pub fn wants_xsi_type(&self) -> bool {
        matches!(self, AnyHolder::RawTyped { .. })
    }
}
