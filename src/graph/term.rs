//! RDF terms: IRIs, blank nodes, and literals

use serde::{Deserialize, Serialize};

/// An absolute IRI, used for predicates and canonical content URIs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(String);

impl Iri {
    /// Create an IRI from a string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Iri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Iri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A literal value with an optional datatype or language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<Iri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A node position in a statement
///
/// Serializes adjacently tagged, e.g. `{"type": "iri", "value": "urn:x"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Term {
    Iri(Iri),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri(Iri::new(value))
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Self::Blank(id.into())
    }

    /// A plain string literal
    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        })
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<Iri>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        })
    }

    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        })
    }

    /// Literals may only appear in object position
    pub fn is_resource(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }

    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{}>", iri),
            Self::Blank(id) => write!(f, "_:{}", id),
            Self::Literal(lit) => {
                write!(f, "\"{}\"", lit.lexical.replace('\\', "\\\\").replace('"', "\\\""))?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{}", lang)
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{}>", dt)
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iri_serializes_adjacently_tagged() {
        let term = Term::iri("urn:loom:content/a");
        let json = serde_json::to_value(&term).unwrap();
        assert_eq!(json, serde_json::json!({"type": "iri", "value": "urn:loom:content/a"}));

        let back: Term = serde_json::from_value(json).unwrap();
        assert_eq!(back, term);
    }

    #[test]
    fn literal_omits_absent_tags() {
        let json = serde_json::to_value(Term::literal("hello")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "literal", "value": {"lexical": "hello"}})
        );
    }

    #[test]
    fn display_uses_ntriples_shapes() {
        assert_eq!(Term::iri("urn:x").to_string(), "<urn:x>");
        assert_eq!(Term::blank("b0").to_string(), "_:b0");
        assert_eq!(Term::lang_literal("chat", "fr").to_string(), "\"chat\"@fr");
        assert_eq!(
            Term::typed_literal("0.9", "http://www.w3.org/2001/XMLSchema#double").to_string(),
            "\"0.9\"^^<http://www.w3.org/2001/XMLSchema#double>"
        );
    }

    #[test]
    fn literals_are_not_resources() {
        assert!(Term::iri("urn:x").is_resource());
        assert!(Term::blank("b").is_resource());
        assert!(!Term::literal("x").is_resource());
    }
}
