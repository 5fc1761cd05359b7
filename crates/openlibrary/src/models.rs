//! Response shapes of the Open Library endpoints used here. Only the fields
//! the ingestion reads are declared; everything else is ignored.

use serde::Deserialize;

/// `GET /search/authors.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorSearchResponse {
    #[serde(default)]
    pub docs: Vec<AuthorCandidate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorCandidate {
    /// Author key, e.g. `OL23919A`.
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub top_work: Option<String>,
    #[serde(default)]
    pub work_count: Option<i64>,
}

/// `GET /authors/{key}/works.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorksResponse {
    #[serde(default)]
    pub entries: Vec<Work>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Work {
    /// Work path, e.g. `/works/OL45804W`.
    pub key: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub isbn: Vec<String>,
}

impl Work {
    /// The bare work id, without the `/works/` prefix.
    pub fn short_key(&self) -> &str {
        short_key(&self.key)
    }
}

/// `GET /works/{key}.json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub first_publish_date: Option<String>,
    #[serde(default)]
    pub created: Option<TypedValue>,
    #[serde(default)]
    pub isbn_13: Vec<String>,
    #[serde(default)]
    pub isbn_10: Vec<String>,
}

/// Open Library's `{"type": ..., "value": ...}` wrapper.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypedValue {
    pub value: String,
}

impl WorkDetails {
    /// First publication date if given, else the record's creation
    /// timestamp.
    pub fn publication_date(&self) -> Option<&str> {
        self.first_publish_date
            .as_deref()
            .or_else(|| self.created.as_ref().map(|c| c.value.as_str()))
    }
}

/// Last path segment of an Open Library key (`/authors/OL1A` -> `OL1A`).
pub fn short_key(key: &str) -> &str {
    key.trim_end_matches('/').rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn search_response_ignores_unknown_fields() {
        let parsed: AuthorSearchResponse = serde_json::from_value(json!({
            "numFound": 1,
            "docs": [{"key": "OL23919A", "name": "J. K. Rowling", "birth_date": "31 July 1965", "type": "author"}]
        }))
        .unwrap();
        assert_eq!(parsed.docs[0].key, "OL23919A");
        assert_eq!(parsed.docs[0].birth_date.as_deref(), Some("31 July 1965"));
    }

    #[test]
    fn publication_date_falls_back_to_created() {
        let details: WorkDetails = serde_json::from_value(json!({
            "title": "Emma",
            "created": {"type": "/type/datetime", "value": "2009-10-15T11:34:21.437031"}
        }))
        .unwrap();
        assert_eq!(details.publication_date(), Some("2009-10-15T11:34:21.437031"));
    }

    #[test]
    fn keys_are_shortened() {
        assert_eq!(short_key("/works/OL45804W"), "OL45804W");
        assert_eq!(short_key("OL23919A"), "OL23919A");
    }
}
