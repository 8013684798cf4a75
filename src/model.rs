use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single guestbook entry.
///
/// `created_at` is absent on entries written before timestamps were recorded,
/// so it is optional on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    name: String,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(name: &str, text: &str) -> Post {
        Post::with_timestamp(name, text, Utc::now())
    }

    pub fn with_timestamp(name: &str, text: &str, created_at: DateTime<Utc>) -> Post {
        Post {
            name: name.to_string(),
            text: text.to_string(),
            created_at: Some(created_at),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> Option<&DateTime<Utc>> {
        self.created_at.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_record_without_timestamp_parses() {
        let post: Post = serde_json::from_str(r#"{"name":"alice","text":"hi"}"#).unwrap();
        assert_eq!(post.name(), "alice");
        assert_eq!(post.text(), "hi");
        assert!(post.created_at().is_none());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let post: Post =
            serde_json::from_str(r#"{"name":"bob","text":"yo","mood":"happy"}"#).unwrap();
        assert_eq!(post.name(), "bob");
    }

    #[test]
    fn missing_or_non_string_fields_are_rejected() {
        assert!(serde_json::from_str::<Post>(r#"{"name":"bob"}"#).is_err());
        assert!(serde_json::from_str::<Post>(r#"{"name":"bob","text":42}"#).is_err());
        assert!(serde_json::from_str::<Post>(r#"{"name":null,"text":"x"}"#).is_err());
    }

    #[test]
    fn timestamp_is_omitted_when_absent() {
        let post: Post = serde_json::from_str(r#"{"name":"a","text":"b"}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&post).unwrap(),
            r#"{"name":"a","text":"b"}"#
        );
    }

    #[test]
    fn timestamp_survives_serialization() {
        let post = Post::new("carol", "hello");
        let json = serde_json::to_string(&post).unwrap();
        let back: Post = serde_json::from_str(&json).unwrap();
        assert_eq!(back, post);
    }
}
