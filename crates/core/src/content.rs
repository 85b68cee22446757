//! Home page content: section keys, typed block payloads, the per-locale
//! translation overlay and the footer blob.
//!
//! Blocks are stored as one JSON object per row. Editors only check that
//! fields are present; nothing here rejects a payload for missing keys.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Errors produced when interpreting stored content.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("unknown block type: {0}")]
    UnknownBlockType(String),
    #[error("block content must be a JSON object")]
    NotAnObject,
    #[error("invalid {block_type} content: {message}")]
    InvalidPayload {
        block_type: BlockType,
        message: String,
    },
}

/// Kind of payload a content block carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "block_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Text,
    Image,
    Button,
    Stat,
    Feature,
    Icon,
}

impl BlockType {
    pub const ALL: [Self; 6] = [
        Self::Text,
        Self::Image,
        Self::Button,
        Self::Stat,
        Self::Feature,
        Self::Icon,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Button => "button",
            Self::Stat => "stat",
            Self::Feature => "feature",
            Self::Icon => "icon",
        }
    }

    /// Payload keys the editor offers for this type, in form order.
    #[must_use]
    pub const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Text => &["title", "body"],
            Self::Image => &["url", "alt"],
            Self::Button => &["label", "url", "style"],
            Self::Stat => &["value", "label", "suffix"],
            Self::Feature => &["title", "description", "icon"],
            Self::Icon => &["name", "label", "url"],
        }
    }

    /// Keys that may be translated per locale. URLs and styles are shared.
    #[must_use]
    pub fn translatable_fields(self) -> Vec<&'static str> {
        self.fields()
            .iter()
            .copied()
            .filter(|f| !matches!(*f, "url" | "style" | "icon" | "name"))
            .collect()
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ContentError::UnknownBlockType(s.to_owned()))
    }
}

/// Well-known home page sections. Sections with other keys render with the
/// generic layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Hero,
    About,
    Stats,
    Features,
    Partners,
    Cta,
}

impl SectionKey {
    pub const ALL: [Self; 6] = [
        Self::Hero,
        Self::About,
        Self::Stats,
        Self::Features,
        Self::Partners,
        Self::Cta,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::About => "about",
            Self::Stats => "stats",
            Self::Features => "features",
            Self::Partners => "partners",
            Self::Cta => "cta",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextContent {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageContent {
    pub url: Option<String>,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonContent {
    pub label: Option<String>,
    pub url: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatContent {
    pub value: Option<String>,
    pub label: Option<String>,
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconContent {
    pub name: Option<String>,
    pub label: Option<String>,
    pub url: Option<String>,
}

/// A block payload interpreted according to its [`BlockType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockContent {
    Text(TextContent),
    Image(ImageContent),
    Button(ButtonContent),
    Stat(StatContent),
    Feature(FeatureContent),
    Icon(IconContent),
}

impl BlockContent {
    /// Interpret a stored JSON object as the given block type.
    ///
    /// Scalar values (numbers, booleans) are accepted as strings so a stat
    /// saved as `{"value": 25}` still renders.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotAnObject`] for non-object payloads and
    /// [`ContentError::InvalidPayload`] when a field has a nested value.
    pub fn parse(block_type: BlockType, value: &Value) -> Result<Self, ContentError> {
        let Value::Object(map) = value else {
            return Err(ContentError::NotAnObject);
        };
        let normalized = Value::Object(stringify_scalars(map));
        let invalid = |e: serde_json::Error| ContentError::InvalidPayload {
            block_type,
            message: e.to_string(),
        };

        Ok(match block_type {
            BlockType::Text => Self::Text(serde_json::from_value(normalized).map_err(invalid)?),
            BlockType::Image => Self::Image(serde_json::from_value(normalized).map_err(invalid)?),
            BlockType::Button => Self::Button(serde_json::from_value(normalized).map_err(invalid)?),
            BlockType::Stat => Self::Stat(serde_json::from_value(normalized).map_err(invalid)?),
            BlockType::Feature => {
                Self::Feature(serde_json::from_value(normalized).map_err(invalid)?)
            }
            BlockType::Icon => Self::Icon(serde_json::from_value(normalized).map_err(invalid)?),
        })
    }

    #[must_use]
    pub const fn block_type(&self) -> BlockType {
        match self {
            Self::Text(_) => BlockType::Text,
            Self::Image(_) => BlockType::Image,
            Self::Button(_) => BlockType::Button,
            Self::Stat(_) => BlockType::Stat,
            Self::Feature(_) => BlockType::Feature,
            Self::Icon(_) => BlockType::Icon,
        }
    }
}

fn stringify_scalars(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                other => other.clone(),
            };
            (k.clone(), v)
        })
        .collect()
}

/// Whether an overlay value should replace the base value.
fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Apply a locale's translation on top of the base content.
///
/// Shallow merge: top-level overlay keys replace base keys, except null or
/// blank-string values which leave the base value in place. If either side
/// is not a JSON object the base is returned unchanged.
#[must_use]
pub fn overlay_translation(base: &Value, overlay: &Value) -> Value {
    let (Value::Object(base_map), Value::Object(overlay_map)) = (base, overlay) else {
        return base.clone();
    };

    let mut merged = base_map.clone();
    for (key, value) in overlay_map {
        if is_meaningful(value) {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

/// Build a block payload from submitted form fields.
///
/// Only the keys of `block_type` are read; blank values are omitted so the
/// stored object stays sparse.
#[must_use]
pub fn content_from_fields<S: std::hash::BuildHasher>(
    block_type: BlockType,
    fields: &HashMap<String, String, S>,
) -> Value {
    let map = block_type
        .fields()
        .iter()
        .filter_map(|key| {
            let value = fields.get(*key)?.trim();
            (!value.is_empty()).then(|| ((*key).to_owned(), Value::String(value.to_owned())))
        })
        .collect();
    Value::Object(map)
}

/// Read a string field from a payload, for editors.
#[must_use]
pub fn field_str<'a>(content: &'a Value, key: &str) -> &'a str {
    content.get(key).and_then(Value::as_str).unwrap_or("")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

/// Footer blob stored per locale in `footer_content`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterContent {
    pub company_name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub links: Vec<FooterLink>,
    pub social: Vec<SocialLink>,
    pub copyright: String,
}

impl FooterContent {
    /// Read a stored blob field by field.
    ///
    /// Scalars are taken as text like block payloads; a field or list entry
    /// of the wrong shape is left empty without losing the rest.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };
        let text = |key: &str| match map.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        };
        Self {
            company_name: text("company_name"),
            description: text("description"),
            address: text("address"),
            phone: text("phone"),
            email: text("email"),
            links: entries(map.get("links")),
            social: entries(map.get("social")),
            copyright: text("copyright"),
        }
    }
}

fn entries<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let normalized = Value::Object(stringify_scalars(item.as_object()?));
                    serde_json::from_value(normalized).ok()
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_type_from_str() {
        assert_eq!("stat".parse::<BlockType>().unwrap(), BlockType::Stat);
        assert!(matches!(
            "video".parse::<BlockType>(),
            Err(ContentError::UnknownBlockType(_))
        ));
    }

    #[test]
    fn test_stat_block_keeps_value_and_label() {
        let content =
            BlockContent::parse(BlockType::Stat, &json!({"value": 25, "label": "Years"})).unwrap();
        let BlockContent::Stat(stat) = content else {
            panic!("expected stat");
        };
        assert_eq!(stat.value.as_deref(), Some("25"));
        assert_eq!(stat.label.as_deref(), Some("Years"));
        assert!(stat.suffix.is_none());
    }

    #[test]
    fn test_parse_ignores_unknown_keys_and_missing_fields() {
        let content = BlockContent::parse(BlockType::Button, &json!({"colour": "red"})).unwrap();
        assert_eq!(content, BlockContent::Button(ButtonContent::default()));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert_eq!(
            BlockContent::parse(BlockType::Text, &json!("hello")),
            Err(ContentError::NotAnObject)
        );
        assert!(matches!(
            BlockContent::parse(BlockType::Text, &json!({"title": ["a"]})),
            Err(ContentError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_overlay_replaces_present_keys() {
        let base = json!({"title": "Quality bearings", "body": "Since 1998", "url": "/about"});
        let overlay = json!({"title": "Rulmenți de calitate", "body": ""});
        let merged = overlay_translation(&base, &overlay);
        assert_eq!(
            merged,
            json!({"title": "Rulmenți de calitate", "body": "Since 1998", "url": "/about"})
        );
    }

    #[test]
    fn test_overlay_ignores_nulls_and_adds_new_keys() {
        let base = json!({"label": "Years"});
        let overlay = json!({"label": null, "suffix": "+"});
        assert_eq!(
            overlay_translation(&base, &overlay),
            json!({"label": "Years", "suffix": "+"})
        );
    }

    #[test]
    fn test_overlay_non_object_returns_base() {
        let base = json!({"title": "x"});
        assert_eq!(overlay_translation(&base, &json!([1, 2])), base);
        assert_eq!(overlay_translation(&json!("s"), &json!({"a": 1})), json!("s"));
    }

    #[test]
    fn test_content_from_fields_only_reads_type_keys() {
        let mut fields = HashMap::new();
        fields.insert("value".to_owned(), " 1200 ".to_owned());
        fields.insert("label".to_owned(), "Products".to_owned());
        fields.insert("suffix".to_owned(), String::new());
        fields.insert("title".to_owned(), "ignored".to_owned());

        let value = content_from_fields(BlockType::Stat, &fields);
        assert_eq!(value, json!({"value": "1200", "label": "Products"}));
        assert_eq!(field_str(&value, "value"), "1200");
        assert_eq!(field_str(&value, "suffix"), "");
    }

    #[test]
    fn test_translatable_fields_exclude_links() {
        assert_eq!(BlockType::Button.translatable_fields(), vec!["label"]);
        assert_eq!(BlockType::Text.translatable_fields(), vec!["title", "body"]);
    }

    #[test]
    fn test_section_key_lookup() {
        assert_eq!(SectionKey::from_key("cta"), Some(SectionKey::Cta));
        assert_eq!(SectionKey::from_key("testimonials"), None);
    }

    #[test]
    fn test_footer_from_value_defaults() {
        let footer = FooterContent::from_value(&json!({
            "company_name": "Bearing Shop",
            "links": [{"label": "Terms", "url": "/terms"}]
        }));
        assert_eq!(footer.company_name, "Bearing Shop");
        assert_eq!(footer.links.len(), 1);
        assert!(footer.social.is_empty());

        assert_eq!(FooterContent::from_value(&json!(null)), FooterContent::default());
    }

    #[test]
    fn test_footer_keeps_good_fields_when_one_is_malformed() {
        let footer = FooterContent::from_value(&json!({
            "company_name": "Bearing Shop",
            "phone": 40_268_123_456_i64,
            "address": {"street": "Str. Lunga 1"},
            "links": [{"label": "Terms", "url": "/terms"}, "broken", {"label": 7, "url": "/faq"}],
            "social": "not a list"
        }));
        assert_eq!(footer.company_name, "Bearing Shop");
        assert_eq!(footer.phone, "40268123456");
        assert_eq!(footer.address, "");
        assert_eq!(footer.links.len(), 2);
        assert_eq!(footer.links[1].label, "7");
        assert!(footer.social.is_empty());
    }
}
