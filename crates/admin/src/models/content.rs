//! Home page content rows and their edit forms.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use bearing_shop_core::content::{BlockType, FooterContent, FooterLink, SocialLink, field_str};
use bearing_shop_core::catalog::{format_pairs, parse_pairs};
use bearing_shop_core::{BannerId, ContentBlockId, HomeSectionId};

use super::product::FormError;

/// A home page section, active or not.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Section {
    pub id: HomeSectionId,
    pub section_key: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub block_count: i64,
}

/// A content block in its base (untranslated) form.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Block {
    pub id: ContentBlockId,
    pub section_id: HomeSectionId,
    pub block_key: String,
    pub block_type: BlockType,
    pub content: Value,
    pub position: i32,
    pub is_active: bool,
}

impl Block {
    /// Value of one payload field, for the editor.
    #[must_use]
    pub fn field(&self, key: &str) -> &str {
        field_str(&self.content, key)
    }

    /// One-line preview for the block list.
    #[must_use]
    pub fn preview(&self) -> String {
        self.block_type
            .fields()
            .iter()
            .map(|key| self.field(key))
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" · ")
    }
}

/// A block's overlay for one locale.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BlockTranslation {
    pub block_id: ContentBlockId,
    pub locale: String,
    pub content: Value,
}

impl BlockTranslation {
    #[must_use]
    pub fn field(&self, key: &str) -> &str {
        field_str(&self.content, key)
    }
}

/// A section heading's overlay for one locale.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SectionTranslation {
    pub section_id: HomeSectionId,
    pub locale: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

/// A promotional banner.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Banner {
    pub id: BannerId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Banner {
    /// Whether the banner shows on the storefront at `now`.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now < end)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// Section create/edit form. The key is only read on create.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SectionForm {
    pub section_key: String,
    pub title: String,
    pub subtitle: String,
}

impl SectionForm {
    /// Normalized section key: lowercase, `[a-z0-9_]`.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is blank or has other characters.
    pub fn key(&self) -> Result<String, FormError> {
        let key = self.section_key.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(FormError {
                field: "section_key",
                message: "is required".to_owned(),
            });
        }
        if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FormError {
                field: "section_key",
                message: "may only use letters, digits and _".to_owned(),
            });
        }
        Ok(key)
    }

    #[must_use]
    pub fn title(&self) -> Option<String> {
        non_empty(&self.title)
    }

    #[must_use]
    pub fn subtitle(&self) -> Option<String> {
        non_empty(&self.subtitle)
    }
}

/// Block create form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewBlockForm {
    pub block_key: String,
    pub block_type: String,
}

impl NewBlockForm {
    /// # Errors
    ///
    /// Returns an error for a blank key or an unknown type.
    pub fn validate(&self) -> Result<(String, BlockType), FormError> {
        let key = self.block_key.trim();
        if key.is_empty() {
            return Err(FormError {
                field: "block_key",
                message: "is required".to_owned(),
            });
        }
        let block_type = self.block_type.parse().map_err(|_| FormError {
            field: "block_type",
            message: format!("unknown type '{}'", self.block_type),
        })?;
        Ok((key.to_owned(), block_type))
    }
}

/// Locale picker on the translation editor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<String>,
}

/// Free-form payload fields posted by the per-type block editors.
pub type BlockFields = HashMap<String, String>;

/// Banner create/edit form. Dates come from `datetime-local` inputs (UTC).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BannerForm {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub link_url: String,
    pub position: String,
    pub is_active: Option<String>,
    pub starts_at: String,
    pub ends_at: String,
}

/// Validated banner values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

const DATETIME_LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

fn parse_datetime_local(field: &'static str, value: &str) -> Result<Option<DateTime<Utc>>, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    DATETIME_LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Some(Utc.from_utc_datetime(&naive)))
        .ok_or_else(|| FormError {
            field,
            message: "must be a date and time".to_owned(),
        })
}

fn format_datetime_local(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|v| v.format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default()
}

impl BannerForm {
    /// # Errors
    ///
    /// Returns an error for a blank title, a bad date or an inverted window.
    pub fn validate(&self) -> Result<BannerInput, FormError> {
        let title = non_empty(&self.title).ok_or_else(|| FormError {
            field: "title",
            message: "is required".to_owned(),
        })?;
        let position = match self.position.trim() {
            "" => 0,
            raw => raw.parse().map_err(|_| FormError {
                field: "position",
                message: "must be a whole number".to_owned(),
            })?,
        };
        let starts_at = parse_datetime_local("starts_at", &self.starts_at)?;
        let ends_at = parse_datetime_local("ends_at", &self.ends_at)?;
        if let (Some(start), Some(end)) = (starts_at, ends_at)
            && end <= start
        {
            return Err(FormError {
                field: "ends_at",
                message: "must be after the start".to_owned(),
            });
        }

        Ok(BannerInput {
            title,
            subtitle: non_empty(&self.subtitle),
            image_url: non_empty(&self.image_url),
            link_url: non_empty(&self.link_url),
            position,
            is_active: self.is_active.is_some(),
            starts_at,
            ends_at,
        })
    }

    #[must_use]
    pub fn new_banner() -> Self {
        Self {
            is_active: Some("on".to_owned()),
            position: "0".to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_banner(banner: &Banner) -> Self {
        Self {
            title: banner.title.clone(),
            subtitle: banner.subtitle.clone().unwrap_or_default(),
            image_url: banner.image_url.clone().unwrap_or_default(),
            link_url: banner.link_url.clone().unwrap_or_default(),
            position: banner.position.to_string(),
            is_active: banner.is_active.then(|| "on".to_owned()),
            starts_at: format_datetime_local(banner.starts_at),
            ends_at: format_datetime_local(banner.ends_at),
        }
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        self.is_active.is_some()
    }
}

/// Footer editor form. Links are `label: url` lines, social accounts
/// `platform: url` lines.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FooterForm {
    pub company_name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub links: String,
    pub social: String,
    pub copyright: String,
}

impl FooterForm {
    #[must_use]
    pub fn into_content(self) -> FooterContent {
        FooterContent {
            company_name: self.company_name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            address: self.address.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            email: self.email.trim().to_owned(),
            links: parse_pairs(&self.links, ':')
                .into_iter()
                .map(|(label, url)| FooterLink { label, url })
                .collect(),
            social: parse_pairs(&self.social, ':')
                .into_iter()
                .map(|(platform, url)| SocialLink { platform, url })
                .collect(),
            copyright: self.copyright.trim().to_owned(),
        }
    }

    #[must_use]
    pub fn from_content(footer: &FooterContent) -> Self {
        Self {
            company_name: footer.company_name.clone(),
            description: footer.description.clone(),
            address: footer.address.clone(),
            phone: footer.phone.clone(),
            email: footer.email.clone(),
            links: format_pairs(
                footer.links.iter().map(|l| (l.label.as_str(), l.url.as_str())),
                ':',
            ),
            social: format_pairs(
                footer
                    .social
                    .iter()
                    .map(|s| (s.platform.as_str(), s.url.as_str())),
                ':',
            ),
            copyright: footer.copyright.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_preview_joins_filled_fields() {
        let block = Block {
            id: ContentBlockId::new(1),
            section_id: HomeSectionId::new(1),
            block_key: "years".to_owned(),
            block_type: BlockType::Stat,
            content: json!({"value": "25", "label": "Years in business"}),
            position: 0,
            is_active: true,
        };
        assert_eq!(block.preview(), "25 · Years in business");
        assert_eq!(block.field("suffix"), "");
    }

    #[test]
    fn test_section_key_rules() {
        let form = SectionForm {
            section_key: " Hero ".to_owned(),
            ..SectionForm::default()
        };
        assert_eq!(form.key().unwrap(), "hero");

        let bad = SectionForm {
            section_key: "our team".to_owned(),
            ..SectionForm::default()
        };
        assert_eq!(bad.key().unwrap_err().field, "section_key");
    }

    #[test]
    fn test_new_block_form_rejects_unknown_type() {
        let form = NewBlockForm {
            block_key: "intro".to_owned(),
            block_type: "video".to_owned(),
        };
        assert_eq!(form.validate().unwrap_err().field, "block_type");

        let form = NewBlockForm {
            block_key: "intro".to_owned(),
            block_type: "text".to_owned(),
        };
        assert_eq!(form.validate().unwrap(), ("intro".to_owned(), BlockType::Text));
    }

    #[test]
    fn test_banner_window_must_be_ordered() {
        let form = BannerForm {
            title: "Spring sale".to_owned(),
            starts_at: "2026-04-01T00:00".to_owned(),
            ends_at: "2026-03-01T00:00".to_owned(),
            ..BannerForm::new_banner()
        };
        assert_eq!(form.validate().unwrap_err().field, "ends_at");
    }

    #[test]
    fn test_banner_roundtrips_through_form() {
        let form = BannerForm {
            title: "Spring sale".to_owned(),
            starts_at: "2026-04-01T08:30".to_owned(),
            ..BannerForm::new_banner()
        };
        let input = form.validate().unwrap();
        assert!(input.is_active);
        assert!(input.ends_at.is_none());

        let banner = Banner {
            id: BannerId::new(1),
            title: input.title,
            subtitle: None,
            image_url: None,
            link_url: None,
            position: input.position,
            is_active: input.is_active,
            starts_at: input.starts_at,
            ends_at: None,
        };
        assert_eq!(BannerForm::from_banner(&banner).starts_at, "2026-04-01T08:30");
        assert!(banner.is_live_at(Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap()));
        assert!(!banner.is_live_at(Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_footer_form_parses_link_lines() {
        let footer = FooterForm {
            company_name: " Bearing Shop SRL ".to_owned(),
            links: "Terms: /terms\nPrivacy: /privacy".to_owned(),
            social: "linkedin: https://linkedin.com/company/bearing-shop".to_owned(),
            ..FooterForm::default()
        }
        .into_content();

        assert_eq!(footer.company_name, "Bearing Shop SRL");
        assert_eq!(footer.links.len(), 2);
        assert_eq!(footer.social[0].platform, "linkedin");
        assert_eq!(FooterForm::from_content(&footer).links, "Terms: /terms\nPrivacy: /privacy");
    }
}
