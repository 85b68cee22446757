//! Home page content: database rows and the flattened views templates read.
//!
//! Rows arrive with the request locale's translation already joined in;
//! [`SectionView::build`] overlays it and interprets each block by type.

use chrono::{DateTime, Utc};
use serde_json::Value;

use bearing_shop_core::content::{BlockContent, BlockType, FooterContent, SectionKey, overlay_translation};
use bearing_shop_core::{BannerId, ContentBlockId, HomeSectionId};

/// An active section with its heading in the request locale.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SectionRow {
    pub id: HomeSectionId,
    pub section_key: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub position: i32,
}

/// An active block with the request locale's overlay, if any.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BlockRow {
    pub id: ContentBlockId,
    pub section_id: HomeSectionId,
    pub block_key: String,
    pub block_type: BlockType,
    pub content: Value,
    pub translation: Option<Value>,
    pub position: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BannerRow {
    pub id: BannerId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub position: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl BannerRow {
    /// Whether `now` falls inside the banner's optional date window.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.is_none_or(|start| start <= now) && self.ends_at.is_none_or(|end| now < end)
    }
}

/// A CMS link or image source if it is site-relative, a fragment, or
/// http(s); anything else (`javascript:`, `data:`) becomes empty.
#[must_use]
pub fn safe_url(raw: &str) -> String {
    let url = raw.trim();
    let lower = url.to_ascii_lowercase();
    let allowed = url.starts_with('/')
        || url.starts_with('#')
        || lower.starts_with("https://")
        || lower.starts_with("http://");
    if allowed { url.to_owned() } else { String::new() }
}

/// Footer with unsafe link targets dropped.
#[must_use]
pub fn safe_footer(mut footer: FooterContent) -> FooterContent {
    footer.links.retain_mut(|link| {
        link.url = safe_url(&link.url);
        !link.url.is_empty()
    });
    footer.social.retain_mut(|social| {
        social.url = safe_url(&social.url);
        !social.url.is_empty()
    });
    footer
}

/// A content block ready for rendering. Absent fields are empty strings.
/// URLs have passed [`safe_url`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockView {
    pub key: String,
    /// Block type name, used by templates to pick a partial.
    pub kind: &'static str,
    pub title: String,
    pub body: String,
    pub url: String,
    pub alt: String,
    pub label: String,
    pub style: String,
    pub value: String,
    pub suffix: String,
    pub description: String,
    pub icon: String,
    pub name: String,
}

impl BlockView {
    #[must_use]
    pub fn new(key: &str, content: BlockContent) -> Self {
        let mut view = Self {
            key: key.to_owned(),
            kind: content.block_type().as_str(),
            ..Self::default()
        };
        match content {
            BlockContent::Text(c) => {
                view.title = c.title.unwrap_or_default();
                view.body = c.body.unwrap_or_default();
            }
            BlockContent::Image(c) => {
                view.url = safe_url(&c.url.unwrap_or_default());
                view.alt = c.alt.unwrap_or_default();
            }
            BlockContent::Button(c) => {
                view.label = c.label.unwrap_or_default();
                view.url = safe_url(&c.url.unwrap_or_default());
                view.style = c.style.unwrap_or_else(|| "primary".to_owned());
            }
            BlockContent::Stat(c) => {
                view.value = c.value.unwrap_or_default();
                view.label = c.label.unwrap_or_default();
                view.suffix = c.suffix.unwrap_or_default();
            }
            BlockContent::Feature(c) => {
                view.title = c.title.unwrap_or_default();
                view.description = c.description.unwrap_or_default();
                view.icon = c.icon.unwrap_or_default();
            }
            BlockContent::Icon(c) => {
                view.name = c.name.unwrap_or_default();
                view.label = c.label.unwrap_or_default();
                view.url = safe_url(&c.url.unwrap_or_default());
            }
        }
        view
    }

    /// Overlay the translation and interpret the row. Malformed payloads are
    /// logged and skipped.
    #[must_use]
    pub fn from_row(row: &BlockRow) -> Option<Self> {
        let content = match &row.translation {
            Some(overlay) => overlay_translation(&row.content, overlay),
            None => row.content.clone(),
        };
        match BlockContent::parse(row.block_type, &content) {
            Ok(parsed) => Some(Self::new(&row.block_key, parsed)),
            Err(e) => {
                tracing::warn!(block_id = %row.id, block_key = %row.block_key, error = %e, "Skipping malformed content block");
                None
            }
        }
    }
}

/// A section ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    pub key: String,
    /// Layout name: a known section key, or `generic`.
    pub layout: &'static str,
    pub title: String,
    pub subtitle: String,
    pub blocks: Vec<BlockView>,
}

impl SectionView {
    /// Group block rows under their sections, keeping the section order.
    #[must_use]
    pub fn build(sections: Vec<SectionRow>, blocks: &[BlockRow]) -> Vec<Self> {
        sections
            .into_iter()
            .map(|section| {
                let blocks = blocks
                    .iter()
                    .filter(|b| b.section_id == section.id)
                    .filter_map(BlockView::from_row)
                    .collect();
                Self {
                    layout: SectionKey::from_key(&section.section_key)
                        .map_or("generic", SectionKey::as_str),
                    key: section.section_key,
                    title: section.title.unwrap_or_default(),
                    subtitle: section.subtitle.unwrap_or_default(),
                    blocks,
                }
            })
            .collect()
    }

    /// Blocks of one type, in position order.
    #[must_use]
    pub fn blocks_of(&self, kind: &str) -> Vec<&BlockView> {
        self.blocks.iter().filter(|b| b.kind == kind).collect()
    }

    /// The first block with a given key, e.g. the hero's `headline`.
    #[must_use]
    pub fn block(&self, key: &str) -> Option<&BlockView> {
        self.blocks.iter().find(|b| b.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerView {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub link_url: String,
}

impl From<BannerRow> for BannerView {
    fn from(row: BannerRow) -> Self {
        Self {
            title: row.title,
            subtitle: row.subtitle.unwrap_or_default(),
            image_url: safe_url(&row.image_url.unwrap_or_default()),
            link_url: safe_url(&row.link_url.unwrap_or_default()),
        }
    }
}

/// Everything the home page shows for one locale.
#[derive(Debug, Clone, Default)]
pub struct HomePage {
    pub sections: Vec<SectionView>,
    pub banners: Vec<BannerView>,
    pub footer: FooterContent,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn block(id: i32, section: i32, key: &str, block_type: BlockType, content: Value) -> BlockRow {
        BlockRow {
            id: ContentBlockId::new(id),
            section_id: HomeSectionId::new(section),
            block_key: key.to_owned(),
            block_type,
            content,
            translation: None,
            position: id,
        }
    }

    #[test]
    fn test_stat_block_view_has_value_and_label() {
        let row = block(1, 1, "years", BlockType::Stat, json!({"value": 25, "label": "Years in business", "suffix": "+"}));
        let view = BlockView::from_row(&row).unwrap();

        assert_eq!(view.kind, "stat");
        assert_eq!(view.value, "25");
        assert_eq!(view.label, "Years in business");
        assert_eq!(view.suffix, "+");
    }

    #[test]
    fn test_translation_overlays_base_content() {
        let mut row = block(1, 1, "intro", BlockType::Text, json!({"title": "About us", "body": "We stock bearings."}));
        row.translation = Some(json!({"title": "Despre noi", "body": ""}));

        let view = BlockView::from_row(&row).unwrap();
        assert_eq!(view.title, "Despre noi");
        assert_eq!(view.body, "We stock bearings.");
    }

    #[test]
    fn test_script_urls_are_not_rendered() {
        let row = block(1, 1, "cta", BlockType::Button, json!({"label": "Shop", "url": " JavaScript:alert(1)"}));
        assert_eq!(BlockView::from_row(&row).unwrap().url, "");

        let row = block(2, 1, "catalog", BlockType::Icon, json!({"name": "gear", "url": "/products?family=ball"}));
        assert_eq!(BlockView::from_row(&row).unwrap().url, "/products?family=ball");

        assert_eq!(safe_url("HTTPS://skf.com"), "HTTPS://skf.com");
        assert_eq!(safe_url("#contact"), "#contact");
        assert_eq!(safe_url("data:text/html,hi"), "");
    }

    #[test]
    fn test_footer_drops_unsafe_links() {
        let footer = safe_footer(FooterContent::from_value(&json!({
            "links": [{"label": "Terms", "url": "/terms"}, {"label": "x", "url": "javascript:void(0)"}],
            "social": [{"platform": "LinkedIn", "url": "https://linkedin.com/company/bearing-shop"}]
        })));
        assert_eq!(footer.links.len(), 1);
        assert_eq!(footer.links[0].url, "/terms");
        assert_eq!(footer.social.len(), 1);
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let row = block(1, 1, "broken", BlockType::Text, json!(["not", "an", "object"]));
        assert!(BlockView::from_row(&row).is_none());
    }

    #[test]
    fn test_sections_group_blocks_in_order() {
        let sections = vec![
            SectionRow {
                id: HomeSectionId::new(2),
                section_key: "stats".to_owned(),
                title: Some("In numbers".to_owned()),
                subtitle: None,
                position: 1,
            },
            SectionRow {
                id: HomeSectionId::new(1),
                section_key: "seasonal".to_owned(),
                title: None,
                subtitle: None,
                position: 2,
            },
        ];
        let blocks = vec![
            block(1, 2, "a", BlockType::Stat, json!({"value": "1"})),
            block(2, 1, "b", BlockType::Text, json!({"title": "x"})),
            block(3, 2, "c", BlockType::Stat, json!({"value": "2"})),
        ];

        let views = SectionView::build(sections, &blocks);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].layout, "stats");
        assert_eq!(views[0].blocks_of("stat").len(), 2);
        assert_eq!(views[1].layout, "generic");
        assert_eq!(views[1].block("b").map(|b| b.title.as_str()), Some("x"));
    }

    #[test]
    fn test_banner_date_window() {
        let now = Utc::now();
        let mut banner = BannerRow {
            id: BannerId::new(1),
            title: "Spring sale".to_owned(),
            subtitle: None,
            image_url: None,
            link_url: None,
            position: 0,
            starts_at: None,
            ends_at: None,
        };
        assert!(banner.is_live_at(now));

        banner.starts_at = Some(now + Duration::hours(1));
        assert!(!banner.is_live_at(now));

        banner.starts_at = Some(now - Duration::hours(1));
        banner.ends_at = Some(now);
        assert!(!banner.is_live_at(now));
    }
}
