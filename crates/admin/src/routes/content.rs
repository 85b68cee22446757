//! Home page content editor: sections, blocks, translations and the footer.
//!
//! The base content is written in the default locale. Every other
//! configured locale gets an overlay form that only offers the
//! translatable fields of a block; blank overlay fields fall back to the
//! base text on the storefront.

use askama::Template;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::content::{BlockType, content_from_fields, field_str};
use bearing_shop_core::{ContentBlockId, HomeSectionId, Locale};

use crate::db::content::Direction;
use crate::db::{ContentRepository, FooterRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, RequireEditor};
use crate::models::{
    Block, BlockFields, FooterForm, LocaleQuery, NewBlockForm, Section, SectionForm,
    SectionTranslation,
};
use crate::routes::{Chrome, render, render_invalid, set_flash};
use crate::services::{discard_images, read_image_upload, store_image};
use crate::state::AppState;

/// Move buttons post `direction=up|down`.
#[derive(Debug, Deserialize)]
pub struct MoveForm {
    pub direction: Direction,
}

/// Section heading translation form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SectionTranslationForm {
    pub locale: String,
    pub title: String,
    pub subtitle: String,
}

/// One input of a block editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub key: &'static str,
    pub value: String,
    /// Base-language value, shown as a hint on translation forms.
    pub base_value: String,
    pub multiline: bool,
}

impl FieldView {
    #[must_use]
    pub fn label(&self) -> String {
        let mut chars = self.key.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

fn is_multiline(key: &str) -> bool {
    matches!(key, "body" | "description")
}

/// Editor inputs for the base payload.
fn base_fields(block: &Block) -> Vec<FieldView> {
    block
        .block_type
        .fields()
        .iter()
        .copied()
        .map(|key| FieldView {
            key,
            value: block.field(key).to_owned(),
            base_value: block.field(key).to_owned(),
            multiline: is_multiline(key),
        })
        .collect()
}

/// Editor inputs for a locale overlay.
fn translation_fields(block: &Block, overlay: Option<&Value>) -> Vec<FieldView> {
    block
        .block_type
        .translatable_fields()
        .into_iter()
        .map(|key| FieldView {
            key,
            value: overlay.map(|o| field_str(o, key)).unwrap_or_default().to_owned(),
            base_value: block.field(key).to_owned(),
            multiline: is_multiline(key),
        })
        .collect()
}

/// Overlay payload from a translation form: translatable keys only.
fn overlay_from_fields(block_type: BlockType, fields: &BlockFields) -> Value {
    let translatable = block_type.translatable_fields();
    let mut content = content_from_fields(block_type, fields);
    if let Value::Object(map) = &mut content {
        map.retain(|key, _| translatable.contains(&key.as_str()));
    }
    content
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().is_none_or(serde_json::Map::is_empty)
}

/// Resolve `?locale=` against the translation locales, defaulting to the
/// first one. `None` when only the base locale is configured.
fn selected_locale(state: &AppState, query: &LocaleQuery) -> Option<Locale> {
    let locales = state.config().translation_locales();
    query
        .locale
        .as_deref()
        .and_then(|tag| Locale::parse(tag).ok())
        .filter(|locale| locales.contains(locale))
        .or_else(|| locales.first().cloned())
}

/// A locale from the URL or a form, which must be a translation locale.
fn translation_locale(state: &AppState, tag: &str) -> Result<Locale> {
    Locale::parse(tag)
        .ok()
        .filter(|locale| state.config().translation_locales().contains(locale))
        .ok_or_else(|| AppError::BadRequest(format!("'{tag}' is not a translation locale")))
}

fn locale_query(locale: &Locale) -> String {
    format!("?locale={}", locale.as_str())
}

// =============================================================================
// Templates
// =============================================================================

/// Section list template.
#[derive(Template)]
#[template(path = "content/index.html")]
pub struct SectionsTemplate {
    pub chrome: Chrome,
    pub sections: Vec<Section>,
    pub form: SectionForm,
    pub error: Option<String>,
}

/// Section editor template.
#[derive(Template)]
#[template(path = "content/section.html")]
pub struct SectionTemplate {
    pub chrome: Chrome,
    pub section: Section,
    pub blocks: Vec<Block>,
    pub block_types: [BlockType; 6],
    pub locales: Vec<Locale>,
    pub locale: Option<Locale>,
    pub translation: Option<SectionTranslation>,
}

impl SectionTemplate {
    fn is_locale(&self, locale: &Locale) -> bool {
        self.locale.as_ref() == Some(locale)
    }

    fn translated_title(&self) -> &str {
        self.translation
            .as_ref()
            .and_then(|t| t.title.as_deref())
            .unwrap_or("")
    }

    fn translated_subtitle(&self) -> &str {
        self.translation
            .as_ref()
            .and_then(|t| t.subtitle.as_deref())
            .unwrap_or("")
    }
}

/// Block editor template.
#[derive(Template)]
#[template(path = "content/block.html")]
pub struct BlockTemplate {
    pub chrome: Chrome,
    pub section: Section,
    pub block: Block,
    pub fields: Vec<FieldView>,
    pub locales: Vec<Locale>,
    pub locale: Option<Locale>,
    pub translation_fields: Vec<FieldView>,
    pub has_translation: bool,
    /// Locales that already have an overlay.
    pub translated_locales: Vec<String>,
}

impl BlockTemplate {
    fn is_locale(&self, locale: &Locale) -> bool {
        self.locale.as_ref() == Some(locale)
    }

    fn is_translated(&self, locale: &Locale) -> bool {
        self.translated_locales.iter().any(|l| l == locale.as_str())
    }

    fn is_image(&self) -> bool {
        self.block.block_type == BlockType::Image
    }
}

/// Footer editor template.
#[derive(Template)]
#[template(path = "content/footer.html")]
pub struct FooterTemplate {
    pub chrome: Chrome,
    pub locales: Vec<Locale>,
    pub locale: Locale,
    pub saved_locales: Vec<String>,
    pub form: FooterForm,
    pub exists: bool,
}

impl FooterTemplate {
    fn is_locale(&self, locale: &Locale) -> bool {
        self.locale == *locale
    }

    fn is_saved(&self, locale: &Locale) -> bool {
        self.saved_locales.iter().any(|l| l == locale.as_str())
    }
}

async fn load_section(repo: &ContentRepository<'_>, id: i32) -> Result<Section> {
    repo.section(HomeSectionId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("section {id}")))
}

async fn load_block(repo: &ContentRepository<'_>, id: i32) -> Result<Block> {
    repo.block(ContentBlockId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("block {id}")))
}

// =============================================================================
// Sections
// =============================================================================

/// Sections in page order.
///
/// GET /content
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    render(&SectionsTemplate {
        chrome: Chrome::new(&admin, &session, "/content").await?,
        sections: ContentRepository::new(state.pool()).sections().await?,
        form: SectionForm::default(),
        error: None,
    })
}

/// POST /content/sections
#[instrument(skip_all)]
pub async fn create_section(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SectionForm>,
) -> Result<Response> {
    let repo = ContentRepository::new(state.pool());

    let message = match form.key() {
        Ok(key) => match repo
            .create_section(&key, form.title().as_deref(), form.subtitle().as_deref())
            .await
        {
            Ok(id) => {
                set_flash(&session, format!("Created section {key}")).await?;
                return Ok(Redirect::to(&format!("/content/sections/{id}")).into_response());
            }
            Err(RepositoryError::Conflict(message)) => message,
            Err(e) => return Err(e.into()),
        },
        Err(e) => e.to_string(),
    };

    render_invalid(&SectionsTemplate {
        chrome: Chrome::new(&admin, &session, "/content").await?,
        sections: repo.sections().await?,
        form,
        error: Some(message),
    })
}

/// Section editor: heading, blocks and heading translation.
///
/// GET /content/sections/{id}
#[instrument(skip(admin, state, session))]
pub async fn edit_section(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Query(query): Query<LocaleQuery>,
) -> Result<Html<String>> {
    let repo = ContentRepository::new(state.pool());
    let section = load_section(&repo, id).await?;
    let blocks = repo.blocks(section.id).await?;
    let locale = selected_locale(&state, &query);
    let translation = match &locale {
        Some(locale) => repo.section_translation(section.id, locale).await?,
        None => None,
    };

    render(&SectionTemplate {
        chrome: Chrome::new(&admin, &session, "/content").await?,
        section,
        blocks,
        block_types: BlockType::ALL,
        locales: state.config().translation_locales().to_vec(),
        locale,
        translation,
    })
}

/// Save the base heading.
///
/// POST /content/sections/{id}
#[instrument(skip(_admin, state, session, form))]
pub async fn update_section(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<SectionForm>,
) -> Result<Redirect> {
    ContentRepository::new(state.pool())
        .update_section(
            HomeSectionId::new(id),
            form.title().as_deref(),
            form.subtitle().as_deref(),
        )
        .await?;
    set_flash(&session, "Section saved").await?;
    Ok(Redirect::to(&format!("/content/sections/{id}")))
}

/// POST /content/sections/{id}/toggle
#[instrument(skip(_admin, state, session))]
pub async fn toggle_section(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let active = ContentRepository::new(state.pool())
        .toggle_section(HomeSectionId::new(id))
        .await?;
    set_flash(
        &session,
        if active { "Section shown" } else { "Section hidden" },
    )
    .await?;
    Ok(Redirect::to("/content"))
}

/// POST /content/sections/{id}/move
#[instrument(skip(_admin, state, form))]
pub async fn move_section(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<MoveForm>,
) -> Result<Redirect> {
    ContentRepository::new(state.pool())
        .move_section(HomeSectionId::new(id), form.direction)
        .await?;
    Ok(Redirect::to("/content"))
}

/// Delete a section with its blocks and translations.
///
/// POST /content/sections/{id}/delete
#[instrument(skip(_admin, state, session))]
pub async fn delete_section(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    ContentRepository::new(state.pool())
        .delete_section(HomeSectionId::new(id))
        .await?;
    tracing::info!(section_id = id, "Deleted home section");
    set_flash(&session, "Section deleted").await?;
    Ok(Redirect::to("/content"))
}

/// POST /content/sections/{id}/translations
#[instrument(skip(_admin, state, session, form))]
pub async fn save_section_translation(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<SectionTranslationForm>,
) -> Result<Redirect> {
    let locale = translation_locale(&state, &form.locale)?;
    let title = form.title.trim();
    let subtitle = form.subtitle.trim();

    ContentRepository::new(state.pool())
        .save_section_translation(
            HomeSectionId::new(id),
            &locale,
            (!title.is_empty()).then_some(title),
            (!subtitle.is_empty()).then_some(subtitle),
        )
        .await?;
    set_flash(&session, format!("Saved {} heading", locale.as_str())).await?;
    Ok(Redirect::to(&format!(
        "/content/sections/{id}{}",
        locale_query(&locale)
    )))
}

// =============================================================================
// Blocks
// =============================================================================

/// Add an empty block and open its editor.
///
/// POST /content/sections/{id}/blocks
#[instrument(skip(_admin, state, session, form))]
pub async fn create_block(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<NewBlockForm>,
) -> Result<Redirect> {
    let section_url = format!("/content/sections/{id}");
    let (key, block_type) = match form.validate() {
        Ok(valid) => valid,
        Err(e) => {
            set_flash(&session, e.to_string()).await?;
            return Ok(Redirect::to(&section_url));
        }
    };

    match ContentRepository::new(state.pool())
        .create_block(HomeSectionId::new(id), &key, block_type)
        .await
    {
        Ok(block_id) => Ok(Redirect::to(&format!("/content/blocks/{block_id}"))),
        Err(RepositoryError::Conflict(message)) => {
            set_flash(&session, message).await?;
            Ok(Redirect::to(&section_url))
        }
        Err(e) => Err(e.into()),
    }
}

/// Block editor with its translation form.
///
/// GET /content/blocks/{id}
#[instrument(skip(admin, state, session))]
pub async fn edit_block(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Query(query): Query<LocaleQuery>,
) -> Result<Html<String>> {
    let repo = ContentRepository::new(state.pool());
    let block = load_block(&repo, id).await?;
    let section = load_section(&repo, block.section_id.as_i32()).await?;
    let translations = repo.block_translations(block.id).await?;
    let locale = selected_locale(&state, &query);

    let overlay = locale.as_ref().and_then(|locale| {
        translations
            .iter()
            .find(|t| t.locale == locale.as_str())
            .map(|t| &t.content)
    });

    render(&BlockTemplate {
        chrome: Chrome::new(&admin, &session, "/content").await?,
        fields: base_fields(&block),
        translation_fields: translation_fields(&block, overlay),
        has_translation: overlay.is_some(),
        translated_locales: translations.iter().map(|t| t.locale.clone()).collect(),
        locales: state.config().translation_locales().to_vec(),
        locale,
        section,
        block,
    })
}

/// Save the base payload from the per-type form.
///
/// POST /content/blocks/{id}
#[instrument(skip(_admin, state, session, fields))]
pub async fn update_block(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(fields): Form<BlockFields>,
) -> Result<Redirect> {
    let repo = ContentRepository::new(state.pool());
    let block = load_block(&repo, id).await?;

    let content = content_from_fields(block.block_type, &fields);
    repo.update_block_content(block.id, &content).await?;

    set_flash(&session, format!("Saved {}", block.block_key)).await?;
    Ok(Redirect::to(&format!("/content/blocks/{id}")))
}

/// Upload an image into an image block's `url`.
///
/// POST /content/blocks/{id}/image
#[instrument(skip(_admin, state, session, multipart))]
pub async fn upload_block_image(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let repo = ContentRepository::new(state.pool());
    let block = load_block(&repo, id).await?;
    if block.block_type != BlockType::Image {
        return Err(AppError::BadRequest("only image blocks take an upload".to_string()));
    }
    let upload = read_image_upload(&mut multipart, state.config().max_upload_bytes).await?;
    let url = store_image(&state, &format!("content/{}", block.block_key), upload).await?;

    let previous = block.field("url").to_owned();
    let mut content = block.content.clone();
    if let Value::Object(map) = &mut content {
        map.insert("url".to_owned(), Value::String(url.clone()));
    } else {
        content = serde_json::json!({ "url": url });
    }
    if let Err(e) = repo.update_block_content(block.id, &content).await {
        discard_images(&state, &[url]).await;
        return Err(e.into());
    }
    if !previous.is_empty() {
        discard_images(&state, &[previous]).await;
    }

    set_flash(&session, "Image uploaded").await?;
    Ok(Redirect::to(&format!("/content/blocks/{id}")))
}

/// POST /content/blocks/{id}/toggle
#[instrument(skip(_admin, state, session))]
pub async fn toggle_block(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let repo = ContentRepository::new(state.pool());
    let block = load_block(&repo, id).await?;
    let active = repo.toggle_block(block.id).await?;
    set_flash(&session, if active { "Block shown" } else { "Block hidden" }).await?;
    Ok(Redirect::to(&format!("/content/sections/{}", block.section_id)))
}

/// POST /content/blocks/{id}/move
#[instrument(skip(_admin, state, form))]
pub async fn move_block(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<MoveForm>,
) -> Result<Redirect> {
    let repo = ContentRepository::new(state.pool());
    let block = load_block(&repo, id).await?;
    repo.move_block(block.id, form.direction).await?;
    Ok(Redirect::to(&format!("/content/sections/{}", block.section_id)))
}

/// POST /content/blocks/{id}/delete
#[instrument(skip(_admin, state, session))]
pub async fn delete_block(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let repo = ContentRepository::new(state.pool());
    let block = load_block(&repo, id).await?;
    repo.delete_block(block.id).await?;

    tracing::info!(block_id = id, key = %block.block_key, "Deleted content block");
    set_flash(&session, format!("Deleted {}", block.block_key)).await?;
    Ok(Redirect::to(&format!("/content/sections/{}", block.section_id)))
}

/// Save a locale overlay. An all-blank form removes the overlay.
///
/// POST /content/blocks/{id}/translations/{locale}
#[instrument(skip(_admin, state, session, fields))]
pub async fn save_block_translation(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path((id, tag)): Path<(i32, String)>,
    Form(fields): Form<BlockFields>,
) -> Result<Redirect> {
    let locale = translation_locale(&state, &tag)?;
    let repo = ContentRepository::new(state.pool());
    let block = load_block(&repo, id).await?;

    let overlay = overlay_from_fields(block.block_type, &fields);
    let message = if is_empty_object(&overlay) {
        match repo.delete_block_translation(block.id, &locale).await {
            Ok(()) | Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        format!("Cleared {} translation", locale.as_str())
    } else {
        repo.save_block_translation(block.id, &locale, &overlay)
            .await?;
        format!("Saved {} translation", locale.as_str())
    };

    set_flash(&session, message).await?;
    Ok(Redirect::to(&format!(
        "/content/blocks/{id}{}",
        locale_query(&locale)
    )))
}

/// POST /content/blocks/{id}/translations/{locale}/delete
#[instrument(skip(_admin, state, session))]
pub async fn delete_block_translation(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path((id, tag)): Path<(i32, String)>,
) -> Result<Redirect> {
    let locale = translation_locale(&state, &tag)?;
    ContentRepository::new(state.pool())
        .delete_block_translation(ContentBlockId::new(id), &locale)
        .await?;
    set_flash(&session, format!("Removed {} translation", locale.as_str())).await?;
    Ok(Redirect::to(&format!(
        "/content/blocks/{id}{}",
        locale_query(&locale)
    )))
}

// =============================================================================
// Footer
// =============================================================================

/// Footer editor for one locale (the base locale by default).
///
/// GET /content/footer
#[instrument(skip_all)]
pub async fn edit_footer(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LocaleQuery>,
) -> Result<Html<String>> {
    let locales = state.config().locales.clone();
    let locale = query
        .locale
        .as_deref()
        .and_then(|tag| Locale::parse(tag).ok())
        .filter(|locale| locales.contains(locale))
        .unwrap_or_else(Locale::default_locale);

    let repo = FooterRepository::new(state.pool());
    let footer = repo.get(&locale).await?;

    render(&FooterTemplate {
        chrome: Chrome::new(&admin, &session, "/content").await?,
        saved_locales: repo.locales().await?,
        form: footer
            .as_ref()
            .map(FooterForm::from_content)
            .unwrap_or_default(),
        exists: footer.is_some(),
        locales,
        locale,
    })
}

/// POST /content/footer/{locale}
#[instrument(skip(_admin, state, session, form))]
pub async fn save_footer(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(tag): Path<String>,
    Form(form): Form<FooterForm>,
) -> Result<Redirect> {
    let locale = Locale::parse(&tag)
        .ok()
        .filter(|locale| state.config().locales.contains(locale))
        .ok_or_else(|| AppError::BadRequest(format!("'{tag}' is not a content locale")))?;

    FooterRepository::new(state.pool())
        .save(&locale, &form.into_content())
        .await?;
    set_flash(&session, format!("Saved {} footer", locale.as_str())).await?;
    Ok(Redirect::to(&format!("/content/footer{}", locale_query(&locale))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(block_type: BlockType, content: Value) -> Block {
        Block {
            id: ContentBlockId::new(1),
            section_id: HomeSectionId::new(1),
            block_key: "cta".to_owned(),
            block_type,
            content,
            position: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_overlay_keeps_only_translatable_fields() {
        let fields: BlockFields = [
            ("label".to_owned(), "Vezi produsele".to_owned()),
            ("url".to_owned(), "/ro/products".to_owned()),
            ("style".to_owned(), "primary".to_owned()),
        ]
        .into_iter()
        .collect();

        let overlay = overlay_from_fields(BlockType::Button, &fields);
        assert_eq!(overlay, json!({"label": "Vezi produsele"}));
    }

    #[test]
    fn test_blank_overlay_is_empty() {
        let fields: BlockFields = [("label".to_owned(), "  ".to_owned())].into_iter().collect();
        assert!(is_empty_object(&overlay_from_fields(BlockType::Button, &fields)));
    }

    #[test]
    fn test_translation_fields_show_base_hint() {
        let block = block(
            BlockType::Text,
            json!({"title": "Quality bearings", "body": "Since 1998"}),
        );
        let overlay = json!({"title": "Rulmenți de calitate"});

        let fields = translation_fields(&block, Some(&overlay));
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].key, "title");
        assert_eq!(fields[0].value, "Rulmenți de calitate");
        assert_eq!(fields[1].value, "");
        assert_eq!(fields[1].base_value, "Since 1998");
        assert!(fields[1].multiline);
    }

    #[test]
    fn test_base_fields_follow_block_type() {
        let block = block(BlockType::Image, json!({"url": "https://cdn.test/a.png"}));
        let keys: Vec<&str> = base_fields(&block).iter().map(|f| f.key).collect();
        assert_eq!(keys, ["url", "alt"]);
        assert_eq!(base_fields(&block)[0].label(), "Url");
    }
}
