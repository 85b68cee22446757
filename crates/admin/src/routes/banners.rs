//! Promotional banner route handlers.
//!
//! A banner shows on the storefront while it is active and inside its
//! optional `starts_at`/`ends_at` window. The image can be an external URL
//! typed into the form or an upload into the bucket under `banners/`.

use askama::Template;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::BannerId;

use crate::db::BannerRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, RequireEditor};
use crate::models::{Banner, BannerForm};
use crate::routes::content::MoveForm;
use crate::routes::{Chrome, render, render_invalid, set_flash};
use crate::services::{discard_images, read_image_upload, store_image};
use crate::state::AppState;

/// Banner list template.
#[derive(Template)]
#[template(path = "banners/index.html")]
pub struct BannersIndexTemplate {
    pub chrome: Chrome,
    pub banners: Vec<Banner>,
    pub now: DateTime<Utc>,
}

impl BannersIndexTemplate {
    fn is_live(&self, banner: &Banner) -> bool {
        banner.is_live_at(self.now)
    }
}

/// Banner create/edit template.
#[derive(Template)]
#[template(path = "banners/form.html")]
pub struct BannerFormTemplate {
    pub chrome: Chrome,
    pub banner: Option<Banner>,
    pub form: BannerForm,
    pub error: Option<String>,
}

impl BannerFormTemplate {
    fn action(&self) -> String {
        self.banner
            .as_ref()
            .map_or_else(|| "/banners".to_owned(), |b| format!("/banners/{}", b.id))
    }
}

async fn load_banner(state: &AppState, id: i32) -> Result<Banner> {
    BannerRepository::new(state.pool())
        .get(BannerId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("banner {id}")))
}

/// GET /banners
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    render(&BannersIndexTemplate {
        chrome: Chrome::new(&admin, &session, "/banners").await?,
        banners: BannerRepository::new(state.pool()).list().await?,
        now: Utc::now(),
    })
}

/// GET /banners/new
pub async fn new(RequireEditor(admin): RequireEditor, session: Session) -> Result<Html<String>> {
    render(&BannerFormTemplate {
        chrome: Chrome::new(&admin, &session, "/banners").await?,
        banner: None,
        form: BannerForm::new_banner(),
        error: None,
    })
}

/// POST /banners
#[instrument(skip_all)]
pub async fn create(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<BannerForm>,
) -> Result<Response> {
    match form.validate() {
        Ok(input) => {
            let id = BannerRepository::new(state.pool()).create(&input).await?;
            set_flash(&session, "Banner created").await?;
            Ok(Redirect::to(&format!("/banners/{id}")).into_response())
        }
        Err(e) => render_invalid(&BannerFormTemplate {
            chrome: Chrome::new(&admin, &session, "/banners").await?,
            banner: None,
            form,
            error: Some(e.to_string()),
        }),
    }
}

/// GET /banners/{id}
#[instrument(skip(admin, state, session))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Html<String>> {
    let banner = load_banner(&state, id).await?;
    render(&BannerFormTemplate {
        chrome: Chrome::new(&admin, &session, "/banners").await?,
        form: BannerForm::from_banner(&banner),
        banner: Some(banner),
        error: None,
    })
}

/// Save the edit form. A replaced bucket image is removed from storage.
///
/// POST /banners/{id}
#[instrument(skip(admin, state, session, form))]
pub async fn update(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<BannerForm>,
) -> Result<Response> {
    let banner = load_banner(&state, id).await?;

    match form.validate() {
        Ok(input) => {
            BannerRepository::new(state.pool())
                .update(banner.id, &input)
                .await?;
            if let Some(old) = banner.image_url
                && input.image_url.as_ref() != Some(&old)
            {
                discard_images(&state, &[old]).await;
            }
            set_flash(&session, "Banner saved").await?;
            Ok(Redirect::to(&format!("/banners/{id}")).into_response())
        }
        Err(e) => render_invalid(&BannerFormTemplate {
            chrome: Chrome::new(&admin, &session, "/banners").await?,
            banner: Some(banner),
            form,
            error: Some(e.to_string()),
        }),
    }
}

/// POST /banners/{id}/image
#[instrument(skip(_admin, state, session, multipart))]
pub async fn upload_image(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let banner = load_banner(&state, id).await?;
    let upload = read_image_upload(&mut multipart, state.config().max_upload_bytes).await?;
    let url = store_image(&state, "banners", upload).await?;

    let previous = match BannerRepository::new(state.pool())
        .set_image(banner.id, Some(&url))
        .await
    {
        Ok(previous) => previous,
        Err(e) => {
            discard_images(&state, &[url]).await;
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        discard_images(&state, &[previous]).await;
    }

    set_flash(&session, "Image uploaded").await?;
    Ok(Redirect::to(&format!("/banners/{id}")))
}

/// POST /banners/{id}/image/remove
#[instrument(skip(_admin, state, session))]
pub async fn remove_image(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let previous = BannerRepository::new(state.pool())
        .set_image(BannerId::new(id), None)
        .await?;
    if let Some(previous) = previous {
        discard_images(&state, &[previous]).await;
    }

    set_flash(&session, "Image removed").await?;
    Ok(Redirect::to(&format!("/banners/{id}")))
}

/// POST /banners/{id}/move
#[instrument(skip(_admin, state, form))]
pub async fn move_banner(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<MoveForm>,
) -> Result<Redirect> {
    BannerRepository::new(state.pool())
        .move_banner(BannerId::new(id), form.direction)
        .await?;
    Ok(Redirect::to("/banners"))
}

/// POST /banners/{id}/delete
#[instrument(skip(_admin, state, session))]
pub async fn delete(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let image = BannerRepository::new(state.pool())
        .delete(BannerId::new(id))
        .await?;
    if let Some(image) = image {
        discard_images(&state, &[image]).await;
    }

    tracing::info!(banner_id = id, "Deleted banner");
    set_flash(&session, "Banner deleted").await?;
    Ok(Redirect::to("/banners"))
}
