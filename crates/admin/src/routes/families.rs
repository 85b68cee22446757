//! Product family route handlers.

use askama::Template;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::ProductFamilyId;

use crate::db::{FamilyRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, RequireEditor};
use crate::models::{FamilyForm, ProductFamily};
use crate::routes::products::ImageForm;
use crate::routes::{Chrome, render, render_invalid, set_flash};
use crate::services::{discard_images, read_image_upload, store_image};
use crate::state::AppState;

/// Family list template.
#[derive(Template)]
#[template(path = "families/index.html")]
pub struct FamiliesIndexTemplate {
    pub chrome: Chrome,
    pub families: Vec<ProductFamily>,
}

/// Family create/edit template.
#[derive(Template)]
#[template(path = "families/form.html")]
pub struct FamilyFormTemplate {
    pub chrome: Chrome,
    pub family: Option<ProductFamily>,
    pub form: FamilyForm,
    pub error: Option<String>,
}

impl FamilyFormTemplate {
    fn action(&self) -> String {
        self.family
            .as_ref()
            .map_or_else(|| "/families".to_owned(), |f| format!("/families/{}", f.id))
    }
}

async fn load_family(state: &AppState, id: i32) -> Result<ProductFamily> {
    FamilyRepository::new(state.pool())
        .get(ProductFamilyId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("family {id}")))
}

/// Family list with product counts.
///
/// GET /families
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let template = FamiliesIndexTemplate {
        chrome: Chrome::new(&admin, &session, "/families").await?,
        families: FamilyRepository::new(state.pool()).list().await?,
    };
    render(&template)
}

/// GET /families/new
pub async fn new(RequireEditor(admin): RequireEditor, session: Session) -> Result<Html<String>> {
    render(&FamilyFormTemplate {
        chrome: Chrome::new(&admin, &session, "/families").await?,
        family: None,
        form: FamilyForm::default(),
        error: None,
    })
}

/// POST /families
#[instrument(skip_all)]
pub async fn create(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<FamilyForm>,
) -> Result<Response> {
    let message = match form.validate() {
        Ok(input) => match FamilyRepository::new(state.pool()).create(&input).await {
            Ok(id) => {
                set_flash(&session, format!("Created family {}", input.name)).await?;
                return Ok(Redirect::to(&format!("/families/{id}")).into_response());
            }
            Err(RepositoryError::Conflict(message)) => message,
            Err(e) => return Err(e.into()),
        },
        Err(e) => e.to_string(),
    };

    render_invalid(&FamilyFormTemplate {
        chrome: Chrome::new(&admin, &session, "/families").await?,
        family: None,
        form,
        error: Some(message),
    })
}

/// GET /families/{id}
#[instrument(skip(admin, state, session))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Html<String>> {
    let family = load_family(&state, id).await?;
    render(&FamilyFormTemplate {
        chrome: Chrome::new(&admin, &session, "/families").await?,
        form: FamilyForm::from_family(&family),
        family: Some(family),
        error: None,
    })
}

/// POST /families/{id}
#[instrument(skip(admin, state, session, form))]
pub async fn update(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<FamilyForm>,
) -> Result<Response> {
    let family = load_family(&state, id).await?;

    let message = match form.validate() {
        Ok(input) => match FamilyRepository::new(state.pool())
            .update(family.id, &input)
            .await
        {
            Ok(()) => {
                set_flash(&session, "Family saved").await?;
                return Ok(Redirect::to(&format!("/families/{id}")).into_response());
            }
            Err(RepositoryError::Conflict(message)) => message,
            Err(e) => return Err(e.into()),
        },
        Err(e) => e.to_string(),
    };

    render_invalid(&FamilyFormTemplate {
        chrome: Chrome::new(&admin, &session, "/families").await?,
        family: Some(family),
        form,
        error: Some(message),
    })
}

/// Delete a family. Its products stay, without a family.
///
/// POST /families/{id}/delete
#[instrument(skip(_admin, state, session))]
pub async fn delete(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let images = FamilyRepository::new(state.pool())
        .delete(ProductFamilyId::new(id))
        .await?;
    discard_images(&state, &images).await;

    tracing::info!(family_id = id, "Deleted product family");
    set_flash(&session, "Family deleted").await?;
    Ok(Redirect::to("/families"))
}

/// POST /families/{id}/images
#[instrument(skip(_admin, state, session, multipart))]
pub async fn upload_image(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let family = load_family(&state, id).await?;
    let upload = read_image_upload(&mut multipart, state.config().max_upload_bytes).await?;

    let url = store_image(&state, &format!("families/{}", family.slug), upload).await?;
    if let Err(e) = FamilyRepository::new(state.pool())
        .add_image(family.id, &url)
        .await
    {
        discard_images(&state, &[url]).await;
        return Err(e.into());
    }

    set_flash(&session, "Image uploaded").await?;
    Ok(Redirect::to(&format!("/families/{id}")))
}

/// POST /families/{id}/images/remove
#[instrument(skip(_admin, state, session, form))]
pub async fn remove_image(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<ImageForm>,
) -> Result<Redirect> {
    let family = load_family(&state, id).await?;
    if !family.images.contains(&form.url) {
        return Err(AppError::BadRequest("image does not belong to this family".to_string()));
    }

    FamilyRepository::new(state.pool())
        .remove_image(family.id, &form.url)
        .await?;
    discard_images(&state, &[form.url]).await;

    set_flash(&session, "Image removed").await?;
    Ok(Redirect::to(&format!("/families/{id}")))
}
