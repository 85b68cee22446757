//! Home page route handler.
//!
//! The page is assembled from the CMS tables: sections in position order,
//! their blocks with the visitor's translation overlaid, live banners and
//! the footer.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::models::HomePage;
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub page: Arc<HomePage>,
}

/// Display the home page.
///
/// A failed content load renders the page without CMS content rather than
/// an error page.
#[instrument(skip(state, layout), fields(locale = %layout.locale))]
pub async fn home(State(state): State<AppState>, layout: Layout) -> impl IntoResponse {
    let page = match state
        .home_cache()
        .get(state.pool(), &layout.locale, &state.config().default_locale)
        .await
    {
        Ok(page) => page,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load home page content");
            Arc::new(HomePage::default())
        }
    };

    HomeTemplate { layout, page }
}
