use std::time::Instant;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::form::{FormController, FormMode, SubmitOutcome};
use crate::models::{BookId, CoverImage, Field};
use crate::render::{self, Chrome};
use crate::repo::BookStore;
use crate::shell::{DeferredNavigation, Route, ShellState, Theme};
use crate::views::{DeleteOutcome, DetailState, DetailView, ListView};

const UPLOAD_TOO_LARGE_MESSAGE: &str =
    "Cover image is too large. Please choose a smaller file.";
const UNREADABLE_FORM_MESSAGE: &str = "Could not read the submitted form. Please try again.";

/// Hidden form input carrying the stored cover URL of a record being edited.
const CURRENT_COVER_FIELD: &str = "currentCover";

const PREFERS_COLOR_SCHEME: &str = "sec-ch-prefers-color-scheme";

/// Largest form post accepted, cover image included.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
struct AppState<S> {
    store: S,
}

/// Routes the application serves, each rendering one page view.
pub fn build_app<S>(store: S) -> Router
where
    S: BookStore + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_books))
        .route("/addbook", get(new_book_form).post(insert_book))
        .route("/book/{id}", get(get_book))
        .route("/book/{id}/delete", post(delete_book))
        .route("/editbook/{id}", get(edit_book_form).post(update_book))
        .fallback(unknown_route)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(AppState { store })
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    theme: Option<String>,
    menu: Option<String>,
    profile: Option<String>,
    delete: Option<String>,
}

impl PageQuery {
    fn shell(&self) -> ShellState {
        ShellState {
            theme: self
                .theme
                .as_deref()
                .and_then(Theme::parse)
                .unwrap_or(Theme::System),
            mobile_menu_open: self.menu.as_deref() == Some("open"),
            profile_open: self.profile.as_deref() == Some("open"),
        }
    }
}

fn chrome(query: &PageQuery, headers: &HeaderMap, uri: &Uri) -> Chrome {
    let system_prefers_dark = headers
        .get(PREFERS_COLOR_SCHEME)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_matches('"') == "dark");

    // Toggle links reload the canonical path of a known route.
    let path = Route::parse(uri.path())
        .map(|route| route.path())
        .unwrap_or_else(|| uri.path().to_string());

    Chrome {
        shell: query.shell(),
        system_prefers_dark,
        path,
    }
}

/// Ask the browser to send its colour-scheme preference on later requests.
fn respond(status: StatusCode, html: String) -> Response {
    (
        status,
        [
            (HeaderName::from_static("accept-ch"), "Sec-CH-Prefers-Color-Scheme"),
            (header::VARY, "Sec-CH-Prefers-Color-Scheme"),
        ],
        Html(html),
    )
        .into_response()
}

async fn list_books<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response
where
    S: BookStore + Clone + Send + Sync,
{
    let chrome = chrome(&query, &headers, &uri);
    let mut view = ListView::new();
    view.load(&state.store).await;

    let body = render::book_list(view.state(), &chrome);
    respond(StatusCode::OK, render::page(&chrome, "Books", &body, None))
}

async fn get_book<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response
where
    S: BookStore + Clone + Send + Sync,
{
    let chrome = chrome(&query, &headers, &uri);
    let mut view = DetailView::new(BookId::new(id));
    view.load(&state.store).await;

    match query.delete.as_deref() {
        Some("confirm") => {
            if let Err(rejected) = view.request_delete() {
                debug!(?rejected, "delete confirmation not shown");
            }
        }
        Some("cancel") => view.cancel_delete(),
        _ => {}
    }

    detail_page(&view, &chrome, None)
}

fn detail_page(
    view: &DetailView,
    chrome: &Chrome,
    navigation: Option<&DeferredNavigation>,
) -> Response {
    let now = Instant::now();
    let (status, title) = match view.state() {
        DetailState::NotFound => (StatusCode::NOT_FOUND, "Book Not Found".to_string()),
        DetailState::Loaded(book) => (StatusCode::OK, book.title.clone()),
        DetailState::Loading => (StatusCode::OK, "Loading".to_string()),
    };
    let body = render::book_detail(view, chrome, now);
    respond(status, render::page(chrome, &title, &body, navigation))
}

async fn delete_book<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response
where
    S: BookStore + Clone + Send + Sync,
{
    let mut chrome = chrome(&query, &headers, &uri);
    let mut view = DetailView::new(BookId::new(id));
    view.load(&state.store).await;
    // Header toggles should reload the record page, not re-post the delete.
    chrome.path = Route::Book(view.id().clone()).path();

    // Posting this form is the confirmation.
    if let Err(rejected) = view.request_delete() {
        debug!(?rejected, "nothing to delete");
        return detail_page(&view, &chrome, None);
    }

    match view.confirm_delete(&state.store, Instant::now()).await {
        DeleteOutcome::Deleted(navigation) => {
            info!("Navigating to {} in {:?}", navigation.to, navigation.after);
            detail_page(&view, &chrome, Some(&navigation))
        }
        DeleteOutcome::Failed | DeleteOutcome::Rejected(_) => detail_page(&view, &chrome, None),
    }
}

async fn new_book_form(
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let chrome = chrome(&query, &headers, &uri);
    let form = FormController::new(FormMode::Create);
    let body = render::book_form(&form, Instant::now());
    respond(StatusCode::OK, render::page(&chrome, "Add Book", &body, None))
}

async fn insert_book<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    uri: Uri,
    multipart: Multipart,
) -> Response
where
    S: BookStore + Clone + Send + Sync,
{
    let chrome = chrome(&query, &headers, &uri);
    let form = FormController::new(FormMode::Create);
    submit_form(&state.store, form, multipart, &chrome, "Add Book").await
}

async fn edit_book_form<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response
where
    S: BookStore + Clone + Send + Sync,
{
    let chrome = chrome(&query, &headers, &uri);
    let mut view = DetailView::new(BookId::new(id));
    view.load(&state.store).await;

    match view.book() {
        Some(book) => {
            let form = FormController::for_update(book);
            let body = render::book_form(&form, Instant::now());
            respond(StatusCode::OK, render::page(&chrome, "Edit Book", &body, None))
        }
        None => detail_page(&view, &chrome, None),
    }
}

async fn update_book<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    uri: Uri,
    multipart: Multipart,
) -> Response
where
    S: BookStore + Clone + Send + Sync,
{
    let chrome = chrome(&query, &headers, &uri);
    let form = FormController::new(FormMode::Update(BookId::new(id)));
    submit_form(&state.store, form, multipart, &chrome, "Edit Book").await
}

async fn submit_form<S: BookStore>(
    store: &S,
    mut form: FormController,
    multipart: Multipart,
    chrome: &Chrome,
    title: &str,
) -> Response {
    let now = Instant::now();
    if let Err(e) = read_form(&mut form, multipart).await {
        warn!(error = %e, "could not read submitted book form");
        let status = e.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            UPLOAD_TOO_LARGE_MESSAGE
        } else {
            UNREADABLE_FORM_MESSAGE
        };
        form.show_error(message, now);
        let body = render::book_form(&form, now);
        return respond(status, render::page(chrome, title, &body, None));
    }

    let outcome = form.submit(store, now).await;
    let (status, navigation) = match outcome {
        SubmitOutcome::Succeeded(navigation) => {
            info!("Navigating to {} in {:?}", navigation.to, navigation.after);
            (StatusCode::OK, Some(navigation))
        }
        SubmitOutcome::Rejected(rejected) => {
            debug!(?rejected, "book form not submitted");
            (StatusCode::UNPROCESSABLE_ENTITY, None)
        }
        SubmitOutcome::Failed => (StatusCode::BAD_GATEWAY, None),
    };

    let body = render::book_form(&form, now);
    respond(status, render::page(chrome, title, &body, navigation.as_ref()))
}

/// Feed each submitted part into the form as a field edit.
async fn read_form(
    form: &mut FormController,
    mut multipart: Multipart,
) -> Result<(), MultipartError> {
    while let Some(entry) = multipart.next_field().await? {
        let name = entry.name().unwrap_or_default().to_string();

        if name == CURRENT_COVER_FIELD {
            let url = entry.text().await?;
            form.set_stored_cover(Some(url));
            continue;
        }

        match Field::from_wire_name(&name) {
            Some(Field::CoverImage) => {
                let file_name = entry.file_name().unwrap_or_default().to_string();
                let content_type = entry.content_type().map(str::to_string);
                let bytes = entry.bytes().await?;
                // An untouched file input still posts an empty part.
                if bytes.is_empty() {
                    continue;
                }
                form.stage_cover_image(CoverImage::new(
                    file_name,
                    content_type.as_deref(),
                    bytes.to_vec(),
                ));
            }
            Some(field) => {
                let value = entry.text().await?;
                form.set_text(field, value);
            }
            None => debug!(%name, "ignoring unknown form field"),
        }
    }
    Ok(())
}

async fn unknown_route(
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    info!("No page at {}", uri.path());
    let chrome = chrome(&query, &headers, &uri);
    let body = render::unknown_route(&chrome);
    respond(StatusCode::NOT_FOUND, render::page(&chrome, "Not Found", &body, None))
}
