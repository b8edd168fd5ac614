use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::models::{format_price, Book, BookId, CoverImage, Field};
use crate::repo::BookStore;
use crate::shell::{DeferredNavigation, Route};
use crate::validation::{validate, ErrorMap};

/// How long any banner stays up before it dismisses itself.
pub const BANNER_DURATION: Duration = Duration::from_secs(5);
pub const CREATE_REDIRECT_DELAY: Duration = Duration::from_secs(3);
pub const UPDATE_REDIRECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update(BookId),
}

impl FormMode {
    pub fn requires_cover_image(&self) -> bool {
        matches!(self, FormMode::Create)
    }

    fn success_message(&self) -> &'static str {
        match self {
            FormMode::Create => "Book added successfully!",
            FormMode::Update(_) => "Book updated successfully!",
        }
    }

    fn failure_fallback(&self) -> &'static str {
        match self {
            FormMode::Create => "Failed to add book",
            FormMode::Update(_) => "Failed to update book",
        }
    }

    fn navigation_after_success(&self) -> DeferredNavigation {
        match self {
            FormMode::Create => DeferredNavigation::new(Route::Home, CREATE_REDIRECT_DELAY),
            FormMode::Update(id) => {
                DeferredNavigation::new(Route::Book(id.clone()), UPDATE_REDIRECT_DELAY)
            }
        }
    }
}

/// Editable copy of a book's fields. Text is kept exactly as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormDraft {
    pub title: String,
    pub price: String,
    pub author_name: String,
    pub description: String,
    pub isbn: String,
    pub publication: String,
    pub published_date: String,
    pub cover_image: Option<CoverImage>,
}

impl FormDraft {
    pub fn from_book(book: &Book) -> Self {
        FormDraft {
            title: book.title.clone(),
            price: book.price.map(format_price).unwrap_or_default(),
            author_name: book.author_name.clone(),
            description: book.description.clone(),
            isbn: book.isbn.clone(),
            publication: book.publication.clone(),
            published_date: book.published_date.clone(),
            cover_image: None,
        }
    }

    /// Value of a text field. The cover image has no text value.
    pub fn text(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Price => &self.price,
            Field::AuthorName => &self.author_name,
            Field::Description => &self.description,
            Field::Isbn => &self.isbn,
            Field::Publication => &self.publication,
            Field::PublishedDate => &self.published_date,
            Field::CoverImage => "",
        }
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Title => Some(&mut self.title),
            Field::Price => Some(&mut self.price),
            Field::AuthorName => Some(&mut self.author_name),
            Field::Description => Some(&mut self.description),
            Field::Isbn => Some(&mut self.isbn),
            Field::Publication => Some(&mut self.publication),
            Field::PublishedDate => Some(&mut self.published_date),
            Field::CoverImage => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Editing,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    pub shown_at: Instant,
}

impl Banner {
    pub fn success(message: impl Into<String>, now: Instant) -> Self {
        Banner {
            kind: BannerKind::Success,
            message: message.into(),
            shown_at: now,
        }
    }

    pub fn error(message: impl Into<String>, now: Instant) -> Self {
        Banner {
            kind: BannerKind::Error,
            message: message.into(),
            shown_at: now,
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        self.remaining(now) > Duration::ZERO
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        BANNER_DURATION.saturating_sub(now.saturating_duration_since(self.shown_at))
    }
}

/// The multipart body of a write request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPayload {
    pub fields: Vec<(Field, String)>,
    pub cover_image: Option<CoverImage>,
}

impl BookPayload {
    pub fn text(&self, field: Field) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitRequest {
    /// `POST /books`
    Create(BookPayload),
    /// `PATCH /book/{id}`
    Update { id: BookId, payload: BookPayload },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    /// A request is already in flight.
    Busy,
    /// The previous submission succeeded and its navigation is pending.
    AlreadySubmitted,
    /// Validation failed; see the error map.
    Invalid,
    /// A result arrived while no request was in flight.
    NotSubmitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(SubmitRejected),
    Succeeded(DeferredNavigation),
    Failed,
}

/// Create/update form state machine:
/// `Editing -> Validating -> Submitting -> {Succeeded | Failed} -> Editing`.
#[derive(Debug, Clone)]
pub struct FormController {
    mode: FormMode,
    draft: FormDraft,
    errors: ErrorMap,
    phase: Phase,
    banner: Option<Banner>,
    preview: Option<String>,
    /// Cover URL of the stored record, shown when nothing is staged.
    stored_cover: Option<String>,
}

impl FormController {
    pub fn new(mode: FormMode) -> Self {
        FormController {
            mode,
            draft: FormDraft::default(),
            errors: ErrorMap::new(),
            phase: Phase::Editing,
            banner: None,
            preview: None,
            stored_cover: None,
        }
    }

    /// An update form pre-filled from the stored record.
    pub fn for_update(book: &Book) -> Self {
        let mut form = FormController::new(FormMode::Update(book.id.clone()));
        form.draft = FormDraft::from_book(book);
        form.set_stored_cover(book.cover_image.clone());
        form
    }

    pub fn set_stored_cover(&mut self, url: Option<String>) {
        self.stored_cover = url.filter(|u| !u.is_empty());
        if self.draft.cover_image.is_none() {
            self.preview = self.stored_cover.clone();
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn draft(&self) -> &FormDraft {
        &self.draft
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn stored_cover(&self) -> Option<&str> {
        self.stored_cover.as_deref()
    }

    /// The submit control is disabled while a request is in flight.
    pub fn submit_enabled(&self) -> bool {
        self.phase != Phase::Submitting
    }

    pub fn banner(&self, now: Instant) -> Option<&Banner> {
        self.banner.as_ref().filter(|b| b.is_visible(now))
    }

    /// Show an error that did not come from the store, such as an upload
    /// that could not be read. The draft is kept for a retry.
    pub fn show_error(&mut self, message: impl Into<String>, now: Instant) {
        self.banner = Some(Banner::error(message, now));
        if self.phase != Phase::Submitting {
            self.phase = Phase::Editing;
        }
    }

    /// Update one text field. Clears that field's error and no other.
    pub fn set_text(&mut self, field: Field, value: impl Into<String>) {
        let Some(slot) = self.draft.text_mut(field) else {
            warn!(%field, "ignoring text value for a non-text field");
            return;
        };
        *slot = value.into();
        self.field_edited(field);
    }

    /// Stage a newly selected cover file and derive its preview.
    pub fn stage_cover_image(&mut self, image: CoverImage) {
        self.preview = Some(image.data_uri());
        self.draft.cover_image = Some(image);
        self.field_edited(Field::CoverImage);
    }

    pub fn clear_cover_image(&mut self) {
        self.draft.cover_image = None;
        self.preview = self.stored_cover.clone();
        self.field_edited(Field::CoverImage);
    }

    fn field_edited(&mut self, field: Field) {
        self.errors.remove(&field);
        if matches!(self.phase, Phase::Succeeded | Phase::Failed) {
            self.phase = Phase::Editing;
        }
    }

    /// Validate the draft and, if it passes, move to `Submitting` and hand
    /// back the single write request to issue.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, SubmitRejected> {
        match self.phase {
            Phase::Submitting => return Err(SubmitRejected::Busy),
            Phase::Succeeded => return Err(SubmitRejected::AlreadySubmitted),
            _ => {}
        }

        self.phase = Phase::Validating;
        self.errors = validate(&self.draft, &self.mode);
        if !self.errors.is_empty() {
            debug!(fields = ?self.errors.keys().collect::<Vec<_>>(), "draft failed validation");
            self.phase = Phase::Editing;
            return Err(SubmitRejected::Invalid);
        }

        self.banner = None;
        self.phase = Phase::Submitting;
        let payload = self.payload();
        Ok(match &self.mode {
            FormMode::Create => SubmitRequest::Create(payload),
            FormMode::Update(id) => SubmitRequest::Update {
                id: id.clone(),
                payload,
            },
        })
    }

    /// Create sends every field; update sends only non-empty ones so the
    /// store keeps whatever was left out.
    fn payload(&self) -> BookPayload {
        let partial = !matches!(self.mode, FormMode::Create);
        let fields = Field::TEXT
            .iter()
            .map(|&field| (field, self.draft.text(field)))
            .filter(|(_, value)| !(partial && value.is_empty()))
            .map(|(field, value)| (field, value.to_string()))
            .collect();

        BookPayload {
            fields,
            cover_image: self.draft.cover_image.clone(),
        }
    }

    pub fn finish_submit(&mut self, result: Result<(), StoreError>, now: Instant) -> SubmitOutcome {
        if self.phase != Phase::Submitting {
            warn!(phase = ?self.phase, "discarding submit result with no request in flight");
            return SubmitOutcome::Rejected(SubmitRejected::NotSubmitting);
        }

        match result {
            Ok(()) => {
                self.banner = Some(Banner::success(self.mode.success_message(), now));
                self.errors.clear();
                if self.mode == FormMode::Create {
                    self.draft = FormDraft::default();
                    self.preview = None;
                }
                self.phase = Phase::Succeeded;

                let navigation = self.mode.navigation_after_success();
                info!(
                    to = %navigation.to,
                    after_ms = navigation.after.as_millis() as u64,
                    "book saved, scheduling navigation"
                );
                SubmitOutcome::Succeeded(navigation)
            }
            Err(e) => {
                error!(error = %e, mode = ?self.mode, "failed to save book");
                let message = e.user_message(self.mode.failure_fallback());
                self.banner = Some(Banner::error(message, now));
                self.phase = Phase::Failed;
                SubmitOutcome::Failed
            }
        }
    }

    /// Run a whole submission against `store`.
    pub async fn submit<S: BookStore>(&mut self, store: &S, now: Instant) -> SubmitOutcome {
        let request = match self.begin_submit() {
            Ok(request) => request,
            Err(rejected) => return SubmitOutcome::Rejected(rejected),
        };

        let result = match request {
            SubmitRequest::Create(payload) => store.create_book(payload).await.map(|_| ()),
            SubmitRequest::Update { id, payload } => store.update_book(&id, payload).await,
        };

        self.finish_submit(result, now)
    }
}
