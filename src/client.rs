use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::form::BookPayload;
use crate::models::{Book, BookId, Field, RawBook};
use crate::repo::BookStore;

/// Success bodies from the store are wrapped in `{ "data": ... }`.
#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct FailureBody {
    message: Option<String>,
}

/// `BookStore` backed by the remote HTTP service.
#[derive(Clone)]
pub struct HttpBookStore {
    http: Client,
    base_url: String,
}

impl HttpBookStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(StoreError::InvalidUrl(format!(
                "{base_url:?} must start with http:// or https://"
            )));
        }

        // No request timeout: the store's own timeout behaviour applies.
        let http = Client::builder()
            .user_agent(concat!("bookstore_catalog/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpBookStore { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn books_url(&self) -> String {
        format!("{}/books", self.base_url)
    }

    fn book_url(&self, id: &BookId) -> String {
        format!("{}/book/{}", self.base_url, urlencoding::encode(id.as_str()))
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_connect() || e.is_timeout() {
        StoreError::Unreachable(e.to_string())
    } else {
        StoreError::Request(e)
    }
}

/// Turn a non-success response into an application error, keeping the
/// store's `message` when it sent one.
async fn failure(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<FailureBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .or_else(|| {
            let text = body.trim();
            (!text.is_empty() && !text.starts_with('{')).then(|| text.to_string())
        });
    StoreError::Application { status, message }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    let envelope: Envelope<T> =
        serde_json::from_str(&body).map_err(|e| StoreError::Parse(e.to_string()))?;
    Ok(envelope.data)
}

fn multipart_form(payload: BookPayload) -> Result<Form> {
    let mut form = Form::new();
    for (field, value) in payload.fields {
        form = form.text(field.wire_name(), value);
    }
    if let Some(image) = payload.cover_image {
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        form = form.part(Field::CoverImage.wire_name(), part);
    }
    Ok(form)
}

impl BookStore for HttpBookStore {
    async fn list_books(&self) -> Result<Vec<Book>> {
        let response = self
            .http
            .get(self.books_url())
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let raw: Vec<RawBook> = read_envelope(response).await?.unwrap_or_default();
        let books: Vec<Book> = raw
            .into_iter()
            .filter_map(|raw| match Book::try_from(raw) {
                Ok(book) => Some(book),
                Err(_) => {
                    warn!("Skipping book without an identifier");
                    None
                }
            })
            .collect();

        debug!(count = books.len(), "listed books");
        Ok(books)
    }

    async fn get_book(&self, id: &BookId) -> Result<Option<Book>> {
        let response = self
            .http
            .get(self.book_url(id))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        match read_envelope::<RawBook>(response).await? {
            Some(raw) => Book::try_from(raw)
                .map(Some)
                .map_err(|_| StoreError::Parse(format!("book {id} has no identifier"))),
            None => Ok(None),
        }
    }

    async fn create_book(&self, payload: BookPayload) -> Result<Option<Book>> {
        let form = multipart_form(payload)?;
        let response = self
            .http
            .post(self.books_url())
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        // The store may or may not echo the record back.
        let created = match read_envelope::<RawBook>(response).await {
            Ok(Some(raw)) => Book::try_from(raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "created book, but the response body was unreadable");
                None
            }
        };
        match &created {
            Some(book) => info!("Created book in the store: {}", book.id),
            None => info!("Created book in the store"),
        }
        Ok(created)
    }

    async fn update_book(&self, id: &BookId, payload: BookPayload) -> Result<()> {
        let form = multipart_form(payload)?;
        let response = self
            .http
            .patch(self.book_url(id))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        info!("Updated book in the store: {}", id);
        Ok(())
    }

    async fn delete_book(&self, id: &BookId) -> Result<()> {
        let response = self
            .http
            .delete(self.book_url(id))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        info!("Deleted book from the store: {}", id);
        Ok(())
    }
}
