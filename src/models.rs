use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Identifier assigned by the external store. Never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        BookId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted catalog record, as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub price: Option<f64>,
    pub author_name: String,
    pub description: String,
    pub isbn: String,
    pub publication: String,
    /// `YYYY-MM-DD`, or empty when the store has no date.
    pub published_date: String,
    /// URL of the stored cover, if any.
    pub cover_image: Option<String>,
}

/// Render a price without a trailing `.0` for whole amounts.
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 && price.abs() < 1e15 {
        format!("{price:.0}")
    } else {
        price.to_string()
    }
}

/// The editable fields of a book, in the order they are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    CoverImage,
    Title,
    Price,
    AuthorName,
    Description,
    Isbn,
    Publication,
    PublishedDate,
}

impl Field {
    pub const TEXT: [Field; 7] = [
        Field::Title,
        Field::Price,
        Field::AuthorName,
        Field::Description,
        Field::Isbn,
        Field::Publication,
        Field::PublishedDate,
    ];

    /// Name used by the external store and by the HTML form inputs.
    pub fn wire_name(self) -> &'static str {
        match self {
            Field::CoverImage => "bookImage",
            Field::Title => "bookName",
            Field::Price => "bookPrice",
            Field::AuthorName => "authorName",
            Field::Description => "bookDescription",
            Field::Isbn => "isbnNumber",
            Field::Publication => "publication",
            Field::PublishedDate => "publishedAt",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Field> {
        match name {
            "bookImage" | "coverImage" => Some(Field::CoverImage),
            "bookName" | "title" => Some(Field::Title),
            "bookPrice" | "price" => Some(Field::Price),
            "authorName" | "autherName" => Some(Field::AuthorName),
            "bookDescription" | "description" => Some(Field::Description),
            "isbnNumber" | "isbn" => Some(Field::Isbn),
            "publication" => Some(Field::Publication),
            "publishedAt" | "publishedDate" => Some(Field::PublishedDate),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// An image file staged in a form but not yet uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl CoverImage {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = match content_type {
            Some(ct) if !ct.is_empty() => ct.to_string(),
            _ => content_type_for_file_name(&file_name).to_string(),
        };
        CoverImage {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Inline preview of the staged image.
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

impl fmt::Debug for CoverImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoverImage")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn content_type_for_file_name(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// A record exactly as the store sends it. The store has used several
/// spellings over time, so every known alias is captured here and resolved
/// in one place by `TryFrom<RawBook> for Book`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawBook {
    #[serde(rename = "_id")]
    underscore_id: Option<Value>,
    id: Option<Value>,
    book_name: Option<String>,
    title: Option<String>,
    book_price: Option<Value>,
    price: Option<Value>,
    author_name: Option<String>,
    auther_name: Option<String>,
    book_description: Option<String>,
    description: Option<String>,
    isbn_number: Option<Value>,
    isbn: Option<Value>,
    publication: Option<String>,
    published_at: Option<String>,
    published_date: Option<String>,
    book_image: Option<String>,
    cover_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MissingId;

impl TryFrom<RawBook> for Book {
    type Error = MissingId;

    fn try_from(raw: RawBook) -> Result<Self, Self::Error> {
        let id = first_present(scalar_text(raw.underscore_id), scalar_text(raw.id))
            .ok_or(MissingId)?;

        let price = raw
            .book_price
            .or(raw.price)
            .and_then(|value| match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            });

        let published_date = first_present(raw.published_at, raw.published_date)
            .map(|date| date_part(&date).to_string())
            .unwrap_or_default();

        Ok(Book {
            id: BookId::new(id),
            title: first_present(raw.book_name, raw.title).unwrap_or_default(),
            price,
            author_name: first_present(raw.author_name, raw.auther_name).unwrap_or_default(),
            description: first_present(raw.book_description, raw.description).unwrap_or_default(),
            isbn: first_present(scalar_text(raw.isbn_number), scalar_text(raw.isbn))
                .unwrap_or_default(),
            publication: raw.publication.unwrap_or_default(),
            published_date,
            cover_image: first_present(raw.book_image, raw.cover_image),
        })
    }
}

/// Prefer the canonical spelling unless it is missing or blank.
fn first_present(canonical: Option<String>, alias: Option<String>) -> Option<String> {
    match canonical {
        Some(value) if !value.is_empty() => Some(value),
        _ => alias.filter(|value| !value.is_empty()),
    }
}

fn scalar_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Drop the time component of an ISO timestamp.
fn date_part(date: &str) -> &str {
    date.split('T').next().unwrap_or(date)
}
