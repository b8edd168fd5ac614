use std::collections::BTreeMap;

use crate::form::{FormDraft, FormMode};
use crate::models::Field;

/// Failing fields and their messages. Empty means the draft may be submitted.
pub type ErrorMap = BTreeMap<Field, String>;

pub const MIN_TITLE_LEN: usize = 2;
pub const MIN_AUTHOR_LEN: usize = 3;
pub const MIN_DESCRIPTION_LEN: usize = 5;
pub const MIN_ISBN_DIGITS: usize = 13;

/// Check every field of the draft at once. A cover image is only required
/// when creating; on update an absent image means "keep the current one".
pub fn validate(draft: &FormDraft, mode: &FormMode) -> ErrorMap {
    let mut errors = ErrorMap::new();

    if mode.requires_cover_image() && draft.cover_image.is_none() {
        errors.insert(Field::CoverImage, "Please upload a book cover image".to_string());
    }
    if draft.title.chars().count() < MIN_TITLE_LEN {
        errors.insert(
            Field::Title,
            "Book title must be at least 2 characters long.".to_string(),
        );
    }
    if parse_price(&draft.price).is_none() {
        errors.insert(Field::Price, "Price must be a positive number.".to_string());
    }
    if draft.author_name.chars().count() < MIN_AUTHOR_LEN {
        errors.insert(
            Field::AuthorName,
            "Author name must be at least 3 characters long".to_string(),
        );
    }
    if draft.description.chars().count() < MIN_DESCRIPTION_LEN {
        errors.insert(
            Field::Description,
            "Description must be at least 5 characters long.".to_string(),
        );
    }
    if !is_valid_isbn(&draft.isbn) {
        errors.insert(Field::Isbn, "ISBN must be at least 13 digits".to_string());
    }
    if draft.publication.is_empty() {
        errors.insert(Field::Publication, "Publication is required".to_string());
    }
    if draft.published_date.is_empty() {
        errors.insert(
            Field::PublishedDate,
            "Published date is required".to_string(),
        );
    }

    errors
}

/// Shape check only: at least 13 characters, all ASCII digits. No check digit.
pub fn is_valid_isbn(isbn: &str) -> bool {
    isbn.len() >= MIN_ISBN_DIGITS && isbn.bytes().all(|b| b.is_ascii_digit())
}

/// A price is a finite decimal strictly greater than zero.
pub fn parse_price(price: &str) -> Option<f64> {
    price
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
}
