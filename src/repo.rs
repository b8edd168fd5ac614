use crate::error::StoreError;
use crate::form::BookPayload;
use crate::models::{Book, BookId};
use std::future::Future;

/// The external store that owns all durable book data.
pub trait BookStore {
    fn list_books(&self) -> impl Future<Output = Result<Vec<Book>, StoreError>> + Send;

    /// `Ok(None)` when the store has no record with this id.
    fn get_book(&self, id: &BookId)
        -> impl Future<Output = Result<Option<Book>, StoreError>> + Send;

    /// Returns the created record when the store echoes it back.
    fn create_book(
        &self,
        payload: BookPayload,
    ) -> impl Future<Output = Result<Option<Book>, StoreError>> + Send;

    /// Only the fields present in `payload` are changed.
    fn update_book(
        &self,
        id: &BookId,
        payload: BookPayload,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_book(&self, id: &BookId) -> impl Future<Output = Result<(), StoreError>> + Send;
}
