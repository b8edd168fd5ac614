//! In-memory `BookStore` double shared by the unit tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::form::BookPayload;
use crate::models::{Book, BookId, Field};
use crate::repo::BookStore;

pub(crate) fn sample_book(id: &str) -> Book {
    Book {
        id: BookId::new(id),
        title: "The Pragmatic Programmer".to_string(),
        price: Some(1999.0),
        author_name: "Andrew Hunt".to_string(),
        description: "From journeyman to master".to_string(),
        isbn: "9780201616224".to_string(),
        publication: "Addison-Wesley".to_string(),
        published_date: "1999-10-20".to_string(),
        cover_image: Some(format!("/uploads/{id}.jpg")),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    List,
    Get(BookId),
    Create(BookPayload),
    Update(BookId, BookPayload),
    Delete(BookId),
}

#[derive(Debug, Clone)]
pub(crate) enum Failure {
    Unreachable,
    Application(u16, Option<String>),
}

impl Failure {
    fn to_error(&self) -> StoreError {
        match self {
            Failure::Unreachable => StoreError::Unreachable("connection refused".to_string()),
            Failure::Application(status, message) => StoreError::Application {
                status: *status,
                message: message.clone(),
            },
        }
    }
}

#[derive(Default)]
struct Inner {
    books: BTreeMap<BookId, Book>,
    next_id: u64,
    calls: Vec<Call>,
    failure: Option<Failure>,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub(crate) fn with_books(books: Vec<Book>) -> Self {
        let store = MemoryStore::default();
        {
            let mut inner = store.lock();
            for book in books {
                inner.books.insert(book.id.clone(), book);
            }
        }
        store
    }

    /// Every subsequent call fails this way until reset with `None`.
    pub(crate) fn fail_with(&self, failure: Option<Failure>) {
        self.lock().failure = failure;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub(crate) fn book(&self, id: &BookId) -> Option<Book> {
        self.lock().books.get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: Call) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        if let Some(failure) = &inner.failure {
            return Err(failure.to_error());
        }
        Ok(inner)
    }
}

fn apply(book: &mut Book, payload: &BookPayload) {
    for (field, value) in &payload.fields {
        match field {
            Field::Title => book.title = value.clone(),
            Field::Price => book.price = value.parse().ok(),
            Field::AuthorName => book.author_name = value.clone(),
            Field::Description => book.description = value.clone(),
            Field::Isbn => book.isbn = value.clone(),
            Field::Publication => book.publication = value.clone(),
            Field::PublishedDate => book.published_date = value.clone(),
            Field::CoverImage => {}
        }
    }
    if let Some(image) = &payload.cover_image {
        book.cover_image = Some(format!("/uploads/{}", image.file_name));
    }
}

impl BookStore for MemoryStore {
    async fn list_books(&self) -> Result<Vec<Book>, StoreError> {
        let inner = self.record(Call::List)?;
        Ok(inner.books.values().cloned().collect())
    }

    async fn get_book(&self, id: &BookId) -> Result<Option<Book>, StoreError> {
        let inner = self.record(Call::Get(id.clone()))?;
        Ok(inner.books.get(id).cloned())
    }

    async fn create_book(&self, payload: BookPayload) -> Result<Option<Book>, StoreError> {
        let mut inner = self.record(Call::Create(payload.clone()))?;
        inner.next_id += 1;
        let mut book = Book {
            id: BookId::new(inner.next_id.to_string()),
            title: String::new(),
            price: None,
            author_name: String::new(),
            description: String::new(),
            isbn: String::new(),
            publication: String::new(),
            published_date: String::new(),
            cover_image: None,
        };
        apply(&mut book, &payload);
        inner.books.insert(book.id.clone(), book.clone());
        Ok(Some(book))
    }

    async fn update_book(&self, id: &BookId, payload: BookPayload) -> Result<(), StoreError> {
        let mut inner = self.record(Call::Update(id.clone(), payload.clone()))?;
        match inner.books.get_mut(id) {
            Some(book) => {
                apply(book, &payload);
                Ok(())
            }
            None => Err(StoreError::Application {
                status: 404,
                message: Some("Book not found".to_string()),
            }),
        }
    }

    async fn delete_book(&self, id: &BookId) -> Result<(), StoreError> {
        let mut inner = self.record(Call::Delete(id.clone()))?;
        match inner.books.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::Application {
                status: 404,
                message: Some("Book not found".to_string()),
            }),
        }
    }
}
