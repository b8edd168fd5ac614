use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::error::StoreError;
use crate::form::Banner;
use crate::models::{Book, BookId};
use crate::repo::BookStore;
use crate::shell::{DeferredNavigation, Route};

pub const DELETE_REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Handed out when a view starts loading. A result is only applied if its
/// ticket is still the latest one and the view is still mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Default)]
struct Mount {
    generation: u64,
    mounted: bool,
}

impl Mount {
    fn begin(&mut self) -> LoadTicket {
        self.generation += 1;
        self.mounted = true;
        LoadTicket(self.generation)
    }

    fn end(&mut self) {
        self.mounted = false;
    }

    fn accepts(&self, ticket: LoadTicket) -> bool {
        self.mounted && ticket.0 == self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListState {
    Loading,
    /// The read succeeded with no records, or the read failed.
    Empty,
    Populated(Vec<Book>),
}

/// The catalog listing.
#[derive(Debug)]
pub struct ListView {
    state: ListState,
    mount: Mount,
}

impl Default for ListView {
    fn default() -> Self {
        ListView::new()
    }
}

impl ListView {
    pub fn new() -> Self {
        ListView {
            state: ListState::Loading,
            mount: Mount::default(),
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn mount(&mut self) -> LoadTicket {
        self.state = ListState::Loading;
        self.mount.begin()
    }

    pub fn unmount(&mut self) {
        self.mount.end();
    }

    /// Returns false when the result was stale and got discarded.
    pub fn resolve(&mut self, ticket: LoadTicket, result: Result<Vec<Book>, StoreError>) -> bool {
        if !self.mount.accepts(ticket) {
            debug!(?ticket, "discarding stale book list");
            return false;
        }

        self.state = match result {
            Ok(books) if books.is_empty() => ListState::Empty,
            Ok(books) => {
                info!("Retrieved {} books from the store", books.len());
                ListState::Populated(books)
            }
            Err(e) => {
                error!(error = %e, "Error fetching books");
                ListState::Empty
            }
        };
        true
    }

    pub async fn load<S: BookStore>(&mut self, store: &S) {
        let ticket = self.mount();
        let result = store.list_books().await;
        self.resolve(ticket, result);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    /// No such record, or it could not be fetched.
    NotFound,
    Loaded(Book),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    Idle,
    /// Waiting for the user to confirm.
    Confirming,
    Deleting,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRejected {
    NotLoaded,
    NotConfirmed,
    Busy,
    AlreadyDeleted,
    NotDeleting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Rejected(DeleteRejected),
    Deleted(DeferredNavigation),
    Failed,
}

/// A single record, with the delete action.
#[derive(Debug)]
pub struct DetailView {
    id: BookId,
    state: DetailState,
    delete: DeleteState,
    banner: Option<Banner>,
    mount: Mount,
}

impl DetailView {
    pub fn new(id: BookId) -> Self {
        DetailView {
            id,
            state: DetailState::Loading,
            delete: DeleteState::Idle,
            banner: None,
            mount: Mount::default(),
        }
    }

    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn book(&self) -> Option<&Book> {
        match &self.state {
            DetailState::Loaded(book) => Some(book),
            _ => None,
        }
    }

    pub fn delete_state(&self) -> DeleteState {
        self.delete
    }

    pub fn banner(&self, now: Instant) -> Option<&Banner> {
        self.banner.as_ref().filter(|b| b.is_visible(now))
    }

    /// Where the not-found view's only action leads.
    pub fn back_to_listing(&self) -> Route {
        Route::Home
    }

    pub fn edit_route(&self) -> Route {
        Route::EditBook(self.id.clone())
    }

    pub fn mount(&mut self) -> LoadTicket {
        self.state = DetailState::Loading;
        self.mount.begin()
    }

    pub fn unmount(&mut self) {
        self.mount.end();
    }

    pub fn resolve(
        &mut self,
        ticket: LoadTicket,
        result: Result<Option<Book>, StoreError>,
    ) -> bool {
        if !self.mount.accepts(ticket) {
            debug!(id = %self.id, ?ticket, "discarding stale book details");
            return false;
        }

        self.state = match result {
            Ok(Some(book)) => {
                info!("Retrieved book from the store: {}", book.id);
                DetailState::Loaded(book)
            }
            Ok(None) => {
                info!("No book found with ID: {}", self.id);
                DetailState::NotFound
            }
            Err(e) => {
                error!(id = %self.id, error = %e, "Error fetching book details");
                DetailState::NotFound
            }
        };
        true
    }

    pub async fn load<S: BookStore>(&mut self, store: &S) {
        let ticket = self.mount();
        let result = store.get_book(&self.id).await;
        self.resolve(ticket, result);
    }

    /// Ask for confirmation before deleting.
    pub fn request_delete(&mut self) -> Result<(), DeleteRejected> {
        if self.book().is_none() {
            return Err(DeleteRejected::NotLoaded);
        }
        match self.delete {
            DeleteState::Idle | DeleteState::Confirming => {
                self.delete = DeleteState::Confirming;
                Ok(())
            }
            DeleteState::Deleting => Err(DeleteRejected::Busy),
            DeleteState::Deleted => Err(DeleteRejected::AlreadyDeleted),
        }
    }

    pub fn cancel_delete(&mut self) {
        if self.delete == DeleteState::Confirming {
            self.delete = DeleteState::Idle;
        }
    }

    /// Confirmation given: move to `Deleting`. The caller issues the DELETE.
    pub fn begin_delete(&mut self) -> Result<BookId, DeleteRejected> {
        match self.delete {
            DeleteState::Confirming => {
                self.delete = DeleteState::Deleting;
                self.banner = None;
                Ok(self.id.clone())
            }
            DeleteState::Idle => Err(DeleteRejected::NotConfirmed),
            DeleteState::Deleting => Err(DeleteRejected::Busy),
            DeleteState::Deleted => Err(DeleteRejected::AlreadyDeleted),
        }
    }

    pub fn finish_delete(&mut self, result: Result<(), StoreError>, now: Instant) -> DeleteOutcome {
        if self.delete != DeleteState::Deleting {
            return DeleteOutcome::Rejected(DeleteRejected::NotDeleting);
        }

        match result {
            Ok(()) => {
                info!("Deleted book with ID: {}", self.id);
                self.delete = DeleteState::Deleted;
                self.banner = Some(Banner::success("Book deleted successfully!", now));
                DeleteOutcome::Deleted(DeferredNavigation::new(
                    self.back_to_listing(),
                    DELETE_REDIRECT_DELAY,
                ))
            }
            Err(e) => {
                error!(id = %self.id, error = %e, "Error deleting book");
                self.delete = DeleteState::Idle;
                self.banner = Some(Banner::error(e.user_message("Failed to delete book"), now));
                DeleteOutcome::Failed
            }
        }
    }

    pub async fn confirm_delete<S: BookStore>(&mut self, store: &S, now: Instant) -> DeleteOutcome {
        let id = match self.begin_delete() {
            Ok(id) => id,
            Err(rejected) => return DeleteOutcome::Rejected(rejected),
        };
        let result = store.delete_book(&id).await;
        self.finish_delete(result, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::BannerKind;
    use crate::test_support::{sample_book, Call, Failure, MemoryStore};

    #[tokio::test]
    async fn empty_collection_is_the_empty_state() {
        let store = MemoryStore::default();
        let mut view = ListView::new();
        assert_eq!(view.state(), &ListState::Loading);

        view.load(&store).await;

        assert_eq!(view.state(), &ListState::Empty);
        assert_eq!(store.calls(), vec![Call::List]);
    }

    #[tokio::test]
    async fn listing_shows_every_record() {
        let store = MemoryStore::with_books(vec![sample_book("1"), sample_book("2")]);
        let mut view = ListView::new();

        view.load(&store).await;

        let ListState::Populated(books) = view.state() else {
            panic!("expected books, got {:?}", view.state());
        };
        assert_eq!(books.len(), 2);
    }

    #[tokio::test]
    async fn failed_listing_falls_back_to_empty() {
        let store = MemoryStore::default();
        store.fail_with(Some(Failure::Unreachable));
        let mut view = ListView::new();

        view.load(&store).await;

        assert_eq!(view.state(), &ListState::Empty);
    }

    #[test]
    fn results_after_unmount_or_remount_are_discarded() {
        let mut view = ListView::new();
        let first = view.mount();
        let second = view.mount();

        assert!(!view.resolve(first, Ok(vec![sample_book("1")])));
        assert_eq!(view.state(), &ListState::Loading);

        view.unmount();
        assert!(!view.resolve(second, Ok(vec![sample_book("1")])));
        assert_eq!(view.state(), &ListState::Loading);
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = MemoryStore::default();
        let mut view = DetailView::new(BookId::new("404"));

        view.load(&store).await;

        assert_eq!(view.state(), &DetailState::NotFound);
        assert_eq!(view.back_to_listing(), Route::Home);
        assert_eq!(view.request_delete(), Err(DeleteRejected::NotLoaded));
    }

    #[tokio::test]
    async fn fetch_failure_is_rendered_as_not_found() {
        let store = MemoryStore::with_books(vec![sample_book("1")]);
        store.fail_with(Some(Failure::Application(500, None)));
        let mut view = DetailView::new(BookId::new("1"));

        view.load(&store).await;

        assert_eq!(view.state(), &DetailState::NotFound);
    }

    #[tokio::test]
    async fn delete_needs_confirmation() {
        let store = MemoryStore::with_books(vec![sample_book("1")]);
        let mut view = DetailView::new(BookId::new("1"));
        view.load(&store).await;

        assert_eq!(
            view.confirm_delete(&store, Instant::now()).await,
            DeleteOutcome::Rejected(DeleteRejected::NotConfirmed)
        );

        view.request_delete().unwrap();
        view.cancel_delete();
        assert_eq!(view.delete_state(), DeleteState::Idle);
        assert!(store.book(&BookId::new("1")).is_some());
        assert!(!store.calls().iter().any(|c| matches!(c, Call::Delete(_))));
    }

    #[tokio::test]
    async fn successful_delete_confirms_and_navigates_home() {
        let store = MemoryStore::with_books(vec![sample_book("1")]);
        let mut view = DetailView::new(BookId::new("1"));
        view.load(&store).await;
        let now = Instant::now();

        view.request_delete().unwrap();
        let outcome = view.confirm_delete(&store, now).await;

        assert_eq!(
            outcome,
            DeleteOutcome::Deleted(DeferredNavigation::new(Route::Home, DELETE_REDIRECT_DELAY))
        );
        assert_eq!(view.delete_state(), DeleteState::Deleted);
        let banner = view.banner(now).unwrap();
        assert_eq!(banner.kind, BannerKind::Success);
        assert_eq!(banner.message, "Book deleted successfully!");
        assert!(store.book(&BookId::new("1")).is_none());
        assert_eq!(view.request_delete(), Err(DeleteRejected::AlreadyDeleted));
    }

    #[tokio::test]
    async fn failed_delete_stays_on_the_record() {
        let store = MemoryStore::with_books(vec![sample_book("1")]);
        let mut view = DetailView::new(BookId::new("1"));
        view.load(&store).await;
        store.fail_with(Some(Failure::Unreachable));
        let now = Instant::now();

        view.request_delete().unwrap();
        let outcome = view.confirm_delete(&store, now).await;

        assert_eq!(outcome, DeleteOutcome::Failed);
        assert_eq!(view.delete_state(), DeleteState::Idle);
        assert_eq!(view.book().map(|b| b.id.as_str()), Some("1"));
        let banner = view.banner(now).unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.message, "Network error. Please try again.");

        store.fail_with(None);
        let mut again = DetailView::new(BookId::new("1"));
        again.load(&store).await;
        assert!(again.book().is_some());
    }

    #[test]
    fn a_second_delete_is_refused_while_in_flight() {
        let mut view = DetailView::new(BookId::new("1"));
        let ticket = view.mount();
        view.resolve(ticket, Ok(Some(sample_book("1"))));

        view.request_delete().unwrap();
        assert_eq!(view.begin_delete(), Ok(BookId::new("1")));
        assert_eq!(view.begin_delete(), Err(DeleteRejected::Busy));
        assert_eq!(view.request_delete(), Err(DeleteRejected::Busy));
    }
}
