//! Client core for the Teledesk user-management console.
//!
//! The crate owns the two pieces every front-end shares: [`api::ApiClient`],
//! a thin typed HTTP client for the registry backend, and
//! [`store::UserStore`], the in-memory cache that coordinates paginated
//! fetches, reconciles freshly created records, and derives table views.
//! Front-ends construct a store over any [`api::DirectoryApi`]
//! implementation and either poll its snapshots or subscribe to change
//! notifications.

pub mod api;
pub mod error;
pub mod store;
pub mod testing;

pub use api::{ApiClient, DirectoryApi, TOTAL_COUNT_HEADER, UserPage};
pub use error::{DirectoryError, DirectoryResult};
pub use store::{
    ChangeType, DEFAULT_PAGE_SIZE, EntityKind, StoreChangeEvent, StoreSubscriber, UserStore,
};
