//! UserStore - single source of truth for cached registry data.
//!
//! The store owns the in-memory `users`/`addresses` collections, coordinates
//! paginated fetches against a [`DirectoryApi`], reconciles freshly created
//! records, and exposes a subscription mechanism for notifying front-end
//! components of changes. It is constructed explicitly and injected into
//! whatever presentation layer sits above it; there is no global instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use teledesk_model::{Address, NewAddress, NewUser, User, UserId};

use crate::api::DirectoryApi;
use crate::error::DirectoryResult;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Which cached collection an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Users,
    Addresses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// A fetched page was appended at the back.
    Appended,
    /// A freshly created record was put at the front.
    Prepended,
    /// The collection was replaced wholesale.
    Replaced,
    /// The collection was emptied.
    Cleared,
}

/// Change event for subscribers.
#[derive(Debug, Clone, Copy)]
pub struct StoreChangeEvent {
    pub entity: EntityKind,
    pub change: ChangeType,
}

/// Trait for components that want to be notified of store changes.
pub trait StoreSubscriber: Send + Sync {
    fn on_store_changed(&self, event: StoreChangeEvent);
}

#[derive(Debug, Default)]
struct StoreState {
    users: Vec<User>,
    addresses: Vec<Address>,
}

/// Clears a loading flag on every exit path, failure included; the
/// at-most-one-in-flight-fetch invariant rides on this.
struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LoadingGuard<'a> {
    /// Take the flag only if it is not already held.
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(Self { flag })
    }

    /// Raise the flag unconditionally.
    fn hold(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self { flag }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Single source of truth for cached users and addresses.
pub struct UserStore {
    api: Arc<dyn DirectoryApi>,
    state: RwLock<StoreState>,
    loading_users: AtomicBool,
    loading_addresses: AtomicBool,
    has_more_users: AtomicBool,
    limit: usize,
    subscribers: RwLock<Vec<Weak<dyn StoreSubscriber>>>,
}

impl UserStore {
    /// Create a store over the given backend with the default page size.
    pub fn new(api: Arc<dyn DirectoryApi>) -> Self {
        Self::with_page_size(api, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(api: Arc<dyn DirectoryApi>, limit: usize) -> Self {
        Self {
            api,
            state: RwLock::new(StoreState::default()),
            loading_users: AtomicBool::new(false),
            loading_addresses: AtomicBool::new(false),
            has_more_users: AtomicBool::new(true),
            limit,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to store changes. Dead subscribers are pruned on notify.
    pub fn subscribe(&self, subscriber: Weak<dyn StoreSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Snapshot of the cached users, newest first.
    pub fn users(&self) -> Vec<User> {
        self.state.read().users.clone()
    }

    /// Snapshot of the cached addresses.
    pub fn addresses(&self) -> Vec<Address> {
        self.state.read().addresses.clone()
    }

    pub fn is_loading_users(&self) -> bool {
        self.loading_users.load(Ordering::Acquire)
    }

    pub fn is_loading_addresses(&self) -> bool {
        self.loading_addresses.load(Ordering::Acquire)
    }

    pub fn has_more_users(&self) -> bool {
        self.has_more_users.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Union of every cached user's extra-field keys, first-seen order.
    ///
    /// Recomputed from the current snapshot on every call; keys within one
    /// user are visited sorted so the result is deterministic.
    pub fn dynamic_field_keys(&self) -> Vec<String> {
        let state = self.state.read();
        let mut keys: Vec<String> = Vec::new();
        for user in &state.users {
            let mut user_keys: Vec<&String> = user.extra_fields.keys().collect();
            user_keys.sort();
            for key in user_keys {
                if !keys.iter().any(|existing| existing == key) {
                    keys.push(key.clone());
                }
            }
        }
        keys
    }

    /// Non-deleted addresses grouped by owning user, preserving the cached
    /// relative order within each group.
    pub fn addresses_for_user(&self) -> HashMap<UserId, Vec<Address>> {
        let state = self.state.read();
        let mut grouped: HashMap<UserId, Vec<Address>> = HashMap::new();
        for address in state.addresses.iter().filter(|addr| !addr.is_deleted) {
            grouped
                .entry(address.user_id)
                .or_default()
                .push(address.clone());
        }
        grouped
    }

    /// Fetch the next page of users and append it to the cache.
    ///
    /// A no-op returning an empty page while a fetch is already in flight or
    /// after the collection is exhausted. `has_more_users` follows the
    /// backend's total count when one was provided, otherwise a page shorter
    /// than `limit` signals exhaustion. On failure the partial state is kept
    /// as-is and the error is propagated after logging.
    pub async fn fetch_users(&self) -> DirectoryResult<Vec<User>> {
        if !self.has_more_users() {
            return Ok(Vec::new());
        }
        let Some(_guard) = LoadingGuard::acquire(&self.loading_users) else {
            return Ok(Vec::new());
        };

        let offset = self.state.read().users.len();
        let page = match self.api.fetch_users(offset, self.limit).await {
            Ok(page) => page,
            Err(err) => {
                log::error!("failed to fetch users page at offset {offset}: {err}");
                return Err(err);
            }
        };

        let fetched = page.records.clone();
        {
            let mut state = self.state.write();
            state.users.extend(page.records);
            let has_more = match page.total_count {
                Some(total) => state.users.len() < total,
                None => fetched.len() == self.limit,
            };
            self.has_more_users.store(has_more, Ordering::Release);
        }
        self.notify(StoreChangeEvent {
            entity: EntityKind::Users,
            change: ChangeType::Appended,
        });

        Ok(fetched)
    }

    /// Drop the cached users and reload the first page, so the table
    /// reflects canonical server ordering after a creation.
    pub async fn reset_users(&self) -> DirectoryResult<Vec<User>> {
        self.state.write().users.clear();
        self.has_more_users.store(true, Ordering::Release);
        self.notify(StoreChangeEvent {
            entity: EntityKind::Users,
            change: ChangeType::Cleared,
        });

        self.fetch_users().await
    }

    /// Create a user and prepend the returned record to the cache.
    ///
    /// The prepend gives immediate local visibility; callers that need the
    /// canonical order call [`UserStore::reset_users`] afterwards. A create
    /// completing while a page fetch is outstanding can transiently
    /// duplicate the row until that reset (no client-side dedup by id).
    pub async fn add_user(&self, new_user: NewUser) -> DirectoryResult<User> {
        let _guard = LoadingGuard::hold(&self.loading_users);

        let created = match self.api.add_user(new_user.with_defaults()).await {
            Ok(created) => created,
            Err(err) => {
                log::error!("failed to create user: {err}");
                return Err(err);
            }
        };

        self.state.write().users.insert(0, created.clone());
        self.notify(StoreChangeEvent {
            entity: EntityKind::Users,
            change: ChangeType::Prepended,
        });

        Ok(created)
    }

    /// Replace the cached addresses with the backend's current set.
    pub async fn fetch_all_addresses(&self) -> DirectoryResult<Vec<Address>> {
        let _guard = LoadingGuard::hold(&self.loading_addresses);

        let fetched = match self.api.fetch_addresses().await {
            Ok(fetched) => fetched,
            Err(err) => {
                log::error!("failed to fetch addresses: {err}");
                return Err(err);
            }
        };

        self.state.write().addresses = fetched.clone();
        self.notify(StoreChangeEvent {
            entity: EntityKind::Addresses,
            change: ChangeType::Replaced,
        });

        Ok(fetched)
    }

    /// Create an address and prepend the returned record to the cache.
    pub async fn add_address(&self, new_address: NewAddress) -> DirectoryResult<Address> {
        let _guard = LoadingGuard::hold(&self.loading_addresses);

        let created = match self.api.add_address(new_address.with_defaults()).await {
            Ok(created) => created,
            Err(err) => {
                log::error!("failed to create address: {err}");
                return Err(err);
            }
        };

        self.state.write().addresses.insert(0, created.clone());
        self.notify(StoreChangeEvent {
            entity: EntityKind::Addresses,
            change: ChangeType::Prepended,
        });

        Ok(created)
    }

    /// Notify live subscribers, dropping the dead ones.
    fn notify(&self, event: StoreChangeEvent) {
        self.subscribers.write().retain(|weak_sub| {
            if let Some(subscriber) = weak_sub.upgrade() {
                subscriber.on_store_changed(event);
                true
            } else {
                false
            }
        });
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("UserStore")
            .field("user_count", &state.users.len())
            .field("address_count", &state.addresses.len())
            .field("limit", &self.limit)
            .field("loading_users", &self.is_loading_users())
            .field("loading_addresses", &self.is_loading_addresses())
            .field("has_more_users", &self.has_more_users())
            .field("subscriber_count", &self.subscribers.read().len())
            .finish()
    }
}
