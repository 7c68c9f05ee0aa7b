//! Scripted [`DirectoryApi`] implementation for driving the store in tests.
//!
//! Keeps a canonical in-memory collection the way the backend would (users
//! newest first), records every call it receives, and can be told to fail
//! the next operation or to answer with artificial latency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use reqwest::StatusCode;

use teledesk_model::{Address, AddressId, NewAddress, NewUser, User, UserId, UserRole};

use crate::api::{DirectoryApi, UserPage};
use crate::error::{DirectoryError, DirectoryResult};

#[derive(Debug, Clone, Default)]
pub struct TestDirectoryApi {
    inner: Arc<RwLock<InnerDirectoryState>>,
}

#[derive(Debug)]
struct InnerDirectoryState {
    users: Vec<User>,
    addresses: Vec<Address>,
    expose_total_count: bool,
    latency: Option<Duration>,
    next_user_id: i64,
    next_address_id: i64,
    fail_next_fetch_users: bool,
    fail_next_add_user: bool,
    fail_next_fetch_addresses: bool,
    fail_next_add_address: bool,
    fetch_users_calls: Vec<(usize, usize)>,
    add_user_calls: usize,
    fetch_addresses_calls: usize,
    add_address_calls: usize,
}

impl Default for InnerDirectoryState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            addresses: Vec::new(),
            expose_total_count: false,
            latency: None,
            next_user_id: 1,
            next_address_id: 1,
            fail_next_fetch_users: false,
            fail_next_add_user: false,
            fail_next_fetch_addresses: false,
            fail_next_add_address: false,
            fetch_users_calls: Vec::new(),
            add_user_calls: 0,
            fetch_addresses_calls: 0,
            add_address_calls: 0,
        }
    }
}

fn scripted_failure(operation: &str) -> DirectoryError {
    DirectoryError::Server {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("scripted {operation} failure"),
    }
}

impl TestDirectoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the backend collection; ids already taken are skipped when
    /// assigning ids to created records.
    pub fn seed_users(&self, users: impl IntoIterator<Item = User>) {
        let mut inner = self.inner.write();
        inner.users = users.into_iter().collect();
        let max_id = inner.users.iter().map(|user| user.id.value()).max();
        if let Some(max_id) = max_id {
            inner.next_user_id = inner.next_user_id.max(max_id + 1);
        }
    }

    pub fn seed_addresses(&self, addresses: impl IntoIterator<Item = Address>) {
        let mut inner = self.inner.write();
        inner.addresses = addresses.into_iter().collect();
        let max_id = inner.addresses.iter().map(|addr| addr.id.value()).max();
        if let Some(max_id) = max_id {
            inner.next_address_id = inner.next_address_id.max(max_id + 1);
        }
    }

    /// Whether responses carry the total-count header.
    pub fn expose_total_count(&self, value: bool) {
        self.inner.write().expose_total_count = value;
    }

    /// Answer every call only after sleeping, to hold operations in flight.
    pub fn set_latency(&self, latency: Duration) {
        self.inner.write().latency = Some(latency);
    }

    pub fn fail_next_fetch_users(&self) {
        self.inner.write().fail_next_fetch_users = true;
    }

    pub fn fail_next_add_user(&self) {
        self.inner.write().fail_next_add_user = true;
    }

    pub fn fail_next_fetch_addresses(&self) {
        self.inner.write().fail_next_fetch_addresses = true;
    }

    pub fn fail_next_add_address(&self) {
        self.inner.write().fail_next_add_address = true;
    }

    /// Recorded `(offset, limit)` pairs, one per network call received.
    pub fn fetch_users_calls(&self) -> Vec<(usize, usize)> {
        self.inner.read().fetch_users_calls.clone()
    }

    pub fn add_user_calls(&self) -> usize {
        self.inner.read().add_user_calls
    }

    pub fn fetch_addresses_calls(&self) -> usize {
        self.inner.read().fetch_addresses_calls
    }

    pub fn add_address_calls(&self) -> usize {
        self.inner.read().add_address_calls
    }

    async fn pause(&self) {
        let latency = self.inner.read().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DirectoryApi for TestDirectoryApi {
    async fn fetch_users(&self, offset: usize, limit: usize) -> DirectoryResult<UserPage> {
        let fail = {
            let mut inner = self.inner.write();
            inner.fetch_users_calls.push((offset, limit));
            std::mem::take(&mut inner.fail_next_fetch_users)
        };
        self.pause().await;
        if fail {
            return Err(scripted_failure("fetch users"));
        }

        let inner = self.inner.read();
        let records: Vec<User> = inner.users.iter().skip(offset).take(limit).cloned().collect();
        let total_count = inner.expose_total_count.then(|| inner.users.len());
        Ok(UserPage {
            records,
            total_count,
        })
    }

    async fn add_user(&self, new_user: NewUser) -> DirectoryResult<User> {
        let fail = {
            let mut inner = self.inner.write();
            inner.add_user_calls += 1;
            std::mem::take(&mut inner.fail_next_add_user)
        };
        self.pause().await;
        if fail {
            return Err(scripted_failure("add user"));
        }

        let mut inner = self.inner.write();
        let id = UserId(inner.next_user_id);
        inner.next_user_id += 1;
        let user = User {
            id,
            telegram_uid: new_user.telegram_uid,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            tg_username: new_user.tg_username,
            photo_url: new_user.photo_url,
            role_id: new_user.role_id.unwrap_or_default(),
            created_at: new_user.created_at.unwrap_or_else(Utc::now),
            extra_fields: new_user.extra_fields,
        };
        inner.users.insert(0, user.clone());
        Ok(user)
    }

    async fn fetch_addresses(&self) -> DirectoryResult<Vec<Address>> {
        let fail = {
            let mut inner = self.inner.write();
            inner.fetch_addresses_calls += 1;
            std::mem::take(&mut inner.fail_next_fetch_addresses)
        };
        self.pause().await;
        if fail {
            return Err(scripted_failure("fetch addresses"));
        }

        let inner = self.inner.read();
        Ok(inner
            .addresses
            .iter()
            .filter(|addr| !addr.is_deleted)
            .cloned()
            .collect())
    }

    async fn add_address(&self, new_address: NewAddress) -> DirectoryResult<Address> {
        let fail = {
            let mut inner = self.inner.write();
            inner.add_address_calls += 1;
            std::mem::take(&mut inner.fail_next_add_address)
        };
        self.pause().await;
        if fail {
            return Err(scripted_failure("add address"));
        }

        let mut inner = self.inner.write();
        let id = AddressId(inner.next_address_id);
        inner.next_address_id += 1;
        let address = Address {
            id,
            user_id: new_address.user_id,
            country: new_address.country,
            city: new_address.city,
            street: new_address.street,
            building: new_address.building,
            appartment: new_address.appartment,
            postal_code: new_address.postal_code,
            is_deleted: new_address.is_deleted.unwrap_or(false),
        };
        inner.addresses.insert(0, address.clone());
        Ok(address)
    }
}

/// Minimal user fixture; fields beyond the names follow the common case
/// (regular role, no photo, no extra fields).
pub fn sample_user(id: i64, first_name: &str, last_name: &str) -> User {
    User {
        id: UserId(id),
        telegram_uid: 100 + id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        tg_username: None,
        photo_url: None,
        role_id: UserRole::User,
        created_at: Utc::now(),
        extra_fields: HashMap::new(),
    }
}

/// Address fixture owned by `user_id`.
pub fn sample_address(id: i64, user_id: i64) -> Address {
    Address {
        id: AddressId(id),
        user_id: UserId(user_id),
        country: "Россия".to_string(),
        city: "Москва".to_string(),
        street: "Тверская".to_string(),
        building: "1".to_string(),
        appartment: None,
        postal_code: "125009".to_string(),
        is_deleted: false,
    }
}
