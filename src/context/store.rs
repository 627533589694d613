//! Per-request and global value store.
//!
//! # Responsibilities
//! - Hold one value bag per in-flight request, keyed by `RequestId`
//! - Hold a process-wide bag for framework singletons
//! - Sweep bags that outlived their request
//!
//! # Design Decisions
//! - Bags are created lazily on first write and stamped with their creation time
//! - Reads of unknown requests or keys return `None`
//! - Both bags sit in `DashMap`s: readers share a shard lock, writers take it exclusively

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::context::keys::Key;
use crate::http::request::RequestId;

type Value = Arc<dyn Any + Send + Sync>;

/// Snapshot of a bag.
#[derive(Clone, Default)]
pub struct ContextData {
    values: HashMap<&'static str, Value>,
}

impl ContextData {
    pub fn get<T: Send + Sync + 'static>(&self, key: Key<T>) -> Option<&T> {
        self.values
            .get(key.name())
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert<T: Send + Sync + 'static>(&mut self, key: Key<T>, value: T) {
        self.values.insert(key.name(), Arc::new(value));
    }

    fn take<T: Clone + Send + Sync + 'static>(&mut self, key: Key<T>) -> Option<T> {
        self.get(key)?;
        let value = self.values.remove(key.name())?.downcast::<T>().ok()?;
        Some(Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone()))
    }
}

impl fmt::Debug for ContextData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

struct Bag {
    created: Instant,
    data: ContextData,
}

impl Bag {
    fn new() -> Self {
        Self {
            created: Instant::now(),
            data: ContextData::default(),
        }
    }
}

/// Request-scoped and global key/value store.
#[derive(Default)]
pub struct Context {
    requests: DashMap<RequestId, Bag>,
    global: DashMap<&'static str, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value to a request, creating its bag if needed.
    pub fn set<T: Send + Sync + 'static>(&self, request: RequestId, key: Key<T>, value: T) {
        self.requests
            .entry(request)
            .or_insert_with(Bag::new)
            .data
            .insert(key, value);
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self, request: RequestId, key: Key<T>) -> Option<T> {
        let bag = self.requests.get(&request)?;
        bag.data.get(key).cloned()
    }

    pub fn contains<T: Send + Sync + 'static>(&self, request: RequestId, key: Key<T>) -> bool {
        self.requests
            .get(&request)
            .is_some_and(|bag| bag.data.get(key).is_some())
    }

    /// Remove and return a value in one step.
    pub fn take<T: Clone + Send + Sync + 'static>(&self, request: RequestId, key: Key<T>) -> Option<T> {
        let mut bag = self.requests.get_mut(&request)?;
        bag.data.take(key)
    }

    /// Copy of every value bound to a request.
    pub fn get_all(&self, request: RequestId) -> Option<ContextData> {
        self.requests.get(&request).map(|bag| bag.data.clone())
    }

    pub fn delete<T>(&self, request: RequestId, key: Key<T>) {
        if let Some(mut bag) = self.requests.get_mut(&request) {
            bag.data.values.remove(key.name());
        }
    }

    /// Drop the whole bag of a request.
    pub fn delete_all(&self, request: RequestId) {
        self.requests.remove(&request);
    }

    pub fn set_global<T: Send + Sync + 'static>(&self, key: Key<T>, value: T) {
        self.global.insert(key.name(), Arc::new(value));
    }

    pub fn get_global<T: Clone + Send + Sync + 'static>(&self, key: Key<T>) -> Option<T> {
        let value = self.global.get(key.name())?;
        (**value).downcast_ref::<T>().cloned()
    }

    pub fn delete_global<T>(&self, key: Key<T>) {
        self.global.remove(key.name());
    }

    /// Remove bags created more than `age` ago. A zero age removes all of them.
    ///
    /// Returns the number of bags removed.
    pub fn cleanup(&self, age: Duration) -> usize {
        let before = self.requests.len();
        if age.is_zero() {
            self.requests.clear();
        } else {
            let now = Instant::now();
            self.requests
                .retain(|_, bag| now.saturating_duration_since(bag.created) <= age);
        }
        before.saturating_sub(self.requests.len())
    }

    /// Number of live request bags.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, request: RequestId, by: Duration) {
        if let Some(mut bag) = self.requests.get_mut(&request) {
            if let Some(earlier) = bag.created.checked_sub(by) {
                bag.created = earlier;
            }
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("requests", &self.requests.len())
            .field("global", &self.global.len())
            .finish()
    }
}
