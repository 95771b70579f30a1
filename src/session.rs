//! Helpers for mutating session attributes.
//!
//! Sessions are owned by the hosting framework. Any keyed store can take part by
//! implementing [`Session`]; the helpers in [`SessionExt`] then provide
//! set-or-clear updates where clearing is spelled out with [`SessionUpdate::Clear`]
//! rather than signalled by a missing value.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// A server-side, per-client key/value store.
pub trait Session {
    /// The type of value stored in the session.
    type Value;

    /// Get the value stored under `key`.
    fn get(&self, key: &str) -> Option<&Self::Value>;

    /// Store `value` under `key`, replacing any previous value.
    fn insert(&mut self, key: &str, value: Self::Value);

    /// Remove the value stored under `key`, returning it if it was present.
    fn remove(&mut self, key: &str) -> Option<Self::Value>;
}

impl<V, S: BuildHasher> Session for HashMap<String, V, S> {
    type Value = V;

    fn get(&self, key: &str) -> Option<&V> {
        HashMap::get(self, key)
    }

    fn insert(&mut self, key: &str, value: V) {
        HashMap::insert(self, key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        HashMap::remove(self, key)
    }
}

impl<V> Session for BTreeMap<String, V> {
    type Value = V;

    fn get(&self, key: &str) -> Option<&V> {
        BTreeMap::get(self, key)
    }

    fn insert(&mut self, key: &str, value: V) {
        BTreeMap::insert(self, key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        BTreeMap::remove(self, key)
    }
}

/// An update to a single session attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionUpdate<T> {
    /// Store the value, replacing anything already there.
    Set(T),

    /// Remove the attribute.
    Clear,
}

impl<T> From<Option<T>> for SessionUpdate<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => SessionUpdate::Set(value),
            None => SessionUpdate::Clear,
        }
    }
}

/// Extends sessions with set-or-clear helpers.
pub trait SessionExt: Session {
    /// Apply `update` to the attribute `key`.
    ///
    /// `Option<Value>` converts into an update, with `None` clearing the attribute.
    fn set_or_clear(&mut self, key: &str, update: impl Into<SessionUpdate<Self::Value>>) {
        match update.into() {
            SessionUpdate::Set(value) => {
                tracing::trace!(key, "setting session attribute");
                self.insert(key, value);
            }
            SessionUpdate::Clear => self.clear(key),
        }
    }

    /// Remove the attribute `key`, whether or not it is present.
    ///
    /// Maps have an inherent `clear`, so call this as `SessionExt::clear(&mut map, key)`.
    fn clear(&mut self, key: &str) {
        if self.remove(key).is_some() {
            tracing::trace!(key, "cleared session attribute");
        }
    }
}

impl<S: Session + ?Sized> SessionExt for S {}
