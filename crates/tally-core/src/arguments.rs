//! The per-request argument bag.
//!
//! Decorators and argument extractors communicate with handlers through
//! [`Arguments`], a heterogeneous map keyed by typed [`ArgKey`] descriptors.
//! A key pairs a name with the type of the value stored under it, so reads
//! are typed and two descriptors of the same value type (say, a `begin` and
//! an `end` date) never collide.
//!
//! The bag is created empty when dispatch begins, is owned by exactly one
//! request's dispatch flow, and is discarded when the reply is written.
//! Missing keys and double writes are programming errors in the
//! registration-time composition, not runtime conditions, and both panic.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

/// A typed key into [`Arguments`].
///
/// The key is identity-comparable through its `(type, name)` pair; the type
/// parameter records what is stored under it. Keys are declared as statics
/// by whichever extractor or decorator owns the value's lifecycle:
///
/// ```
/// use tally_core::{ArgKey, Arguments};
///
/// static ACCOUNT_IDS: ArgKey<Vec<u64>> = ArgKey::new("account-ids");
///
/// let mut args = Arguments::new();
/// args.set(&ACCOUNT_IDS, vec![1, 2, 3]);
/// assert_eq!(args.expect(&ACCOUNT_IDS), &[1, 2, 3]);
/// ```
#[derive(Debug)]
pub struct ArgKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ArgKey<T> {
    /// Declares a new key.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the key's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    fn id(&self) -> (TypeId, &'static str) {
        (TypeId::of::<T>(), self.name)
    }
}

/// The per-request typed key/value store.
///
/// One instance exists per request. Extractors and decorators write values
/// in, the handler (and downstream decorators) read them out. There is no
/// iteration and no deletion; [`Arguments::take`] exists solely so a handler
/// can assume ownership of a value the chain produced for it (a decoded
/// request body, a transaction handle).
#[derive(Debug, Default)]
pub struct Arguments {
    values: HashMap<(TypeId, &'static str), Box<dyn Any + Send + Sync>>,
}

impl Arguments {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key was already written. Each key has exactly one
    /// writer per request; a second write means two chain stages were
    /// composed over the same key, which is a registration bug.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &ArgKey<T>, value: T) {
        let previous = self.values.insert(key.id(), Box::new(value));
        assert!(
            previous.is_none(),
            "argument '{}' written twice in one request",
            key.name
        );
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &ArgKey<T>) -> Option<&T> {
        self.values
            .get(&key.id())
            .and_then(|value| value.downcast_ref())
    }

    /// Returns the value stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key was never written. A consumer that expects a key
    /// an upstream stage did not provide is a composition bug, so this
    /// fails fast rather than surfacing a runtime error.
    #[must_use]
    pub fn expect<T: Send + Sync + 'static>(&self, key: &ArgKey<T>) -> &T {
        match self.get(key) {
            Some(value) => value,
            None => panic!("argument '{}' expected but never set", key.name),
        }
    }

    /// Removes and returns the value stored under `key`, handing ownership
    /// to the caller.
    pub fn take<T: Send + Sync + 'static>(&mut self, key: &ArgKey<T>) -> Option<T> {
        self.values
            .remove(&key.id())
            .and_then(|value| value.downcast().ok())
            .map(|boxed| *boxed)
    }

    /// Returns true if `key` has been written.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self, key: &ArgKey<T>) -> bool {
        self.values.contains_key(&key.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static COUNT: ArgKey<u64> = ArgKey::new("count");
    static LABEL: ArgKey<String> = ArgKey::new("label");

    #[test]
    fn set_then_get() {
        let mut args = Arguments::new();
        args.set(&COUNT, 7);
        assert_eq!(args.get(&COUNT), Some(&7));
        assert_eq!(args.expect(&COUNT), &7);
    }

    #[test]
    fn absent_key_is_none() {
        let args = Arguments::new();
        assert_eq!(args.get(&COUNT), None);
        assert!(!args.contains(&COUNT));
    }

    #[test]
    fn same_name_different_type_does_not_collide() {
        static COUNT_TEXT: ArgKey<String> = ArgKey::new("count");

        let mut args = Arguments::new();
        args.set(&COUNT, 7);
        args.set(&COUNT_TEXT, "seven".to_string());
        assert_eq!(args.expect(&COUNT), &7);
        assert_eq!(args.expect(&COUNT_TEXT), "seven");
    }

    #[test]
    #[should_panic(expected = "written twice")]
    fn double_write_panics() {
        let mut args = Arguments::new();
        args.set(&COUNT, 1);
        args.set(&COUNT, 2);
    }

    #[test]
    #[should_panic(expected = "expected but never set")]
    fn expect_on_absent_key_panics() {
        let args = Arguments::new();
        let _ = args.expect(&LABEL);
    }

    #[test]
    fn take_moves_the_value_out() {
        let mut args = Arguments::new();
        args.set(&LABEL, "body".to_string());
        assert_eq!(args.take(&LABEL), Some("body".to_string()));
        assert_eq!(args.take(&LABEL), None);
        assert!(!args.contains(&LABEL));
    }
}
