//! Hash/equality strategies bound to a table at construction.
//!
//! A strategy carries whatever context hashing needs, so there is no
//! separate user-data pointer. Implementations must agree: `equal(a, b)`
//! implies `hash(a) == hash(b)`.

use crate::jenkins;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

pub trait HashStrategy<T: ?Sized> {
    fn hash(&self, v: &T) -> u64;
    fn equal(&self, a: &T, b: &T) -> bool;
}

/// `Hash` + `Eq` through a `BuildHasher` (hashbrown's default unless given).
#[derive(Clone, Default, Debug)]
pub struct StdHash<S = DefaultHashBuilder> {
    build: S,
}

impl StdHash {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> StdHash<S> {
    pub fn with_hasher(build: S) -> Self {
        Self { build }
    }
}

impl<T, S> HashStrategy<T> for StdHash<S>
where
    T: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, v: &T) -> u64 {
        self.build.hash_one(v)
    }

    #[inline]
    fn equal(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// A pair of closures. Captured state plays the role of user data.
#[derive(Clone, Debug)]
pub struct FnHash<H, E> {
    hash_fn: H,
    equal_fn: E,
}

impl<H, E> FnHash<H, E> {
    pub fn new(hash_fn: H, equal_fn: E) -> Self {
        Self { hash_fn, equal_fn }
    }
}

impl<T, H, E> HashStrategy<T> for FnHash<H, E>
where
    T: ?Sized,
    H: Fn(&T) -> u64,
    E: Fn(&T, &T) -> bool,
{
    #[inline]
    fn hash(&self, v: &T) -> u64 {
        (self.hash_fn)(v)
    }

    #[inline]
    fn equal(&self, a: &T, b: &T) -> bool {
        (self.equal_fn)(a, b)
    }
}

/// lookup3 over the raw bytes of plain-old-data values; equality is bitwise.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Lookup3 {
    pub seed: u32,
}

impl<T: bytemuck::Pod> HashStrategy<T> for Lookup3 {
    #[inline]
    fn hash(&self, v: &T) -> u64 {
        u64::from(jenkins::hash_bytes(bytemuck::bytes_of(v), self.seed))
    }

    #[inline]
    fn equal(&self, a: &T, b: &T) -> bool {
        bytemuck::bytes_of(a) == bytemuck::bytes_of(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agrees<T, S: HashStrategy<T>>(s: &S, a: &T, b: &T) -> bool {
        !s.equal(a, b) || s.hash(a) == s.hash(b)
    }

    #[test]
    fn std_hash_is_consistent_with_eq() {
        let s = StdHash::<DefaultHashBuilder>::default();
        let a = String::from("node");
        let b = String::from("node");
        assert!(s.equal(&a, &b));
        assert!(agrees(&s, &a, &b));
        assert!(!s.equal(&a, &String::from("edge")));
        // Unsized keys hash through the same strategy.
        assert_eq!(
            HashStrategy::<str>::hash(&s, "node"),
            HashStrategy::<str>::hash(&s, a.as_str())
        );
    }

    #[test]
    fn closures_carry_context() {
        let modulus = 10u64;
        let s = FnHash::new(
            move |v: &u64| *v % modulus,
            move |a: &u64, b: &u64| a % modulus == b % modulus,
        );
        let (three, thirteen) = (3u64, 13u64);
        assert!(s.equal(&three, &thirteen));
        assert_eq!(s.hash(&thirteen), 3);
        assert!(agrees(&s, &three, &thirteen));
    }

    #[test]
    fn lookup3_is_bitwise() {
        let s = Lookup3 { seed: 5 };
        assert!(s.equal(&[1u32, 2], &[1u32, 2]));
        assert!(!s.equal(&1.0f64, &-1.0f64));
        assert_eq!(s.hash(&42u64), s.hash(&42u64));
        assert_ne!(s.hash(&42u64), Lookup3 { seed: 6 }.hash(&42u64));
    }
}
