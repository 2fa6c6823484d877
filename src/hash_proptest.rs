#![cfg(test)]

// Property tests for Hash kept inside the crate so the raw table and its
// statistics are reachable without feature gates.

use crate::config::HashConfig;
use crate::hash::{Handle, Hash as Table, InsertError};
use crate::list::Link;
use crate::mempool::{Allocator, SharedPool};
use crate::strategy::{HashStrategy, StdHash};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hasher;

// Compared and hashed by key only, so a lookup with any value finds the entry.
#[derive(Clone, Debug)]
struct Entry {
    key: String,
    value: i32,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for Entry {}
impl std::hash::Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state)
    }
}

fn key_only(pool: &[String], i: usize) -> Entry {
    Entry {
        key: pool[i].clone(),
        value: 0,
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Find(usize),
    Mutate(usize, i32),
    Iterate,
    Truncate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            3 => idx.clone().prop_map(OpI::Find),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Truncate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap.
// - Duplicate inserts are rejected and name the live entry's handle.
// - `lookup` parity, and handles stay stable while their entry lives.
// - `remove` hands back the stored entry and kills its handle.
// - `for_each` visits each live entry exactly once.
// - Stale handles never resolve; `len` matches the model after each op.
fn run_state_machine<S>(
    sut: &mut Table<'_, Entry, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: HashStrategy<Entry>,
{
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut live: HashMap<String, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                match sut.insert_unique(Entry {
                    key: k.clone(),
                    value: v,
                }) {
                    Ok(h) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        prop_assert!(live.insert(k.clone(), h).is_none());
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey(h)) => {
                        prop_assert!(already, "duplicate error only when key exists");
                        prop_assert_eq!(Some(&h), live.get(&k));
                    }
                }
            }
            OpI::Remove(i) => {
                let k = pool[i].clone();
                let removed = sut.remove(&key_only(pool, i));
                match model.remove(&k) {
                    Some(mv) => {
                        let e = removed.expect("present in model");
                        prop_assert_eq!(e.value, mv);
                        stale.push(live.remove(&k).expect("tracked live handle"));
                    }
                    None => prop_assert!(removed.is_none()),
                }
            }
            OpI::Find(i) => {
                let found = sut.lookup(&key_only(pool, i));
                prop_assert_eq!(found.is_some(), model.contains_key(&pool[i]));
                if let Some(h) = found {
                    prop_assert_eq!(Some(&h), live.get(&pool[i]));
                    prop_assert_eq!(h.value(sut).map(|e| e.value), model.get(&pool[i]).copied());
                }
            }
            OpI::Mutate(i, d) => {
                if let Some(mut e) = sut.lookup_mut(&key_only(pool, i)) {
                    e.value = e.value.saturating_add(d);
                    let mv = model.get_mut(&pool[i]).expect("present in model");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.contains_key(&pool[i]));
                }
            }
            OpI::Iterate => {
                let mut s_keys = BTreeSet::new();
                let mut visits = 0;
                sut.for_each(|_, e| {
                    visits += 1;
                    s_keys.insert(e.key.clone());
                });
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(visits, model.len());
                prop_assert_eq!(s_keys, m_keys);
            }
            OpI::Truncate => {
                sut.truncate();
                model.clear();
                stale.extend(live.drain().map(|(_, h)| h));
            }
        }

        for &h in &stale {
            prop_assert!(h.value(sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.statistics().elements, model.len());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: Table<Entry> = Table::new();
        run_state_machine(&mut sut, &pool, ops)?;
    }
}

// Constant hasher: every entry lands in one chain.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl std::hash::BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Same state machine under worst-case collisions, on a shared pool.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let links: SharedPool<Link<Entry>> = SharedPool::new();
        let mut sut = Table::with_allocator(StdHash::with_hasher(ConstBuildHasher), &links);
        run_state_machine(&mut sut, &pool, ops)?;
        prop_assert_eq!(links.len(), sut.len());
        drop(sut);
        prop_assert!(links.is_empty());
    }
}

#[derive(Clone, Debug)]
enum NumOp {
    Insert(u16),
    Remove(u16),
}

fn arb_num_ops() -> impl Strategy<Value = Vec<NumOp>> {
    let op = prop_oneof![
        3 => (0u16..400).prop_map(NumOp::Insert),
        2 => (0u16..400).prop_map(NumOp::Remove),
    ];
    proptest::collection::vec(op, 1..600)
}

// Membership and pool accounting survive every grow and shrink.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_resizes_keep_membership(ops in arb_num_ops()) {
        let config = HashConfig::small();
        let links: SharedPool<Link<u16>> = SharedPool::new();
        let mut sut = Table::with_config(StdHash::new(), config, Allocator::shared(&links)).unwrap();
        let mut model: HashSet<u16> = HashSet::new();
        for op in ops {
            match op {
                NumOp::Insert(v) => prop_assert_eq!(sut.insert_unique(v).is_ok(), model.insert(v)),
                NumOp::Remove(v) => prop_assert_eq!(sut.remove(&v), model.take(&v)),
            }
            let s = sut.statistics();
            prop_assert_eq!(s.elements, model.len());
            prop_assert_eq!(links.len(), model.len());
            prop_assert!(s.slots >= config.min_slots);
            prop_assert!(model.len() <= config.max_load * s.slots);
        }
        for v in &model {
            prop_assert!(sut.contains(v));
        }
    }
}
