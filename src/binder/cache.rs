// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The two binding caches.
//!
//! The global cache is shared per catalog and guarded by one coarse mutex;
//! every insert is atomic under it, so a cancelled binding never leaves a
//! half-written entry. The local cache lives for a single top-level bind and
//! carries the set of signatures currently being expanded, which is what
//! breaks expansion cycles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::expand::Expansion;
use super::unify::UnifyStrategy;
use crate::catalog::TableRef;
use crate::types::DataValue;

/// Identity of one call site for expansion memoization: the signature plus
/// every parameter's name, type rendering, constant-ness and value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct CallSiteFingerprint {
    pub signature: usize,
    pub params: Vec<(String, String, bool, Option<DataValue>)>,
}

pub(super) type UnifyKey = (UnifyStrategy, Vec<usize>);

#[derive(Default)]
struct GlobalCacheInner {
    unifications: HashMap<UnifyKey, TableRef>,
    expansions: HashMap<CallSiteFingerprint, Option<Arc<Expansion>>>,
}

/// Per-catalog shared cache: column unifications over catalog tables and
/// expansions of database functions whose result depends only on argument
/// types.
#[derive(Default)]
pub struct GlobalBindingCache {
    inner: Mutex<GlobalCacheInner>,
}

impl GlobalBindingCache {
    pub fn new() -> Arc<GlobalBindingCache> {
        Arc::new(GlobalBindingCache::default())
    }

    pub(super) fn unification(&self, key: &UnifyKey) -> Option<TableRef> {
        self.inner.lock().unifications.get(key).cloned()
    }

    pub(super) fn record_unification(&self, key: UnifyKey, table: TableRef) {
        self.inner.lock().unifications.insert(key, table);
    }

    pub(super) fn expansion(
        &self,
        fingerprint: &CallSiteFingerprint,
    ) -> Option<Option<Arc<Expansion>>> {
        self.inner.lock().expansions.get(fingerprint).cloned()
    }

    pub(super) fn record_expansion(
        &self,
        fingerprint: CallSiteFingerprint,
        expansion: Option<Arc<Expansion>>,
    ) {
        self.inner.lock().expansions.insert(fingerprint, expansion);
    }
}

/// Per-binding state for inline expansion.
#[derive(Default)]
pub(super) struct LocalBindingCache {
    /// Signatures currently being expanded somewhere up the stack.
    pub expanding: HashSet<usize>,
    pub expansions: HashMap<CallSiteFingerprint, Option<Arc<Expansion>>>,
}
