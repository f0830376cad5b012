//! k-limited call-string contexts
//!
//! A context is the sequence of the most recent call sites, newest first,
//! never longer than k. Contexts are interned: structurally equal contexts
//! share one `ContextID`, keyed by their dash-joined element string.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::config::{ConfigError, ConfigResult, MAX_K_LIMIT};
use crate::features::call_graph::domain::CallSiteID;

/// Interned context identifier
pub type ContextID = u32;

/// Call-string element
pub type ContextElem = CallSiteID;

/// ID of the empty context; always interned first
pub const EMPTY_CONTEXT: ContextID = 0;

/// Call string, most recent call site first
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Context {
    elems: Vec<ContextElem>,
}

impl Context {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context of length one
    pub fn new(callsite: ContextElem) -> Self {
        Self {
            elems: vec![callsite],
        }
    }

    /// Prepend `callsite` and truncate to `k`
    pub fn derive(&self, callsite: ContextElem, k: usize) -> Self {
        if k == 0 {
            return Self::empty();
        }
        let mut elems = Vec::with_capacity(k.min(self.elems.len() + 1));
        elems.push(callsite);
        elems.extend(self.elems.iter().take(k - 1).copied());
        Self { elems }
    }

    pub fn elems(&self) -> &[ContextElem] {
        &self.elems
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Intern key: elements joined by `-` (empty string for the empty context)
    pub fn key(&self) -> String {
        self.elems
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.key())
    }
}

/// Interning table for contexts under a fixed k
#[derive(Debug)]
pub struct ContextCache {
    k_limit: usize,
    by_key: FxHashMap<String, ContextID>,
    contexts: Vec<Context>,
}

impl ContextCache {
    /// Fails for k above the supported maximum
    pub fn new(k_limit: usize) -> ConfigResult<Self> {
        if k_limit > MAX_K_LIMIT {
            return Err(ConfigError::range_with_hint(
                "k_limit",
                k_limit,
                0,
                MAX_K_LIMIT,
                "Call-string depth beyond 5 is not supported",
            ));
        }
        let mut cache = Self {
            k_limit,
            by_key: FxHashMap::default(),
            contexts: Vec::new(),
        };
        cache.intern(Context::empty());
        Ok(cache)
    }

    #[inline]
    pub fn k_limit(&self) -> usize {
        self.k_limit
    }

    #[inline]
    pub fn empty_context(&self) -> ContextID {
        EMPTY_CONTEXT
    }

    /// Return the ID of an equal context, inserting it if absent
    pub fn intern(&mut self, ctx: Context) -> ContextID {
        let key = ctx.key();
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = self.contexts.len() as ContextID;
        self.contexts.push(ctx);
        self.by_key.insert(key, id);
        id
    }

    /// Context holding just `callsite` (empty when k is 0)
    pub fn new_context(&mut self, callsite: ContextElem) -> ContextID {
        self.derive(EMPTY_CONTEXT, callsite)
    }

    /// Callee context for a call from `caller` at `callsite`
    ///
    /// An unknown caller ID is treated as the empty context.
    pub fn derive(&mut self, caller: ContextID, callsite: ContextElem) -> ContextID {
        let derived = match self.contexts.get(caller as usize) {
            Some(ctx) => ctx.derive(callsite, self.k_limit),
            None => Context::empty().derive(callsite, self.k_limit),
        };
        self.intern(derived)
    }

    pub fn get(&self, id: ContextID) -> Option<&Context> {
        self.contexts.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
