//! Serialized access to the knowledge base.
//!
//! The backing store is not assumed safe for concurrent reads, so every read
//! goes through one mutex. A [`GatewaySession`] holds that lock for a whole
//! scoring evaluation. Id and attribute lookups are memoized; backend errors
//! degrade to "unknown" / "no attributes" and are not memoized.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use linker_core::cache::Memo;
use linker_core::traits::KnowledgeBase;
use linker_core::types::{AttributeSet, KbId};

pub struct Gateway {
    kb: Mutex<Box<dyn KnowledgeBase>>,
    ids: Memo<String, Option<KbId>>,
    attributes: Memo<KbId, Arc<AttributeSet>>,
}

impl Gateway {
    pub fn new(kb: Box<dyn KnowledgeBase>) -> Self {
        Self { kb: Mutex::new(kb), ids: Memo::new(), attributes: Memo::new() }
    }

    /// Block until the knowledge base is free and keep it until the session drops.
    pub fn session(&self) -> GatewaySession<'_> {
        GatewaySession { kb: self.kb.lock().unwrap_or_else(PoisonError::into_inner), gateway: self }
    }
}

pub struct GatewaySession<'a> {
    kb: MutexGuard<'a, Box<dyn KnowledgeBase>>,
    gateway: &'a Gateway,
}

impl GatewaySession<'_> {
    pub fn lookup_id(&self, uri: &str) -> Option<KbId> {
        let key = uri.to_string();
        if let Some(id) = self.gateway.ids.get(&key) {
            return id;
        }
        match self.kb.lookup_id(uri) {
            Ok(id) => self.gateway.ids.insert(key, id),
            Err(e) => {
                tracing::warn!(uri, error = %e, "knowledge base id lookup failed");
                None
            }
        }
    }

    pub fn attributes_of(&self, id: KbId) -> Arc<AttributeSet> {
        if let Some(attrs) = self.gateway.attributes.get(&id) {
            return attrs;
        }
        match self.kb.attributes_of(id) {
            Ok(attrs) => self.gateway.attributes.insert(id, Arc::new(attrs)),
            Err(e) => {
                tracing::warn!(%id, error = %e, "knowledge base attribute fetch failed");
                Arc::new(AttributeSet::new())
            }
        }
    }

    pub fn exists(&self, subject: KbId, predicate: KbId, object: KbId) -> bool {
        self.kb.exists(subject, predicate, object).unwrap_or_else(|e| {
            tracing::warn!(%subject, %predicate, %object, error = %e, "knowledge base existence check failed");
            false
        })
    }
}
