//! Selection context.
//!
//! A key→value mapping threaded through selection. The engine owns a few
//! typed keys (`nodes`, `position`, `last` during XPath predicate
//! evaluation, plus the accumulator for `select`); user keys ride in an
//! `Any` map and are never touched by the engine. Contexts are derived,
//! never mutated in place, so a caller's context is always left intact.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dom::NodeId;
use crate::select::accumulator::Accumulator;

type UserValue = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct Context {
    pub(crate) accumulator: Option<Box<dyn Accumulator>>,
    nodes: Option<Arc<Vec<NodeId>>>,
    position: Option<usize>,
    last: Option<usize>,
    user: HashMap<String, UserValue>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// A context carrying an accumulator, for use with `select`.
    pub fn with_accumulator(accumulator: Box<dyn Accumulator>) -> Self {
        Context {
            accumulator: Some(accumulator),
            ..Context::default()
        }
    }

    /// Store a user value. Engine keys are typed fields, so user keys can
    /// never collide with them.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.user.insert(key.into(), Arc::new(value));
    }

    /// Fetch a user value by key and type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.user.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Current node-set during XPath predicate evaluation.
    pub fn nodes(&self) -> Option<&[NodeId]> {
        self.nodes.as_deref().map(|v| v.as_slice())
    }

    /// 1-based position within the current axis step.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Size of the current axis step's node-set.
    pub fn last(&self) -> Option<usize> {
        self.last
    }

    /// Copy for the engine's own use: user keys and step state carry over,
    /// the accumulator stays with the caller.
    pub(crate) fn derive(&self) -> Context {
        Context {
            accumulator: None,
            nodes: self.nodes.clone(),
            position: self.position,
            last: self.last,
            user: self.user.clone(),
        }
    }

    /// Fresh context for one predicate application.
    pub(crate) fn derive_step(
        &self,
        nodes: Arc<Vec<NodeId>>,
        position: usize,
        last: usize,
    ) -> Context {
        Context {
            accumulator: None,
            nodes: Some(nodes),
            position: Some(position),
            last: Some(last),
            user: self.user.clone(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("accumulator", &self.accumulator.is_some())
            .field("nodes", &self.nodes)
            .field("position", &self.position)
            .field("last", &self.last)
            .field("user_keys", &self.user.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_values_round_trip() {
        let mut ctx = Context::new();
        ctx.insert("threshold", 3usize);
        assert_eq!(ctx.get::<usize>("threshold"), Some(&3));
        assert_eq!(ctx.get::<String>("threshold"), None);
        assert_eq!(ctx.get::<usize>("missing"), None);
    }

    #[test]
    fn test_derive_keeps_user_values_not_accumulator() {
        let mut ctx = Context::with_accumulator(Box::new(crate::select::All::default()));
        ctx.insert("k", "v".to_string());
        let derived = ctx.derive();
        assert!(derived.accumulator.is_none());
        assert_eq!(derived.get::<String>("k"), Some(&"v".to_string()));
        // the original still owns its accumulator
        assert!(ctx.accumulator.is_some());
    }

    #[test]
    fn test_derive_step_sets_engine_keys() {
        let ctx = Context::new();
        let step = ctx.derive_step(Arc::new(vec![1, 2, 3]), 2, 3);
        assert_eq!(step.nodes(), Some(&[1, 2, 3][..]));
        assert_eq!(step.position(), Some(2));
        assert_eq!(step.last(), Some(3));
    }
}
