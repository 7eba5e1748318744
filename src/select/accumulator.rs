//! Accumulators gather results during the driver's walk.
//!
//! An accumulator folds candidates in one at a time, may report that the
//! walk can short-circuit, and yields a final value when the selection
//! ends. Each selection owns exactly one, so implementations need no
//! internal synchronization.

use std::any::Any;

use crate::extract::Selection;

/// The accumulator capability.
pub trait Accumulator: Send {
    /// Fold a candidate in.
    fn include(&mut self, selection: Selection);

    /// May the walk short-circuit?
    fn complete(&self) -> bool;

    /// Final value extraction. Built-ins yield `Option<Selection>` (One)
    /// and `Vec<Selection>` (All); custom accumulators yield whatever they
    /// collect.
    fn finish(self: Box<Self>) -> Box<dyn Any>;
}

/// Keeps the first match and stops the walk.
#[derive(Debug, Default)]
pub struct One {
    result: Option<Selection>,
}

impl One {
    pub fn into_result(self) -> Option<Selection> {
        self.result
    }
}

impl Accumulator for One {
    fn include(&mut self, selection: Selection) {
        if self.result.is_none() {
            self.result = Some(selection);
        }
    }

    fn complete(&self) -> bool {
        self.result.is_some()
    }

    fn finish(self: Box<Self>) -> Box<dyn Any> {
        Box::new(self.result)
    }
}

/// Keeps every match in document order.
#[derive(Debug, Default)]
pub struct All {
    results: Vec<Selection>,
}

impl All {
    pub fn into_results(self) -> Vec<Selection> {
        self.results
    }
}

impl Accumulator for All {
    fn include(&mut self, selection: Selection) {
        self.results.push(selection);
    }

    fn complete(&self) -> bool {
        false
    }

    fn finish(self: Box<Self>) -> Box<dyn Any> {
        Box::new(self.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_keeps_first_and_completes() {
        let doc = crate::parse_html("<p>a</p><p>b</p>").unwrap();
        let mut one = One::default();
        assert!(!one.complete());
        one.include(Selection::new(doc.clone(), 1));
        one.include(Selection::new(doc.clone(), 2));
        assert!(one.complete());
        assert_eq!(one.into_result().unwrap().id(), 1);
    }

    #[test]
    fn test_all_never_completes() {
        let doc = crate::parse_html("<p>a</p>").unwrap();
        let mut all = All::default();
        all.include(Selection::new(doc.clone(), 0));
        all.include(Selection::new(doc.clone(), 1));
        assert!(!all.complete());
        assert_eq!(all.into_results().len(), 2);
    }

    #[test]
    fn test_finish_downcasts() {
        let doc = crate::parse_html("<p>a</p>").unwrap();
        let mut all = All::default();
        all.include(Selection::new(doc, 0));
        let boxed: Box<dyn Any> = Box::new(all).finish();
        let results = boxed.downcast::<Vec<Selection>>().unwrap();
        assert_eq!(results.len(), 1);
    }
}
