//! Result cursors

use serde_json::Value;
use std::collections::VecDeque;

/// Forward-only result cursor returned by a [`QueryEngine`](super::QueryEngine)
pub trait Cursor: Send {
    /// Whether another result is available
    fn has_next(&self) -> bool;

    /// Take the next result
    fn next(&mut self) -> Option<Value>;

    /// Take every remaining result
    fn to_array(&mut self) -> Vec<Value>;

    /// Total number of results, if the query was asked to count them
    fn count(&self) -> Option<usize>;

    /// Release the cursor's results
    fn dispose(&mut self);
}

/// Cursor over fully materialized results
#[derive(Debug, Clone, Default)]
pub struct VecCursor {
    items: VecDeque<Value>,
    count: Option<usize>,
}

impl VecCursor {
    /// Wrap results; `counted` controls whether [`Cursor::count`] answers
    pub fn new(items: Vec<Value>, counted: bool) -> Self {
        let count = counted.then_some(items.len());
        Self {
            items: items.into(),
            count,
        }
    }
}

impl Cursor for VecCursor {
    fn has_next(&self) -> bool {
        !self.items.is_empty()
    }

    fn next(&mut self) -> Option<Value> {
        self.items.pop_front()
    }

    fn to_array(&mut self) -> Vec<Value> {
        self.items.drain(..).collect()
    }

    fn count(&self) -> Option<usize> {
        self.count
    }

    fn dispose(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_iteration() {
        let mut cursor = VecCursor::new(vec![json!(1), json!(2), json!(3)], true);
        assert_eq!(cursor.count(), Some(3));
        assert!(cursor.has_next());
        assert_eq!(cursor.next(), Some(json!(1)));
        assert_eq!(cursor.to_array(), vec![json!(2), json!(3)]);
        assert!(!cursor.has_next());
        // count reports the full result size
        assert_eq!(cursor.count(), Some(3));
    }

    #[test]
    fn test_uncounted_cursor() {
        let mut cursor = VecCursor::new(vec![json!("a")], false);
        assert_eq!(cursor.count(), None);
        cursor.dispose();
        assert_eq!(cursor.next(), None);
    }
}
