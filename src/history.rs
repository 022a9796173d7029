//! Bounded navigation history.
//!
//! Entries are kept newest-last. Pushing the screen already on top replaces
//! it in place; otherwise the oldest entries are dropped once the cap is
//! exceeded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use checkout_types::{screens, ScreenId, SearchContext};

/// Where the user was, and enough context to put them back there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationContext {
    pub screen_id: ScreenId,
    pub title: String,
    pub search: Option<SearchContext>,
    /// Side-channel data the screen wants back on return
    pub data: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl NavigationContext {
    /// Context for `screen_id`, titled with the screen's default title when
    /// it is a known checkout screen.
    pub fn new(screen_id: ScreenId, created_at: DateTime<Utc>) -> Self {
        let title = screens::default_title(screen_id.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| screen_id.to_string());
        Self {
            screen_id,
            title,
            search: None,
            data: HashMap::new(),
            created_at,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_search(mut self, search: SearchContext) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

pub struct HistoryStack {
    capacity: usize,
    entries: Mutex<VecDeque<NavigationContext>>,
}

impl HistoryStack {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<NavigationContext>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, context: NavigationContext) {
        let mut entries = self.lock();
        if let Some(top) = entries.back_mut() {
            if top.screen_id == context.screen_id {
                *top = context;
                return;
            }
        }
        entries.push_back(context);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    pub fn pop(&self) -> Option<NavigationContext> {
        self.lock().pop_back()
    }

    pub fn peek(&self) -> Option<NavigationContext> {
        self.lock().back().cloned()
    }

    /// Most recent entry for `screen_id`, scanning from the top.
    pub fn find_most_recent_by_screen(&self, screen_id: &ScreenId) -> Option<NavigationContext> {
        self.lock()
            .iter()
            .rev()
            .find(|c| &c.screen_id == screen_id)
            .cloned()
    }

    /// Drop every entry for a screen that can no longer be returned to.
    pub fn remove_all_for_screen(&self, screen_id: &ScreenId) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|c| &c.screen_id != screen_id);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Clone of the stack, top first.
    pub fn snapshot(&self) -> Vec<NavigationContext> {
        self.lock().iter().rev().cloned().collect()
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(crate::config::HistoryConfig::default().capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx(screen: &str) -> NavigationContext {
        NavigationContext::new(ScreenId::from(screen), Utc::now())
    }

    #[test]
    fn test_same_screen_replaces_top() {
        let stack = HistoryStack::new(10);
        stack.push(ctx(screens::CART));
        stack.push(ctx(screens::CART).with_title("Cart (2)"));

        assert_eq!(stack.len(), 1);
        assert_eq!(stack.peek().unwrap().title, "Cart (2)");
    }

    #[test]
    fn test_pop_returns_newest_first() {
        let stack = HistoryStack::new(10);
        stack.push(ctx(screens::CART));
        stack.push(ctx(screens::DELIVERY_INFO));

        assert_eq!(stack.pop().unwrap().screen_id.as_str(), screens::DELIVERY_INFO);
        assert_eq!(stack.pop().unwrap().screen_id.as_str(), screens::CART);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_find_and_remove_by_screen() {
        let stack = HistoryStack::new(10);
        let search = SearchContext {
            term: Some("tea".into()),
            page: 2,
            total_pages: 5,
            ..Default::default()
        };
        stack.push(ctx("search_results").with_search(search.clone()));
        stack.push(ctx(screens::CART));
        stack.push(ctx("search_results").with_search(SearchContext::default()));

        let found = stack
            .find_most_recent_by_screen(&ScreenId::from("search_results"))
            .unwrap();
        assert_eq!(found.search, Some(SearchContext::default()));

        assert_eq!(stack.remove_all_for_screen(&ScreenId::from("search_results")), 2);
        assert_eq!(stack.len(), 1);
        assert!(stack
            .find_most_recent_by_screen(&ScreenId::from("search_results"))
            .is_none());
    }

    #[test]
    fn test_default_title_and_data() {
        let c = ctx(screens::ORDER_SUMMARY).with_data("scroll", serde_json::json!(120));
        assert_eq!(c.title, "Order Summary");
        assert_eq!(c.data["scroll"], 120);
        assert_eq!(ctx("wishlist").title, "wishlist");
    }

    #[test]
    fn test_snapshot_is_top_first() {
        let stack = HistoryStack::new(10);
        stack.push(ctx("a"));
        stack.push(ctx("b"));
        let snap: Vec<_> = stack
            .snapshot()
            .into_iter()
            .map(|c| c.screen_id.to_string())
            .collect();
        assert_eq!(snap, vec!["b", "a"]);
        stack.clear();
        assert!(stack.is_empty());
    }

    proptest! {
        #[test]
        fn prop_size_never_exceeds_cap(
            cap in 1usize..12,
            ids in proptest::collection::vec("[a-e]", 0..60),
        ) {
            let stack = HistoryStack::new(cap);
            for s in &ids {
                stack.push(ctx(s));
                prop_assert!(stack.len() <= cap);
            }
        }

        #[test]
        fn prop_distinct_pushes_keep_most_recent(cap in 1usize..12, extra in 1usize..10) {
            let stack = HistoryStack::new(cap);
            let n = cap + extra;
            for i in 0..n {
                stack.push(ctx(&format!("screen_{i}")));
            }
            prop_assert_eq!(stack.len(), cap);
            let expected: Vec<String> = (n - cap..n).rev().map(|i| format!("screen_{i}")).collect();
            let actual: Vec<String> = stack.snapshot().into_iter().map(|c| c.screen_id.to_string()).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_repeated_screen_never_grows(times in 1usize..20) {
            let stack = HistoryStack::new(10);
            for _ in 0..times {
                stack.push(ctx(screens::CART));
            }
            prop_assert_eq!(stack.len(), 1);
        }
    }
}
