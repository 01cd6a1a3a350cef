//! Unit tests for BudgetFillStrategy.
//!
//! Covers recency ordering, greedy stop at the first overflow, and the budget bound.

mod common;

use chrono::Utc;
use memory_strategies::{BudgetFillStrategy, RelevanceStrategy};

/// **Test: Newest contexts are taken first and the text is blank-line separated.**
#[tokio::test]
async fn test_budget_fill_newest_first() {
    let now = Utc::now();
    let contexts = vec![
        common::context("old", "oldest note", 2, now, 30),
        common::context("new", "newest note", 2, now, 0),
        common::context("mid", "middle note", 2, now, 10),
    ];
    let strategy = BudgetFillStrategy::new(100);

    let selection = strategy.select("anything", &contexts).await.unwrap();

    assert_eq!(selection.context_ids(), vec!["new", "mid", "old"]);
    assert_eq!(selection.text(), "newest note\n\nmiddle note\n\noldest note");
}

/// **Test: Selection stops at the first context that would overflow, even if a later one fits.**
#[tokio::test]
async fn test_budget_fill_stops_at_first_overflow() {
    let now = Utc::now();
    let contexts = vec![
        common::context("a", "a", 6, now, 0),
        common::context("b", "b", 5, now, 1),
        common::context("c", "c", 1, now, 2),
    ];
    let strategy = BudgetFillStrategy::new(10);

    let selection = strategy.select("", &contexts).await.unwrap();

    assert_eq!(selection.context_ids(), vec!["a"]);
    assert_eq!(selection.total_tokens(), 6);
}

/// **Test: Selected tokens never exceed the budget across varied inputs.**
#[tokio::test]
async fn test_budget_fill_never_exceeds_budget() {
    let now = Utc::now();
    for budget in [0usize, 1, 5, 9, 17, 40] {
        let contexts: Vec<_> = (0..12)
            .map(|i| common::context(&format!("c{i}"), "x", (i * 7) % 11 + 1, now, i as i64))
            .collect();
        let selection = BudgetFillStrategy::new(budget)
            .select("q", &contexts)
            .await
            .unwrap();
        assert!(selection.total_tokens() <= budget, "budget {budget} exceeded");
    }
}

/// **Test: An exact fit is accepted.**
#[tokio::test]
async fn test_budget_fill_exact_fit() {
    let now = Utc::now();
    let contexts = vec![
        common::context("a", "a", 4, now, 0),
        common::context("b", "b", 6, now, 1),
    ];
    let selection = BudgetFillStrategy::new(10).select("", &contexts).await.unwrap();
    assert_eq!(selection.context_ids(), vec!["a", "b"]);
}

/// **Test: No contexts yields an empty selection and empty text.**
#[tokio::test]
async fn test_budget_fill_empty() {
    let selection = BudgetFillStrategy::new(10).select("q", &[]).await.unwrap();
    assert!(selection.is_empty());
    assert_eq!(selection.text(), "");
}
