// Unit tests for the transcript aggregator
//
// These verify commit ordering, barge-in isolation, and flush semantics
// against the public API.

use fala_live::{TranscriptAggregator, TurnSide};

#[test]
fn test_partials_accumulate_and_commit() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_partial(TurnSide::User, "Oi");
    aggregator.append_partial(TurnSide::User, " tudo bem?");
    assert!(aggregator.history().is_empty(), "Nothing committed before turn complete");

    aggregator.commit_turn();

    let history = aggregator.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].side, TurnSide::User);
    assert_eq!(history[0].text, "Oi tudo bem?");
}

#[test]
fn test_commit_order_user_before_ai() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_partial(TurnSide::Ai, "Olá!");
    aggregator.append_partial(TurnSide::User, "Bom dia");
    aggregator.commit_turn();

    let history = aggregator.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].side, TurnSide::User, "User commits before AI within one turn");
    assert_eq!(history[1].side, TurnSide::Ai);
}

#[test]
fn test_empty_turn_complete_is_noop() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.commit_turn();
    assert!(aggregator.history().is_empty());

    // Whitespace-only partials count as empty too
    aggregator.append_partial(TurnSide::User, "   ");
    aggregator.commit_turn();
    assert!(aggregator.history().is_empty());
}

#[test]
fn test_interruption_discards_only_ai_partial() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_partial(TurnSide::Ai, "Olá");
    aggregator.append_partial(TurnSide::User, "Espera");

    aggregator.discard_ai_partial();

    assert_eq!(aggregator.partial(TurnSide::Ai), "", "AI partial dropped");
    assert_eq!(aggregator.partial(TurnSide::User), "Espera", "User partial untouched");

    aggregator.commit_turn();

    let history = aggregator.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].side, TurnSide::User);
    assert_eq!(history[0].text, "Espera");
}

#[test]
fn test_interrupted_ai_turn_commits_nothing() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_partial(TurnSide::Ai, "Olá");
    aggregator.discard_ai_partial();
    aggregator.commit_turn();

    assert!(aggregator.history().is_empty());
}

#[test]
fn test_flush_emits_open_partials() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_partial(TurnSide::User, "Bom dia");
    aggregator.flush();

    let history = aggregator.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].side, TurnSide::User);
    assert_eq!(history[0].text, "Bom dia");
}

#[test]
fn test_flush_is_idempotent() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_partial(TurnSide::User, "Tchau");
    aggregator.append_partial(TurnSide::Ai, "Até logo");

    aggregator.flush();
    aggregator.flush();

    assert_eq!(aggregator.history().len(), 2, "Second flush emits nothing new");
}

#[test]
fn test_history_preserves_commit_order_across_turns() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_partial(TurnSide::User, "Oi");
    aggregator.commit_turn();
    aggregator.append_partial(TurnSide::Ai, "Olá, como posso ajudar?");
    aggregator.commit_turn();
    aggregator.append_partial(TurnSide::User, "Quero praticar");
    aggregator.commit_turn();

    let sides: Vec<_> = aggregator.history().iter().map(|m| m.side).collect();
    assert_eq!(sides, vec![TurnSide::User, TurnSide::Ai, TurnSide::User]);
}
