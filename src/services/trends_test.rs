use super::*;
use crate::state::test_helpers::MockLlm;

#[test]
fn trending_topics_are_ranked_fallbacks() {
    let trends = trending_topics();
    assert_eq!(trends.len(), 10);
    assert_eq!(trends[0].keyword, "AI technology");
    assert_eq!(trends[0].rank, 1);
    assert_eq!(trends[9].rank, 10);
    assert!(trends.iter().all(|t| t.category == "fallback"));
}

#[test]
fn basic_strategy_uses_top_three_trends() {
    let trends = trending_topics();
    let s = basic_strategy(&trends, "sports");
    assert!(s.strategy.starts_with("Content Strategy for sports:"));
    assert!(s.strategy.contains("AI technology, Social media marketing, Content creation"));
    assert!(s.strategy.contains("Post during peak hours (2-6 PM)"));
    assert_eq!(s.trends_used.len(), 3);
}

#[tokio::test]
async fn generate_strategy_without_llm_is_template() {
    let s = generate_strategy(None, &trending_topics(), "fitness").await;
    assert_eq!(s.niche, "fitness");
    assert!(s.strategy.contains("Reels with trending audio"));
}

#[tokio::test]
async fn generate_strategy_sends_top_five_trends() {
    let llm = MockLlm::new(["  1. Post cricket reels  "]);
    let s = generate_strategy(Some(&llm), &trending_topics(), "sports").await;
    assert_eq!(s.strategy, "1. Post cricket reels");
    assert_eq!(s.trends_used.len(), 5);

    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, STRATEGIST_SYSTEM);
    assert_eq!(calls[0].max_tokens, 800);
    assert!(calls[0].prompt.contains("- Instagram reels (Rank #5)"));
    assert!(!calls[0].prompt.contains("Viral content"));
}

#[tokio::test]
async fn generate_strategy_falls_back_on_llm_error() {
    let llm = MockLlm::failing();
    let s = generate_strategy(Some(&llm), &trending_topics(), "sports").await;
    assert!(s.strategy.starts_with("Content Strategy for sports:"));
}

#[tokio::test]
async fn comprehensive_strategy_uses_sports_niche() {
    let c = comprehensive_strategy(None).await;
    assert_eq!(c.content_strategy.niche, "sports");
    assert_eq!(c.trending_topics.len(), 10);
    assert!(c.interest_analysis.is_empty());
    assert_eq!(c.recommendations.len(), 4);
    assert_eq!(c.recommendations[0], "Leverage trending topic: 'AI technology' in your next post");
}

#[test]
fn recommendations_without_trends_are_generic() {
    assert_eq!(recommendations(&[]).len(), 3);
}

#[test]
fn related_queries_share_a_word() {
    assert_eq!(related_queries("marketing"), ["Social media marketing", "Influencer marketing"]);
    assert_eq!(related_queries("Instagram reels"), Vec::<String>::new());
    assert!(topic_analysis("cricket").related_queries.is_empty());
}
