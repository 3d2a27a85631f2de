//! Lexicon sentiment scoring for comments and captions.
//!
//! Text is lowercased, URLs and `@mention`/`#tag` tokens are stripped, then
//! whitespace-split words are counted against fixed positive, negative and
//! neutral word sets (emoji included). No model calls.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const POSITIVE: &[&str] = &[
    "love", "amazing", "awesome", "great", "excellent", "fantastic", "wonderful", "beautiful", "perfect", "best",
    "good", "nice", "cool", "super", "brilliant", "outstanding", "incredible", "fabulous", "marvelous",
    "spectacular", "divine", "gorgeous", "stunning", "impressive", "remarkable", "extraordinary", "magnificent",
    "like", "liked", "likes", "heart", "❤️", "😍", "🔥", "👏", "🙌", "💯", "✨", "happy", "joy", "excited",
    "thrilled", "delighted", "pleased", "satisfied",
];

const NEGATIVE: &[&str] = &[
    "hate", "terrible", "awful", "bad", "horrible", "disgusting", "ugly", "worst", "stupid", "dumb", "boring",
    "lame", "sucks", "pathetic", "ridiculous", "annoying", "disappointing", "useless", "worthless", "trash",
    "garbage", "fake", "scam", "angry", "mad", "furious", "upset", "frustrated", "disappointed", "sad",
    "depressed", "dislike", "disliked", "dislikes", "😡", "😠", "👎", "💔", "😢", "😭", "🤮",
];

const NEUTRAL: &[&str] = &[
    "okay", "ok", "fine", "alright", "normal", "average", "decent", "fair", "maybe", "perhaps", "possibly",
    "might", "could", "would", "should", "think", "believe", "guess", "suppose", "wonder", "question", "ask",
];

/// Scores strictly above this are positive, strictly below its negation negative.
const POLARITY_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSentiment {
    pub sentiment: Sentiment,
    /// `(positive - negative) / words`, in `[-1, 1]`.
    pub score: f64,
    /// Share of words that carry any sentiment, capped at 1.
    pub confidence: f64,
    pub positive_words: usize,
    pub negative_words: usize,
    pub neutral_words: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentsSentiment {
    pub overall_sentiment: Sentiment,
    pub positive_percentage: u32,
    pub negative_percentage: u32,
    pub neutral_percentage: u32,
    pub total_comments: usize,
    pub sentiment_breakdown: SentimentBreakdown,
}

impl CommentsSentiment {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            overall_sentiment: Sentiment::Neutral,
            positive_percentage: 0,
            negative_percentage: 0,
            neutral_percentage: 100,
            total_comments: 0,
            sentiment_breakdown: SentimentBreakdown::default(),
        }
    }
}

struct Lexicon {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    neutral: HashSet<&'static str>,
    url: Option<Regex>,
    tag: Option<Regex>,
    space: Option<Regex>,
}

fn lexicon() -> &'static Lexicon {
    static LEXICON: OnceLock<Lexicon> = OnceLock::new();
    LEXICON.get_or_init(|| Lexicon {
        positive: POSITIVE.iter().copied().collect(),
        negative: NEGATIVE.iter().copied().collect(),
        neutral: NEUTRAL.iter().copied().collect(),
        url: Regex::new(r"https?://\S+").ok(),
        tag: Regex::new(r"[@#]\w+").ok(),
        space: Regex::new(r"\s+").ok(),
    })
}

/// Lowercase, drop URLs and `@`/`#` tokens, collapse whitespace.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let lex = lexicon();
    let mut out = text.to_lowercase();
    for re in [&lex.url, &lex.tag].into_iter().flatten() {
        out = re.replace_all(&out, "").into_owned();
    }
    if let Some(space) = &lex.space {
        out = space.replace_all(&out, " ").into_owned();
    }
    out.trim().to_string()
}

#[must_use]
pub fn analyze_text(text: &str) -> TextSentiment {
    let mut result = TextSentiment {
        sentiment: Sentiment::Neutral,
        score: 0.0,
        confidence: 0.0,
        positive_words: 0,
        negative_words: 0,
        neutral_words: 0,
    };
    if text.is_empty() {
        return result;
    }

    let lex = lexicon();
    let cleaned = clean_text(text);
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    for word in &words {
        if lex.positive.contains(word) {
            result.positive_words += 1;
        } else if lex.negative.contains(word) {
            result.negative_words += 1;
        } else if lex.neutral.contains(word) {
            result.neutral_words += 1;
        }
    }

    let sentiment_words = result.positive_words + result.negative_words + result.neutral_words;
    if sentiment_words == 0 {
        result.confidence = 0.1;
        return result;
    }

    #[allow(clippy::cast_precision_loss)]
    let (total, pos, neg, hits) = (
        words.len() as f64,
        result.positive_words as f64,
        result.negative_words as f64,
        sentiment_words as f64,
    );
    result.score = (pos - neg) / total;
    result.confidence = (hits / total).min(1.0);
    result.sentiment = if result.score > POLARITY_THRESHOLD {
        Sentiment::Positive
    } else if result.score < -POLARITY_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };
    result
}

/// Classify each comment and aggregate into rounded percentages.
///
/// The overall label is positive or negative only when its share is
/// strictly larger than both others.
#[must_use]
pub fn analyze_comments<S: AsRef<str>>(comments: &[S]) -> CommentsSentiment {
    if comments.is_empty() {
        return CommentsSentiment::empty();
    }

    let mut breakdown = SentimentBreakdown::default();
    for comment in comments {
        match analyze_text(comment.as_ref()).sentiment {
            Sentiment::Positive => breakdown.positive += 1,
            Sentiment::Negative => breakdown.negative += 1,
            Sentiment::Neutral => breakdown.neutral += 1,
        }
    }

    let total = comments.len();
    let pct = |count: usize| -> u32 {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = (count as f64 / total as f64 * 100.0).round_ties_even() as u32;
        value
    };
    let (positive, negative, neutral) = (pct(breakdown.positive), pct(breakdown.negative), pct(breakdown.neutral));

    let overall = if positive > negative && positive > neutral {
        Sentiment::Positive
    } else if negative > positive && negative > neutral {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    CommentsSentiment {
        overall_sentiment: overall,
        positive_percentage: positive,
        negative_percentage: negative,
        neutral_percentage: neutral,
        total_comments: total,
        sentiment_breakdown: breakdown,
    }
}

#[cfg(test)]
#[path = "sentiment_test.rs"]
mod tests;
