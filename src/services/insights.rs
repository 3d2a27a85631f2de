//! Analytics views derived from raw Graph insights and media.
//!
//! Every function here is pure: callers fetch insights and media through
//! `SocialPlatform` and pass the current time in, so tests pin the clock.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::instagram::{InsightMetric, MediaItem};

/// Posts whose per-media insights feed the performance view.
pub const PERFORMANCE_INSIGHT_POSTS: usize = 10;
const TREND_WEEKS: usize = 4;
const POSTS_PER_TREND_WEEK: usize = 10;
const DEFAULT_COLOR: &str = "#6B7280";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayInsight {
    pub name: String,
    pub engagement: u64,
    pub reach: u64,
    pub impressions: u64,
    pub views: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceDay {
    pub date: String,
    pub engagement: u64,
    pub reach: u64,
    pub views: u64,
    pub impressions: u64,
    pub saves: u64,
    pub shares: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceSlice {
    pub demographic: String,
    pub value: u64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: String,
    pub engagement: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekTrend {
    pub week: String,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachMetric {
    pub metric: String,
    pub value: u64,
    pub color: String,
}

fn weekday_abbrev(ts: OffsetDateTime) -> String {
    ts.weekday().to_string().chars().take(3).collect()
}

/// Copy the i-th daily value of the tracked metrics into `apply(i, name, value)`.
fn each_daily_value(insights: &[InsightMetric], mut apply: impl FnMut(usize, &str, u64)) {
    for metric in insights {
        for (i, value) in metric.values.iter().take(7).enumerate() {
            apply(i, metric.name.as_str(), value.as_u64());
        }
    }
}

// =============================================================================
// WEEKLY / PERFORMANCE
// =============================================================================

/// Seven days ending today, keyed by weekday abbreviation.
///
/// Account metric value `i` maps to day `i`. Engagement sums every post
/// whose weekday matches, not only posts from this week.
#[must_use]
pub fn weekly(insights: &[InsightMetric], media: &[MediaItem], now: OffsetDateTime) -> Vec<DayInsight> {
    let mut days: Vec<DayInsight> = (0..7)
        .map(|i| DayInsight {
            name: weekday_abbrev(now - Duration::days(6 - i)),
            ..DayInsight::default()
        })
        .collect();

    each_daily_value(insights, |i, name, value| match name {
        "impressions" => days[i].impressions = value,
        "reach" => days[i].reach = value,
        "profile_views" => days[i].views = value,
        _ => {}
    });

    for post in media {
        let Some(posted) = post.posted_at() else { continue };
        let name = weekday_abbrev(posted);
        if let Some(day) = days.iter_mut().find(|d| d.name == name) {
            day.engagement += post.engagement();
        }
    }
    days
}

/// `Day 1`..`Day 7`, oldest first. A post counts toward day `i` when it is
/// exactly `6 - i` whole days old. Shares are estimated at 5% of engagement.
#[must_use]
pub fn performance(
    insights: &[InsightMetric],
    media: &[MediaItem],
    saves_by_post: &HashMap<String, u64>,
    now: OffsetDateTime,
) -> Vec<PerformanceDay> {
    let mut days: Vec<PerformanceDay> = (1..=7)
        .map(|n| PerformanceDay {
            date: format!("Day {n}"),
            ..PerformanceDay::default()
        })
        .collect();

    each_daily_value(insights, |i, name, value| match name {
        "impressions" => days[i].impressions = value,
        "reach" => days[i].reach = value,
        "profile_views" => days[i].views = value,
        _ => {}
    });

    for post in media {
        let Some(posted) = post.posted_at() else { continue };
        let age = now - posted;
        if age.is_negative() {
            continue;
        }
        let Ok(days_ago) = usize::try_from(age.whole_days()) else { continue };
        if days_ago > 6 {
            continue;
        }
        let day = &mut days[6 - days_ago];
        day.engagement += post.engagement();
        day.saves += saves_by_post.get(&post.id).copied().unwrap_or_default();
    }

    for day in &mut days {
        day.shares = day.engagement * 5 / 100;
    }
    days
}

/// Sum of the `saved` metric in one post's insights.
#[must_use]
pub fn saved_total(metrics: &[InsightMetric]) -> u64 {
    metrics
        .iter()
        .filter(|m| m.name == "saved")
        .map(InsightMetric::total)
        .sum()
}

// =============================================================================
// AUDIENCE
// =============================================================================

#[must_use]
pub fn age_color(age_range: &str) -> &'static str {
    match age_range {
        "13-17" => "#3B82F6",
        "18-24" => "#10B981",
        "25-34" => "#F59E0B",
        "35-44" => "#EF4444",
        "45-54" => "#8B5CF6",
        "55-64" => "#06B6D4",
        _ => DEFAULT_COLOR,
    }
}

/// Age-range shares from `audience_gender_age` (`"F.25-34": n` keys),
/// in first-seen order. Falls back to a single "No Audience Data" slice.
#[must_use]
pub fn audience(demographics: &[InsightMetric]) -> Vec<AudienceSlice> {
    let mut totals: Vec<(String, u64)> = Vec::new();
    let mut audience_total = 0u64;

    for metric in demographics.iter().filter(|m| m.name == "audience_gender_age") {
        let Some(breakdown) = metric.values.first().and_then(|v| v.value.as_object()) else {
            continue;
        };
        for (key, count) in breakdown {
            let Some((_, age_range)) = key.split_once('.') else { continue };
            let count = count.as_u64().unwrap_or_default();
            audience_total += count;
            match totals.iter_mut().find(|(range, _)| range == age_range) {
                Some((_, total)) => *total += count,
                None => totals.push((age_range.to_string(), count)),
            }
        }
    }

    if totals.is_empty() {
        return vec![AudienceSlice {
            demographic: "No Audience Data".into(),
            value: 100,
            color: DEFAULT_COLOR.into(),
        }];
    }

    totals
        .into_iter()
        .map(|(range, count)| AudienceSlice {
            value: percent(count, audience_total),
            color: age_color(&range).into(),
            demographic: format!("Age {range}"),
        })
        .collect()
}

fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = (part as f64 / whole as f64 * 100.0).round_ties_even() as u64;
    value
}

// =============================================================================
// ENGAGEMENT
// =============================================================================

/// Engagement summed into two-hour windows at fixed times of day (UTC).
#[must_use]
pub fn engagement_by_time(media: &[MediaItem]) -> Vec<TimeSlot> {
    let mut hourly = [0u64; 24];
    for post in media {
        if let Some(posted) = post.posted_at() {
            hourly[usize::from(posted.hour())] += post.engagement();
        }
    }
    [("6AM", 6), ("9AM", 9), ("12PM", 12), ("3PM", 15), ("6PM", 18), ("9PM", 21), ("12AM", 0)]
        .into_iter()
        .map(|(label, hour)| TimeSlot {
            time: label.into(),
            engagement: hourly[hour] + hourly[hour + 1],
        })
        .collect()
}

/// The latest 40 posts in four buckets of ten, newest bucket first.
/// Shares are estimated at 10% of likes.
#[must_use]
pub fn engagement_trends(media: &[MediaItem]) -> Vec<WeekTrend> {
    (0..TREND_WEEKS)
        .map(|week| {
            let bucket = media
                .iter()
                .skip(week * POSTS_PER_TREND_WEEK)
                .take(POSTS_PER_TREND_WEEK);
            let (likes, comments) = bucket.fold((0, 0), |(l, c), p| (l + p.like_count, c + p.comments_count));
            WeekTrend {
                week: format!("Week {}", week + 1),
                likes,
                comments,
                shares: likes / 10,
            }
        })
        .collect()
}

/// Seven-day totals. Website clicks appear only when non-zero.
#[must_use]
pub fn reach(insights: &[InsightMetric]) -> Vec<ReachMetric> {
    let total = |name: &str| {
        insights
            .iter()
            .rfind(|m| m.name == name)
            .map(InsightMetric::total)
            .unwrap_or_default()
    };
    let metric = |label: &str, value: u64, color: &str| ReachMetric {
        metric: label.into(),
        value,
        color: color.into(),
    };

    let mut data = vec![
        metric("Reach", total("reach"), "#3B82F6"),
        metric("Impressions", total("impressions"), "#10B981"),
        metric("Profile Views", total("profile_views"), "#F59E0B"),
    ];
    let clicks = total("website_clicks");
    if clicks > 0 {
        data.push(metric("Website Clicks", clicks, "#8B5CF6"));
    }
    data
}

#[cfg(test)]
#[path = "insights_test.rs"]
mod tests;
