//! Lead-agent analytics: a seven-day activity chart, today's status
//! breakdown, and the sentiment distribution over all analysis results.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use helpdesk_core::{Case, CaseError, CaseStatus};
use helpdesk_store::{CaseStore, SentimentCounts};
use serde::Serialize;

/// Days covered by the chart, today included.
pub const CHART_DAYS: i64 = 7;

/// One chart bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    /// UTC calendar day.
    pub date: NaiveDate,
    /// Cases opened that day.
    pub created: u64,
    /// Cases resolved that day, by either resolver.
    pub resolved: u64,
}

/// Status breakdown of the cases opened today.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TodayTotals {
    /// Cases opened today.
    pub total: u64,
    /// Still waiting for an agent.
    #[serde(rename = "OPEN")]
    pub open: u64,
    /// Assigned.
    #[serde(rename = "IN_PROGRESS")]
    pub in_progress: u64,
    /// Already resolved.
    #[serde(rename = "RESOLVED")]
    pub resolved: u64,
}

/// Counts or percentages keyed by sentiment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SentimentBreakdown {
    /// POSITIVE.
    pub positive: u64,
    /// NEUTRAL.
    pub neutral: u64,
    /// NEGATIVE.
    pub negative: u64,
}

/// Sentiment over every analysis result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SentimentReport {
    /// All results, including any without a sentiment.
    pub total: u64,
    /// Results per sentiment.
    pub counts: SentimentBreakdown,
    /// Share of `total` per sentiment, rounded to whole percent.
    pub percentage: SentimentBreakdown,
}

/// Response body of `GET /analytics`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    /// Oldest day first.
    pub daily_chart: Vec<DailyActivity>,
    /// Today's cases by status.
    pub today: TodayTotals,
    /// Sentiment distribution.
    pub sentiment: SentimentReport,
}

fn percent(part: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (part * 100 + total / 2) / total
}

/// Aggregate `cases` (anything created or resolved inside the window) and
/// the sentiment tally as of `now`.
pub fn build_report(cases: &[Case], sentiment: SentimentCounts, now: DateTime<Utc>) -> AnalyticsReport {
    let today = now.date_naive();
    let first = today - Duration::days(CHART_DAYS - 1);

    let mut daily_chart: Vec<DailyActivity> = (0..CHART_DAYS)
        .map(|offset| DailyActivity {
            date: first + Duration::days(offset),
            created: 0,
            resolved: 0,
        })
        .collect();
    let bucket = |date: NaiveDate| -> Option<usize> {
        let offset = (date - first).num_days();
        (0..CHART_DAYS)
            .contains(&offset)
            .then(|| usize::try_from(offset).ok())
            .flatten()
    };

    let mut totals = TodayTotals::default();
    for case in cases {
        let created = case.created_at.date_naive();
        if let Some(i) = bucket(created) {
            daily_chart[i].created += 1;
        }
        if let Some(i) = case.resolved_at().and_then(|at| bucket(at.date_naive())) {
            daily_chart[i].resolved += 1;
        }

        if created == today {
            totals.total += 1;
            match case.status {
                CaseStatus::Open => totals.open += 1,
                CaseStatus::InProgress => totals.in_progress += 1,
                CaseStatus::Resolved => totals.resolved += 1,
            }
        }
    }

    let total = sentiment.total();
    let counts = SentimentBreakdown {
        positive: sentiment.positive,
        neutral: sentiment.neutral,
        negative: sentiment.negative,
    };
    let percentage = SentimentBreakdown {
        positive: percent(counts.positive, total),
        neutral: percent(counts.neutral, total),
        negative: percent(counts.negative, total),
    };

    AnalyticsReport {
        daily_chart,
        today: totals,
        sentiment: SentimentReport {
            total,
            counts,
            percentage,
        },
    }
}

/// Load the window and the tally from `store` and build the report.
pub async fn analytics(store: &dyn CaseStore, now: DateTime<Utc>) -> Result<AnalyticsReport, CaseError> {
    let first_day = now.date_naive() - Duration::days(CHART_DAYS - 1);
    let since = first_day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let cases = store.cases_touched_since(since).await?;
    let sentiment = store.sentiment_counts().await?;
    Ok(build_report(&cases, sentiment, now))
}
