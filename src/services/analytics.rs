use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::constants::ANALYTICS_CHART_DAYS;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReviews {
    pub date: NaiveDate,
    pub reviews: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyAnalytics {
    /// Most recent active days, oldest first.
    pub chart_data: Vec<DailyReviews>,
    pub streak: u32,
    pub heatmap: BTreeMap<NaiveDate, u32>,
}

pub fn study_analytics(store: &Store, user_id: &str) -> Result<StudyAnalytics, StoreError> {
    let chart_data = store
        .recent_daily_review_counts(user_id, ANALYTICS_CHART_DAYS)?
        .into_iter()
        .map(|(date, reviews)| DailyReviews { date, reviews })
        .collect();
    let streak = store
        .get_user_profile(user_id)?
        .map(|profile| profile.streak)
        .unwrap_or(0);
    Ok(StudyAnalytics {
        chart_data,
        streak,
        heatmap: store.get_activity_log(user_id)?,
    })
}
