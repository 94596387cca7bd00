//! Day schedule: which catalog sources are primary for a given date.
//!
//! The schedule is a pure function of the calendar date, so a wrapping
//! scheduler needs no state of its own and backfills are reproducible.
//!
//! Reading difficulty ramps over the programme: the first two weeks use the
//! easiest source, weeks three and four the general front page, and later
//! weeks the opinion section (denser, editorial Spanish). Podcasts rotate
//! by weekday; weekends reuse Monday's show.

use crate::catalog;
use crate::models::Source;
use chrono::{Datelike, NaiveDate, Weekday};

/// First day of the learning programme; week numbers count from here.
const PROGRAMME_START: (i32, u32, u32) = (2025, 7, 1);

/// The primary sources selected for one calendar day.
#[derive(Debug, Clone, Copy)]
pub struct DayPlan {
    pub date: NaiveDate,
    /// 1-based week of the programme.
    pub week_number: i64,
    pub article_source: &'static Source,
    pub podcast_source: &'static Source,
}

/// Compute the day's primary sources from the date.
pub fn plan_for(date: NaiveDate) -> DayPlan {
    let start = NaiveDate::from_ymd_opt(PROGRAMME_START.0, PROGRAMME_START.1, PROGRAMME_START.2)
        .unwrap();
    let week_number = (date.signed_duration_since(start).num_days() / 7) + 1;

    let article_id = if week_number <= 2 {
        "veinteminutos"
    } else if week_number <= 4 {
        "elpais-portada"
    } else {
        "elpais-opinion"
    };

    let podcast_id = match date.weekday() {
        Weekday::Mon => "hoy-hablamos",
        Weekday::Tue => "radio-ambulante",
        Weekday::Wed => "spanishpodcast",
        Weekday::Thu => "spanish-with-vicente",
        Weekday::Fri => "dele-podcast",
        // Weekend runs reuse Monday's show.
        Weekday::Sat | Weekday::Sun => "hoy-hablamos",
    };

    DayPlan {
        date,
        week_number,
        article_source: catalog::find(article_id).unwrap(),
        podcast_source: catalog::find(podcast_id).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_one_uses_easiest_reading_source() {
        let plan = plan_for(date(2025, 7, 3));
        assert_eq!(plan.week_number, 1);
        assert_eq!(plan.article_source.id, "veinteminutos");
    }

    #[test]
    fn test_week_three_moves_to_front_page() {
        let plan = plan_for(date(2025, 7, 16));
        assert_eq!(plan.week_number, 3);
        assert_eq!(plan.article_source.id, "elpais-portada");
    }

    #[test]
    fn test_late_weeks_use_opinion_section() {
        let plan = plan_for(date(2026, 8, 6));
        assert!(plan.week_number > 4);
        assert_eq!(plan.article_source.id, "elpais-opinion");
    }

    #[test]
    fn test_podcast_rotation_by_weekday() {
        // 2025-07-07 is a Monday.
        assert_eq!(plan_for(date(2025, 7, 7)).podcast_source.id, "hoy-hablamos");
        assert_eq!(plan_for(date(2025, 7, 8)).podcast_source.id, "radio-ambulante");
        assert_eq!(plan_for(date(2025, 7, 11)).podcast_source.id, "dele-podcast");
    }

    #[test]
    fn test_weekend_reuses_monday_show() {
        assert_eq!(plan_for(date(2025, 7, 12)).podcast_source.id, "hoy-hablamos");
        assert_eq!(plan_for(date(2025, 7, 13)).podcast_source.id, "hoy-hablamos");
    }

    #[test]
    fn test_plan_is_deterministic() {
        let a = plan_for(date(2025, 12, 24));
        let b = plan_for(date(2025, 12, 24));
        assert_eq!(a.article_source.id, b.article_source.id);
        assert_eq!(a.podcast_source.id, b.podcast_source.id);
    }
}
