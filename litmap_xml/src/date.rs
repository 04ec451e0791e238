use chrono::NaiveDate;
use observability_deps::tracing::warn;

/// A year/month/day triple as read off the XML, before clamping. `day` may
/// be out of range for `month` (e.g. day 30 in February).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCandidate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// One entry of an article's history list, tagged by the history type
/// string as it appears in the XML (`"entrez"`, `"pubmed"`, `"medline"`,
/// `"received"`, …).
#[derive(Debug, Clone)]
pub struct HistoryCandidate {
    pub kind: String,
    pub date: DateCandidate,
}

/// Repairs a missing article date following the precedence in spec §3:
/// `ArticleDate` → `PubDate` → first `entrez` history entry → first
/// history entry, clamping an invalid day-of-month to the last valid day
/// of that month (spec B2).
pub fn repair_article_date(
    id: &str,
    article_date: Option<DateCandidate>,
    pub_date: Option<DateCandidate>,
    history: &[HistoryCandidate],
) -> NaiveDate {
    if let Some(candidate) = article_date {
        return clamp_and_log(id, candidate, "ArticleDate");
    }
    if let Some(candidate) = pub_date {
        return clamp_and_log(id, candidate, "PubDate");
    }
    if let Some(entrez) = history.iter().find(|h| h.kind.eq_ignore_ascii_case("entrez")) {
        return clamp_and_log(id, entrez.date, "entrez history");
    }
    if let Some(first) = history.first() {
        return clamp_and_log(id, first.date, "first history entry");
    }

    warn!(id, "article has no usable date anywhere, defaulting to 1900-01-01");
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()
}

fn clamp_and_log(id: &str, candidate: DateCandidate, source: &str) -> NaiveDate {
    let DateCandidate { year, month, day } = candidate;
    let month = month.clamp(1, 12);
    let last_day = days_in_month(year, month);
    let clamped_day = day.clamp(1, last_day);

    if clamped_day != day {
        warn!(
            id,
            source,
            original_day = day,
            clamped_day,
            year,
            month,
            "invalid day-of-month clamped to last valid day"
        );
    }

    NaiveDate::from_ymd_opt(year, month, clamped_day)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, last_day).expect("valid clamp"))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid first-of-month");

    let this_month_first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid first-of-month");
    (next_month_first - this_month_first).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_date_takes_precedence() {
        let date = repair_article_date(
            "pmid-1",
            Some(DateCandidate { year: 2024, month: 3, day: 15 }),
            Some(DateCandidate { year: 2024, month: 1, day: 1 }),
            &[],
        );
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn falls_back_to_entrez_history() {
        let history = vec![
            HistoryCandidate { kind: "received".into(), date: DateCandidate { year: 2023, month: 5, day: 1 } },
            HistoryCandidate { kind: "entrez".into(), date: DateCandidate { year: 2023, month: 6, day: 2 } },
        ];
        let date = repair_article_date("pmid-2", None, None, &history);
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 6, 2).unwrap());
    }

    #[test]
    fn falls_back_to_first_history_entry_when_no_entrez() {
        let history = vec![HistoryCandidate {
            kind: "received".into(),
            date: DateCandidate { year: 2022, month: 4, day: 9 },
        }];
        let date = repair_article_date("pmid-3", None, None, &history);
        assert_eq!(date, NaiveDate::from_ymd_opt(2022, 4, 9).unwrap());
    }

    #[test]
    fn clamps_invalid_day_of_month() {
        // spec B2: 2023-02-30 clamps to 2023-02-28.
        let date = repair_article_date(
            "pmid-4",
            Some(DateCandidate { year: 2023, month: 2, day: 30 }),
            None,
            &[],
        );
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
    }

    #[test]
    fn clamps_in_leap_year() {
        let date = repair_article_date(
            "pmid-5",
            Some(DateCandidate { year: 2024, month: 2, day: 30 }),
            None,
            &[],
        );
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
