use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// A Monday-to-Sunday week, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub monday: NaiveDate,
    pub sunday: NaiveDate,
}

impl Period {
    pub fn starting_at(monday: NaiveDate) -> Self {
        Self {
            monday,
            sunday: monday + Duration::days(6),
        }
    }

    pub fn containing(date: NaiveDate) -> Self {
        let offset = i64::from(date.weekday().num_days_from_monday());
        Self::starting_at(date - Duration::days(offset))
    }

    /// ISO week number of the Monday. Used for file naming only, so the
    /// first week of a year can legitimately report week 52/53 or week 1.
    pub fn iso_week(&self) -> u32 {
        self.monday.iso_week().week()
    }

    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.monday.format("%Y-%m-%d"),
            self.sunday.format("%Y-%m-%d")
        )
    }

    pub fn compact_label(&self) -> String {
        format!(
            "{}-{}",
            self.monday.format("%Y%m%d"),
            self.sunday.format("%Y%m%d")
        )
    }
}

pub fn today_in(timezone: Tz) -> NaiveDate {
    Utc::now().with_timezone(&timezone).date_naive()
}

pub fn this_week_range(today: NaiveDate) -> Period {
    Period::containing(today)
}

pub fn last_week_range(today: NaiveDate) -> Period {
    let offset = i64::from(today.weekday().num_days_from_monday()) + 7;
    Period::starting_at(today - Duration::days(offset))
}

/// Every week that intersects `year`, including the boundary weeks that
/// straddle Dec 31 / Jan 1.
pub fn year_weeks(year: i32) -> Vec<Period> {
    let Some(first_day) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    let first_monday = Period::containing(first_day).monday;

    std::iter::successors(Some(first_monday), |monday| {
        monday.checked_add_signed(Duration::days(7))
    })
    .take_while(|monday| monday.year() <= year)
    .map(Period::starting_at)
    .filter(|period| period.sunday.year() >= year)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::{Period, last_week_range, this_week_range, year_weeks};
    use chrono::{Datelike, Duration, NaiveDate, Weekday};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn year_2024_starts_on_jan_first_and_covers_new_years_eve() {
        let weeks = year_weeks(2024);

        assert_eq!(weeks.first().map(|week| week.monday), Some(date(2024, 1, 1)));
        let last = weeks.last().expect("at least one week");
        assert!(last.sunday >= date(2024, 12, 31));
        assert_eq!(last.monday, date(2024, 12, 30));
    }

    #[test]
    fn first_week_may_start_in_previous_december() {
        let weeks = year_weeks(2025);

        assert_eq!(weeks[0].monday, date(2024, 12, 30));
        assert_eq!(weeks[0].sunday, date(2025, 1, 5));
    }

    #[test]
    fn weeks_are_contiguous_and_cover_every_day() {
        for year in 1999..=2032 {
            let weeks = year_weeks(year);

            assert!(!weeks.is_empty());
            assert!(weeks.iter().all(|week| week.monday.weekday() == Weekday::Mon));
            assert!(
                weeks
                    .iter()
                    .all(|week| week.sunday - week.monday == Duration::days(6))
            );
            assert!(
                weeks
                    .windows(2)
                    .all(|pair| pair[1].monday - pair[0].monday == Duration::days(7))
            );

            let mut day = date(year, 1, 1);
            while day.year() == year {
                assert!(
                    weeks
                        .iter()
                        .any(|week| week.monday <= day && day <= week.sunday),
                    "{day} not covered in {year}"
                );
                day += Duration::days(1);
            }

            assert!(weeks.iter().all(|week| week.monday.year() <= year));
            assert!(weeks.iter().all(|week| week.sunday.year() >= year));
        }
    }

    #[test]
    fn last_week_is_the_week_before_today() {
        let wednesday = date(2024, 3, 13);

        assert_eq!(
            last_week_range(wednesday),
            Period {
                monday: date(2024, 3, 4),
                sunday: date(2024, 3, 10),
            }
        );
    }

    #[test]
    fn this_week_on_a_sunday_starts_six_days_earlier() {
        let sunday = date(2024, 3, 17);
        let period = this_week_range(sunday);

        assert_eq!(period.monday, date(2024, 3, 11));
        assert_eq!(period.sunday, sunday);
        assert_eq!(this_week_range(date(2024, 3, 11)), period);
    }

    #[test]
    fn labels_use_iso_week_of_monday() {
        let period = Period::starting_at(date(2024, 12, 30));

        assert_eq!(period.iso_week(), 1);
        assert_eq!(period.label(), "2024-12-30 to 2025-01-05");
        assert_eq!(period.compact_label(), "20241230-20250105");
    }
}
