use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FinancialYearError {
    #[error("financial year ending {0} is out of range")]
    OutOfRange(i32),
}

/// Financial year running 1 July to 30 June (inclusive at both ends).
/// The year value is the end year, e.g. 2023 = 2022-23 financial year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FinancialYear {
    end_year: i32,
    start: NaiveDate,
    end: NaiveDate,
}

impl FinancialYear {
    pub fn new(end_year: i32) -> Result<Self, FinancialYearError> {
        let start = end_year
            .checked_sub(1)
            .and_then(|start_year| NaiveDate::from_ymd_opt(start_year, 7, 1))
            .ok_or(FinancialYearError::OutOfRange(end_year))?;
        let end = NaiveDate::from_ymd_opt(end_year, 6, 30)
            .ok_or(FinancialYearError::OutOfRange(end_year))?;
        Ok(FinancialYear {
            end_year,
            start,
            end,
        })
    }

    /// Financial year ending in the current calendar year
    pub fn current() -> Result<Self, FinancialYearError> {
        Self::new(chrono::Local::now().year())
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    /// 1 July of the previous calendar year
    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    /// 30 June of the end year
    pub fn end_date(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Display as "2022-23" format
    pub fn display(&self) -> String {
        format!("{}-{:02}", self.end_year - 1, self.end_year.rem_euclid(100))
    }
}

impl std::fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
