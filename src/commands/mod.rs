//! CLI commands implementation

pub mod alerts;
pub mod enrich;
pub mod ingest;
pub mod init;
pub mod parse;
pub mod report;
pub mod status;
pub mod xref;

pub use alerts::*;
pub use enrich::*;
pub use ingest::*;
pub use init::*;
pub use parse::*;
pub use report::*;
pub use status::*;
pub use xref::*;

use crate::error::{Error, Result};
use chrono::{Duration, Local, NaiveDate};

/// An inclusive day range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Resolve optional bounds; `to` defaults to today and `from` to
    /// `default_days - 1` days before `to`
    pub fn resolve(from: Option<NaiveDate>, to: Option<NaiveDate>, default_days: i64) -> Result<Self> {
        let to = to.unwrap_or_else(|| Local::now().date_naive());
        let from = from.unwrap_or_else(|| to - Duration::days(default_days.max(1) - 1));
        if from > to {
            return Err(Error::InvalidDate(format!("{} is after {}", from, to)));
        }
        Ok(Self { from, to })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |d| *d <= to)
    }

    pub fn len(&self) -> usize {
        ((self.to - self.from).num_days() + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}..{}", self.from, self.to)
        }
    }
}

/// Parse a CLI date (`YYYY-MM-DD`, `DD/MM/YYYY` or `YYYYMMDD`)
pub fn parse_cli_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    crate::models::parse_loose_date(raw).ok_or_else(|| format!("invalid date: {}", raw))
}
