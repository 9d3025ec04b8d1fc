//! Product symbol enumeration.
//!
//! Daily-expiry products are named `{UNDERLYING}0D{YY}{MM}{DD}`. Every day
//! 1..=31 is generated for every month; symbols for dates that don't exist
//! simply come back from the API as an empty page.

pub const DEFAULT_UNDERLYINGS: &[&str] = &["OPOS", "BITCOIN", "ETH"];
pub const DEFAULT_YEAR: u32 = 23;

const MONTHS: std::ops::RangeInclusive<u32> = 1..=12;
const DAYS: std::ops::RangeInclusive<u32> = 1..=31;

/// Build the symbol for one underlying and expiry date.
///
/// ```
/// use fillbook::products::product_symbol;
///
/// assert_eq!(product_symbol("BITCOIN", 23, 6, 15), "BITCOIN0D230615");
/// ```
pub fn product_symbol(underlying: &str, year: u32, month: u32, day: u32) -> String {
    format!("{underlying}0D{year:02}{month:02}{day:02}")
}

/// The set of products to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRange {
    pub underlyings: Vec<String>,
    /// Two-digit year.
    pub year: u32,
    /// Restrict to one month; all twelve when unset.
    pub month: Option<u32>,
    /// Restrict to one day of month; 1 through 31 when unset.
    pub day: Option<u32>,
}

impl Default for ProductRange {
    fn default() -> Self {
        Self {
            underlyings: DEFAULT_UNDERLYINGS.iter().map(|u| u.to_string()).collect(),
            year: DEFAULT_YEAR,
            month: None,
            day: None,
        }
    }
}

impl ProductRange {
    pub fn new(underlyings: Vec<String>, year: u32) -> Self {
        Self {
            underlyings,
            year,
            month: None,
            day: None,
        }
    }

    pub fn with_month(mut self, month: Option<u32>) -> Self {
        self.month = month;
        self
    }

    pub fn with_day(mut self, day: Option<u32>) -> Self {
        self.day = day;
        self
    }

    fn months(&self) -> Vec<u32> {
        match self.month {
            Some(month) => vec![month],
            None => MONTHS.collect(),
        }
    }

    fn days(&self) -> Vec<u32> {
        match self.day {
            Some(day) => vec![day],
            None => DAYS.collect(),
        }
    }

    /// All symbols, ordered by underlying, then month, then day.
    pub fn symbols(&self) -> Vec<String> {
        let months = self.months();
        let days = self.days();

        let mut symbols =
            Vec::with_capacity(self.underlyings.len() * months.len() * days.len());
        for underlying in &self.underlyings {
            for &month in &months {
                for &day in &days {
                    symbols.push(product_symbol(underlying, self.year, month, day));
                }
            }
        }
        symbols
    }
}
