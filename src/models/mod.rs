//! Record types exchanged between parsers, engines and the store
//!
//! Rust field names are English; the serialized names follow the stable
//! Spanish field contract of the persisted data (`titulo`, `departamento`,
//! `importe`, `adjudicatario`, `empresa`, `cargo`, `accion`, ...).

mod document;
mod registry;
mod subsidy;

pub use document::*;
pub use registry::*;
pub use subsidy::*;

use chrono::NaiveDate;

/// Date formats accepted for free-text dates, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d", "%d-%m-%Y", "%d.%m.%Y"];

/// Parse a free-text date in any of the formats the sources use
pub fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loose_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_loose_date("2024-03-05"), expected);
        assert_eq!(parse_loose_date("05/03/2024"), expected);
        assert_eq!(parse_loose_date("20240305"), expected);
        assert_eq!(parse_loose_date(" 05.03.2024 "), expected);
        assert_eq!(parse_loose_date("marzo"), None);
    }
}
