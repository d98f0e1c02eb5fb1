use chrono::NaiveDate;

use crate::error::ParseError;

use super::units::normalise_tenths;

/// One day of measurements for a station, in physical units.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyObservation {
    pub date: NaiveDate,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub precipitation: Option<f64>,
}

impl DailyObservation {
    /// Parses `YYYYMMDD \t max \t min \t precip`, all measurements in tenths.
    pub fn from_line(line: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() != 4 {
            return Err(ParseError::FieldCount(fields.len()));
        }

        let date = parse_date(fields[0])?;
        let max_temp = normalise_tenths(fields[1])?;
        let min_temp = normalise_tenths(fields[2])?;
        let precipitation = normalise_tenths(fields[3])?;

        Ok(DailyObservation {
            date,
            max_temp,
            min_temp,
            precipitation,
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, ParseError> {
    let s = s.trim();
    if s.len() != 8 {
        return Err(ParseError::Date(s.to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| ParseError::Date(s.to_string()))
}

// -- Tests ----------------------------------------------------------------------------
