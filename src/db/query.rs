//! Read-only filtered access to the observation and statistics tables.

use chrono::NaiveDate;
use rusqlite::{types::Value, Connection, Row};
use serde::Serialize;

use crate::error::StorageError;

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationRow {
    pub station_id: i64,
    pub weather_date: NaiveDate,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub precipitation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyStat {
    pub station_id: i64,
    pub year: i32,
    pub avg_max_temp: f64,
    pub avg_min_temp: f64,
    pub total_precipitation: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ObservationFilter {
    pub station_id: Option<i64>,
    pub date: Option<NaiveDate>,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub station_id: Option<i64>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub page: u32,
    pub per_page: u32,
    pub data: Vec<T>,
}

pub fn observations(
    conn: &Connection,
    filter: &ObservationFilter,
) -> Result<Page<ObservationRow>, StorageError> {
    let page = filter.page.max(1);
    let per_page = match filter.per_page {
        0 => DEFAULT_PER_PAGE,
        n => n.min(MAX_PER_PAGE),
    };

    let mut sql = String::from(
        "SELECT station_id, weather_date, max_temp, min_temp, precipitation
         FROM weather_data WHERE 1 = 1",
    );
    let mut binds: Vec<Value> = Vec::new();
    if let Some(station_id) = filter.station_id {
        sql.push_str(" AND station_id = ?");
        binds.push(Value::Integer(station_id));
    }
    if let Some(date) = filter.date {
        sql.push_str(" AND weather_date = ?");
        binds.push(Value::Text(date.format("%F").to_string()));
    }
    sql.push_str(" ORDER BY station_id, weather_date, rowid LIMIT ? OFFSET ?");
    binds.push(Value::Integer(i64::from(per_page)));
    binds.push(Value::Integer(i64::from(page - 1) * i64::from(per_page)));

    let mut stmt = conn.prepare(&sql)?;
    let data = stmt
        .query_map(rusqlite::params_from_iter(binds), observation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        page,
        per_page,
        data,
    })
}

pub fn yearly_stats(conn: &Connection, filter: &StatsFilter) -> Result<Vec<YearlyStat>, StorageError> {
    let mut sql = String::from(
        "SELECT station_id, year, avg_max_temp, avg_min_temp, total_precipitation
         FROM weather_stats WHERE 1 = 1",
    );
    let mut binds: Vec<Value> = Vec::new();
    if let Some(station_id) = filter.station_id {
        sql.push_str(" AND station_id = ?");
        binds.push(Value::Integer(station_id));
    }
    if let Some(year) = filter.year {
        sql.push_str(" AND year = ?");
        binds.push(Value::Integer(i64::from(year)));
    }
    sql.push_str(" ORDER BY station_id, year");

    let mut stmt = conn.prepare(&sql)?;
    let stats = stmt
        .query_map(rusqlite::params_from_iter(binds), |row| {
            Ok(YearlyStat {
                station_id: row.get(0)?,
                year: row.get(1)?,
                avg_max_temp: row.get(2)?,
                avg_min_temp: row.get(3)?,
                total_precipitation: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(stats)
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<ObservationRow> {
    Ok(ObservationRow {
        station_id: row.get(0)?,
        weather_date: row.get(1)?,
        max_temp: row.get(2)?,
        min_temp: row.get(3)?,
        precipitation: row.get(4)?,
    })
}

// -- Tests -------------------------------------------------------------------
