//! Lists the station registry.

use anyhow::Result;

use crate::{
    config::Settings,
    db::{list_stations, Store},
};

pub fn stations(settings: &Settings) -> Result<String> {
    let store = Store::open_read_only(&settings.database, settings.timeout())?;
    let stations = list_stations(store.conn())?;

    let lines: Vec<String> = stations
        .iter()
        .map(|s| format!("{:>8}  {}", s.station_id, s.station_code))
        .collect();

    Ok(lines.join("\n"))
}
