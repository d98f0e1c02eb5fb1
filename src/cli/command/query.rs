use anyhow::Result;

use crate::{
    cli::QueryTarget,
    config::Settings,
    db::{
        query::{observations, yearly_stats, ObservationFilter, StatsFilter},
        Store,
    },
};

/// Runs a read-only query and renders the result as JSON.
pub fn query(settings: &Settings, target: &QueryTarget) -> Result<String> {
    let store = Store::open_read_only(&settings.database, settings.timeout())?;

    let json = match target {
        QueryTarget::Weather {
            station_id,
            date,
            page,
            per_page,
        } => {
            let filter = ObservationFilter {
                station_id: *station_id,
                date: *date,
                page: *page,
                per_page: *per_page,
            };
            let page = observations(store.conn(), &filter)?;
            if page.data.is_empty() {
                no_data("station_id or date")
            } else {
                serde_json::to_string_pretty(&page)?
            }
        }
        QueryTarget::Stats { station_id, year } => {
            let filter = StatsFilter {
                station_id: *station_id,
                year: *year,
            };
            let stats = yearly_stats(store.conn(), &filter)?;
            if stats.is_empty() {
                no_data("station_id or year")
            } else {
                serde_json::to_string_pretty(&stats)?
            }
        }
    };

    Ok(json)
}

fn no_data(filters: &str) -> String {
    serde_json::json!({ "message": format!("No data found for the given {}.", filters) }).to_string()
}
