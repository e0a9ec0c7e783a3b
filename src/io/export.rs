//! CSV export for federation, microgrid, and house records.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::sim::Federation;
use crate::sim::records::{FederationRecord, GridRecord, HouseRecord};
use crate::sim::types::{GridId, HouseId};

/// Federation log column header.
const FEDERATION_HEADER: &str = "simulation_hour,total_generation,total_demand,unmet_demand,\
                                 total_grid_transactions,total_client_expenditure,revenue,\
                                 netted_kWh,unallocated_kWh";

/// Microgrid log column header.
const GRID_HEADER: &str = "simulation_hour,generation_kWh,total_demand_kWh,unmet_demand_kWh,\
                           internal_transactions,external_transactions,revenue_USD,\
                           battery_level_kWh,battery_percent,unallocated_kWh";

/// House log column header.
const HOUSE_HEADER: &str = "simulation_hour,current_demand,unmet_demand,cost,energy_source";

/// Rounds to `places` decimals, normalizing negative zero.
fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale + 0.0
}

fn fixed3(value: f64) -> String {
    format!("{:.3}", round_to(value, 3))
}

/// Writes federation records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_federation_csv(records: &[FederationRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(FEDERATION_HEADER.split(',').map(str::trim))?;

    for r in records {
        wtr.write_record(&[
            r.simulation_hour.to_string(),
            fixed3(r.total_generation),
            fixed3(r.total_demand),
            fixed3(r.unmet_demand),
            fixed3(r.total_grid_transactions),
            fixed3(r.total_client_expenditure),
            fixed3(r.revenue),
            fixed3(r.netted_kwh),
            fixed3(r.unallocated_kwh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes one microgrid's records as CSV to any writer.
///
/// Transaction lists are encoded as JSON arrays of
/// `[peer_id, amount, direction]` and `[direction, amount, price]`.
///
/// # Errors
///
/// Returns an `io::Error` if writing or JSON encoding fails.
pub fn write_grid_csv(records: &[GridRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(GRID_HEADER.split(',').map(str::trim))?;

    for r in records {
        let internal: Vec<(GridId, f64, &str)> = r
            .internal_transactions
            .iter()
            .map(|t| (t.peer, round_to(t.amount_kwh, 3), t.direction.as_str()))
            .collect();
        let external: Vec<(&str, f64, f64)> = r
            .external_transactions
            .iter()
            .map(|t| (t.direction.as_str(), round_to(t.amount_kwh, 3), round_to(t.price, 3)))
            .collect();

        wtr.write_record(&[
            r.simulation_hour.to_string(),
            fixed3(r.generation_kwh),
            fixed3(r.total_demand_kwh),
            fixed3(r.unmet_demand_kwh),
            serde_json::to_string(&internal)?,
            serde_json::to_string(&external)?,
            fixed3(r.revenue_usd),
            fixed3(r.battery_level_kwh),
            format!("{:.2}", round_to(r.battery_percent, 2)),
            fixed3(r.unallocated_kwh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes house records as CSV to any writer.
///
/// Hours with no delivered energy show `none` as the source.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_house_csv<'a>(
    records: impl IntoIterator<Item = &'a HouseRecord>,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HOUSE_HEADER.split(','))?;

    for r in records {
        wtr.write_record(&[
            r.simulation_hour.to_string(),
            fixed3(r.current_demand),
            fixed3(r.unmet_demand),
            fixed3(r.cost),
            r.energy_source.map_or("none", |s| s.as_str()).to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn create(path: &Path) -> io::Result<io::BufWriter<File>> {
    Ok(io::BufWriter::new(File::create(path)?))
}

/// Writes every log of a federation into `dir`.
///
/// Produces `simulation_log.csv`, one `mini_grid_log_<id>.csv` per grid, and
/// one `house_log_grid_<g>_house_<h>.csv` per house. Output is identical for
/// identical runs.
///
/// # Returns
///
/// The paths written, in the order above.
///
/// # Errors
///
/// Returns an `io::Error` if the directory or any file cannot be written.
pub fn export_logs(federation: &Federation, dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let path = dir.join("simulation_log.csv");
    write_federation_csv(federation.log().records(), create(&path)?)?;
    written.push(path);

    for grid in federation.grids() {
        let path = dir.join(format!("mini_grid_log_{}.csv", grid.id()));
        write_grid_csv(grid.grid_log().records(), create(&path)?)?;
        written.push(path);
    }

    for grid in federation.grids() {
        for house in grid.houses() {
            let path = dir.join(house_file_name(grid.id(), house.id()));
            let records = grid
                .house_log()
                .records()
                .iter()
                .filter(|r| r.house_id == house.id());
            write_house_csv(records, create(&path)?)?;
            written.push(path);
        }
    }

    info!(files = written.len(), dir = %dir.display(), "logs exported");
    Ok(written)
}

/// File name of one house's log.
pub fn house_file_name(grid: GridId, house: HouseId) -> String {
    format!("house_log_grid_{grid}_house_{house}.csv")
}
