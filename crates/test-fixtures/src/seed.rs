//! Deterministic airline seed data.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use flightvault_core::errors::StoreResult;
use flightvault_core::models::Record;

use crate::memory_store::InMemoryTemporalStore;
use crate::schemas;

const COUNTRIES: [&str; 8] = [
    "United Kingdom",
    "France",
    "Germany",
    "United States",
    "Japan",
    "Brazil",
    "India",
    "Australia",
];

const EQUIPMENT: [&str; 4] = ["320", "738", "77W", "E90"];

/// Three-letter code derived from `id`.
fn code(id: i64) -> String {
    let mut n = id.rem_euclid(26 * 26 * 26);
    let mut letters = [b'A'; 3];
    for slot in letters.iter_mut().rev() {
        *slot = b'A' + (n % 26) as u8;
        n /= 26;
    }
    String::from_utf8_lossy(&letters).into_owned()
}

pub fn airport(id: i64) -> Record {
    Record::new()
        .with("airport_id", id)
        .with("name", format!("Airport {id}"))
        .with("city", format!("City {}", id % 500))
        .with("country", COUNTRIES[(id as usize) % COUNTRIES.len()])
        .with("iata", code(id))
        .with("latitude", ((id * 7919) % 18_000) as f64 / 100.0 - 90.0)
        .with("altitude", (id * 37) % 3_000)
}

/// Airports `1..=n`.
pub fn airports(n: usize) -> Vec<Record> {
    (1..=n as i64).map(airport).collect()
}

pub fn airline(id: i64) -> Record {
    Record::new()
        .with("airline_id", id)
        .with("name", format!("Airline {id}"))
        .with("iata", code(id * 31))
        .with("country", COUNTRIES[(id as usize) % COUNTRIES.len()])
        .with("active", id % 5 != 0)
}

/// Airlines `1..=n`.
pub fn airlines(n: usize) -> Vec<Record> {
    (1..=n as i64).map(airline).collect()
}

pub fn route(id: i64, airline_id: i64, source: i64, destination: i64) -> Record {
    Record::new()
        .with("route_id", id)
        .with("airline_id", airline_id)
        .with("source_airport_id", source)
        .with("destination_airport_id", destination)
        .with("stops", id % 2)
        .with("equipment", EQUIPMENT[(id as usize) % EQUIPMENT.len()])
}

/// Routes `1..=n` spread over the given airports and airlines.
pub fn routes(n: usize, airport_count: usize, airline_count: usize) -> Vec<Record> {
    let airports = airport_count.max(2) as i64;
    let airlines = airline_count.max(1) as i64;
    (1..=n as i64)
        .map(|id| {
            let source = (id - 1) % airports + 1;
            let destination = id % airports + 1;
            let airline = (id - 1) % airlines + 1;
            route(id, airline, source, destination)
        })
        .collect()
}

/// An in-memory store holding the three airline tables, all loaded at `t0`.
pub struct AirlineScenario {
    pub store: Arc<InMemoryTemporalStore>,
    pub t0: DateTime<Utc>,
}

impl AirlineScenario {
    pub fn seed(
        t0: DateTime<Utc>,
        airport_count: usize,
        airline_count: usize,
        route_count: usize,
    ) -> StoreResult<Self> {
        let store = Arc::new(InMemoryTemporalStore::new());
        for schema in schemas::all() {
            store.register_table(&schema.name, &schema.key_field, t0);
        }
        let loads = [
            ("airports", airports(airport_count)),
            ("airlines", airlines(airline_count)),
            ("routes", routes(route_count, airport_count, airline_count)),
        ];
        for (table, records) in loads {
            store.bulk_insert(table, records, t0)?;
        }
        Ok(Self { store, t0 })
    }

    /// Just the airports table.
    pub fn airports_only(t0: DateTime<Utc>, airport_count: usize) -> StoreResult<Self> {
        Self::seed(t0, airport_count, 0, 0)
    }
}
