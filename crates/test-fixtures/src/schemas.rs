//! Airline schema: airports, airlines, routes.

use flightvault_core::config::FlightVaultConfig;
use flightvault_core::models::{SchemaDescriptor, SchemaRegistry};

pub fn airports() -> SchemaDescriptor {
    SchemaDescriptor::new("airports", "airport_id")
        .with_required(&["name", "city", "country", "iata"])
        .with_distribution_fields(&["country", "altitude", "latitude"])
}

pub fn airlines() -> SchemaDescriptor {
    SchemaDescriptor::new("airlines", "airline_id")
        .with_required(&["name", "country"])
        .with_distribution_fields(&["country", "active"])
}

pub fn routes() -> SchemaDescriptor {
    SchemaDescriptor::new("routes", "route_id")
        .with_required(&["airline_id", "source_airport_id", "destination_airport_id"])
        .with_foreign_key("airline_id", "airlines", "airline_id")
        .with_foreign_key("source_airport_id", "airports", "airport_id")
        .with_foreign_key("destination_airport_id", "airports", "airport_id")
        .with_distribution_fields(&["stops", "equipment"])
}

pub fn all() -> Vec<SchemaDescriptor> {
    vec![airports(), airlines(), routes()]
}

pub fn airline_registry() -> SchemaRegistry {
    SchemaRegistry::new(all())
}

/// Default config with the airline tables declared.
pub fn airline_config() -> FlightVaultConfig {
    FlightVaultConfig::default().with_tables(all())
}
