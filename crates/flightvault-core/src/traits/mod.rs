mod temporal_store;

pub use temporal_store::ITemporalStore;
