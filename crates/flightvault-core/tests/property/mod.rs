//! Property tests for flightvault-core.

mod value_props;
