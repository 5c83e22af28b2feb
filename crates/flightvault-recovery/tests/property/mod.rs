//! Property tests for flightvault-recovery.

mod diff_props;
mod health_props;
