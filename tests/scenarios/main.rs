//! End-to-end scenario suite exercising the public `Engine` facade
//! against the seed scenarios this engine was built to satisfy.
//!
//! Each module covers one scenario:
//!
//! - `scenario_a_roundtrip` - basic put/get/delete round-trips
//! - `scenario_b_crash_recovery` - crash mid-append recovery
//! - `scenario_c_quantum_prefetch` - entanglement-driven prefetch
//! - `scenario_d_entropy_rebalance` - entropy-driven adaptive routing
//! - `scenario_e_durability_modes` - Async/Grouped/Sync durability
//! - `scenario_f_rotation_boundary` - WAL segment rotation

mod test_utils;

mod scenario_a_roundtrip;
mod scenario_b_crash_recovery;
mod scenario_c_quantum_prefetch;
mod scenario_d_entropy_rebalance;
mod scenario_e_durability_modes;
mod scenario_f_rotation_boundary;
