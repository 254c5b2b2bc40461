pub mod binning;
pub mod calo_cell;
pub mod calo_errors;
pub mod cluster;
pub mod constants;
pub mod coordinates;
pub mod detector;
pub mod env_state;
pub mod geometry;
pub mod records;
pub mod run;
pub mod spatial_index;
pub mod time_digitizer;
pub mod truth_particle;
