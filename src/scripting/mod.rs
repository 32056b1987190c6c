pub mod stats_set;
