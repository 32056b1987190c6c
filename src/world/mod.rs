pub mod cron;
pub mod data;
pub mod id_factory;
pub mod position;
pub mod spawn;
pub mod state;
pub mod time;
