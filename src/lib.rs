pub mod commands;
pub mod events;
pub mod filter;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod state;
pub mod storage;

#[cfg(all(feature = "app", not(test)))]
mod app;

#[cfg(all(feature = "app", not(test)))]
pub use app::run;
