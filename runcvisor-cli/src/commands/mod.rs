pub mod delete;
pub mod events;
pub mod kill;
pub mod lifecycle;
pub mod list;
pub mod ps;
pub mod run;
pub mod state;
pub mod stats;
pub mod version;
