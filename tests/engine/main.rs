#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod file_backed;
mod items;
mod links;
mod single_flight;
mod write_order;
