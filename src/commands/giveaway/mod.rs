pub mod collaborators;
pub mod draw;
pub mod formatters;
pub mod handlers;
pub mod ingest;
pub mod manager;
pub mod models;
pub mod presenter;
pub mod scheduler;
pub mod store;
pub mod utils;

#[cfg(test)]
pub mod testkit;

pub use crate::commands::giveaway::handlers::{
    // Prize pool management
    create_pool,
    list_pools,
    delete_pool,
    add_pool_item,
    remove_pool_item,
    list_pool_items,

    // Giveaway lifecycle
    start_giveaway,
};
