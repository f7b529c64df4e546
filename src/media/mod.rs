pub mod catalog;
pub mod indexer;
pub mod item;
pub mod kind;
pub mod tags;
