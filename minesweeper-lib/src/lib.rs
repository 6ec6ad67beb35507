pub mod board;
pub mod cell;
pub mod difficulty;
pub mod engine;
pub mod game;
pub mod persist;
pub mod replay;
pub mod store;
