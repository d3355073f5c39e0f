/// Game state storage and retrieval operations.
pub mod game_store;
/// Database model definitions.
pub mod models;
/// Question pool loading and selection.
pub mod question_bank;
/// Storage abstraction layer for database operations.
pub mod storage;
