pub mod browser;
pub mod database;
pub mod editor;
pub mod feedback;
pub mod grid;
pub mod limits;
pub mod render;
pub mod schema;
pub mod session;
pub mod types;
