// Presentation layer - HTTP adapter
pub mod app_state;
pub mod building_handlers;
pub mod handlers;
pub mod shape_handlers;
