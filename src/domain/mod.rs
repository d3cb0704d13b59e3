// Domain layer - Pure models and geometry
pub mod building;
pub mod geo;
pub mod geo_projector;
pub mod projection;
pub mod shape;
pub mod shape_history;
pub mod tiles;
