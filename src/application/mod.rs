// Application layer - Use cases and ports
pub mod asset_service;
pub mod building_service;
pub mod key_value_store;
pub mod provisioning_service;
pub mod shape_service;
pub mod tile_gateway;
pub mod tile_repository;

#[cfg(test)]
pub mod test_support;
