// Infrastructure layer - External dependencies and adapters
pub mod chunked_json;
pub mod config;
pub mod file_kv_store;
pub mod fs_tile_store;
pub mod http_origin;
pub mod http_response;
