pub mod index_response;
pub mod index_route;
