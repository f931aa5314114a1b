//! Request and response DTOs that exist only at the HTTP layer.

pub mod api;
