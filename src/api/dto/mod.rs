//! Data Transfer Objects for REST request/response serialization.

pub mod analytics_dto;
pub mod common_dto;
pub mod snippet_dto;
pub mod user_dto;

pub use analytics_dto::*;
pub use common_dto::*;
pub use snippet_dto::*;
pub use user_dto::*;
