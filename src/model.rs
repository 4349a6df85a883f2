pub mod api_model;
pub mod stop;

pub use api_model::*;
pub use stop::*;
