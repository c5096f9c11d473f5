#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]

pub mod attribute;
pub mod config;
pub mod error;
pub mod guid;
pub mod loader;
pub mod sid;
pub mod value;

pub use attribute::{Attribute, AttributeSchema, NON_EXISTING};
pub use config::GlobalConfig;
pub use error::OgError;
pub use guid::Guid;
pub use loader::LoaderId;
pub use sid::Sid;
pub use value::AttributeValue;
