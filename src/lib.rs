// src/lib.rs

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

pub use error::FieldError;
pub use models::{
    field::{FieldDescriptor, FieldKind, HtmlField},
    record::{HostRecord, Record},
    source::ContentSource,
    visibility::{RequestContext, View, Visibility},
};
pub use routes::create_router;
pub use utils::{
    html::Sanitizer,
    policy::{PurifierOverrides, PurifierPolicy},
};
