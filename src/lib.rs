//! Entity engine: declarative entity metadata driving generic CRUD, access policies and seeding.
//!
//! Entities are declared once (builder or JSON), resolved into an immutable
//! [`ResolvedModel`] at startup, and served by slug through [`CrudService`]
//! over any [`RowStore`].

pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod policy;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{
    load_declarations, parse_declarations, resolve, resolve_with, EntityDeclaration, EntityDefinition,
    PropertyDeclaration, PropertyDescriptor, PropertyType, PropertyTypeRegistry, ResolvedEntity, ResolvedModel,
};
pub use error::{AppError, ConfigError, GeneratorError};
pub use policy::{Operation, Policy, PolicyGate, Principal};
pub use routes::{app, common_routes, entity_routes};
pub use service::{CrudService, ListOptions, Listing, Page, SeedReport, Seeder};
pub use settings::Settings;
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Row, RowStore};
