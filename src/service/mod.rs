//! Descriptor-driven services: generic CRUD, payload validation and seeding.

mod crud;
mod seeder;
mod validation;
pub use crud::{page_offset, CrudService, DeleteResult, ListOptions, Listing, Page, SelectOption, PER_PAGE};
pub(crate) use crud::{load_related, run_pre_insert};
pub use seeder::{seed_waves, synthesize_row, SeedReport, SeededEntity, Seeder};
pub use validation::RequestValidator;
