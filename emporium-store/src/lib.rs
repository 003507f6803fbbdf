pub mod app_config;
pub mod database;
pub mod catalog_repo;

pub use database::DbClient;
pub use catalog_repo::PgCatalogRepository;
