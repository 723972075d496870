pub mod dataset;
pub mod loader;

pub use dataset::CatalogDataset;
pub use loader::DataLoader;
