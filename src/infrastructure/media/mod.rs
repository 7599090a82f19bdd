pub mod file_staging;

pub use file_staging::DiskFileStaging;
