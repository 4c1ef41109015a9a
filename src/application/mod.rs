pub mod folder_uploader;
pub mod page_scraper;

pub use folder_uploader::{FolderUploader, UploadError};
pub use page_scraper::PageScraper;
