pub mod client;
pub mod drive;
pub mod models;

pub use client::{AssetClient, FetchError};
pub use drive::{DriveClient, DriveError};
