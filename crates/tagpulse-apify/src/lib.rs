pub mod client;
pub mod error;
mod retry;
pub mod types;

pub use client::ApifyClient;
pub use error::ApifyError;
pub use types::{ActorInput, Harvest, InstagramScraperInput, RunData, TikTokScraperInput};
