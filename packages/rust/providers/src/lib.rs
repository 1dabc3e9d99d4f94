//! REST clients for the hosted services behind the collaborator traits.
//!
//! - [`FirecrawlClient`]: site mapping and page scraping
//! - [`OpenAiClient`]: URL relevance scoring and profile insight structuring
//! - [`ScrapingDogClient`]: professional-profile scraping
//!
//! Every client is built once per process and shared behind an `Arc`.

mod firecrawl;
mod http;
mod openai;
mod scrapingdog;

pub use firecrawl::FirecrawlClient;
pub use openai::OpenAiClient;
pub use scrapingdog::ScrapingDogClient;
