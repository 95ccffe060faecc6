//! Configuration module

mod site;

pub use site::CmsConfig;
pub use site::CommentsConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
pub use site::{ENV_ACCESS_TOKEN, ENV_API_ENDPOINT};
