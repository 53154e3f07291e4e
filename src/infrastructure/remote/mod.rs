pub mod credentials;
pub mod http_client;

pub use credentials::StaticCredentials;
pub use http_client::HttpRemoteApi;
