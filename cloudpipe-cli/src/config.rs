//! CLI configuration

use cloudpipe_client::ApiClient;

#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the API server
    pub api_url: String,
}

impl Config {
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.api_url)
    }
}
