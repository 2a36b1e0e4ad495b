use crate::client::{decode, PaperspaceClient};
use crate::error::Result;
use crate::transport::ApiRequest;
use crate::types::PrivateNetwork;

impl PaperspaceClient {
    /// Fetch a private network.
    ///
    /// The API answers a literal `null` for networks that do not exist or are
    /// not private; that reads as `None`, not as an error.
    pub async fn get_private_network(&self, network_id: &str) -> Result<Option<PrivateNetwork>> {
        let path = format!("private-networks/{}", network_id);
        let body = self.send(ApiRequest::get(&path)).await?;

        if body.trim() == "null" {
            tracing::debug!(network_id, "No private network with this ID");
            return Ok(None);
        }
        decode(&path, &body).map(Some)
    }
}
