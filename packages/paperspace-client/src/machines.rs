//! Single-request machine endpoints. Multi-step protocols live in
//! `lifecycle`.

use reqwest::Method;

use crate::client::PaperspaceClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::transport::ApiRequest;
use crate::types::{
    Machine, MachineCreateConfig, MachineEventResponse, MachineUpdateConfig, TargetState,
};

impl PaperspaceClient {
    pub async fn get_machine(&self, machine_id: &str) -> Result<Machine> {
        self.get_json(&format!("machines/{}", machine_id)).await
    }

    /// Like [`get_machine`](Self::get_machine), but a machine removed outside
    /// this client reads as `None` rather than an error.
    pub async fn find_machine(&self, machine_id: &str) -> Result<Option<Machine>> {
        match self.get_machine(machine_id).await {
            Ok(machine) => Ok(Some(machine)),
            Err(e) if e.is_not_found() => {
                tracing::info!(machine_id, "Machine not found, it may have been deleted");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_machines(&self, ctx: &CallContext) -> Result<Vec<Machine>> {
        self.fetch_all(ctx, "machines", &[]).await
    }

    pub(crate) async fn post_machine(
        &self,
        config: &MachineCreateConfig,
    ) -> Result<MachineEventResponse> {
        let request = Self::request_with_body(Method::POST, "machines", config)?;
        self.send_json(request).await
    }

    pub(crate) async fn put_machine(
        &self,
        machine_id: &str,
        body: serde_json::Value,
    ) -> Result<MachineEventResponse> {
        let request = ApiRequest::new(Method::PUT, format!("machines/{}", machine_id)).json(body);
        self.send_json(request).await
    }

    pub(crate) async fn patch_machine_action(
        &self,
        machine_id: &str,
        target: TargetState,
    ) -> Result<()> {
        let request = ApiRequest::new(
            Method::PATCH,
            format!("machines/{}/{}", machine_id, target.action()),
        );
        self.send(request).await.map(|_| ())
    }

    pub(crate) async fn delete_machine_request(&self, machine_id: &str) -> Result<()> {
        let request = ApiRequest::new(Method::DELETE, format!("machines/{}", machine_id));
        self.send(request).await.map(|_| ())
    }
}

/// Serialize an update body. `None` when no field is set.
pub(crate) fn update_body(update: &MachineUpdateConfig) -> Result<Option<serde_json::Value>> {
    let body = serde_json::to_value(update).map_err(crate::error::PaperspaceError::Serialize)?;
    let is_empty = body.as_object().is_some_and(|fields| fields.is_empty());
    Ok((!is_empty).then_some(body))
}
