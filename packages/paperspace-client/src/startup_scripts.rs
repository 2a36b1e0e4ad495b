use reqwest::Method;

use crate::client::PaperspaceClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::lifecycle::delete_and_confirm;
use crate::transport::ApiRequest;
use crate::types::{StartupScript, StartupScriptCreateConfig};

impl PaperspaceClient {
    /// Create a startup script. Scripts are created synchronously; there is
    /// no event to wait for.
    pub async fn create_startup_script(
        &self,
        config: &StartupScriptCreateConfig,
    ) -> Result<StartupScript> {
        let request = Self::request_with_body(Method::POST, "startup-scripts", config)?;
        let script: StartupScript = self.send_json(request).await?;
        tracing::info!(script_id = %script.id, name = %script.name, "Startup script created");
        Ok(script)
    }

    pub async fn get_startup_script(&self, script_id: &str) -> Result<StartupScript> {
        self.get_json(&format!("startup-scripts/{}", script_id)).await
    }

    /// `None` when the script no longer exists.
    pub async fn find_startup_script(&self, script_id: &str) -> Result<Option<StartupScript>> {
        match self.get_startup_script(script_id).await {
            Ok(script) => Ok(Some(script)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list_startup_scripts(&self, ctx: &CallContext) -> Result<Vec<StartupScript>> {
        self.fetch_all(ctx, "startup-scripts", &[]).await
    }

    /// Delete a startup script and wait until it can no longer be fetched.
    pub async fn delete_startup_script(&self, ctx: &CallContext, script_id: &str) -> Result<()> {
        let _lease = self.locks().acquire(ctx, script_id).await?;

        let request = ApiRequest::new(Method::DELETE, format!("startup-scripts/{}", script_id));
        delete_and_confirm(
            ctx,
            "startup script",
            script_id,
            self.poll_policy().startup_script_delete,
            async { self.send(request).await.map(|_| ()) },
            || self.get_startup_script(script_id),
        )
        .await
    }
}
