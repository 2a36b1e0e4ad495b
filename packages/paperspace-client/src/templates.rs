use crate::client::PaperspaceClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::pagination::dedup_by_key;
use crate::types::{CustomTemplate, TemplateSortKey};

impl PaperspaceClient {
    /// All custom templates, each ID once, optionally sorted.
    ///
    /// The endpoint repeats entries across pages, so results are
    /// deduplicated by ID (first occurrence wins).
    pub async fn list_custom_templates(
        &self,
        ctx: &CallContext,
        sort: Option<TemplateSortKey>,
    ) -> Result<Vec<CustomTemplate>> {
        let fetched: Vec<CustomTemplate> = self.fetch_all(ctx, "custom-templates", &[]).await?;
        let fetched_count = fetched.len();

        let mut templates = dedup_by_key(fetched, |t| t.id.clone());
        tracing::debug!(
            fetched = fetched_count,
            unique = templates.len(),
            "Deduplicated custom templates"
        );

        if let Some(key) = sort {
            sort_templates(&mut templates, key);
        }
        Ok(templates)
    }

    /// Same as [`list_custom_templates`](Self::list_custom_templates) with the
    /// sort key given by name. Unknown keys fail before any request is made.
    pub async fn list_custom_templates_sorted_by(
        &self,
        ctx: &CallContext,
        key: &str,
    ) -> Result<Vec<CustomTemplate>> {
        let key: TemplateSortKey = key.parse()?;
        self.list_custom_templates(ctx, Some(key)).await
    }
}

/// Stable ascending sort. Templates without a creation time come first.
pub fn sort_templates(templates: &mut [CustomTemplate], key: TemplateSortKey) {
    match key {
        TemplateSortKey::Created => templates.sort_by_key(|t| t.dt_created),
        TemplateSortKey::Name => templates.sort_by(|a, b| a.name.cmp(&b.name)),
    }
}
