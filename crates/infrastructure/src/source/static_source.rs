use async_trait::async_trait;
use inventory_core::{
    traits::{Page, ResourceSource, Scope},
    InventoryError, InventoryResult, Registry,
};

fn page_key(kind: &str, scope: &Scope) -> String {
    format!("{kind}@{scope}")
}

/// 固定页面的数据源，页码即页面下标
///
/// 未登记的 (kind, scope) 返回一页空结果。
#[derive(Default)]
pub struct StaticResourceSource {
    pages: Registry<String, Vec<Vec<serde_json::Value>>>,
    failures: Registry<String, String>,
}

impl StaticResourceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一页
    pub fn add_page(&self, kind: &str, scope: &Scope, items: Vec<serde_json::Value>) {
        let key = page_key(kind, scope);
        let mut pages = self.pages.get(&key).unwrap_or_default();
        pages.push(items);
        self.pages.overwrite(key, pages);
    }

    /// 替换全部页面
    pub fn set_pages(&self, kind: &str, scope: &Scope, pages: Vec<Vec<serde_json::Value>>) {
        self.pages.overwrite(page_key(kind, scope), pages);
    }

    /// 此后对该 (kind, scope) 的请求都返回网络错误，直到 `clear_failure`
    pub fn fail_with(&self, kind: &str, scope: &Scope, message: impl Into<String>) {
        self.failures.overwrite(page_key(kind, scope), message.into());
    }

    pub fn clear_failure(&self, kind: &str, scope: &Scope) {
        self.failures.unregister(&page_key(kind, scope));
    }
}

#[async_trait]
impl ResourceSource for StaticResourceSource {
    async fn fetch_page(
        &self,
        kind: &str,
        scope: &Scope,
        page_token: Option<&str>,
    ) -> InventoryResult<Page> {
        let key = page_key(kind, scope);
        if let Some(message) = self.failures.get(&key) {
            return Err(InventoryError::Network(message));
        }

        let index = match page_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                InventoryError::UnsupportedValue(format!("无效的页码: {token}")).skip_retry()
            })?,
        };

        let pages = self.pages.get(&key).unwrap_or_default();
        let items = pages.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < pages.len()).then(|| (index + 1).to_string());

        Ok(Page {
            items,
            next_page_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_pages_follow_tokens() {
        let source = StaticResourceSource::new();
        let scope = Scope::new("gardener");
        source.add_page("projects", &scope, vec![json!({"name": "a"})]);
        source.add_page("projects", &scope, vec![json!({"name": "b"})]);

        let first = source.fetch_page("projects", &scope, None).await.unwrap();
        assert_eq!(first.items, vec![json!({"name": "a"})]);
        let token = first.next_page_token.unwrap();

        let second = source.fetch_page("projects", &scope, Some(&token)).await.unwrap();
        assert_eq!(second.items, vec![json!({"name": "b"})]);
        assert!(second.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_unknown_kind_is_empty_and_failures_injected() {
        let source = StaticResourceSource::new();
        let scope = Scope::new("aws/111").with("region", "eu-west-1");
        assert!(source.fetch_page("vpcs", &scope, None).await.unwrap().items.is_empty());

        source.fail_with("vpcs", &scope, "throttled");
        assert!(source.fetch_page("vpcs", &scope, None).await.is_err());
        source.clear_failure("vpcs", &scope);
        assert!(source.fetch_page("vpcs", &scope, None).await.is_ok());
    }
}
