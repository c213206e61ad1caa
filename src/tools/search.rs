//! Search 工具：Wikipedia 查询
//!
//! 两步：先用 MediaWiki 搜索 API 取第一条命中的标题，再取该页面的 REST 摘要；
//! 摘要超过 max_chars 时截断。没有命中返回 ToolError::NotFound。
//! 请求带超时与可识别的 User-Agent（Wikipedia 要求）。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::SearchSection;
use crate::core::ToolError;
use crate::tools::Tool;

/// Search 工具：查询 Wikipedia 并返回简短摘要
pub struct SearchTool {
    client: Client,
    api_url: String,
    summary_url: String,
    max_chars: usize,
}

impl SearchTool {
    pub fn new(settings: &SearchSection) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_url: settings.api_url.clone(),
            summary_url: settings.summary_url.trim_end_matches('/').to_string(),
            max_chars: settings.max_chars,
        }
    }

    /// 页面摘要地址：标题中空格换成下划线后做 URL 编码
    fn summary_endpoint(&self, title: &str) -> String {
        format!(
            "{}/{}",
            self.summary_url,
            urlencoding::encode(&title.replace(' ', "_"))
        )
    }

    async fn lookup(&self, query: &str) -> Result<String, ToolError> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(ToolError::Failed(format!("HTTP {}", resp.status())));
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| ToolError::Failed(format!("Invalid search response: {}", e)))?;

        let title = first_search_title(&data)
            .ok_or_else(|| ToolError::NotFound(format!("No wiki result for: {}", query)))?;

        let summary = match self.client.get(self.summary_endpoint(&title)).send().await {
            Ok(r) if r.status().is_success() => r.json::<Value>().await.ok(),
            Ok(r) => {
                tracing::warn!(title = %title, status = %r.status(), "summary fetch failed");
                None
            }
            Err(e) => {
                tracing::warn!(title = %title, error = %e, "summary fetch failed");
                None
            }
        };
        match summary {
            Some(s) => Ok(format_summary(&title, &summary_extract(&s), self.max_chars)),
            None => Ok(format!("Found page {} but could not fetch summary.", title)),
        }
    }
}

/// 搜索结果中第一条命中的标题
fn first_search_title(data: &Value) -> Option<String> {
    data.get("query")?
        .get("search")?
        .as_array()?
        .first()?
        .get("title")?
        .as_str()
        .map(String::from)
}

fn summary_extract(data: &Value) -> String {
    data.get("extract")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// "<title>: <extract>"，extract 按字符数截断
fn format_summary(title: &str, extract: &str, max_chars: usize) -> String {
    let extract: String = extract.chars().take(max_chars).collect();
    format!("{}: {}", title, extract)
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search Wikipedia and return a short summary for a query. Args: {\"query\": \"World Wide Web\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for on Wikipedia"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("search: empty query".to_string()));
        }
        tracing::info!(query = %query, "search tool lookup");
        self.lookup(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn tool() -> SearchTool {
        SearchTool::new(&SearchSection::default())
    }

    #[test]
    fn test_first_search_title() {
        let data = json!({
            "query": {"search": [{"title": "World Wide Web", "pageid": 33139}]}
        });
        assert_eq!(first_search_title(&data).as_deref(), Some("World Wide Web"));
        assert_eq!(first_search_title(&json!({"query": {"search": []}})), None);
        assert_eq!(first_search_title(&json!({})), None);
    }

    #[test]
    fn test_format_summary_truncates_by_chars() {
        let extract = "é".repeat(10);
        assert_eq!(format_summary("T", &extract, 3), "T: ééé");
        assert_eq!(summary_extract(&json!({"extract": "abc"})), "abc");
        assert_eq!(summary_extract(&json!({})), "");
    }

    #[test]
    fn test_summary_endpoint_encodes_title() {
        let t = tool();
        assert_eq!(
            t.summary_endpoint("C++ (programming language)"),
            "https://en.wikipedia.org/api/rest_v1/page/summary/C%2B%2B_%28programming_language%29"
        );
    }

    /// 本地 HTTP 桩：按请求路径返回预设 JSON，代替 Wikipedia
    async fn serve_wiki() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = wiki_route(&path);
                let response = format!(
                    "HTTP/1.1 {} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    fn wiki_route(path: &str) -> (u16, String) {
        if path.starts_with("/w/api.php") {
            let hits = if path.contains("srsearch=Atlantis") {
                json!([])
            } else if path.contains("Broken") {
                json!([{"title": "Broken Page"}])
            } else {
                json!([{"title": "World Wide Web"}])
            };
            (200, json!({"query": {"search": hits}}).to_string())
        } else if path == "/summary/World_Wide_Web" {
            let extract = "The World Wide Web is an information system.";
            (200, json!({"title": "World Wide Web", "extract": extract}).to_string())
        } else {
            (404, "{}".to_string())
        }
    }

    async fn local_tool(max_chars: usize) -> SearchTool {
        let base = serve_wiki().await;
        SearchTool::new(&SearchSection {
            api_url: format!("{}/w/api.php", base),
            summary_url: format!("{}/summary", base),
            max_chars,
            ..SearchSection::default()
        })
    }

    #[tokio::test]
    async fn test_lookup_returns_truncated_summary() {
        let tool = local_tool(10).await;
        let out = tool.execute(json!({"query": "World Wide Web"})).await.unwrap();
        assert_eq!(out, "World Wide Web: The World ");
    }

    #[tokio::test]
    async fn test_lookup_without_hit_is_not_found() {
        let tool = local_tool(800).await;
        let err = tool.execute(json!({"query": "Atlantis"})).await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("No wiki result for: Atlantis".to_string()));
    }

    #[tokio::test]
    async fn test_lookup_summary_failure_falls_back() {
        let tool = local_tool(800).await;
        let out = tool.execute(json!({"query": "Broken"})).await.unwrap();
        assert_eq!(out, "Found page Broken Page but could not fetch summary.");
    }

    #[tokio::test]
    async fn test_empty_query_rejected_without_request() {
        let err = tool().execute(json!({"query": "   "})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
