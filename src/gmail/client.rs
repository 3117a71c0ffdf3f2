//! Gmail REST API client.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::json;
use tracing::debug;

use super::types::{Label, LabelList, LabelVisibility, MessageListPage, MessageMetadata, SentMessage};
use super::{MailStore, StoreFuture};
use crate::auth::TokenProvider;
use crate::{AppError, Result};

/// Gmail API client bound to one mailbox.
pub struct GmailClient {
    http: Client,
    api_base: String,
    user_id: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GmailClient {
    /// Create a client for `user_id` (usually `me`) against `api_base`.
    #[must_use]
    pub fn new(
        http: Client,
        api_base: impl Into<String>,
        user_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            user_id: user_id.into(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/{}/{path}", self.api_base, self.user_id)
    }

    async fn execute(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| AppError::Gmail(format!("{action} failed: {err}")))?;
        check_status(response, action).await
    }

    async fn list(&self, query: &str, page_token: Option<&str>) -> Result<MessageListPage> {
        let mut params = vec![("q", query)];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        let request = self.http.get(self.url("messages")).query(&params);
        let page: MessageListPage = self.execute(request, "messages.list").await?.json().await?;
        debug!(count = page.messages.len(), more = page.next_page_token.is_some(), "listed messages");
        Ok(page)
    }

    async fn metadata(&self, id: &str, headers: &[&str]) -> Result<MessageMetadata> {
        let mut params = vec![("format", "metadata")];
        params.extend(headers.iter().map(|h| ("metadataHeaders", *h)));
        let request = self
            .http
            .get(self.url(&format!("messages/{id}")))
            .query(&params);
        Ok(self.execute(request, "messages.get").await?.json().await?)
    }

    async fn send(&self, raw: &str, thread_id: Option<&str>) -> Result<SentMessage> {
        let mut body = json!({ "raw": raw });
        if let Some(thread_id) = thread_id.filter(|t| !t.is_empty()) {
            body["threadId"] = json!(thread_id);
        }
        let request = self.http.post(self.url("messages/send")).json(&body);
        Ok(self.execute(request, "messages.send").await?.json().await?)
    }

    async fn modify(&self, id: &str, add: &[String], remove: &[String]) -> Result<()> {
        let body = json!({
            "addLabelIds": add,
            "removeLabelIds": remove,
        });
        let request = self
            .http
            .post(self.url(&format!("messages/{id}/modify")))
            .json(&body);
        self.execute(request, "messages.modify").await?;
        Ok(())
    }

    async fn create(&self, name: &str, visibility: &LabelVisibility) -> Result<Label> {
        let body = json!({
            "name": name,
            "labelListVisibility": visibility.label_list_visibility,
            "messageListVisibility": visibility.message_list_visibility,
        });
        let request = self.http.post(self.url("labels")).json(&body);
        Ok(self.execute(request, "labels.create").await?.json().await?)
    }

    async fn labels(&self) -> Result<Vec<Label>> {
        let request = self.http.get(self.url("labels"));
        let list: LabelList = self.execute(request, "labels.list").await?.json().await?;
        Ok(list.labels)
    }
}

/// Map non-success statuses onto the error taxonomy.
async fn check_status(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::CONFLICT => AppError::Conflict(format!("{action}: {body}")),
        StatusCode::NOT_FOUND => AppError::NotFound(format!("{action}: {body}")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Auth(format!("{action} rejected ({status}): {body}"))
        }
        _ => AppError::Gmail(format!("{action} failed ({status}): {body}")),
    })
}

impl MailStore for GmailClient {
    fn list_messages<'a>(
        &'a self,
        query: &'a str,
        page_token: Option<&'a str>,
    ) -> StoreFuture<'a, MessageListPage> {
        Box::pin(self.list(query, page_token))
    }

    fn get_message_metadata<'a>(
        &'a self,
        id: &'a str,
        headers: &'a [&'a str],
    ) -> StoreFuture<'a, MessageMetadata> {
        Box::pin(self.metadata(id, headers))
    }

    fn send_raw<'a>(
        &'a self,
        raw: &'a str,
        thread_id: Option<&'a str>,
    ) -> StoreFuture<'a, SentMessage> {
        Box::pin(self.send(raw, thread_id))
    }

    fn modify_labels<'a>(
        &'a self,
        id: &'a str,
        add: &'a [String],
        remove: &'a [String],
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.modify(id, add, remove))
    }

    fn create_label<'a>(
        &'a self,
        name: &'a str,
        visibility: &'a LabelVisibility,
    ) -> StoreFuture<'a, Label> {
        Box::pin(self.create(name, visibility))
    }

    fn list_labels(&self) -> StoreFuture<'_, Vec<Label>> {
        Box::pin(self.labels())
    }
}
