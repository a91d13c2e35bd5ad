use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::transport::{HttpSender, Params, Transport, decode};
use crate::error::{Result, SlackError};

/// One cursor-following listing: which method, where the items live in each
/// page, the endpoint's page-size ceiling and an optional total cap.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub method: &'static str,
    pub items_key: &'static str,
    pub ceiling: usize,
    pub params: Params,
    pub limit: Option<usize>,
}

impl PageRequest {
    pub fn new(method: &'static str, items_key: &'static str, ceiling: usize) -> Self {
        Self {
            method,
            items_key,
            ceiling,
            params: Vec::new(),
            limit: None,
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Caps the total number of items. Zero means every page.
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit.filter(|n| *n > 0);
        self
    }

    pub fn page_size(&self) -> usize {
        match self.limit {
            Some(limit) => self.ceiling.min(limit),
            None => self.ceiling,
        }
    }
}

impl<S: HttpSender> Transport<S> {
    /// Follows `next_cursor` until it comes back empty or `limit` items have
    /// been collected. Items keep the order the API returned them in.
    pub async fn paginate<T: DeserializeOwned>(&self, request: PageRequest) -> Result<Vec<T>> {
        let mut all: Vec<T> = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut params = request.params.clone();
            params.push(("limit", request.page_size().to_string()));
            if !cursor.is_empty() {
                params.push(("cursor", cursor.clone()));
            }

            let body = self.post(request.method, &params).await?;
            let mut page: Value = decode(request.method, &body)?;

            let items = match page.get_mut(request.items_key).map(Value::take) {
                Some(Value::Null) | None => Vec::new(),
                Some(items) => {
                    serde_json::from_value::<Vec<T>>(items).map_err(|source| {
                        SlackError::Decode {
                            method: request.method.to_string(),
                            source,
                        }
                    })?
                }
            };
            debug!("{} returned {} {}", request.method, items.len(), request.items_key);
            all.extend(items);

            if let Some(limit) = request.limit {
                if all.len() >= limit {
                    all.truncate(limit);
                    break;
                }
            }

            cursor = page
                .pointer("/response_metadata/next_cursor")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if cursor.is_empty() {
                break;
            }
        }

        Ok(all)
    }
}
