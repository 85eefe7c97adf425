// ABOUTME: HTTP implementation of the provisioning API gateway.
// ABOUTME: Form-encoded action calls over hyper with JSON response bodies.

use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::types::{ProjectEnv, ResourceId, StackId, StackIdentity, StackName, StackStatus};

use super::error::{StackError, TagError};
use super::traits::{StackOps, TagOps};
use super::types::{AnchorResource, StackDescription, StackEvent, StackRequest};

/// How to reach the provisioning API. Passed in explicitly; nothing here is
/// read from ambient process state.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// `host:port` of the API endpoint.
    pub endpoint: String,
    /// Bearer token, if the endpoint requires one.
    pub token: Option<String>,
    /// Per-request deadline.
    pub request_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Stack gateway speaking the provisioning API's action protocol: one POST
/// per call, `Action` plus form-encoded parameters in, JSON out.
pub struct HttpStackGateway {
    config: ConnectionConfig,
}

impl HttpStackGateway {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Issue one action call and return the raw JSON document.
    async fn call(&self, params: &[(&str, &str)]) -> Result<serde_json::Value, CallError> {
        let body: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let stream = TcpStream::connect(&self.config.endpoint)
            .await
            .map_err(|e| CallError::Transport(format!("connect failed: {e}")))?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| CallError::Transport(format!("HTTP handshake failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("provisioning API connection error: {}", e);
            }
        });

        let mut builder = hyper::Request::builder()
            .method("POST")
            .uri("/")
            .header("Host", self.config.endpoint.as_str())
            .header("Content-Type", "application/x-www-form-urlencoded");
        if let Some(token) = &self.config.token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = builder
            .body(http_body_util::Full::new(bytes::Bytes::from(body)))
            .map_err(|e| CallError::Transport(format!("failed to build request: {e}")))?;

        let response = tokio::time::timeout(self.config.request_timeout, async {
            let response = sender
                .send_request(request)
                .await
                .map_err(|e| CallError::Transport(format!("request failed: {e}")))?;
            let status = response.status();
            let collected = response
                .into_body()
                .collect()
                .await
                .map_err(|e| CallError::Transport(format!("failed to read response: {e}")))?;
            Ok::<_, CallError>((status, collected.to_bytes()))
        })
        .await
        .map_err(|_| CallError::Transport("request timed out".to_string()))??;

        let (status, bytes) = response;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| CallError::Decode(format!("invalid JSON response: {e}")))?;

        if !status.is_success() {
            let error: WireError = serde_json::from_value(value.clone()).unwrap_or_default();
            return Err(CallError::Api {
                code: error.error.code,
                message: error.error.message,
            });
        }

        Ok(value)
    }

    fn decode<T: for<'de> Deserialize<'de>>(value: serde_json::Value) -> Result<T, CallError> {
        serde_json::from_value(value).map_err(|e| CallError::Decode(e.to_string()))
    }
}

/// Shared shape of a failed call, mapped into StackError or TagError at
/// each call site.
#[derive(Debug)]
enum CallError {
    Transport(String),
    Api { code: String, message: String },
    Decode(String),
}

impl CallError {
    fn into_stack_error(self, name: &str) -> StackError {
        match self {
            CallError::Transport(msg) => StackError::Transport(msg),
            CallError::Decode(msg) => StackError::Decode(msg),
            CallError::Api { code, message } => match code.as_str() {
                "StackNotFound" => StackError::NotFound(name.to_string()),
                _ => StackError::Api { code, message },
            },
        }
    }

    fn into_tag_error(self) -> TagError {
        match self {
            CallError::Transport(msg) | CallError::Decode(msg) => TagError::Transport(msg),
            CallError::Api { code, message } => TagError::Api { code, message },
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct WireError {
    #[serde(default)]
    error: WireErrorBody,
}

#[derive(Debug, Deserialize, Default)]
struct WireErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireStack {
    name: String,
    id: String,
    status: String,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl WireStack {
    fn into_description(self) -> Result<StackDescription, CallError> {
        let name = StackName::new(&self.name)
            .map_err(|e| CallError::Decode(format!("bad stack name {}: {e}", self.name)))?;
        let status: StackStatus = self
            .status
            .parse()
            .map_err(|e| CallError::Decode(format!("bad stack status: {e}")))?;
        Ok(StackDescription {
            identity: StackIdentity::new(name, StackId::new(self.id)),
            status,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireStackEnvelope {
    stack: WireStack,
}

#[derive(Debug, Deserialize)]
struct WireStackList {
    #[serde(default)]
    stacks: Vec<WireStack>,
}

#[derive(Debug, Deserialize)]
struct WireIdentity {
    stack_id: String,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    event_id: String,
    logical_resource_id: String,
    resource_type: String,
    status: String,
    #[serde(default)]
    reason: Option<String>,
    timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct WireEventList {
    #[serde(default)]
    events: Vec<WireEvent>,
}

#[derive(Debug, Deserialize)]
struct WireResource {
    id: String,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WireResourceList {
    #[serde(default)]
    resources: Vec<WireResource>,
}

#[derive(Debug, Deserialize)]
struct WireTagValue {
    #[serde(default)]
    value: Option<String>,
}

/// Append numbered `Parameter.N.Key`/`Parameter.N.Value` pairs the way the
/// action protocol expects repeated values.
fn push_indexed<'a>(
    params: &mut Vec<(String, String)>,
    prefix: &str,
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
) {
    for (n, (key, value)) in pairs.enumerate() {
        params.push((format!("{prefix}.{}.Key", n + 1), key.to_string()));
        params.push((format!("{prefix}.{}.Value", n + 1), value.to_string()));
    }
}

fn request_params(action: &str, request: &StackRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("Action".to_string(), action.to_string()),
        ("StackName".to_string(), request.name.to_string()),
        ("TemplateBody".to_string(), request.template_body.clone()),
    ];
    push_indexed(
        &mut params,
        "Parameter",
        request
            .parameters
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str())),
    );
    push_indexed(
        &mut params,
        "Tag",
        request
            .tags
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );
    params
}

fn borrow(params: &[(String, String)]) -> Vec<(&str, &str)> {
    params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

#[async_trait]
impl StackOps for HttpStackGateway {
    async fn describe(&self, name: &StackName) -> Result<StackDescription, StackError> {
        let value = self
            .call(&[("Action", "DescribeStack"), ("StackName", name.as_str())])
            .await
            .map_err(|e| e.into_stack_error(name.as_str()))?;
        let envelope: WireStackEnvelope =
            Self::decode(value).map_err(|e| e.into_stack_error(name.as_str()))?;
        envelope
            .stack
            .into_description()
            .map_err(|e| e.into_stack_error(name.as_str()))
    }

    async fn describe_all(&self) -> Result<Vec<StackDescription>, StackError> {
        let value = self
            .call(&[("Action", "DescribeStacks")])
            .await
            .map_err(|e| e.into_stack_error(""))?;
        let list: WireStackList = Self::decode(value).map_err(|e| e.into_stack_error(""))?;
        list.stacks
            .into_iter()
            .map(|s| s.into_description().map_err(|e| e.into_stack_error("")))
            .collect()
    }

    async fn create(&self, request: &StackRequest) -> Result<StackIdentity, StackError> {
        let params = request_params("CreateStack", request);
        let value = self
            .call(&borrow(&params))
            .await
            .map_err(|e| e.into_stack_error(request.name.as_str()))?;
        let identity: WireIdentity =
            Self::decode(value).map_err(|e| e.into_stack_error(request.name.as_str()))?;
        Ok(StackIdentity::new(
            request.name.clone(),
            StackId::new(identity.stack_id),
        ))
    }

    async fn update(&self, request: &StackRequest) -> Result<StackIdentity, StackError> {
        let params = request_params("UpdateStack", request);
        let value = self
            .call(&borrow(&params))
            .await
            .map_err(|e| e.into_stack_error(request.name.as_str()))?;
        let identity: WireIdentity =
            Self::decode(value).map_err(|e| e.into_stack_error(request.name.as_str()))?;
        Ok(StackIdentity::new(
            request.name.clone(),
            StackId::new(identity.stack_id),
        ))
    }

    async fn delete(&self, name: &StackName) -> Result<(), StackError> {
        self.call(&[("Action", "DeleteStack"), ("StackName", name.as_str())])
            .await
            .map_err(|e| e.into_stack_error(name.as_str()))?;
        Ok(())
    }

    async fn describe_events(&self, name: &StackName) -> Result<Vec<StackEvent>, StackError> {
        let value = self
            .call(&[("Action", "DescribeStackEvents"), ("StackName", name.as_str())])
            .await
            .map_err(|e| e.into_stack_error(name.as_str()))?;
        let list: WireEventList =
            Self::decode(value).map_err(|e| e.into_stack_error(name.as_str()))?;
        Ok(list
            .events
            .into_iter()
            .map(|e| StackEvent {
                event_id: crate::types::EventId::new(e.event_id),
                logical_resource_id: e.logical_resource_id,
                resource_type: e.resource_type,
                status: e.status,
                reason: e.reason,
                timestamp: e.timestamp,
            })
            .collect())
    }
}

#[async_trait]
impl TagOps for HttpStackGateway {
    async fn find_anchor(&self, scope: &ProjectEnv) -> Result<AnchorResource, TagError> {
        let value = self
            .call(&[
                ("Action", "DescribeAnchors"),
                ("ProjectTag", scope.project()),
                ("EnvironmentTag", scope.environment()),
            ])
            .await
            .map_err(CallError::into_tag_error)?;
        let list: WireResourceList = Self::decode(value).map_err(CallError::into_tag_error)?;

        let mut resources = list.resources;
        match resources.len() {
            0 => Err(TagError::AnchorNotFound(scope.to_string())),
            1 => {
                let resource = resources.remove(0);
                Ok(AnchorResource {
                    id: ResourceId::new(resource.id),
                    tags: resource.tags,
                })
            }
            count => Err(TagError::AmbiguousAnchor {
                scope: scope.to_string(),
                count,
            }),
        }
    }

    async fn read_tag(
        &self,
        resource: &ResourceId,
        key: &str,
    ) -> Result<Option<String>, TagError> {
        let value = self
            .call(&[
                ("Action", "ReadTag"),
                ("ResourceId", resource.as_str()),
                ("TagKey", key),
            ])
            .await
            .map_err(CallError::into_tag_error)?;
        let tag: WireTagValue = Self::decode(value).map_err(CallError::into_tag_error)?;
        Ok(tag.value)
    }

    async fn write_tag(
        &self,
        resource: &ResourceId,
        key: &str,
        value: &str,
    ) -> Result<(), TagError> {
        self.call(&[
            ("Action", "WriteTag"),
            ("ResourceId", resource.as_str()),
            ("TagKey", key),
            ("TagValue", value),
        ])
        .await
        .map_err(CallError::into_tag_error)?;
        Ok(())
    }
}
