//! Docker API wire types.
//!
//! Field names follow the Docker Remote API as the console consumes it,
//! including the upper-case `ID` of the inspect records.

use chrono::{DateTime, SecondsFormat, Utc};
use dockmock_core::{Container, Image, PortMapping};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp rendered for a time that was never set.
pub const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

fn timestamp(t: Option<DateTime<Utc>>) -> String {
    t.map_or_else(
        || ZERO_TIME.to_string(),
        |t| t.to_rfc3339_opts(SecondsFormat::Nanos, true),
    )
}

/// Port in a container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Port {
    /// Host address.
    #[serde(rename = "IP")]
    pub ip: String,
    /// Container port.
    pub private_port: u16,
    /// Host port.
    pub public_port: u16,
    /// Protocol.
    #[serde(rename = "Type")]
    pub kind: String,
}

impl From<&PortMapping> for Port {
    fn from(p: &PortMapping) -> Self {
        Self {
            ip: p.ip.clone(),
            private_port: p.private_port,
            public_port: p.public_port,
            kind: p.protocol.clone(),
        }
    }
}

/// Container summary for list operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    /// Container ID.
    pub id: String,
    /// Container names.
    pub names: Vec<String>,
    /// Image reference.
    pub image: String,
    /// Command line.
    pub command: String,
    /// Creation time (unix seconds).
    pub created: i64,
    /// Published ports.
    pub ports: Vec<Port>,
    /// Human readable status.
    pub status: String,
}

impl ContainerSummary {
    /// Builds the summary as seen at `now`.
    #[must_use]
    pub fn new(c: &Container, now: DateTime<Utc>) -> Self {
        Self {
            id: c.id.to_string(),
            names: c.names.clone(),
            image: c.image.clone(),
            command: c.command_line(),
            created: c.created.timestamp(),
            ports: c.ports.iter().map(Port::from).collect(),
            status: c.status_text(now),
        }
    }
}

/// Container process state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerStateInfo {
    /// Whether the container is running.
    pub running: bool,
    /// Process ID, 0 when not running.
    pub pid: u32,
    /// Exit code, 0 while running.
    pub exit_code: i32,
    /// Start time of the last run.
    pub started_at: String,
    /// Finish time of the last run.
    pub finished_at: String,
    /// Always false.
    pub ghost: bool,
}

/// Container inspect response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspect {
    /// Container ID.
    #[serde(rename = "ID")]
    pub id: String,
    /// Process state.
    pub state: ContainerStateInfo,
}

impl From<&Container> for ContainerInspect {
    fn from(c: &Container) -> Self {
        let state = &c.state;
        Self {
            id: c.id.to_string(),
            state: ContainerStateInfo {
                running: state.is_running(),
                pid: state.pid().unwrap_or(0),
                exit_code: state.exit_code().unwrap_or(0),
                started_at: timestamp(state.started_at()),
                finished_at: timestamp(state.finished_at()),
                ghost: false,
            },
        }
    }
}

/// Image summary for list operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSummary {
    /// Creation time (unix seconds).
    pub created: i64,
    /// Image ID.
    pub id: String,
    /// Parent image ID.
    pub parent_id: String,
    /// Repository tags.
    pub repo_tags: Vec<String>,
    /// Layer size in bytes.
    pub size: u64,
    /// Total size in bytes.
    pub virtual_size: u64,
}

impl From<&Image> for ImageSummary {
    fn from(i: &Image) -> Self {
        Self {
            created: i.created.timestamp(),
            id: i.id.to_string(),
            parent_id: i
                .parent_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            repo_tags: i.repo_tags.clone(),
            size: i.size,
            virtual_size: i.virtual_size,
        }
    }
}

/// Placeholder value in Docker's set-as-map encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Image configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageConfigInfo {
    /// Default command.
    pub cmd: Vec<String>,
    /// Exposed ports, keyed `port/proto`.
    pub exposed_ports: BTreeMap<String, Empty>,
}

/// Image inspect response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInspect {
    /// Image ID.
    #[serde(rename = "ID")]
    pub id: String,
    /// Configuration.
    pub config: ImageConfigInfo,
}

impl From<&Image> for ImageInspect {
    fn from(i: &Image) -> Self {
        Self {
            id: i.id.to_string(),
            config: ImageConfigInfo {
                cmd: i.config.cmd.clone(),
                exposed_ports: i
                    .config
                    .exposed_ports
                    .iter()
                    .map(|p| (p.clone(), Empty::default()))
                    .collect(),
            },
        }
    }
}

/// Container create request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerCreateRequest {
    /// Command; the image default when absent or empty.
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
    /// Image reference.
    pub image: String,
}

/// Container create response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerCreateResponse {
    /// ID of the new container.
    pub id: String,
}

/// Successful outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Container listing.
    Containers(Vec<ContainerSummary>),
    /// Container inspect record.
    Container(ContainerInspect),
    /// Image listing.
    Images(Vec<ImageSummary>),
    /// Image inspect record.
    Image(ImageInspect),
    /// A container was created.
    Created(ContainerCreateResponse),
    /// The operation was accepted; serializes as `null`.
    Accepted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockmock_core::fixtures;
    use serde_json::json;

    #[test]
    fn container_summary_matches_wire_format() {
        let c = &fixtures::demo_containers()[0];
        let now = c.state.started_at().unwrap() + chrono::Duration::hours(2);
        let json = serde_json::to_value(ContainerSummary::new(c, now)).unwrap();
        assert_eq!(
            json,
            json!({
                "Id": fixtures::NODEJS_CONTAINER_ID,
                "Names": ["/nodejs"],
                "Image": "mvollmer/nodejs:latest",
                "Command": "node /src/index.js",
                "Created": 1_394_455_735,
                "Ports": [{"IP": "0.0.0.0", "PrivatePort": 8080, "PublicPort": 8080, "Type": "tcp"}],
                "Status": "Up 2 hours"
            })
        );
    }

    #[test]
    fn inspect_renders_unset_fields_as_docker_zero_values() {
        let c = &fixtures::demo_containers()[0];
        let json = serde_json::to_value(ContainerInspect::from(c)).unwrap();
        assert_eq!(
            json,
            json!({
                "ID": fixtures::NODEJS_CONTAINER_ID,
                "State": {
                    "Running": true,
                    "Pid": 12800,
                    "ExitCode": 0,
                    "StartedAt": "2014-03-10T12:50:33.214661528Z",
                    "FinishedAt": ZERO_TIME,
                    "Ghost": false
                }
            })
        );
    }

    #[test]
    fn image_inspect_encodes_ports_as_map() {
        let image = &fixtures::demo_images()[1];
        let json = serde_json::to_value(ImageInspect::from(image)).unwrap();
        assert_eq!(
            json["Config"],
            json!({"Cmd": ["/run.sh"], "ExposedPorts": {"3306/tcp": {}, "80/tcp": {}}})
        );
    }

    #[test]
    fn create_request_command_is_optional() {
        let req: ContainerCreateRequest =
            serde_json::from_value(json!({"Image": "fedora"})).unwrap();
        assert_eq!(req.cmd, None);
        assert!(serde_json::from_value::<ContainerCreateRequest>(json!({"Cmd": []})).is_err());
    }

    #[test]
    fn accepted_reply_is_null() {
        assert_eq!(serde_json::to_value(Reply::Accepted).unwrap(), json!(null));
    }
}
