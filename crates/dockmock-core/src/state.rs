//! Container and image records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Generates a Docker-style 64 character hex identifier.
fn random_hex_id() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Container identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new random container ID.
    #[must_use]
    pub fn new() -> Self {
        Self(random_hex_id())
    }

    /// Creates a container ID from a string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the ID as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Image identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Creates an image ID from a string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the ID as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process state of a container.
///
/// The fields are only meaningful in combination with `running`:
///
/// | field         | running | not running             |
/// |---------------|---------|-------------------------|
/// | `pid`         | set     | unset                   |
/// | `exit_code`   | unset   | set (0 if never run)    |
/// | `started_at`  | set     | last run, if any        |
/// | `finished_at` | unset   | last run, if any        |
///
/// The transition methods are the only way to flip `running`, so the table
/// holds for every value produced through them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    running: bool,
    pid: Option<u32>,
    exit_code: Option<i32>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl ContainerState {
    /// State of a freshly created, never started container.
    #[must_use]
    pub const fn created() -> Self {
        Self {
            running: false,
            pid: None,
            exit_code: Some(0),
            started_at: None,
            finished_at: None,
        }
    }

    /// State of a container that is already running.
    #[must_use]
    pub const fn running_since(pid: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            running: true,
            pid: Some(pid),
            exit_code: None,
            started_at: Some(started_at),
            finished_at: None,
        }
    }

    /// Marks the container as running with a new process.
    pub fn mark_running(&mut self, pid: u32, at: DateTime<Utc>) {
        self.running = true;
        self.pid = Some(pid);
        self.exit_code = None;
        self.started_at = Some(at);
        self.finished_at = None;
    }

    /// Marks the container as exited. `started_at` keeps the last run.
    pub fn mark_exited(&mut self, exit_code: i32, at: DateTime<Utc>) {
        self.running = false;
        self.pid = None;
        self.exit_code = Some(exit_code);
        self.finished_at = Some(at);
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

impl Default for ContainerState {
    fn default() -> Self {
        Self::created()
    }
}

/// A published port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Host address the port is bound on.
    pub ip: String,
    /// Port inside the container.
    pub private_port: u16,
    /// Port on the host.
    pub public_port: u16,
    /// Protocol (`tcp` or `udp`).
    pub protocol: String,
}

/// Container information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container ID.
    pub id: ContainerId,
    /// Image reference the container was created from.
    pub image: String,
    /// Command tokens.
    pub cmd: Vec<String>,
    /// Names, each with a leading `/`.
    pub names: Vec<String>,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Published ports.
    pub ports: Vec<PortMapping>,
    /// Process state.
    pub state: ContainerState,
}

impl Container {
    /// Creates a new, not running container.
    #[must_use]
    pub fn new(image: impl Into<String>, cmd: Vec<String>, created: DateTime<Utc>) -> Self {
        Self {
            id: ContainerId::new(),
            image: image.into(),
            cmd,
            names: Vec::new(),
            created,
            ports: Vec::new(),
            state: ContainerState::created(),
        }
    }

    /// Adds a name, normalizing it to the `/name` form.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        let name = if name.starts_with('/') {
            name.to_string()
        } else {
            format!("/{name}")
        };
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        self
    }

    /// Returns whether the container answers to `name` (with or without `/`).
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        let bare = name.trim_start_matches('/');
        self.names
            .iter()
            .any(|n| n.trim_start_matches('/') == bare)
    }

    /// Returns whether the container is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Returns the command as a single space separated string.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.cmd.join(" ")
    }

    /// Human readable status, e.g. `Up 2 hours` or `Exited (0) 5 seconds ago`.
    #[must_use]
    pub fn status_text(&self, now: DateTime<Utc>) -> String {
        if let (true, Some(started)) = (self.state.is_running(), self.state.started_at()) {
            return format!("Up {}", human_duration(now - started));
        }
        match (self.state.started_at(), self.state.finished_at()) {
            (None, _) => "Created".to_string(),
            (Some(_), Some(finished)) => format!(
                "Exited ({}) {} ago",
                self.state.exit_code().unwrap_or(0),
                human_duration(now - finished)
            ),
            (Some(_), None) => format!("Exited ({})", self.state.exit_code().unwrap_or(0)),
        }
    }
}

fn human_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds().max(0);
    let (n, unit) = match secs {
        0..=59 => (secs, "second"),
        60..=3_599 => (secs / 60, "minute"),
        3_600..=86_399 => (secs / 3_600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Image configuration record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Default command tokens.
    pub cmd: Vec<String>,
    /// Exposed ports in `port/proto` form.
    pub exposed_ports: BTreeSet<String>,
}

/// Image information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image ID.
    pub id: ImageId,
    /// Parent image ID.
    pub parent_id: Option<ImageId>,
    /// Repository tags in `repo:tag` form.
    pub repo_tags: Vec<String>,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Size of this layer in bytes.
    pub size: u64,
    /// Size including all parent layers in bytes.
    pub virtual_size: u64,
    /// Configuration record.
    pub config: ImageConfig,
}

impl Image {
    /// Returns whether the image carries `reference` as a tag.
    ///
    /// A reference without a tag matches `:latest`.
    #[must_use]
    pub fn has_tag(&self, reference: &str) -> bool {
        let has_tag = reference
            .rsplit_once(':')
            .is_some_and(|(_, tag)| !tag.contains('/'));
        if has_tag {
            self.repo_tags.iter().any(|t| t == reference)
        } else {
            let with_latest = format!("{reference}:latest");
            self.repo_tags.iter().any(|t| *t == with_latest)
        }
    }
}
