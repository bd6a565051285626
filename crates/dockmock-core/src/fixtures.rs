//! Demo data the console shows out of the box.

use crate::state::{
    Container, ContainerId, ContainerState, Image, ImageConfig, ImageId, PortMapping,
};
use chrono::{DateTime, Utc};

/// ID of the demo `/nodejs` container.
pub const NODEJS_CONTAINER_ID: &str =
    "7a7e76e00fa6563b0c0b70a1e2e3b11146afa11c49aacb34d06c225db1bb812d";

/// ID of the `mvollmer/nodejs:latest` image.
pub const NODEJS_IMAGE_ID: &str =
    "d5cf505c5b998e577950816c6cb7776a5abc01ff09a846b1c4c42e86dc978d96";

/// PID of the demo container's process.
pub const NODEJS_PID: u32 = 12800;

fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, nanos).unwrap_or_default()
}

fn tokens(words: &[&str]) -> Vec<String> {
    words.iter().map(ToString::to_string).collect()
}

#[allow(clippy::too_many_arguments)]
fn image(
    id: &str,
    parent: &str,
    tags: &[&str],
    created: i64,
    size: u64,
    virtual_size: u64,
    cmd: &[&str],
    ports: &[&str],
) -> Image {
    Image {
        id: ImageId::from_string(id),
        parent_id: Some(ImageId::from_string(parent)),
        repo_tags: tokens(tags),
        created: at(created, 0),
        size,
        virtual_size,
        config: ImageConfig {
            cmd: tokens(cmd),
            exposed_ports: ports.iter().map(ToString::to_string).collect(),
        },
    }
}

/// The demo images.
#[must_use]
pub fn demo_images() -> Vec<Image> {
    vec![
        image(
            NODEJS_IMAGE_ID,
            "e8b2b9353e7046a91ac38a3246e9061cb36aeb4b15a780dbf2ec810e1ee5f4c8",
            &["mvollmer/nodejs:latest"],
            1_394_445_579,
            0,
            1_096_326_874,
            &["node", "/src/index.js"],
            &["8080/tcp"],
        ),
        image(
            "0c295b6f613e58e6a09e6ac6e37503cbfa04bd2f0c1a83dce9315718feba26a2",
            "779c7e14a46617a70a46ef78ac342a3fee8d0fd874b1bfdc32b72465705d115e",
            &["tutum/wordpress:latest"],
            1_394_104_925,
            0,
            620_110_708,
            &["/run.sh"],
            &["80/tcp", "3306/tcp"],
        ),
        image(
            "34ead373df921d5d28226e7a6795280f4f33bbfdf7ca0bc9c98a3e431a8f2e44",
            "550aa8256008af492f131b473364afb4e16999903b56311ddb23df7bc13635e2",
            &["tutum/lamp:latest"],
            1_394_104_237,
            0,
            484_333_730,
            &["/run.sh"],
            &["80/tcp", "3306/tcp"],
        ),
        image(
            "0d20aec6529d5d396b195182c0eaa82bfe014c3e82ab390203ed56a774d2c404",
            "8abc22fbb04266308ff408ca61cb8f6f4244a59308f7efc64e54b08b496c58db",
            &["fedora:rawhide"],
            1_391_444_049,
            387_016_823,
            387_016_823,
            &["/bin/bash"],
            &[],
        ),
        image(
            "58394af373423902a1b97f209a31e3777932d9321ef10e64feaaa7b4df609cf9",
            "8abc22fbb04266308ff408ca61cb8f6f4244a59308f7efc64e54b08b496c58db",
            &["fedora:20", "fedora:heisenbug", "fedora:latest"],
            1_391_443_840,
            385_520_098,
            385_520_098,
            &["/bin/bash"],
            &[],
        ),
    ]
}

/// The demo containers: a single running `/nodejs`.
#[must_use]
pub fn demo_containers() -> Vec<Container> {
    vec![Container {
        id: ContainerId::from_string(NODEJS_CONTAINER_ID),
        image: "mvollmer/nodejs:latest".to_string(),
        cmd: tokens(&["node", "/src/index.js"]),
        names: vec!["/nodejs".to_string()],
        created: at(1_394_455_735, 0),
        ports: vec![PortMapping {
            ip: "0.0.0.0".to_string(),
            private_port: 8080,
            public_port: 8080,
            protocol: "tcp".to_string(),
        }],
        state: ContainerState::running_since(NODEJS_PID, at(1_394_455_833, 214_661_528)),
    }]
}
