//! Request router tests.
//!
//! Most tests run on tokio's paused clock, so the simulated latency elapses
//! as soon as the test awaits.

use dockmock_core::fixtures::{NODEJS_CONTAINER_ID, NODEJS_IMAGE_ID};
use dockmock_core::{Config, EventStatus, ManualScheduler, Simulator};
use dockmock_docker::types::ZERO_TIME;
use dockmock_docker::{DockerError, ErrorKind, Reply, Request, RequestRouter};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn router() -> RequestRouter {
    RequestRouter::new(Simulator::with_tokio(Config::default()).unwrap())
}

async fn read(router: &RequestRouter, target: &str) -> Value {
    let reply = router.call(Request::read(target)).await.unwrap();
    serde_json::to_value(reply).unwrap()
}

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|c| c["Id"].as_str().unwrap().to_string())
        .collect()
}

async fn create(router: &RequestRouter, target: &str, body: Value) -> String {
    match router.call(Request::create(target, body)).await.unwrap() {
        Reply::Created(created) => created.id,
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn lists_seeded_resources() {
    let router = router();

    let containers = read(&router, "/containers/json").await;
    assert_eq!(ids(&containers), vec![NODEJS_CONTAINER_ID]);
    assert_eq!(containers[0]["Names"], json!(["/nodejs"]));
    assert!(containers[0]["Status"].as_str().unwrap().starts_with("Up "));

    let images = read(&router, "/images/json").await;
    assert_eq!(images.as_array().unwrap().len(), 5);
    assert_eq!(images[0]["Id"], NODEJS_IMAGE_ID);
    assert_eq!(images[0]["RepoTags"], json!(["mvollmer/nodejs:latest"]));
}

#[tokio::test(start_paused = true)]
async fn inspects_by_prefix_and_tag() {
    let router = router();

    let container = read(&router, "/containers/7a7e76e00fa6/json").await;
    assert_eq!(container["ID"], NODEJS_CONTAINER_ID);
    assert_eq!(container["State"]["Running"], true);

    let image = read(&router, "/images/mvollmer/nodejs:latest/json").await;
    assert_eq!(image["ID"], NODEJS_IMAGE_ID);
    assert_eq!(image["Config"]["Cmd"], json!(["node", "/src/index.js"]));
    assert_eq!(image["Config"]["ExposedPorts"], json!({"8080/tcp": {}}));
}

#[tokio::test(start_paused = true)]
async fn unknown_paths_are_unrecognized() {
    let router = router();

    for request in [
        Request::read("/volumes"),
        Request::read("/containers"),
        Request::mutate("/containers/abc/restart"),
        Request::delete("/containers"),
        Request::read("/containers/create"),
    ] {
        let target = request.target.clone();
        let err = router.dispatch(request).unwrap_err();
        assert_eq!(err, DockerError::Unrecognized(target));
    }
}

#[tokio::test(start_paused = true)]
async fn unknown_references_are_not_found() {
    let router = router();

    let err = router
        .call(Request::read("/containers/deadbeef/json"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = router
        .call(Request::mutate("/containers/deadbeef/stop"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = router
        .call(Request::delete("/images/nosuch:tag"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn create_start_stop_remove() {
    let router = router();
    let sim = router.simulator().clone();
    let mut events = sim.events().watch();

    let id = create(
        &router,
        "/containers/create?name=web",
        json!({"Image": "tutum/wordpress", "Cmd": []}),
    )
    .await;
    assert_eq!(id.len(), 64);

    let all = read(&router, "/containers/json?all=1").await;
    assert_eq!(ids(&all), vec![id.clone(), NODEJS_CONTAINER_ID.to_string()]);
    assert_eq!(all[0]["Names"], json!(["/web"]));
    assert_eq!(all[0]["Command"], "/run.sh");
    assert_eq!(all[0]["Status"], "Created");

    let created = read(&router, "/containers/web/json").await;
    assert_eq!(created["State"]["Running"], false);
    assert_eq!(created["State"]["Pid"], 0);
    assert_eq!(created["State"]["StartedAt"], ZERO_TIME);

    let reply = router
        .call(Request::mutate(format!("/containers/{id}/start")))
        .await
        .unwrap();
    assert_eq!(reply, Reply::Accepted);
    let running = read(&router, &format!("/containers/{id}/json")).await;
    assert_eq!(running["State"]["Running"], true);
    assert_eq!(running["State"]["Pid"], 12801);

    let err = router
        .call(Request::delete(format!("/containers/{id}")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    router
        .call(Request::mutate(format!("/containers/{id}/stop")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    let stopped = read(&router, &format!("/containers/{id}/json")).await;
    assert_eq!(stopped["State"]["Running"], false);
    assert_eq!(stopped["State"]["ExitCode"], 123);

    router
        .call(Request::delete(format!("/containers/{id}")))
        .await
        .unwrap();
    assert!(sim.store().container(&id).is_none());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.id, id);
        seen.push(event.status);
    }
    assert_eq!(
        seen,
        vec![
            EventStatus::Create,
            EventStatus::Start,
            EventStatus::Die,
            EventStatus::Stop,
            EventStatus::Destroy,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stop_replies_before_the_container_exits() {
    let router = router();

    let reply = router
        .call(Request::mutate("/containers/nodejs/stop"))
        .await
        .unwrap();
    assert_eq!(reply, Reply::Accepted);
    let inspect = read(&router, "/containers/nodejs/json").await;
    assert_eq!(inspect["State"]["Running"], true);

    tokio::time::sleep(Duration::from_millis(250)).await;
    let inspect = read(&router, "/containers/nodejs/json").await;
    assert_eq!(inspect["State"]["Running"], false);
    assert_ne!(inspect["State"]["FinishedAt"], ZERO_TIME);
    assert!(read(&router, "/containers/json").await.as_array().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn list_queries() {
    let router = router();
    let first = create(&router, "/containers/create", json!({"Image": "fedora"})).await;
    let second = create(&router, "/containers/create", json!({"Image": "fedora:rawhide"})).await;

    assert_eq!(ids(&read(&router, "/containers/json").await).len(), 1);
    assert_eq!(ids(&read(&router, "/containers/json?all=0").await).len(), 1);
    assert_eq!(ids(&read(&router, "/containers/json?all=true").await).len(), 3);
    assert_eq!(
        ids(&read(&router, "/containers/json?limit=2").await),
        vec![second, first]
    );
    assert!(ids(&read(&router, "/containers/json?all=1&limit=0").await).is_empty());
}

#[tokio::test(start_paused = true)]
async fn image_path_may_contain_slashes() {
    let router = router();

    let reply = router
        .call(Request::delete("/images/tutum/lamp:latest"))
        .await
        .unwrap();
    assert_eq!(reply, Reply::Accepted);

    tokio::time::sleep(Duration::from_millis(250)).await;
    let images = read(&router, "/images/json").await;
    assert_eq!(images.as_array().unwrap().len(), 4);
    assert!(images
        .as_array()
        .unwrap()
        .iter()
        .all(|i| i["RepoTags"] != json!(["tutum/lamp:latest"])));
}

#[tokio::test(start_paused = true)]
async fn malformed_create_bodies_are_rejected() {
    let router = router();

    let err = router
        .call(Request::create("/containers/create", json!({"Cmd": ["sh"]})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);

    let err = router
        .dispatch(Request {
            body: None,
            ..Request::create("/containers/create", Value::Null)
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);

    let err = router
        .call(Request::create("/containers/create", json!({"Image": "nope"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(router.simulator().store().container_count(), 1);
}

#[test]
fn start_settles_when_the_clock_advances() {
    let clock = Arc::new(ManualScheduler::new());
    let router = RequestRouter::new(Simulator::new(Config::default(), clock.clone()));
    let id = NODEJS_CONTAINER_ID;

    let stop = router
        .dispatch(Request::mutate(format!("/containers/{id}/stop")))
        .unwrap();
    assert_eq!(futures::executor::block_on(stop).unwrap(), Reply::Accepted);
    assert_eq!(clock.advance(Duration::from_millis(200)), 1);

    let start = router
        .dispatch(Request::mutate(format!("/containers/{id}/start")))
        .unwrap();
    assert_eq!(clock.pending(), 1);
    assert!(!router.simulator().store().container(id).unwrap().is_running());

    clock.advance(Duration::from_millis(200));
    assert_eq!(futures::executor::block_on(start).unwrap(), Reply::Accepted);
    assert!(router.simulator().store().container(id).unwrap().is_running());
}
