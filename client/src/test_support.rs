//! Fake gateway helpers shared by async tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Json;
use axum::Router;
use serde_json::{Value, json};

use crate::storage::{KeyValueStore, MemoryStore};
use crate::{Client, ClientConfig};

/// Serve `router` on an ephemeral local port and return its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}")
}

/// Client wired to `base_url` with an in-memory store the test can inspect.
pub(crate) fn client_for(base_url: &str) -> (Client, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let dyn_storage: Arc<dyn KeyValueStore> = storage.clone();
    let client = Client::new(ClientConfig::new(base_url), dyn_storage).expect("client");
    (client, storage)
}

pub(crate) fn ok(data: Value) -> Json<Value> {
    Json(json!({ "base": { "code": 0, "msg": "ok" }, "data": data }))
}

pub(crate) fn fail(code: i64, msg: &str) -> Json<Value> {
    Json(json!({ "base": { "code": code, "msg": msg }, "data": null }))
}

/// Request counter shared between a handler and the test body.
#[derive(Clone, Default)]
pub(crate) struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub(crate) fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
