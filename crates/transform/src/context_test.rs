//! Tests for the invocation context

use super::*;
use crate::log::Level;
use crate::test_util::{recording_context, test_context};
use serde_json::json;

#[test]
fn test_connection_meta_from_config() {
    let config = ConnectionConfig {
        workspace_id: "ws".into(),
        stream_id: "src".into(),
        connection_id: "conn".into(),
        destination_type: Some("postgres".into()),
    };
    let meta = ConnectionMeta::from_config(&config, "dst");
    assert_eq!(meta.workspace_id, "ws");
    assert_eq!(meta.stream_id, "src");
    assert_eq!(meta.destination_id, "dst");
    assert_eq!(meta.connection_id, "conn");
    assert_eq!(meta.destination_type.as_deref(), Some("postgres"));
}

#[test]
fn test_for_function_scopes_log() {
    let (ctx, log) = recording_context();
    assert_eq!(ctx.function_id(), "");

    let scoped = ctx.for_function("enrich");
    assert_eq!(scoped.function_id(), "enrich");
    scoped.log().info("hello");

    let lines = log.lines.lock();
    assert_eq!(
        lines.as_slice(),
        &[(Level::Info, "enrich".to_string(), "hello".to_string())]
    );
}

#[tokio::test]
async fn test_store_is_shared_but_namespaced() {
    let ctx = test_context();
    let a = ctx.for_function("a");
    let b = ctx.for_function("b");

    a.store().set("k", json!(1), None).await.unwrap();
    assert_eq!(a.store().get("k").await.unwrap(), Some(json!(1)));
    assert_eq!(b.store().get("k").await.unwrap(), None);

    // a second scoped copy of the same function sees the same data
    let a_again = ctx.for_function("a");
    assert_eq!(a_again.store().get("k").await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn test_shared_store_outlives_context() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    {
        let ctx = test_context().with_store(store.clone()).for_function("f");
        ctx.store().set("seen", json!(true), None).await.unwrap();
    }
    let ctx = test_context().with_store(store).for_function("f");
    assert_eq!(ctx.store().get("seen").await.unwrap(), Some(json!(true)));
}

#[test]
fn test_user_agent_is_optional() {
    let ctx = test_context();
    assert!(ctx.user_agent().is_none());

    let ua = UserAgent {
        bot: Some(true),
        ..Default::default()
    };
    let ctx = ctx.with_user_agent(ua.clone()).for_function("f");
    assert_eq!(ctx.user_agent(), Some(&ua));
}
