use std::sync::{Arc, Mutex};

use anyhow::Result;
use requery::testing::RecordingClient;
use requery::{Error, Hooks, LifecycleHooks, ProxyClient};
use serde_json::{json, Value};
use uuid::Uuid;

fn logging_hooks(log: Arc<Mutex<Vec<String>>>) -> LifecycleHooks {
    let before_log = log.clone();
    let error_log = log.clone();
    let success_log = log.clone();
    let settled_log = log;
    LifecycleHooks::new()
        .before_execution(move |meta| {
            before_log
                .lock()
                .unwrap()
                .push(format!("before:{}", meta.from));
            json!({"started": true})
        })
        .on_error(move |event| {
            error_log
                .lock()
                .unwrap()
                .push(format!("error:{}", event.error.message));
        })
        .on_success(move |event| {
            success_log.lock().unwrap().push(format!(
                "success:{}:{}",
                event.data.cloned().unwrap_or(Value::Null),
                event.context.before_execution_result.is_some()
            ));
        })
        .on_settled(move |event| {
            settled_log.lock().unwrap().push(format!(
                "settled:{}",
                event.error.map(|e| e.message.as_str()).unwrap_or("ok")
            ));
        })
}

#[tokio::test]
async fn success_fires_before_success_settled_in_order() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = RecordingClient::respond_with(json!([{"id": 1}]));
    let proxy = ProxyClient::wrap_with_hooks(
        client,
        Hooks::new().queries(logging_hooks(log.clone())),
    );

    let response = proxy.select_from("todos").select_all().eq("id", 1).await?;
    assert!(response.error.is_none());

    let entries = log.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "before:todos".to_string(),
            format!("success:{}:true", json!([{"id": 1}])),
            "settled:ok".to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn resolved_error_payload_fires_error_then_settled() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = RecordingClient::respond_error("permission denied");
    let proxy = ProxyClient::wrap_with_hooks(
        client,
        Hooks::new().queries(logging_hooks(log.clone())),
    );

    let response = proxy.select_from("todos").select_all().await?;
    assert!(response.error.is_some());

    let entries = log.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "before:todos".to_string(),
            "error:permission denied".to_string(),
            "settled:permission denied".to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn mutation_chains_route_to_the_mutation_phase() -> Result<()> {
    let query_log = Arc::new(Mutex::new(Vec::new()));
    let mutation_log = Arc::new(Mutex::new(Vec::new()));
    let client = RecordingClient::respond_with(json!([{"id": 1, "done": true}]));
    let proxy = ProxyClient::wrap_with_hooks(
        client,
        Hooks::new()
            .queries(logging_hooks(query_log.clone()))
            .mutations(logging_hooks(mutation_log.clone())),
    );

    proxy
        .select_from("todos")
        .update(json!({"done": true}))
        .eq("id", 1)
        .await?;

    assert!(query_log.lock().unwrap().is_empty());
    let entries = mutation_log.lock().unwrap().clone();
    assert_eq!(entries.first().map(String::as_str), Some("before:todos"));
    assert_eq!(entries.len(), 3);
    Ok(())
}

#[tokio::test]
async fn transport_failure_passes_through_without_post_hooks() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = RecordingClient::new();
    client.fail_resolve("connection reset");
    let proxy = ProxyClient::wrap_with_hooks(
        client,
        Hooks::new().queries(logging_hooks(log.clone())),
    );

    let err = proxy
        .select_from("todos")
        .select_all()
        .await
        .expect_err("transport failure should surface");
    assert!(matches!(err, Error::Client(_)));
    assert_eq!(err.to_string(), "client error: connection reset");

    // before_execution ran; nothing fired after the rejection
    assert_eq!(log.lock().unwrap().clone(), vec!["before:todos".to_string()]);
    Ok(())
}

#[tokio::test]
async fn record_hooks_rewrite_forwarded_values_but_not_metadata() -> Result<()> {
    let id = Uuid::new_v4();
    let client = RecordingClient::respond_with(json!([]));
    let proxy = ProxyClient::wrap_with_hooks(
        client.clone(),
        Hooks::new().records_for_insert(|mut values| {
            if let Value::Array(records) = &mut values {
                for record in records {
                    record["created_by"] = json!("importer");
                }
            }
            values
        }),
    );

    let response = proxy
        .select_from("todos")
        .insert(json!([{"id": id, "title": "a"}]))
        .await?;

    // metadata keeps the original values
    assert_eq!(
        response.query_meta.values,
        Some(json!([{"id": id, "title": "a"}]))
    );

    // the wrapped client saw the rewritten records
    let forwarded = client
        .calls()
        .into_iter()
        .find(|call| call.method == "insert")
        .expect("insert forwarded");
    assert_eq!(
        forwarded.args,
        vec![json!([{"id": id, "title": "a", "created_by": "importer"}])]
    );
    Ok(())
}
