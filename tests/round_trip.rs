use anyhow::Result;
use requery::testing::{RecordedCall, RecordingClient};
use requery::{replay, ProxyClient};
use serde_json::json;

#[tokio::test]
async fn todos_chain_records_and_replays_in_order() -> Result<()> {
    let client = RecordingClient::respond_with(json!([{"id": 1, "done": false}]));
    let proxy = ProxyClient::wrap(client);

    let response = proxy
        .select_from("todos")
        .select_all()
        .eq("id", 1)
        .eq("done", false)
        .order("id")
        .await?;

    let meta = response.query_meta.clone();
    assert_eq!(
        serde_json::to_value(&meta)?,
        json!({
            "from": "todos",
            "filters": {"eq": [["id", 1], ["done", false]]},
            "modifiers": {"select": "*", "order": "id"}
        })
    );

    let target = RecordingClient::new();
    replay(&target, &meta)?;
    assert_eq!(
        target.calls(),
        vec![
            RecordedCall::new("select_from", vec![json!("todos")]),
            RecordedCall::new("select", vec![json!("*")]),
            RecordedCall::new("eq", vec![json!("id"), json!(1)]),
            RecordedCall::new("eq", vec![json!("done"), json!(false)]),
            RecordedCall::new("order", vec![json!("id")]),
        ]
    );

    Ok(())
}

#[test]
fn replay_issues_the_same_forwarded_sequence() -> Result<()> {
    let source = RecordingClient::new();
    let proxy = ProxyClient::wrap(source.clone());

    let meta = proxy
        .select_from("orders")
        .select("id, total, customer(name)")
        .eq("status", "open")
        .eq("region", "eu")
        .gte("total", 100)
        .order_with("total", json!({"ascending": false}))
        .limit(5)
        .query_meta();

    let target = RecordingClient::new();
    replay(&target, &meta)?;

    assert_eq!(source.calls(), target.calls());
    Ok(())
}

#[test]
fn replayed_descriptor_survives_a_serde_boundary() -> Result<()> {
    let proxy = ProxyClient::wrap(RecordingClient::new());
    let meta = proxy
        .select_from("events")
        .select("id, kind")
        .in_("kind", ["created", "updated"])
        .text_search_with("body", "urgent", json!({"type": "websearch"}))
        .range(0, 49)
        .query_meta();

    // across a cache or process boundary the descriptor is plain JSON
    let wire = serde_json::to_string(&meta)?;
    let thawed: requery::QueryMeta = serde_json::from_str(&wire)?;

    let direct = RecordingClient::new();
    replay(&direct, &meta)?;
    let thawed_target = RecordingClient::new();
    replay(&thawed_target, &thawed)?;

    assert_eq!(direct.calls(), thawed_target.calls());
    Ok(())
}

#[test]
fn multi_invocation_filters_replay_once_per_call() -> Result<()> {
    let proxy = ProxyClient::wrap(RecordingClient::new());
    let meta = proxy
        .select_from("todos")
        .select_all()
        .eq("id", 1)
        .eq("done", false)
        .eq("archived", false)
        .query_meta();

    let target = RecordingClient::new();
    replay(&target, &meta)?;

    let calls = target.calls();
    let eq_calls: Vec<&RecordedCall> = calls.iter().filter(|call| call.method == "eq").collect();
    assert_eq!(
        eq_calls,
        vec![
            &RecordedCall::new("eq", vec![json!("id"), json!(1)]),
            &RecordedCall::new("eq", vec![json!("done"), json!(false)]),
            &RecordedCall::new("eq", vec![json!("archived"), json!(false)]),
        ]
    );
    Ok(())
}
