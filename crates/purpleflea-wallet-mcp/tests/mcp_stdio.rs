use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn wallet_mcp(
    cfg_dir: &tempfile::TempDir,
    data_dir: &tempfile::TempDir,
    api_url: &str,
) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("purpleflea-wallet-mcp"));
    cmd.env("WALLET_MCP_CONFIG_DIR", cfg_dir.path())
        .env("WALLET_MCP_DATA_DIR", data_dir.path())
        .env("WALLET_API_URL", api_url)
        .env("WALLET_MCP_BANNER", "0")
        .env_remove("RUST_LOG");
    cmd
}

fn parse_frames(stdout: &[u8]) -> eyre::Result<Vec<Value>> {
    String::from_utf8(stdout.to_vec())?
        .lines()
        .map(|l| serde_json::from_str(l).map_err(Into::into))
        .collect()
}

fn frame_with_id(frames: &[Value], id: i64) -> eyre::Result<&Value> {
    frames
        .iter()
        .find(|f| f.get("id").and_then(Value::as_i64) == Some(id))
        .ok_or_else(|| eyre::eyre!("no response with id {id} in {frames:?}"))
}

#[test]
fn stdio_session_lists_and_calls_tools() -> eyre::Result<()> {
    let mut server = mockito::Server::new();
    let balance = server
        .mock("GET", "/v1/wallet/internal/balance/agent-42")
        .match_header("x-service-key", "svc-secret")
        .with_header("content-type", "application/json")
        .with_body(r#"{"agent_id":"agent-42","balance_usd":"3.50"}"#)
        .expect(1)
        .create();

    let cfg_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;

    let input = [
        json!({"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18"}}),
        json!({"jsonrpc":"2.0","method":"notifications/initialized"}),
        json!({"jsonrpc":"2.0","id":2,"method":"tools/list"}),
        json!({"jsonrpc":"2.0","id":3,"method":"tools/call","params":{
          "name":"balance",
          "arguments":{"agent_id":"agent-42","service_key":"svc-secret"}
        }}),
        json!({"jsonrpc":"2.0","id":4,"method":"tools/call","params":{
          "name":"balance",
          "arguments":{"agent_id":"agent-42"}
        }}),
    ]
    .iter()
    .map(Value::to_string)
    .collect::<Vec<_>>()
    .join("\n");

    let assert = wallet_mcp(&cfg_dir, &data_dir, &server.url())
        .arg("mcp")
        .write_stdin(input)
        .assert()
        .success()
        .stderr(predicate::str::contains("svc-secret").not());

    let frames = parse_frames(&assert.get_output().stdout)?;
    assert_eq!(frames.len(), 4, "unexpected frames: {frames:?}");

    let init = frame_with_id(&frames, 1)?;
    assert_eq!(init["result"]["serverInfo"]["name"], "purpleflea-wallet");

    let list = frame_with_id(&frames, 2)?;
    assert_eq!(
        list["result"]["tools"].as_array().map(Vec::len),
        Some(13),
        "tools/list: {list}"
    );

    let call = frame_with_id(&frames, 3)?;
    assert_eq!(call["result"]["isError"], false);
    let text = call["result"]["content"][0]["text"].as_str().unwrap_or_default();
    assert_eq!(
        serde_json::from_str::<Value>(text)?,
        json!({"agent_id":"agent-42","balance_usd":"3.50"})
    );

    let invalid = frame_with_id(&frames, 4)?;
    assert_eq!(invalid["result"]["isError"], true);

    balance.assert();
    Ok(())
}

#[test]
fn bare_binary_defaults_to_mcp() -> eyre::Result<()> {
    let cfg_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;

    let assert = wallet_mcp(&cfg_dir, &data_dir, "http://127.0.0.1:9")
        .write_stdin("{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n")
        .assert()
        .success();

    let frames = parse_frames(&assert.get_output().stdout)?;
    assert_eq!(frames, vec![json!({"jsonrpc":"2.0","id":7,"result":{}})]);
    Ok(())
}

#[test]
fn insecure_base_url_fails_at_startup() -> eyre::Result<()> {
    let cfg_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;

    wallet_mcp(&cfg_dir, &data_dir, "http://wallet.example.com")
        .arg("mcp")
        .write_stdin("")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn tools_subcommand_prints_catalogue() -> eyre::Result<()> {
    let cfg_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;

    let assert = wallet_mcp(&cfg_dir, &data_dir, "https://wallet.purpleflea.com")
        .arg("tools")
        .assert()
        .success();

    let v: Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let names: Vec<&str> = v["tools"]
        .as_array()
        .map(|a| a.iter().filter_map(|t| t["name"].as_str()).collect())
        .unwrap_or_default();
    assert!(names.contains(&"privacy_swap"), "names: {names:?}");
    assert!(names.contains(&"transactions"), "names: {names:?}");
    assert_eq!(names.len(), 13);
    Ok(())
}
