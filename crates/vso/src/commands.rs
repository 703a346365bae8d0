//! `trigger` and `status`: thin HTTP clients against a running `vso serve`.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::cli::{StatusArgs, TriggerArgs};

pub async fn trigger(endpoint: &str, args: TriggerArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let body = serde_json::json!({ "capabilities": args.capabilities });
    let response = client
        .post(format!("{endpoint}/autonomy/trigger"))
        .json(&body)
        .send()
        .await
        .context("failed to reach vso HTTP facade")?
        .error_for_status()
        .context("vso rejected the trigger request")?;
    let json: Value = response.json().await.context("malformed response body")?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

pub async fn status(endpoint: &str, args: StatusArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let daemon: Value = client
        .get(format!("{endpoint}/daemon"))
        .send()
        .await
        .context("failed to reach vso HTTP facade")?
        .error_for_status()?
        .json()
        .await
        .context("malformed /daemon response")?;
    let servers: Value = client
        .get(format!("{endpoint}/mcp/servers"))
        .send()
        .await
        .context("failed to reach vso HTTP facade")?
        .error_for_status()?
        .json()
        .await
        .context("malformed /mcp/servers response")?;

    if args.json {
        let combined = serde_json::json!({ "daemon": daemon, "servers": servers });
        println!("{}", serde_json::to_string_pretty(&combined)?);
        return Ok(());
    }

    println!(
        "daemon: {} (state={}, interval={}ms, checks={})",
        if daemon["running"].as_bool().unwrap_or(false) { "enabled" } else { "disabled" },
        daemon["state"].as_str().unwrap_or("unknown"),
        daemon["interval_ms"].as_u64().unwrap_or(0),
        daemon["checks"].as_u64().unwrap_or(0),
    );
    println!();
    let empty = Vec::new();
    let servers = servers["servers"].as_array().unwrap_or(&empty);
    println!("servers ({}):", servers.len());
    for server in servers {
        println!(
            "  {:<36} {:<24} {:<10} pid={}",
            server["id"].as_str().unwrap_or("?"),
            server["package"]["name"].as_str().unwrap_or("?"),
            server["status"].as_str().unwrap_or("?"),
            server["pid"].as_u64().map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
        );
    }
    Ok(())
}
