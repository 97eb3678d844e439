mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/health")).await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "memory");
    Ok(())
}

#[tokio::test]
async fn root_reports_name_and_version() -> Result<()> {
    let server = common::ensure_server().await?;
    let body = reqwest::get(server.url("/")).await?.json::<Value>().await?;

    assert_eq!(body["data"]["name"], "cidadao-api");
    assert!(body["data"]["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn schema_is_served_as_xml() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/schema")).await?;

    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("application/xml"), "got {}", content_type);

    let xml = res.text().await?;
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<table name=\"citizens\">"), "{}", xml);
    assert!(xml.contains("national_id"));
    Ok(())
}
