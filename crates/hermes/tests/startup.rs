//! Starting and stopping a hook server through the facade.

use std::time::Duration;

use hermes::prelude::*;
use hermes::StartupError;

fn quiet_config(addr: &str) -> HermesConfig {
    let toml = format!(
        r#"
[server]
http_addr = "{addr}"
shutdown_timeout_secs = 1

[telemetry.logging]
enabled = false

[telemetry.metrics]
enabled = false

[proxies."payments/charge"]
require_match_any = ["billing"]
"#
    );
    ConfigLoader::new()
        .with_string(&toml, "toml")
        .unwrap()
        .load_unvalidated()
}

#[tokio::test]
async fn stops_when_shutdown_is_triggered() {
    let config = quiet_config("127.0.0.1:0");
    assert!(config.proxy_policy("payments/charge").unwrap().is_some());

    let mut registry = HookRegistry::new();
    registry.register_proxy_hook("payments/charge", |_req, _body| async { Ok(None) }, None);

    let shutdown = ShutdownSignal::new();
    let task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { hermes::serve_with_shutdown(&config, registry, shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn invalid_address_is_a_startup_error() {
    let config = quiet_config("not-an-address");
    let err = hermes::serve_with_shutdown(&config, HookRegistry::new(), ShutdownSignal::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StartupError::Server(_)));
    assert!(err.to_string().contains("not-an-address"));
}
