use super::*;
use crate::stores::STORE_NAME_PREFIX;
use axum::response::Html;

pub(crate) async fn index(State(state): State<ServerState>) -> Html<String> {
    let store_count = match state.service.list().await {
        Ok(stores) => stores.len().to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to count stores for index page");
            "unavailable".to_string()
        }
    };
    let config = &state.config;

    let body = format!(
        "<!doctype html>
<html lang=\"en\">
<head>
    <meta charset=\"utf-8\" />
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />
    <title>Store Provisioner</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 2rem; }}
        main {{ max-width: 760px; margin: 0 auto; }}
        code {{ background: #f4f4f4; padding: 0.2rem 0.4rem; border-radius: 0.2rem; }}
        ul {{ line-height: 1.6; }}
    </style>
</head>
<body>
    <main>
        <h1>Store Provisioner</h1>
        <p>Stores: <code>{store_count}</code></p>
        <p>Cluster backend: <code>{mode}</code></p>
        <p>Helm chart: <code>{chart}</code></p>
        <p>Store domain: <code>{domain}</code></p>
        <h2>Available routes</h2>
        <ul>
            <li><code>GET /</code> this information page</li>
            <li><code>GET /health</code> liveness JSON</li>
            <li><code>GET /stores</code> list stores, newest first</li>
            <li><code>POST /stores/{{name}}</code> provision a store, body <code>{{\"engine\": \"woocommerce\"}}</code></li>
            <li><code>DELETE /stores/{{name}}</code> uninstall and remove a store</li>
        </ul>
        <p>Store names must start with <code>{prefix}</code>.</p>
    </main>
</body>
</html>\n",
        mode = config.cluster_mode.as_str(),
        chart = config.chart_path,
        domain = config.store_domain,
        prefix = STORE_NAME_PREFIX,
    );

    Html(body)
}
