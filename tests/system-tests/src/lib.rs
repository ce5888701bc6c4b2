#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;
    use std::process::{Output, Stdio};
    use std::sync::OnceLock;
    use std::time::Duration;

    use anyhow::{Context, Result, bail};
    use client_sdk::{StoreApi, StoreClient};
    use common::StoreEngine;
    use reqwest::StatusCode;
    use tokio::process::{Child, Command};
    use tokio::time::sleep;

    #[tokio::test]
    async fn sdk_create_list_delete_against_live_server() -> Result<()> {
        let bind = "127.0.0.1:19180";
        let mut server = start_provisioner(bind).await?;

        let result = async {
            let client = StoreClient::new(format!("http://{bind}"));
            let created = client
                .create_store("store-sdk", StoreEngine::WooCommerce)
                .await?;
            assert_eq!(created.status, "Provisioning");

            let stores = client.list_stores().await?;
            assert_eq!(stores.len(), 1);
            assert_eq!(stores[0].name, "store-sdk");
            assert_eq!(stores[0].status, "Ready");

            let deleted = client.delete_store("store-sdk").await?;
            assert_eq!(deleted.status, "deleted");
            assert!(client.list_stores().await?.is_empty());
            anyhow::Ok(())
        }
        .await;

        stop_process(&mut server).await;
        result
    }

    #[tokio::test]
    async fn cli_create_list_delete_against_live_server() -> Result<()> {
        let bind = "127.0.0.1:19181";
        let api_url = format!("http://{bind}");
        let mut server = start_provisioner(bind).await?;

        let result = async {
            let created = run_cli(&["--api-url", &api_url, "create", "store-cli"]).await?;
            assert!(created.contains("Provisioning started for store-cli"));

            let listed = run_cli(&["--api-url", &api_url, "list"]).await?;
            assert!(listed.starts_with("NAME"));
            assert!(listed.contains("store-cli"));
            assert!(listed.contains("http://store-cli.localtest.me"));

            let deleted = run_cli(&["--api-url", &api_url, "delete", "store-cli"]).await?;
            assert!(deleted.contains("Deleted store-cli"));

            let listed = run_cli(&["--api-url", &api_url, "list"]).await?;
            assert_eq!(listed.trim(), "no stores");
            anyhow::Ok(())
        }
        .await;

        stop_process(&mut server).await;
        result
    }

    #[tokio::test]
    async fn cli_shows_server_detail_for_rejected_create() -> Result<()> {
        let bind = "127.0.0.1:19182";
        let api_url = format!("http://{bind}");
        let mut server = start_provisioner(bind).await?;

        let output = cli_output(&["--api-url", &api_url, "create", "shop"]).await;
        stop_process(&mut server).await;
        let output = output?;

        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("must start with 'store-'"));
        Ok(())
    }

    #[tokio::test]
    async fn cli_rejects_blank_name_without_a_server() -> Result<()> {
        let output = cli_output(&["--api-url", "http://127.0.0.1:9", "create", "  "]).await?;

        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("Store name is required"));
        Ok(())
    }

    #[tokio::test]
    async fn web_dashboard_creates_and_lists_stores() -> Result<()> {
        let api_bind = "127.0.0.1:19183";
        let web_bind = "127.0.0.1:19184";
        let mut server = start_provisioner(api_bind).await?;
        let web = start_web(web_bind, &format!("http://{api_bind}")).await;
        let mut web = match web {
            Ok(web) => web,
            Err(err) => {
                stop_process(&mut server).await;
                return Err(err);
            }
        };

        let result = async {
            let http = reqwest::Client::new();
            let page = http
                .post(format!("http://{web_bind}/stores"))
                .form(&[("name", "store-web"), ("engine", "woocommerce")])
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(page.contains("Provisioning started for store-web"));
            assert!(page.contains(r#"<td class="status-ready">Ready</td>"#));

            let page = http
                .post(format!("http://{web_bind}/stores/store-web/delete"))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(page.contains("Deleted store-web"));
            assert!(!page.contains("<td>store-web</td>"));
            anyhow::Ok(())
        }
        .await;

        stop_process(&mut web).await;
        stop_process(&mut server).await;
        result
    }

    async fn start_provisioner(bind: &str) -> Result<Child> {
        let server_bin = binary_path("provisioner")?;

        let child = Command::new(server_bin)
            .env("PROVISIONER_BIND", bind)
            .env("PROVISIONER_CLUSTER", "memory")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn provisioner")?;

        wait_for_url_status(&format!("http://{bind}/health"), StatusCode::OK, 40).await?;
        Ok(child)
    }

    async fn start_web(bind: &str, api_url: &str) -> Result<Child> {
        let cli_bin = binary_path("storectl")?;

        let child = Command::new(cli_bin)
            .arg("--api-url")
            .arg(api_url)
            .arg("serve-web")
            .arg("--bind")
            .arg(bind)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn storectl serve-web")?;

        wait_for_url_status(&format!("http://{bind}/api/ping"), StatusCode::OK, 40).await?;
        Ok(child)
    }

    async fn cli_output(args: &[&str]) -> Result<Output> {
        let cli_bin = binary_path("storectl")?;
        Command::new(cli_bin)
            .args(args)
            .env_remove("STORECTL_API_URL")
            .output()
            .await
            .context("failed to execute storectl")
    }

    async fn run_cli(args: &[&str]) -> Result<String> {
        let output = cli_output(args).await?;

        if !output.status.success() {
            bail!("storectl failed: {}", String::from_utf8_lossy(&output.stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn wait_for_url_status(url: &str, expected: StatusCode, retries: usize) -> Result<()> {
        let http = reqwest::Client::new();

        for _ in 0..retries {
            if let Ok(resp) = http.get(url).send().await
                && resp.status() == expected
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }

        bail!("service did not return {expected} at {url}");
    }

    async fn stop_process(child: &mut Child) {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }

    fn binary_path(name: &str) -> Result<PathBuf> {
        let workspace_root = workspace_root()?;
        ensure_binaries_built(&workspace_root)?;
        let mut path = workspace_root.join("target").join("debug").join(name);

        if let Some(suffix) = std::env::consts::EXE_SUFFIX.strip_prefix('.') {
            let mut filename = OsString::from(name);
            filename.push(".");
            filename.push(suffix);
            path = workspace_root.join("target").join("debug").join(filename);
        }

        if !path.exists() {
            bail!("expected binary does not exist: {}", path.display());
        }

        Ok(path)
    }

    fn workspace_root() -> Result<PathBuf> {
        let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        crate_dir
            .parent()
            .and_then(|p| p.parent())
            .map(PathBuf::from)
            .context("failed to resolve workspace root")
    }

    fn build_required_binaries(workspace_root: &PathBuf) -> Result<()> {
        let status = std::process::Command::new("cargo")
            .arg("build")
            .arg("-p")
            .arg("provisioner")
            .arg("-p")
            .arg("cli-client")
            .current_dir(workspace_root)
            .status()
            .context("failed to run cargo build for system test binaries")?;

        if !status.success() {
            bail!("cargo build for system test binaries failed");
        }

        Ok(())
    }

    fn ensure_binaries_built(workspace_root: &PathBuf) -> Result<()> {
        static BUILD_RESULT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

        let result = BUILD_RESULT.get_or_init(|| {
            build_required_binaries(workspace_root).map_err(|err| err.to_string())
        });

        if let Err(message) = result {
            bail!("failed to build required binaries: {message}");
        }

        Ok(())
    }
}
