//! Server management - spawning and health checking the application preview server

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running server process
pub struct ServerHandle {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn the preview server and wait until it answers
    pub async fn spawn(config: AppServerConfig) -> E2eResult<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| E2eError::ServerStartup("empty server command".into()))?;
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!(
            "http://127.0.0.1:{}/{}",
            port,
            config.base_path.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string();

        info!("Spawning app server on port {}: {}", port, config.command.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&config.working_dir)
            .env("PORT", port.to_string())
            .env("HOST", "127.0.0.1");

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        cmd.stdout(Stdio::null()).stderr(Stdio::inherit());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e))
        })?;

        let handle = ServerHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        handle
            .wait_for_healthy(Duration::from_secs(config.startup_timeout_secs))
            .await?;

        info!("Server is healthy at {}", base_url);
        Ok(handle)
    }

    /// Poll the site root until it answers with a non-error status
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let health_url = format!("{}/", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().as_u16() < 400 => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(250)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server: SIGTERM first, then kill
    pub fn stop(&mut self) -> E2eResult<()> {
        info!("Stopping server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// How to start the application under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppServerConfig {
    /// Program and arguments, e.g. `["npm", "run", "preview"]`
    pub command: Vec<String>,

    pub working_dir: PathBuf,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Path prefix the site is served under
    pub base_path: String,

    pub startup_timeout_secs: u64,

    /// Extra environment for the server
    pub env: Vec<(String, String)>,
}

impl Default for AppServerConfig {
    fn default() -> Self {
        Self {
            command: vec!["npm".into(), "run".into(), "preview".into()],
            working_dir: PathBuf::from("."),
            port: None,
            base_path: String::new(),
            startup_timeout_secs: 60,
            env: Vec::new(),
        }
    }
}

/// Find a free port to use
pub fn find_free_port() -> E2eResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port1 = find_free_port().unwrap();
        let port2 = find_free_port().unwrap();

        assert!(port1 > 1024);
        assert!(port2 > 1024);
    }

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let config = AppServerConfig {
            command: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            ServerHandle::spawn(config).await,
            Err(E2eError::ServerStartup(_))
        ));
    }

    #[test]
    fn test_config_from_toml() {
        let config: AppServerConfig = toml::from_str(
            r#"
command = ["npx", "vite", "preview", "--strictPort"]
base_path = "/AI-Project/"
env = [["VITE_PAYMENT_MODE", "mock"]]
"#,
        )
        .unwrap();
        assert_eq!(config.command[1], "vite");
        assert_eq!(config.env[0].0, "VITE_PAYMENT_MODE");
        assert_eq!(config.startup_timeout_secs, 60);
    }
}
