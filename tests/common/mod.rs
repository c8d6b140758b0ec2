//! Shared test infrastructure for integration tests
//!
//! Provides TestServer, which spawns the real birthday_page binary on a
//! fresh port with a temp config and known passwords.

#![allow(dead_code)]

use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Ask the OS for a port that is free right now.
fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to allocate a port")
}

pub const PUBLIC_PASSWORD: &str = "happy-birthday";
pub const ADMIN_PASSWORD: &str = "candles-and-cake";

/// Test server wrapper that spawns a real birthday_page binary
pub struct TestServer {
    process: Child,
    port: u16,
    _dir: TempDir,
}

/// Environment for a TestServer: passwords, extra config, template overrides.
pub struct TestServerBuilder {
    public_password: Option<&'static str>,
    admin_password: Option<&'static str>,
    config_body: String,
    templates: Vec<(&'static str, String)>,
}

impl TestServerBuilder {
    pub fn without_admin_password(mut self) -> Self {
        self.admin_password = None;
        self
    }

    /// Extra TOML lines appended to the generated config.
    pub fn config(mut self, body: &str) -> Self {
        self.config_body.push_str(body);
        self.config_body.push('\n');
        self
    }

    /// Write `<name>.html` into the template override directory.
    pub fn template(mut self, name: &'static str, content: &str) -> Self {
        self.templates.push((name, content.to_string()));
        self
    }

    /// Allocate a port, write templates and a TOML config, spawn the server,
    /// and wait for readiness.
    pub async fn start(self) -> TestServer {
        let port = free_port();
        let dir = TempDir::new().expect("Failed to create temp dir");

        let template_dir = dir.path().join("templates");
        std::fs::create_dir_all(&template_dir).expect("Failed to create template dir");
        for (name, content) in &self.templates {
            std::fs::write(template_dir.join(format!("{}.html", name)), content)
                .expect("Failed to write template");
        }

        let config = format!(
            "listen_addr = \"127.0.0.1:{}\"\ntemplate_dir = \"{}\"\n{}",
            port,
            template_dir.display(),
            self.config_body
        );
        let config_path = dir.path().join("test.toml");
        std::fs::write(&config_path, &config).expect("Failed to write test config");

        let mut command = Command::new(env!("CARGO_BIN_EXE_birthday_page"));
        command
            .env("BIRTHDAY_PAGE_CONFIG", &config_path)
            .env("RUST_LOG", "birthday_page=warn")
            .env_remove("BIRTHDAY_PAGE_LISTEN_ADDR")
            .env_remove("BIRTHDAY_PAGE_TEMPLATE_DIR")
            .env_remove("BIRTHDAY_PAGE_SESSION_TTL_MINUTES")
            .env_remove("BIRTHDAY_PAGE_SECURE_COOKIE");
        match self.public_password {
            Some(pw) => command.env("BIRTHDAY_PAGE_PASSWORD", pw),
            None => command.env_remove("BIRTHDAY_PAGE_PASSWORD"),
        };
        match self.admin_password {
            Some(pw) => command.env("BIRTHDAY_PAGE_ADMIN_PASSWORD", pw),
            None => command.env_remove("BIRTHDAY_PAGE_ADMIN_PASSWORD"),
        };

        let process = command.spawn().expect("Failed to start server");

        let mut server = TestServer {
            process,
            port,
            _dir: dir,
        };
        server.wait_ready().await;
        server
    }
}

impl TestServer {
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder {
            public_password: Some(PUBLIC_PASSWORD),
            admin_password: Some(ADMIN_PASSWORD),
            config_body: String::new(),
            templates: Vec::new(),
        }
    }

    /// Start a test server with both passwords set and builtin templates
    pub async fn start() -> Self {
        Self::builder().start().await
    }

    async fn wait_ready(&mut self) {
        let addr = format!("127.0.0.1:{}", self.port);
        for _ in 0..150 {
            if std::net::TcpStream::connect(&addr).is_ok() {
                sleep(Duration::from_millis(100)).await;
                return;
            }

            if let Ok(Some(status)) = self.process.try_wait() {
                panic!("Server exited before becoming ready: {}", status);
            }

            sleep(Duration::from_millis(100)).await;
        }

        let _ = self.process.kill();
        panic!("Timed out waiting for server on {}", addr);
    }

    /// Get the HTTP endpoint URL
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint(), path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}

// === Shared HTTP helpers (reqwest) ===

/// Client with its own cookie jar that does not follow redirects.
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build client")
}

/// Like [`browser`], but connecting from a specific local address.
pub fn browser_from(local: std::net::IpAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .local_address(local)
        .build()
        .expect("Failed to build client")
}

/// POST the login form at `path`.
pub async fn login(
    client: &reqwest::Client,
    server: &TestServer,
    path: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(server.url(path))
        .form(&[("password", password)])
        .send()
        .await
        .expect("login request failed")
}

/// Value of the session cookie set on `resp`, if any.
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("birthday_session="))
        .and_then(|v| v.split(';').next())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}
