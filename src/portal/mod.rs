//! Provisioning portal.
//!
//! A small HTTP surface served from a background thread. Which routes
//! exist depends on the [`PortalScope`]:
//!
//! - `Provision` (AP mode): `GET /` serves the provisioning form,
//!   `POST /connect` accepts credentials.
//! - `Reset` (station mode): `GET /reset` erases stored credentials.
//!
//! Both scopes answer `GET /favicon.ico` with 204 so browsers stay
//! quiet. A successful submit or reset schedules a full process
//! restart after a short drain delay; the next boot sequence picks up
//! the new store contents. At most one portal instance is live at a
//! time; the controller stops the old one before starting another.
//!
//! Uses `tiny_http` which works on both host and ESP32 (via std::net).

use log::{error, info, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, ResponseBox, Server};

use crate::config::{MAX_FORM_BODY, RESTART_DELAY};
use crate::reboot::Reboot;
use crate::store::SharedStore;

pub mod form;

const CONNECT_ACK: &str = "<h1>Connecting...</h1><p>If successful, the device will connect to the network. If failed, it will remain in provisioning mode.</p>";
const RESET_ACK: &str =
    "<h1>Credentials Cleared</h1><p>The device will restart and enter provisioning mode.</p>";

/// Route set exposed by a portal instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalScope {
    /// Form and credential submission, for AP mode.
    Provision,
    /// Credential reset only, for station mode.
    Reset,
}

/// Headers reused across responses.
struct StaticHeaders {
    html: Header,
    allow_get: Header,
    allow_post: Header,
}

impl StaticHeaders {
    fn new() -> Self {
        Self {
            html: Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..])
                .expect("static header"),
            allow_get: Header::from_bytes(&b"Allow"[..], &b"GET"[..]).expect("static header"),
            allow_post: Header::from_bytes(&b"Allow"[..], &b"POST"[..]).expect("static header"),
        }
    }
}

/// HTTP portal server.
///
/// Runs in a background thread until stopped or dropped.
pub struct Portal {
    /// Server thread handle.
    handle: Option<thread::JoinHandle<()>>,
    /// Flag to signal shutdown.
    shutdown: Arc<AtomicBool>,
    scope: PortalScope,
    port: u16,
}

impl Portal {
    /// Start a portal on `port` (0 picks a free port).
    ///
    /// `form_path` is the provisioning form document; it is read per
    /// request, so it only has to exist once a browser asks for it.
    pub fn start(
        scope: PortalScope,
        port: u16,
        form_path: PathBuf,
        store: SharedStore,
        reboot: Arc<dyn Reboot>,
    ) -> Result<Self, std::io::Error> {
        let addr = format!("0.0.0.0:{}", port);
        let server = Server::http(&addr)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::AddrInUse, format!("{}", e)))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|a| a.port())
            .unwrap_or(port);

        info!("Portal listening on http://0.0.0.0:{} ({})", port, scope_name(scope));

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let handle = thread::spawn(move || {
            Self::run_server(server, scope, form_path, store, reboot, shutdown_clone);
        });

        Ok(Self {
            handle: Some(handle),
            shutdown,
            scope,
            port,
        })
    }

    /// Route set this instance serves.
    pub fn scope(&self) -> PortalScope {
        self.scope
    }

    /// Port the instance is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    fn run_server(
        server: Server,
        scope: PortalScope,
        form_path: PathBuf,
        store: SharedStore,
        reboot: Arc<dyn Reboot>,
        shutdown: Arc<AtomicBool>,
    ) {
        // Pre-create headers to avoid repeated allocations
        let headers = StaticHeaders::new();

        loop {
            // Use Acquire ordering to ensure we see the shutdown flag from stop()
            if shutdown.load(Ordering::Acquire) {
                info!("Portal shutting down");
                break;
            }

            match server.recv_timeout(Duration::from_millis(100)) {
                Ok(Some(request)) => {
                    Self::handle_request(request, scope, &form_path, &store, &reboot, &headers);
                }
                Ok(None) => {
                    // Timeout, check shutdown flag and continue
                }
                Err(e) => {
                    error!("Portal server error: {}", e);
                    break;
                }
            }
        }
    }

    fn handle_request(
        mut request: Request,
        scope: PortalScope,
        form_path: &Path,
        store: &SharedStore,
        reboot: &Arc<dyn Reboot>,
        headers: &StaticHeaders,
    ) {
        // The query string never participates in routing
        let path = match request.url().split('?').next() {
            Some(p) => p.to_string(),
            None => request.url().to_string(),
        };
        let is_get = request.method() == &Method::Get;
        let is_post = request.method() == &Method::Post;

        let response = match path.as_str() {
            "/" if scope == PortalScope::Provision => {
                if is_get {
                    Self::serve_form(form_path, headers)
                } else {
                    Self::method_not_allowed(&headers.allow_get)
                }
            }
            "/connect" if scope == PortalScope::Provision => {
                if is_post {
                    Self::handle_connect(&mut request, store, reboot, headers)
                } else {
                    Self::method_not_allowed(&headers.allow_post)
                }
            }
            "/reset" if scope == PortalScope::Reset => {
                if is_get {
                    Self::handle_reset(store, reboot, headers)
                } else {
                    Self::method_not_allowed(&headers.allow_get)
                }
            }
            "/favicon.ico" => {
                if is_get {
                    Response::empty(204).boxed()
                } else {
                    Self::method_not_allowed(&headers.allow_get)
                }
            }
            _ => Self::not_found(),
        };

        if let Err(e) = request.respond(response) {
            warn!("Failed to send response: {}", e);
        }
    }

    /// `GET /`: the form document, byte for byte.
    fn serve_form(form_path: &Path, headers: &StaticHeaders) -> ResponseBox {
        match std::fs::read(form_path) {
            Ok(bytes) => Response::from_data(bytes)
                .with_header(headers.html.clone())
                .boxed(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!("Provisioning form not found at {}", form_path.display());
                Self::not_found()
            }
            Err(e) => {
                error!("Failed to read provisioning form: {}", e);
                Response::from_string("Internal Server Error")
                    .with_status_code(500)
                    .boxed()
            }
        }
    }

    /// `POST /connect`: validate, persist, acknowledge, restart.
    fn handle_connect(
        request: &mut Request,
        store: &SharedStore,
        reboot: &Arc<dyn Reboot>,
        headers: &StaticHeaders,
    ) -> ResponseBox {
        let mut body = Vec::new();
        let mut reader = request.as_reader().take(MAX_FORM_BODY as u64 + 1);
        if let Err(e) = reader.read_to_end(&mut body) {
            warn!("Failed to read submit body: {}", e);
            return Response::from_string("Bad Request").with_status_code(400).boxed();
        }
        if body.len() > MAX_FORM_BODY {
            return Response::from_string("Payload Too Large")
                .with_status_code(413)
                .boxed();
        }

        // The raw body is held to the same UTF-8 rule as its decoded fields
        let parsed = String::from_utf8(body)
            .map_err(|_| form::FormError::NotUtf8)
            .and_then(|body| form::parse_connect(&body));
        let creds = match parsed {
            Ok(creds) => creds,
            Err(e) => {
                info!("Rejected credential submission: {}", e);
                return Response::from_string(e.to_string()).with_status_code(400).boxed();
            }
        };

        info!("Received credentials for '{}'", creds.ssid);
        if let Err(e) = store.lock().unwrap().save(&creds) {
            error!("Failed to save credentials: {}", e);
            return Response::from_string("Failed to save credentials")
                .with_status_code(500)
                .boxed();
        }

        // The delay lets the acknowledgement reach the browser first
        reboot.schedule_restart(RESTART_DELAY);
        Response::from_string(CONNECT_ACK)
            .with_header(headers.html.clone())
            .boxed()
    }

    /// `GET /reset`: erase best-effort, acknowledge, restart regardless.
    fn handle_reset(
        store: &SharedStore,
        reboot: &Arc<dyn Reboot>,
        headers: &StaticHeaders,
    ) -> ResponseBox {
        match store.lock().unwrap().clear() {
            Ok(()) => info!("Stored credentials cleared"),
            Err(e) => warn!("Failed to clear credentials: {}", e),
        }

        reboot.schedule_restart(RESTART_DELAY);
        Response::from_string(RESET_ACK)
            .with_header(headers.html.clone())
            .boxed()
    }

    fn method_not_allowed(allow: &Header) -> ResponseBox {
        Response::from_string("Method Not Allowed")
            .with_status_code(405)
            .with_header(allow.clone())
            .boxed()
    }

    fn not_found() -> ResponseBox {
        Response::from_string("Not Found").with_status_code(404).boxed()
    }

    /// Stop the server.
    ///
    /// Note: May take up to 100ms due to polling interval.
    pub fn stop(&mut self) {
        // Use Release ordering to ensure the server thread sees this write
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        self.stop();
    }
}

fn scope_name(scope: PortalScope) -> &'static str {
    match scope {
        PortalScope::Provision => "provisioning routes",
        PortalScope::Reset => "reset route",
    }
}

#[cfg(all(test, not(feature = "esp32")))]
mod tests {
    use super::*;
    use crate::creds::Credentials;
    use crate::reboot::testing::RecordingReboot;
    use crate::store::{shared, CredentialStore, FileCredentialStore, StoreError};
    use tempfile::TempDir;

    const FORM_BODY: &str = "<html><body>provisioning form</body></html>";

    struct TestPortal {
        portal: Portal,
        store: SharedStore,
        reboot: Arc<RecordingReboot>,
        dir: TempDir,
    }

    impl TestPortal {
        fn url(&self, path: &str) -> String {
            format!("http://127.0.0.1:{}{}", self.portal.port(), path)
        }

        fn form_path(&self) -> PathBuf {
            self.dir.path().join("index.html")
        }
    }

    fn start_portal(scope: PortalScope) -> TestPortal {
        let dir = TempDir::new().unwrap();
        let form_path = dir.path().join("index.html");
        std::fs::write(&form_path, FORM_BODY).unwrap();

        let store = shared(FileCredentialStore::open(dir.path().join("store")).unwrap());
        let reboot = Arc::new(RecordingReboot::new());
        let portal = Portal::start(
            scope,
            0,
            form_path,
            store.clone(),
            reboot.clone(),
        )
        .unwrap();

        TestPortal {
            portal,
            store,
            reboot,
            dir,
        }
    }

    fn get(url: &str) -> (u16, String) {
        match ureq::get(url).call() {
            Ok(resp) => (resp.status(), resp.into_string().unwrap()),
            Err(ureq::Error::Status(code, resp)) => (code, resp.into_string().unwrap()),
            Err(e) => panic!("transport error: {}", e),
        }
    }

    fn post_form(url: &str, body: &str) -> (u16, String) {
        post_bytes(url, body.as_bytes())
    }

    fn post_bytes(url: &str, body: &[u8]) -> (u16, String) {
        let result = ureq::post(url)
            .set("Content-Type", "application/x-www-form-urlencoded")
            .send_bytes(body);
        match result {
            Ok(resp) => (resp.status(), resp.into_string().unwrap()),
            Err(ureq::Error::Status(code, resp)) => (code, resp.into_string().unwrap()),
            Err(e) => panic!("transport error: {}", e),
        }
    }

    // ==================== Form Serving Tests ====================

    #[test]
    fn test_form_served_verbatim() {
        let t = start_portal(PortalScope::Provision);
        let (status, body) = get(&t.url("/"));
        assert_eq!(status, 200);
        assert_eq!(body, FORM_BODY);
    }

    #[test]
    fn test_missing_form_is_not_found() {
        let t = start_portal(PortalScope::Provision);
        std::fs::remove_file(t.form_path()).unwrap();
        let (status, _) = get(&t.url("/"));
        assert_eq!(status, 404);
    }

    #[test]
    fn test_query_string_does_not_affect_routing() {
        let t = start_portal(PortalScope::Provision);
        let (status, body) = get(&t.url("/?cached=1"));
        assert_eq!(status, 200);
        assert_eq!(body, FORM_BODY);
    }

    // ==================== Credential Submission Tests ====================

    #[test]
    fn test_connect_saves_and_schedules_restart() {
        let t = start_portal(PortalScope::Provision);
        let (status, body) = post_form(&t.url("/connect"), "ssid=HomeNet&password=secret123");

        assert_eq!(status, 200);
        assert!(body.contains("Connecting"));
        assert_eq!(
            t.store.lock().unwrap().load().unwrap(),
            Credentials::new("HomeNet", "secret123").unwrap()
        );
        assert!(t.reboot.wait_for_restart(Duration::from_secs(1)));
        assert_eq!(t.reboot.last_delay(), Some(RESTART_DELAY));
    }

    #[test]
    fn test_connect_decodes_urlencoded_fields() {
        let t = start_portal(PortalScope::Provision);
        let (status, _) = post_form(&t.url("/connect"), "ssid=My+Home+Net&password=p%40ss");

        assert_eq!(status, 200);
        let stored = t.store.lock().unwrap().load().unwrap();
        assert_eq!(stored.ssid, "My Home Net");
        assert_eq!(stored.password, "p@ss");
    }

    #[test]
    fn test_connect_missing_ssid_rejected_without_side_effects() {
        let t = start_portal(PortalScope::Provision);
        let (status, body) = post_form(&t.url("/connect"), "password=secret123");

        assert_eq!(status, 400);
        assert!(body.contains("Missing 'ssid' parameter"));
        assert!(matches!(
            t.store.lock().unwrap().load(),
            Err(StoreError::NoCredentials)
        ));
        assert_eq!(t.reboot.restart_count(), 0);
    }

    #[test]
    fn test_connect_empty_ssid_rejected() {
        let t = start_portal(PortalScope::Provision);
        let (status, _) = post_form(&t.url("/connect"), "ssid=&password=x");
        assert_eq!(status, 400);
        assert_eq!(t.reboot.restart_count(), 0);
    }

    #[test]
    fn test_connect_invalid_utf8_rejected_raw_and_escaped() {
        let t = start_portal(PortalScope::Provision);

        let (status, body) = post_bytes(&t.url("/connect"), b"ssid=\xFF&password=x");
        assert_eq!(status, 400);
        assert!(body.contains("not valid UTF-8"));

        let (status, _) = post_form(&t.url("/connect"), "ssid=%FF&password=x");
        assert_eq!(status, 400);

        assert!(matches!(
            t.store.lock().unwrap().load(),
            Err(StoreError::NoCredentials)
        ));
        assert_eq!(t.reboot.restart_count(), 0);
    }

    #[test]
    fn test_connect_oversize_body_rejected() {
        let t = start_portal(PortalScope::Provision);
        let body = format!("ssid=Net&password={}", "x".repeat(MAX_FORM_BODY));
        let (status, _) = post_form(&t.url("/connect"), &body);

        assert_eq!(status, 413);
        assert_eq!(t.reboot.restart_count(), 0);
    }

    #[test]
    fn test_connect_save_failure_is_server_error() {
        struct FailingStore;
        impl CredentialStore for FailingStore {
            fn save(&mut self, _: &Credentials) -> Result<(), StoreError> {
                Err(StoreError::Backend("disk full".to_string()))
            }
            fn load(&self) -> Result<Credentials, StoreError> {
                Err(StoreError::NoCredentials)
            }
            fn clear(&mut self) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let dir = TempDir::new().unwrap();
        let reboot = Arc::new(RecordingReboot::new());
        let portal = Portal::start(
            PortalScope::Provision,
            0,
            dir.path().join("index.html"),
            shared(FailingStore),
            reboot.clone(),
        )
        .unwrap();

        let url = format!("http://127.0.0.1:{}/connect", portal.port());
        let (status, _) = post_form(&url, "ssid=HomeNet");
        assert_eq!(status, 500);
        assert_eq!(reboot.restart_count(), 0);
    }

    // ==================== Reset Tests ====================

    #[test]
    fn test_reset_clears_store_and_schedules_restart() {
        let t = start_portal(PortalScope::Reset);
        t.store
            .lock()
            .unwrap()
            .save(&Credentials::new("HomeNet", "secret123").unwrap())
            .unwrap();

        let (status, body) = get(&t.url("/reset"));
        assert_eq!(status, 200);
        assert!(body.contains("Credentials Cleared"));
        assert!(matches!(
            t.store.lock().unwrap().load(),
            Err(StoreError::NoCredentials)
        ));
        assert!(t.reboot.wait_for_restart(Duration::from_secs(1)));
    }

    #[test]
    fn test_reset_on_empty_store_still_acks_and_restarts() {
        let t = start_portal(PortalScope::Reset);
        let (status, _) = get(&t.url("/reset"));
        assert_eq!(status, 200);
        assert!(t.reboot.wait_for_restart(Duration::from_secs(1)));
    }

    // ==================== Routing Tests ====================

    #[test]
    fn test_scope_gates_routes() {
        let provision = start_portal(PortalScope::Provision);
        let (status, _) = get(&provision.url("/reset"));
        assert_eq!(status, 404);

        let reset = start_portal(PortalScope::Reset);
        let (status, _) = get(&reset.url("/"));
        assert_eq!(status, 404);
        let (status, _) = post_form(&reset.url("/connect"), "ssid=Net");
        assert_eq!(status, 404);
    }

    #[test]
    fn test_wrong_method_names_the_allowed_one() {
        let t = start_portal(PortalScope::Provision);
        let err = ureq::get(&t.url("/connect")).call().unwrap_err();
        match err {
            ureq::Error::Status(405, resp) => {
                assert_eq!(resp.header("Allow"), Some("POST"));
            }
            other => panic!("expected 405, got {:?}", other),
        }
    }

    #[test]
    fn test_favicon_is_no_content_in_both_scopes() {
        for scope in [PortalScope::Provision, PortalScope::Reset] {
            let t = start_portal(scope);
            let (status, body) = get(&t.url("/favicon.ico"));
            assert_eq!(status, 204);
            assert!(body.is_empty());
        }
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let t = start_portal(PortalScope::Provision);
        let (status, _) = get(&t.url("/admin"));
        assert_eq!(status, 404);
    }

    // ==================== Lifecycle Tests ====================

    #[test]
    fn test_second_instance_on_same_port_fails() {
        let t = start_portal(PortalScope::Provision);
        let result = Portal::start(
            PortalScope::Provision,
            t.portal.port(),
            t.form_path(),
            t.store.clone(),
            t.reboot.clone(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_stop_releases_the_port() {
        let mut t = start_portal(PortalScope::Provision);
        let port = t.portal.port();
        t.portal.stop();

        let portal = Portal::start(
            PortalScope::Provision,
            port,
            t.form_path(),
            t.store.clone(),
            t.reboot.clone(),
        );
        assert!(portal.is_ok());
    }
}
