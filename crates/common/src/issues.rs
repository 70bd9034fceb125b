//! Known-issue lookups
//!
//! Issue ids look like `BZ:1666687`. Only Bugzilla ids are understood; any
//! other prefix is reported as closed.

use serde::Deserialize;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::settings::{IssueBackend, Settings};

/// Bugzilla statuses that mean the fix has landed
pub const CLOSED_STATUSES: [&str; 3] = ["VERIFIED", "RELEASE_PENDING", "CLOSED"];

/// Answers whether a tracked product defect is still open
pub trait IssueTracker {
    fn is_open(&self, id: &str) -> bool;
}

impl<T: IssueTracker + ?Sized> IssueTracker for &T {
    fn is_open(&self, id: &str) -> bool {
        (**self).is_open(id)
    }
}

impl<T: IssueTracker + ?Sized> IssueTracker for Box<T> {
    fn is_open(&self, id: &str) -> bool {
        (**self).is_open(id)
    }
}

/// Fixed set of open ids, usually from `issues.open`
#[derive(Debug, Clone, Default)]
pub struct StaticIssueTracker {
    open: BTreeSet<String>,
}

impl StaticIssueTracker {
    pub fn new<I, S>(open: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            open: open.into_iter().map(Into::into).collect(),
        }
    }
}

impl IssueTracker for StaticIssueTracker {
    fn is_open(&self, id: &str) -> bool {
        self.open.contains(id)
    }
}

#[derive(Debug, Deserialize)]
struct BugList {
    bugs: Vec<Bug>,
}

#[derive(Debug, Deserialize)]
struct Bug {
    status: String,
}

/// Queries a Bugzilla REST endpoint, caching each answer
pub struct BugzillaTracker {
    base_url: String,
    client: reqwest::blocking::Client,
    cache: RefCell<HashMap<String, bool>>,
}

impl BugzillaTracker {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::blocking::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn fetch_status(&self, number: &str) -> Result<String> {
        let url = format!("{}/rest/bug/{}?include_fields=id,status", self.base_url, number);
        let response = self
            .client
            .get(&url)
            .send()?
            .error_for_status()?;
        let list: BugList = response.json()?;
        list.bugs
            .into_iter()
            .next()
            .map(|bug| bug.status)
            .ok_or_else(|| Error::IssueTracker(format!("bug {} not found", number)))
    }
}

impl IssueTracker for BugzillaTracker {
    fn is_open(&self, id: &str) -> bool {
        if let Some(open) = self.cache.borrow().get(id) {
            return *open;
        }

        let open = match id.strip_prefix("BZ:") {
            Some(number) => match self.fetch_status(number) {
                Ok(status) => {
                    debug!("{} has status {}", id, status);
                    is_open_status(&status)
                }
                Err(e) => {
                    // Unknown state keeps workarounds and skips in place
                    warn!("Could not resolve {}: {}; treating it as open", id, e);
                    true
                }
            },
            None => {
                warn!("Unsupported issue id {}; treating it as closed", id);
                false
            }
        };

        self.cache.borrow_mut().insert(id.to_string(), open);
        open
    }
}

/// Whether a Bugzilla status string means the bug is still open
pub fn is_open_status(status: &str) -> bool {
    !CLOSED_STATUSES.contains(&status.to_ascii_uppercase().as_str())
}

/// Build the tracker selected by `issues.backend`
pub fn tracker_from_settings(settings: &Settings) -> Result<Box<dyn IssueTracker>> {
    match settings.issues.backend {
        IssueBackend::Static => Ok(Box::new(StaticIssueTracker::new(
            settings.issues.open.iter().cloned(),
        ))),
        IssueBackend::Bugzilla => {
            let url = settings.issues.bugzilla_url.as_deref().ok_or_else(|| {
                Error::InvalidConfig("issues.bugzilla_url is required by the bugzilla backend".to_string())
            })?;
            Ok(Box::new(BugzillaTracker::new(url)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use test_case::test_case;

    /// Minimal HTTP server answering every request with the same response
    struct CannedServer {
        url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl CannedServer {
        fn start(status: &'static str, body: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let url = format!("http://{}/", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);

            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let Ok(clone) = stream.try_clone() else { break };
                    let mut reader = BufReader::new(clone);

                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).is_err() {
                        continue;
                    }
                    loop {
                        let mut header = String::new();
                        match reader.read_line(&mut header) {
                            Ok(0) | Err(_) => break,
                            Ok(_) if header == "\r\n" => break,
                            Ok(_) => {}
                        }
                    }
                    seen.lock().unwrap().push(request_line.trim_end().to_string());

                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes());
                }
            });

            Self { url, requests }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn tracker(url: &str) -> BugzillaTracker {
        let client = reqwest::blocking::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        BugzillaTracker::with_client(url, client)
    }

    #[test_case(r#"{"bugs": [{"id": 1666687, "status": "NEW"}]}"#, true ; "new bug is open")]
    #[test_case(r#"{"bugs": [{"id": 1666687, "status": "ON_QA"}]}"#, true ; "bug on qa is open")]
    #[test_case(r#"{"bugs": [{"id": 1666687, "status": "VERIFIED"}]}"#, false ; "verified bug is closed")]
    #[test_case(r#"{"bugs": [{"id": 1666687, "status": "CLOSED"}]}"#, false ; "closed bug is closed")]
    #[test_case(r#"{"bugs": []}"#, true ; "unknown bug counts as open")]
    fn test_bugzilla_status(body: &'static str, open: bool) {
        let server = CannedServer::start("200 OK", body);
        let tracker = tracker(&server.url);
        assert_eq!(tracker.is_open("BZ:1666687"), open);
        assert_eq!(
            server.requests(),
            vec!["GET /rest/bug/1666687?include_fields=id,status HTTP/1.1".to_string()]
        );
    }

    #[test]
    fn test_bugzilla_answers_are_cached() {
        let server = CannedServer::start("200 OK", r#"{"bugs": [{"id": 42, "status": "VERIFIED"}]}"#);
        let tracker = tracker(&server.url);
        assert!(!tracker.is_open("BZ:42"));
        assert!(!tracker.is_open("BZ:42"));
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn test_bugzilla_missing_bug_error() {
        let server = CannedServer::start("200 OK", r#"{"bugs": []}"#);
        let err = tracker(&server.url).fetch_status("7").unwrap_err();
        assert!(err.to_string().contains("bug 7 not found"));
    }

    #[test]
    fn test_bugzilla_server_error_counts_as_open() {
        let server = CannedServer::start("500 Internal Server Error", "{}");
        assert!(tracker(&server.url).is_open("BZ:42"));
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn test_unreachable_bugzilla_counts_as_open() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        assert!(tracker(&url).is_open("BZ:42"));
    }

    #[test]
    fn test_static_tracker() {
        let tracker = StaticIssueTracker::new(["BZ:1666687"]);
        assert!(tracker.is_open("BZ:1666687"));
        assert!(!tracker.is_open("BZ:1"));
    }

    #[test]
    fn test_open_statuses() {
        assert!(is_open_status("NEW"));
        assert!(is_open_status("ASSIGNED"));
        assert!(is_open_status("ON_QA"));
        assert!(!is_open_status("VERIFIED"));
        assert!(!is_open_status("closed"));
    }

    #[test]
    fn test_unsupported_prefix_is_closed() {
        let tracker = BugzillaTracker::new("https://bugzilla.example.com/").unwrap();
        assert!(!tracker.is_open("JIRA:ABC-1"));
    }

    #[test]
    fn test_tracker_from_settings_uses_open_list() {
        let mut settings = Settings::default();
        settings.issues.open = vec!["BZ:42".to_string()];
        let tracker = tracker_from_settings(&settings).unwrap();
        assert!(tracker.is_open("BZ:42"));
        assert!(!tracker.is_open("BZ:43"));
    }

    #[test]
    fn test_bugzilla_backend_needs_url() {
        let mut settings = Settings::default();
        settings.issues.backend = IssueBackend::Bugzilla;
        assert!(tracker_from_settings(&settings).is_err());
    }
}
