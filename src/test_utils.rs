//! Test utilities shared across test modules
//!
//! Provides temp-dir backed paths, an in-memory [`UserDirectory`] that
//! records every call it receives, and a single-request HTTP server for
//! exercising the REST client.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use crate::claims::Claims;
use crate::client::{ClientError, ClientResult, UserDirectory, UserPage, UserRecord};
use crate::paths::Paths;
use tempfile::TempDir;

/// Create a Paths struct rooted at a temporary home directory.
///
/// `~/.fbauth/` is created so tests can drop credential files next to the
/// manifest.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    let paths = Paths::from_home(temp_dir.path());
    fs::create_dir_all(&paths.base_dir).unwrap();
    paths
}

/// Write `content` as the manifest file
pub fn write_manifest(paths: &Paths, content: &str) {
    fs::write(&paths.config_file, content).unwrap();
}

pub const ALICE_UID: &str = "AliceUid0000000000000000000A";
pub const BOB_UID: &str = "BobUid000000000000000000000B";

pub fn user(uid: &str, email: &str, display_name: &str) -> UserRecord {
    UserRecord {
        uid: uid.to_string(),
        email: email.to_string(),
        display_name: display_name.to_string(),
        ..UserRecord::default()
    }
}

/// In-memory user directory.
///
/// Pages are keyed by the cursor that requests them; asking for an unknown
/// cursor fails like a broken paging request would.
#[derive(Default)]
pub struct FakeDirectory {
    users: RefCell<Vec<UserRecord>>,
    pages: HashMap<String, UserPage>,
    calls: RefCell<Vec<String>>,
}

impl FakeDirectory {
    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: RefCell::new(users),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, cursor: &str, users: Vec<UserRecord>, next: &str) -> Self {
        self.pages.insert(
            cursor.to_string(),
            UserPage {
                users,
                next_page_token: next.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl UserDirectory for FakeDirectory {
    fn get_user(&self, uid: &str) -> ClientResult<UserRecord> {
        self.record(format!("get_user:{uid}"));
        self.users
            .borrow()
            .iter()
            .find(|u| u.uid == uid)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("no user exists with the uid: {uid}")))
    }

    fn get_user_by_email(&self, email: &str) -> ClientResult<UserRecord> {
        self.record(format!("get_user_by_email:{email}"));
        self.users
            .borrow()
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| {
                ClientError::NotFound(format!("no user exists with the email: {email}"))
            })
    }

    fn list_users(&self, page_token: &str, page_size: u32) -> ClientResult<UserPage> {
        self.record(format!("list_users:{page_token}:{page_size}"));
        self.pages
            .get(page_token)
            .cloned()
            .ok_or_else(|| ClientError::Api {
                status: 500,
                message: format!("INTERNAL_ERROR : bad page token {page_token:?}"),
            })
    }

    fn set_custom_claims(&self, uid: &str, claims: &Claims) -> ClientResult<()> {
        self.record(format!("set_custom_claims:{uid}"));
        let mut users = self.users.borrow_mut();
        let user = users
            .iter_mut()
            .find(|u| u.uid == uid)
            .ok_or_else(|| ClientError::NotFound(format!("no user exists with the uid: {uid}")))?;
        user.custom_claims = claims.clone();
        Ok(())
    }
}

/// Request as seen by [`serve_once`]
#[derive(Debug)]
pub struct CapturedRequest {
    /// Request line, e.g. `POST /v1/projects/p/accounts:lookup HTTP/1.1`
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Accept one connection on a loopback port, answer it with `status` and a
/// JSON `body`, and hand back what the client sent.
///
/// Returns the server's `http://127.0.0.1:<port>` base URL.
pub fn serve_once(status: u16, body: &str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let body = body.to_string();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        let length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| v.parse::<usize>().unwrap())
            .unwrap_or(0);
        let mut request_body = vec![0u8; length];
        reader.read_exact(&mut request_body).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        stream.flush().unwrap();

        CapturedRequest {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(request_body).unwrap(),
        }
    });

    (base_url, handle)
}
