// ─── Account Login ───
// Token fetch followed by a form POST sign-in against the account API.

use std::fmt;

use tracing::{debug, info};

use super::task::{WebTask, WebTaskHandler};
use crate::core::json::{parse_json, JsonValue, OnValue, ParseOptions};
use crate::core::transport::Transport;

pub const TOKEN_TASK_ID: &str = "CC get token";
pub const SIGN_IN_TASK_ID: &str = "CC post login";

/// Fetches the anti-forgery token that must accompany a sign-in.
#[derive(Debug, Default)]
pub struct GetTokenTask {
    base: WebTask,
    json: ParseOptions,
    pub token: String,
}

impl GetTokenTask {
    pub fn new(json: ParseOptions) -> Self {
        Self {
            json,
            ..Self::default()
        }
    }

    pub fn run(&mut self, transport: &dyn Transport, login_url: &str) {
        if self.base.working {
            return;
        }
        self.base.reset(TOKEN_TASK_ID);
        self.token.clear();
        transport.async_get(login_url, TOKEN_TASK_ID);
    }
}

impl WebTaskHandler for GetTokenTask {
    fn task(&self) -> &WebTask {
        &self.base
    }

    fn task_mut(&mut self) -> &mut WebTask {
        &mut self.base
    }

    fn handle(&mut self, data: &[u8]) {
        let token = &mut self.token;
        let mut visitor = OnValue(|key: &str, value: &JsonValue<'_>| {
            if key.eq_ignore_ascii_case("token") && !value.is_container() {
                *token = value.as_str().to_string();
            }
        });
        if !parse_json(data, self.json, &mut visitor) {
            debug!("Login token response was malformed");
        }
    }
}

/// Application-level reasons a sign-in was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInError {
    WrongCredentials,
    VerificationRequired,
    Unknown,
}

impl SignInError {
    /// Map one entry of the `errors` array. Empty codes mean nothing.
    pub fn from_code(code: &str) -> Option<Self> {
        if code.eq_ignore_ascii_case("username") || code.eq_ignore_ascii_case("password") {
            Some(SignInError::WrongCredentials)
        } else if code.eq_ignore_ascii_case("verification") {
            Some(SignInError::VerificationRequired)
        } else if !code.is_empty() {
            Some(SignInError::Unknown)
        } else {
            None
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            SignInError::WrongCredentials => "&cWrong username or password",
            SignInError::VerificationRequired => "&cAccount verification required",
            SignInError::Unknown => "&cUnknown error occurred",
        }
    }
}

impl fmt::Display for SignInError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Posts credentials plus the previously fetched token.
#[derive(Debug, Default)]
pub struct SignInTask {
    base: WebTask,
    json: ParseOptions,
    /// Canonical account name echoed back by the server.
    pub username: String,
    /// First recognised error of the last run.
    pub error: Option<SignInError>,
}

impl SignInTask {
    pub fn new(json: ParseOptions) -> Self {
        Self {
            json,
            ..Self::default()
        }
    }

    pub fn run(
        &mut self,
        transport: &dyn Transport,
        login_url: &str,
        user: &str,
        pass: &str,
        token: &str,
    ) {
        if self.base.working {
            return;
        }
        self.base.reset(SIGN_IN_TASK_ID);
        self.username.clear();
        self.error = None;

        info!("Signing in as '{}'", user);
        transport.async_post(login_url, SIGN_IN_TASK_ID, sign_in_form(user, pass, token));
    }
}

impl WebTaskHandler for SignInTask {
    fn task(&self) -> &WebTask {
        &self.base
    }

    fn task_mut(&mut self) -> &mut WebTask {
        &mut self.base
    }

    fn handle(&mut self, data: &[u8]) {
        let json = self.json;
        let username = &mut self.username;
        let error = &mut self.error;
        let mut visitor = OnValue(|key: &str, value: &JsonValue<'_>| {
            if value.is_container() {
                return;
            }
            if key.eq_ignore_ascii_case("username") {
                *username = value.as_str().to_string();
            } else if key.eq_ignore_ascii_case("errors") && error.is_none() {
                *error = SignInError::from_code(value.as_str());
            }
        });
        if !parse_json(data, json, &mut visitor) {
            debug!("Sign-in response was malformed");
        }
    }
}

fn sign_in_form(user: &str, pass: &str, token: &str) -> Vec<u8> {
    format!(
        "username={}&password={}&token={}",
        urlencoding::encode(user),
        urlencoding::encode(pass),
        urlencoding::encode(token)
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::mock::MockTransport;

    const LOGIN_URL: &str = "https://example.net/api/login";

    #[test]
    fn token_is_extracted_case_insensitively() {
        let transport = MockTransport::new();
        let mut task = GetTokenTask::default();
        task.run(&transport, LOGIN_URL);
        transport.complete_ok(TOKEN_TASK_ID, br#"{"authenticated":false,"Token":"abc123"}"#.to_vec());

        assert!(task.tick(&transport));
        assert!(task.task().success);
        assert_eq!(task.token, "abc123");
    }

    #[test]
    fn run_while_working_sends_nothing_new() {
        let transport = MockTransport::new();
        let mut task = GetTokenTask::default();
        task.run(&transport, LOGIN_URL);
        task.token = "in flight".into();
        task.run(&transport, LOGIN_URL);

        assert_eq!(transport.request_count(), 1);
        assert!(task.is_working());
        assert_eq!(task.token, "in flight");
    }

    #[test]
    fn sign_in_posts_encoded_form() {
        let transport = MockTransport::new();
        let mut task = SignInTask::default();
        task.run(&transport, LOGIN_URL, "al ice", "p&ss", "tok");

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.identifier, SIGN_IN_TASK_ID);
        assert_eq!(
            request.body.as_deref(),
            Some(&b"username=al%20ice&password=p%26ss&token=tok"[..])
        );
    }

    #[test]
    fn sign_in_reads_username() {
        let transport = MockTransport::new();
        let mut task = SignInTask::default();
        task.run(&transport, LOGIN_URL, "alice", "secret", "tok");
        transport.complete_ok(
            SIGN_IN_TASK_ID,
            br#"{"authenticated":true,"username":"Alice","errors":[]}"#.to_vec(),
        );

        task.tick(&transport);
        assert_eq!(task.username, "Alice");
        assert_eq!(task.error, None);
    }

    #[test]
    fn first_known_error_wins() {
        let transport = MockTransport::new();
        let mut task = SignInTask::default();
        task.run(&transport, LOGIN_URL, "alice", "bad", "tok");
        transport.complete_ok(
            SIGN_IN_TASK_ID,
            br#"{"username":null,"errors":["verification","password"]}"#.to_vec(),
        );

        task.tick(&transport);
        assert_eq!(task.error, Some(SignInError::VerificationRequired));
        assert_eq!(
            task.error.unwrap().message(),
            "&cAccount verification required"
        );
    }

    #[test]
    fn error_codes_map_to_messages() {
        assert_eq!(
            SignInError::from_code("PASSWORD"),
            Some(SignInError::WrongCredentials)
        );
        assert_eq!(SignInError::from_code("banned"), Some(SignInError::Unknown));
        assert_eq!(SignInError::from_code(""), None);
    }

    #[test]
    fn a_new_run_clears_previous_error() {
        let transport = MockTransport::new();
        let mut task = SignInTask::default();
        task.run(&transport, LOGIN_URL, "alice", "bad", "tok");
        transport.complete_ok(SIGN_IN_TASK_ID, br#"{"errors":["username"]}"#.to_vec());
        task.tick(&transport);
        assert!(task.error.is_some());

        task.run(&transport, LOGIN_URL, "alice", "good", "tok");
        assert_eq!(task.error, None);
        assert_eq!(transport.request_count(), 2);
    }
}
