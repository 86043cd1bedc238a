// ─── Web Task ───
// Poll-driven request lifecycle shared by every launcher task.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::error::TransportError;
use crate::core::transport::{HttpResponse, Transport};

/// State of one fetch-then-parse run.
///
/// `completed` only moves from false to true within a run, and `success`
/// is only meaningful once `completed` is set.
#[derive(Debug, Clone, Default)]
pub struct WebTask {
    pub identifier: String,
    pub completed: bool,
    pub working: bool,
    pub success: bool,
    pub started_at: Option<DateTime<Utc>>,
    /// Network-level failure of the last run.
    pub result: Option<TransportError>,
    pub status_code: u16,
}

impl WebTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run. Callers check `working` first.
    pub fn reset(&mut self, identifier: impl Into<String>) {
        self.identifier = identifier.into();
        self.completed = false;
        self.working = true;
        self.success = false;
        self.started_at = Some(Utc::now());
        self.result = None;
        self.status_code = 0;
    }

    /// Collect the transport result if it has arrived.
    ///
    /// Returns the response exactly once per run, on the tick that observes
    /// completion. Before that, and after it, this is a no-op.
    pub fn poll(&mut self, transport: &dyn Transport) -> Option<HttpResponse> {
        if self.completed || !self.working {
            return None;
        }

        let response = transport.poll_result(&self.identifier)?;
        let elapsed = self
            .started_at
            .map(|start| (Utc::now() - start).num_milliseconds())
            .unwrap_or_default();
        debug!("{} took {}ms", self.identifier, elapsed);

        self.result = response.error.clone();
        self.status_code = response.status_code;
        self.working = false;
        self.completed = true;
        self.success = response.success;
        Some(response)
    }

    /// User-facing description of why the last run failed.
    pub fn display_error(&self, action: &str) -> String {
        describe_http_error(self.result.as_ref(), self.status_code, action)
    }
}

/// Render a transport failure the way the launcher status line shows it.
pub fn describe_http_error(result: Option<&TransportError>, status: u16, action: &str) -> String {
    match result {
        Some(err) => format!("&cError {} when {}", err, action),
        None if status != 200 => format!("&c{} error when {}", status, action),
        None => format!("&cEmpty response when {}", action),
    }
}

/// A concrete task: a `WebTask` plus what to do with a successful body.
pub trait WebTaskHandler {
    fn task(&self) -> &WebTask;

    fn task_mut(&mut self) -> &mut WebTask;

    /// Consume the body of a successful response.
    fn handle(&mut self, data: &[u8]);

    /// Advance the task. Returns `true` on the tick the run completes.
    fn tick(&mut self, transport: &dyn Transport) -> bool {
        let Some(response) = self.task_mut().poll(transport) else {
            return false;
        };
        if response.success {
            self.handle(&response.data);
        }
        true
    }

    fn is_working(&self) -> bool {
        self.task().working
    }

    fn is_completed(&self) -> bool {
        self.task().completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::mock::MockTransport;

    #[derive(Default)]
    struct EchoTask {
        base: WebTask,
        received: Vec<Vec<u8>>,
    }

    impl WebTaskHandler for EchoTask {
        fn task(&self) -> &WebTask {
            &self.base
        }

        fn task_mut(&mut self) -> &mut WebTask {
            &mut self.base
        }

        fn handle(&mut self, data: &[u8]) {
            self.received.push(data.to_vec());
        }
    }

    #[test]
    fn tick_before_result_changes_nothing() {
        let transport = MockTransport::new();
        let mut task = EchoTask::default();
        task.base.reset("echo");

        for _ in 0..3 {
            assert!(!task.tick(&transport));
            assert!(!task.base.completed);
            assert!(task.base.working);
        }
        assert!(task.received.is_empty());
    }

    #[test]
    fn success_runs_handler_once() {
        let transport = MockTransport::new();
        let mut task = EchoTask::default();
        task.base.reset("echo");
        transport.complete_ok("echo", b"payload".to_vec());

        assert!(task.tick(&transport));
        assert!(task.base.completed);
        assert!(!task.base.working);
        assert!(task.base.success);
        assert_eq!(task.base.status_code, 200);
        assert_eq!(task.received, vec![b"payload".to_vec()]);

        // later results for the same id are not collected
        transport.complete_ok("echo", b"again".to_vec());
        assert!(!task.tick(&transport));
        assert_eq!(task.received.len(), 1);
    }

    #[test]
    fn failure_skips_handler_and_keeps_status() {
        let transport = MockTransport::new();
        let mut task = EchoTask::default();
        task.base.reset("echo");
        transport.complete("echo", HttpResponse::status(404));

        assert!(task.tick(&transport));
        assert!(task.base.completed);
        assert!(!task.base.success);
        assert!(task.received.is_empty());
        assert_eq!(task.base.display_error("fetching"), "&c404 error when fetching");
    }

    #[test]
    fn idle_task_never_polls() {
        let transport = MockTransport::new();
        transport.complete_ok("", b"stray".to_vec());
        let mut task = EchoTask::default();
        assert!(!task.tick(&transport));
        assert!(!task.base.completed);
    }

    #[test]
    fn error_descriptions() {
        let err = TransportError::Timeout;
        assert_eq!(
            describe_http_error(Some(&err), 0, "signing in"),
            "&cError request timed out when signing in"
        );
        assert_eq!(
            describe_http_error(None, 200, "checking updates"),
            "&cEmpty response when checking updates"
        );
    }
}
