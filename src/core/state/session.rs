// ─── Launcher Session ───
// Owns the transport and every web task; the UI drives it with `tick()`.

use tracing::{info, warn};

use super::config::LauncherConfig;
use crate::core::resources::{ResourceFetcher, ResourceStatus};
use crate::core::transport::Transport;
use crate::core::web::{
    BuildFlavor, CheckUpdateTask, FetchFlagsTask, FetchServerTask, FetchServersTask,
    FetchUpdateTask, FsUpdater, GetTokenTask, SignInTask, WebTaskHandler,
};

struct Credentials {
    user: String,
    pass: String,
}

/// Everything one launcher instance needs to talk to the web.
pub struct LauncherSession<T: Transport> {
    pub config: LauncherConfig,
    transport: T,
    pub get_token: GetTokenTask,
    pub sign_in: SignInTask,
    pub fetch_server: FetchServerTask,
    pub fetch_servers: FetchServersTask,
    pub check_update: CheckUpdateTask,
    pub fetch_update: FetchUpdateTask,
    pub flags: FetchFlagsTask,
    pub resources: ResourceFetcher,
    /// Sent once the token request completes.
    pending_login: Option<Credentials>,
}

impl<T: Transport> LauncherSession<T> {
    pub fn new(config: LauncherConfig, transport: T) -> Self {
        let json = config.json;
        let endpoints = &config.endpoints;
        let flags = FetchFlagsTask::new(endpoints.flags_url.clone(), config.display_scale);
        let resources = ResourceFetcher::new(
            config.resources_dir(),
            endpoints.texture_archive_url.clone(),
            endpoints.audio_url.clone(),
        );
        let fetch_update = FetchUpdateTask::new(config.update_path(), Box::new(FsUpdater));

        Self {
            get_token: GetTokenTask::new(json),
            sign_in: SignInTask::new(json),
            fetch_server: FetchServerTask::new(json),
            fetch_servers: FetchServersTask::new(json),
            check_update: CheckUpdateTask::new(json),
            fetch_update,
            flags,
            resources,
            pending_login: None,
            transport,
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ── Actions ─────────────────────────────────────────

    /// Fetch a login token, then post the credentials with it.
    pub fn sign_in(&mut self, user: &str, pass: &str) {
        if self.get_token.is_working() || self.sign_in.is_working() {
            return;
        }
        self.pending_login = Some(Credentials {
            user: user.to_string(),
            pass: pass.to_string(),
        });
        self.get_token
            .run(&self.transport, &self.config.endpoints.login_url);
    }

    pub fn fetch_server(&mut self, hash: &str) {
        self.fetch_server
            .run(&self.transport, &self.config.endpoints.server_fetch_url, hash);
    }

    pub fn fetch_servers(&mut self) {
        self.fetch_servers
            .run(&self.transport, &self.config.endpoints.servers_url);
    }

    pub fn check_update(&mut self) {
        self.check_update
            .run(&self.transport, &self.config.endpoints.builds_url);
    }

    /// Download the release or development build. Needs a finished update check.
    pub fn fetch_update(&mut self, release: bool, flavor: BuildFlavor) {
        self.fetch_update.run(
            &self.transport,
            &self.config.endpoints.update_base,
            release,
            flavor,
            &self.check_update,
        );
    }

    pub fn check_resources(&mut self) -> &ResourceStatus {
        self.resources.check_existence()
    }

    pub fn fetch_resources(&mut self) {
        self.resources.run(&self.transport);
    }

    /// Queue a flag download for the country of every listed server.
    pub fn queue_flags_for_servers(&mut self) {
        for server in &self.fetch_servers.servers {
            self.flags.add(&self.transport, server.country);
        }
    }

    // ── Polling ─────────────────────────────────────────

    /// Advance every task by one step.
    pub fn tick(&mut self) {
        let transport = &self.transport;

        if self.get_token.tick(transport) {
            if let Some(login) = self.pending_login.take() {
                if self.get_token.task().success {
                    self.sign_in.run(
                        transport,
                        &self.config.endpoints.login_url,
                        &login.user,
                        &login.pass,
                        &self.get_token.token,
                    );
                } else {
                    warn!("{}", self.get_token.task().display_error("signing in"));
                }
            }
        }

        if self.sign_in.tick(transport) {
            let task = self.sign_in.task();
            match self.sign_in.error {
                Some(error) => warn!("Sign-in rejected: {}", error),
                None if task.success => info!("Signed in as '{}'", self.sign_in.username),
                None => warn!("{}", task.display_error("signing in")),
            }
        }

        if self.fetch_server.tick(transport) && !self.fetch_server.task().success {
            warn!("{}", self.fetch_server.task().display_error("fetching server info"));
        }

        if self.fetch_servers.tick(transport) {
            let task = self.fetch_servers.task();
            if task.success {
                info!("Fetched {} servers", self.fetch_servers.num_servers());
            } else {
                warn!("{}", task.display_error("fetching servers list"));
            }
        }

        if self.check_update.tick(transport) && !self.check_update.task().success {
            warn!("{}", self.check_update.task().display_error("checking for updates"));
        }

        if self.fetch_update.tick(transport) && !self.fetch_update.task().success {
            warn!("{}", self.fetch_update.task().display_error("fetching update"));
        }

        self.flags.tick(transport);
        self.resources.update(transport);
    }

    /// Whether any request is still outstanding.
    pub fn is_busy(&self) -> bool {
        self.get_token.is_working()
            || self.sign_in.is_working()
            || self.fetch_server.is_working()
            || self.fetch_servers.is_working()
            || self.check_update.is_working()
            || self.fetch_update.is_working()
            || self.flags.is_working()
            || self.flags.pending() > 0
            || self.resources.working
    }
}
