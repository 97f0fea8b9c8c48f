pub mod apt;
pub mod github;
pub mod install;
pub mod release;

use crate::apt::AptSession;
use crate::config::Config;
use crate::process::SystemShell;

/// State shared by every command of one invocation.
pub struct Context {
    pub config: Config,
    pub force: bool,
    pub shell: SystemShell,
    pub apt: AptSession,
}

impl Context {
    pub fn new(config: Config, force: bool) -> Self {
        let apt = AptSession::new(config.package_list.clone());
        Self {
            config,
            force,
            shell: SystemShell,
            apt,
        }
    }
}
