//! A single command managed by a deputy, as seen by the sheriff.

use std::fmt;

/// `desired_runid`/`actual_runid` are 31-bit counters that wrap to 1
/// rather than 0 so that a wire encoding treating them as 31-bit
/// quantities never observes a zero run id.
const RUNID_MAX: u32 = 1 << 31;

/// POSIX-`wait`-style termination signals that still count as a clean
/// stop when the sheriff itself asked for the quit.
const CLEAN_TERMINATION_SIGNALS: [i32; 3] = [
    libc_signal::SIGTERM,
    libc_signal::SIGINT,
    libc_signal::SIGKILL,
];

/// Minimal stand-in for the signal numbers this crate needs, so the
/// status state machine does not have to pull in a full libc binding
/// for three constants.
mod libc_signal {
    pub const SIGINT: i32 = 2;
    pub const SIGTERM: i32 = 15;
    pub const SIGKILL: i32 = 9;
}

/// Decodes a POSIX `wait()`-encoded exit status and reports whether the
/// process was terminated by one of `CLEAN_TERMINATION_SIGNALS`.
fn killed_by_clean_signal(exit_code: i32) -> bool {
    let signaled = exit_code & 0x7f != 0 && (exit_code & 0x7f) != 0x7f;
    if !signaled {
        return false;
    }
    let signal = exit_code & 0x7f;
    CLEAN_TERMINATION_SIGNALS.contains(&signal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Unknown,
    TryingToStart,
    Running,
    TryingToStop,
    Restarting,
    Removing,
    StoppedOk,
    StoppedError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeputyCommand {
    pub sheriff_id: u32,
    pub name: String,
    pub nickname: String,
    group: String,
    pub desired_runid: u32,
    pub actual_runid: u32,
    pub force_quit: bool,
    pub auto_respawn: bool,
    pub pid: u32,
    pub exit_code: i32,
    pub cpu_usage: f32,
    pub mem_vsize_bytes: u64,
    pub mem_rss_bytes: u64,
    pub scheduled_for_removal: bool,
    pub updated_from_info: bool,
}

impl DeputyCommand {
    pub fn new(sheriff_id: u32, name: String, nickname: String, group: String, auto_respawn: bool) -> Self {
        assert_ne!(sheriff_id, 0, "sheriff_id must be non-zero");
        Self {
            sheriff_id,
            name,
            nickname,
            group: normalize_group(&group),
            desired_runid: 0,
            actual_runid: 0,
            force_quit: false,
            auto_respawn,
            pid: 0,
            exit_code: 0,
            cpu_usage: 0.0,
            mem_vsize_bytes: 0,
            mem_rss_bytes: 0,
            scheduled_for_removal: false,
            updated_from_info: false,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn set_group(&mut self, group: &str) -> bool {
        let normalized = normalize_group(group);
        if normalized == self.group {
            return false;
        }
        self.group = normalized;
        true
    }

    /// Derived status, computed purely from the command's fields.
    pub fn status(&self) -> Status {
        if !self.updated_from_info {
            return Status::Unknown;
        }
        if self.desired_runid != self.actual_runid {
            return if self.force_quit {
                Status::Unknown
            } else if self.pid == 0 {
                Status::TryingToStart
            } else {
                Status::Restarting
            };
        }
        // desired_runid == actual_runid
        if self.pid > 0 {
            return if self.force_quit || self.scheduled_for_removal {
                Status::TryingToStop
            } else {
                Status::Running
            };
        }
        if self.scheduled_for_removal {
            return Status::Removing;
        }
        if self.exit_code == 0 {
            return Status::StoppedOk;
        }
        if self.force_quit && killed_by_clean_signal(self.exit_code) {
            return Status::StoppedOk;
        }
        Status::StoppedError
    }

    /// Mutator: request the command start running. No-op if it's
    /// already running and not force-quit.
    pub fn start(&mut self) {
        if self.pid > 0 && !self.force_quit {
            return;
        }
        self.bump_desired_runid();
        self.force_quit = false;
    }

    /// Mutator: unconditionally request a fresh run.
    pub fn restart(&mut self) {
        self.bump_desired_runid();
        self.force_quit = false;
    }

    /// Mutator: request the command stop.
    pub fn stop(&mut self) {
        self.force_quit = true;
    }

    fn bump_desired_runid(&mut self) {
        self.desired_runid += 1;
        if self.desired_runid > RUNID_MAX {
            self.desired_runid = 1;
        }
    }

    /// Applies actual-state fields reported by an info frame. Pins
    /// non-respawn commands that have already completed so a deputy
    /// restart doesn't silently re-run them.
    pub(crate) fn apply_info(
        &mut self,
        pid: u32,
        actual_runid: u32,
        exit_code: i32,
        cpu_usage: f32,
        mem_vsize_bytes: u64,
        mem_rss_bytes: u64,
    ) {
        self.pid = pid;
        self.actual_runid = actual_runid;
        self.exit_code = exit_code;
        self.cpu_usage = cpu_usage;
        self.mem_vsize_bytes = mem_vsize_bytes;
        self.mem_rss_bytes = mem_rss_bytes;
        self.updated_from_info = true;

        if self.pid == 0
            && self.actual_runid == self.desired_runid
            && !self.auto_respawn
            && !self.force_quit
        {
            self.force_quit = true;
        }
    }

    /// Applies desired-state fields reported by another sheriff's
    /// orders frame (observer mode only).
    pub(crate) fn apply_order(
        &mut self,
        name: String,
        nickname: String,
        group: String,
        desired_runid: u32,
        force_quit: bool,
    ) {
        self.name = name;
        self.nickname = nickname;
        self.group = normalize_group(&group);
        self.desired_runid = desired_runid;
        self.force_quit = force_quit;
    }
}

impl fmt::Display for DeputyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]\n   group:        {}\n   sheriff_id:   {}\n   pid:          {}\n   exit_code:    {}\n   cpu_usage:    {}\n   mem_vsize:    {}\n   mem_rss:      {}\n   actual_runid: {}",
            self.name,
            self.group,
            self.sheriff_id,
            self.pid,
            self.exit_code,
            self.cpu_usage,
            self.mem_vsize_bytes,
            self.mem_rss_bytes,
            self.actual_runid
        )
    }
}

/// Strips leading/trailing `/` and collapses runs of `/` into one.
pub fn normalize_group(group: &str) -> String {
    let trimmed = group.trim_matches('/');
    let mut normalized = String::with_capacity(trimmed.len());
    let mut last_was_slash = false;
    for c in trimmed.chars() {
        if c == '/' {
            if last_was_slash {
                continue;
            }
            last_was_slash = true;
        } else {
            last_was_slash = false;
        }
        normalized.push(c);
    }
    normalized
}

/// `true` if `candidate_group` is `query` or one of its sub-groups.
pub fn group_matches_prefix(candidate_group: &str, query: &str) -> bool {
    let query = normalize_group(query);
    if query.is_empty() {
        return true;
    }
    let cmd_parts: Vec<&str> = candidate_group.split('/').collect();
    let query_parts: Vec<&str> = query.split('/').collect();
    query_parts.len() <= cmd_parts.len()
        && query_parts
            .iter()
            .zip(cmd_parts.iter())
            .all(|(q, c)| q == c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(desired: u32, actual: u32, pid: u32, force_quit: bool, scheduled: bool, exit_code: i32) -> DeputyCommand {
        let mut cmd = DeputyCommand::new(1, "echo".into(), "greet".into(), "".into(), false);
        cmd.updated_from_info = true;
        cmd.desired_runid = desired;
        cmd.actual_runid = actual;
        cmd.pid = pid;
        cmd.force_quit = force_quit;
        cmd.scheduled_for_removal = scheduled;
        cmd.exit_code = exit_code;
        cmd
    }

    #[test]
    fn unknown_before_any_info() {
        let cmd = DeputyCommand::new(1, "echo".into(), "greet".into(), "".into(), false);
        assert_eq!(cmd.status(), Status::Unknown);
    }

    #[test]
    fn trying_to_start_when_desired_ahead_and_not_running() {
        assert_eq!(fresh(1, 0, 0, false, false, 0).status(), Status::TryingToStart);
    }

    #[test]
    fn restarting_when_desired_ahead_and_still_running() {
        assert_eq!(fresh(2, 1, 123, false, false, 0).status(), Status::Restarting);
    }

    #[test]
    fn running_when_caught_up_and_alive() {
        assert_eq!(fresh(1, 1, 123, false, false, 0).status(), Status::Running);
    }

    #[test]
    fn trying_to_stop_when_caught_up_alive_and_force_quit() {
        assert_eq!(fresh(1, 1, 123, true, false, 0).status(), Status::TryingToStop);
    }

    #[test]
    fn trying_to_stop_when_caught_up_alive_and_scheduled_for_removal() {
        assert_eq!(fresh(1, 1, 123, false, true, 0).status(), Status::TryingToStop);
    }

    #[test]
    fn removing_when_caught_up_dead_and_scheduled() {
        assert_eq!(fresh(1, 1, 0, false, true, 0).status(), Status::Removing);
    }

    #[test]
    fn stopped_ok_on_clean_exit() {
        assert_eq!(fresh(1, 1, 0, false, false, 0).status(), Status::StoppedOk);
    }

    #[test]
    fn stopped_ok_on_sigterm_when_force_quit() {
        // WIFSIGNALED encoding: low 7 bits = signal number, not 0x7f.
        let sigterm_exit_code = libc_signal::SIGTERM;
        assert_eq!(
            fresh(1, 1, 0, true, false, sigterm_exit_code).status(),
            Status::StoppedOk
        );
    }

    #[test]
    fn stopped_error_otherwise() {
        assert_eq!(fresh(1, 1, 0, false, false, 1).status(), Status::StoppedError);
    }

    #[test]
    fn unknown_when_desired_ahead_and_force_quit() {
        assert_eq!(fresh(2, 1, 0, true, false, 0).status(), Status::Unknown);
    }

    #[test]
    fn start_is_noop_while_running_and_not_force_quit() {
        let mut cmd = fresh(1, 1, 123, false, false, 0);
        let before = cmd.clone();
        cmd.start();
        assert_eq!(cmd, before);
    }

    #[test]
    fn start_bumps_desired_runid_and_clears_force_quit() {
        let mut cmd = fresh(1, 1, 0, true, false, 0);
        cmd.start();
        assert_eq!(cmd.desired_runid, 2);
        assert!(!cmd.force_quit);
    }

    #[test]
    fn restart_always_bumps_even_if_running() {
        let mut cmd = fresh(1, 1, 123, false, false, 0);
        cmd.restart();
        assert_eq!(cmd.desired_runid, 2);
    }

    #[test]
    fn desired_runid_wraps_past_2_pow_31() {
        let mut cmd = fresh(RUNID_MAX, RUNID_MAX, 0, true, false, 0);
        cmd.start();
        assert_eq!(cmd.desired_runid, 1);
    }

    #[test]
    fn apply_info_pins_completed_non_respawn_command() {
        let mut cmd = DeputyCommand::new(1, "echo".into(), "greet".into(), "".into(), false);
        cmd.desired_runid = 1;
        cmd.apply_info(0, 1, 0, 0.0, 0, 0);
        assert!(cmd.force_quit);
    }

    #[test]
    fn apply_info_does_not_pin_auto_respawn_command() {
        let mut cmd = DeputyCommand::new(1, "echo".into(), "greet".into(), "".into(), true);
        cmd.desired_runid = 1;
        cmd.apply_info(0, 1, 0, 0.0, 0, 0);
        assert!(!cmd.force_quit);
    }

    #[test]
    fn group_normalization_strips_and_collapses_slashes() {
        assert_eq!(normalize_group("/a//b/c/"), "a/b/c");
        assert_eq!(normalize_group(""), "");
    }

    #[test]
    fn group_prefix_matching() {
        assert!(group_matches_prefix("a/b/c", "a"));
        assert!(group_matches_prefix("a/b/c", "a/b"));
        assert!(group_matches_prefix("a/b/c", "a/b/c"));
        assert!(!group_matches_prefix("a/b/c", "a/x"));
        assert!(!group_matches_prefix("a/b", "a/b/c"));
    }
}
