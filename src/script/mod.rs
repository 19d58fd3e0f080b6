//! The script engine: a hierarchical action interpreter driving
//! commands through state transitions.

use serde::{Deserialize, Serialize};

use crate::deputy::command::{DeputyCommand, Status};
use crate::event::Event;
use crate::sheriff::Sheriff;

/// Rate limit on script actions: no more than ~10/second.
const SCRIPT_ACTION_RATE_LIMIT_MICROS: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentType {
    Cmd,
    Group,
    Everything,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStatus {
    Running,
    Stopped,
}

/// Parsed from a script's action list in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Start {
        ident_type: IdentType,
        ident: String,
        #[serde(default)]
        wait_status: Option<WaitStatus>,
    },
    Stop {
        ident_type: IdentType,
        ident: String,
        #[serde(default)]
        wait_status: Option<WaitStatus>,
    },
    Restart {
        ident_type: IdentType,
        ident: String,
        #[serde(default)]
        wait_status: Option<WaitStatus>,
    },
    #[serde(rename = "wait_status")]
    WaitForStatus {
        ident_type: IdentType,
        ident: String,
        wait_status: WaitStatus,
    },
    WaitMs {
        delay_ms: u64,
    },
    RunScript {
        script_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub name: String,
    pub actions: Vec<Action>,
}

/// A resumable cursor over a script's actions, recursing into
/// sub-scripts.
#[derive(Debug, Clone)]
pub struct ScriptExecutionContext {
    script: Script,
    current_action: i64,
    subscript: Option<Box<ScriptExecutionContext>>,
}

impl ScriptExecutionContext {
    fn new(script: Script) -> Self {
        Self {
            script,
            current_action: -1,
            subscript: None,
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Advances the cursor, descending into a `run_script` target and
    /// resuming at the parent's next action once the child is
    /// exhausted. Returns `None` at end-of-script.
    fn get_next_action(&mut self, find_script: &impl Fn(&str) -> Option<Script>) -> Option<Action> {
        if let Some(sub) = self.subscript.as_mut() {
            if let Some(action) = sub.get_next_action(find_script) {
                return Some(action);
            }
            self.subscript = None;
        }

        self.current_action += 1;
        if self.current_action as usize >= self.script.actions.len() {
            return None;
        }
        let action = self.script.actions[self.current_action as usize].clone();

        if let Action::RunScript { script_name } = &action {
            let subscript = find_script(script_name)?;
            self.subscript = Some(Box::new(ScriptExecutionContext::new(subscript)));
            return self.get_next_action(find_script);
        }

        Some(action)
    }
}

impl Sheriff {
    fn resolve_idents(&self, ident_type: IdentType, ident: &str) -> Vec<DeputyCommand> {
        match ident_type {
            IdentType::Cmd => self.get_commands_by_nickname(ident),
            IdentType::Group => self.get_commands_by_group(ident),
            IdentType::Everything => self.get_all_commands(),
        }
    }

    /// Walks every action in `script` (and transitively, every
    /// `run_script` target) looking for dangling identifiers, negative
    /// waits, and call cycles.
    pub fn check_script_for_errors(&self, script: &Script) -> Vec<String> {
        self.check_script_for_errors_with_path(script, &mut Vec::new())
    }

    fn check_script_for_errors_with_path(&self, script: &Script, path: &mut Vec<String>) -> Vec<String> {
        let mut errors = Vec::new();
        let mut check_subscripts = true;

        if path.contains(&script.name) {
            errors.push(format!(
                "Infinite loop: script {} eventually calls itself",
                script.name
            ));
            check_subscripts = false;
        }

        for action in &script.actions {
            match action {
                Action::Start { ident_type, ident, .. }
                | Action::Stop { ident_type, ident, .. }
                | Action::Restart { ident_type, ident, .. }
                | Action::WaitForStatus { ident_type, ident, .. } => match ident_type {
                    IdentType::Cmd => {
                        if self.get_commands_by_nickname(ident).is_empty() {
                            errors.push(format!("No such command: {}", ident));
                        }
                    }
                    IdentType::Group => {
                        if self.get_commands_by_group(ident).is_empty() {
                            errors.push(format!("No such group: {}", ident));
                        }
                    }
                    IdentType::Everything => {}
                },
                Action::WaitMs { .. } => {
                    // delay_ms is unsigned; nothing to validate.
                }
                Action::RunScript { script_name } => match self.get_script(script_name) {
                    None => errors.push(format!("Unknown script \"{}\"", script_name)),
                    Some(subscript) if check_subscripts => {
                        let subscript = subscript.clone();
                        path.push(script.name.clone());
                        let sub_errors = self.check_script_for_errors_with_path(&subscript, path);
                        path.pop();
                        let chain: Vec<&str> = path
                            .iter()
                            .map(String::as_str)
                            .chain(std::iter::once(subscript.name.as_str()))
                            .collect();
                        let parstr = chain.join("->");
                        for msg in sub_errors {
                            errors.push(format!("{} - {}", parstr, msg));
                        }
                    }
                    Some(_) => {}
                },
            }
        }
        errors
    }

    /// Starts executing `script_name`. Aborts any currently active
    /// script first. Returns the preflight error list; a non-empty
    /// list means the script was *not* started.
    pub fn execute_script(&mut self, script_name: &str) -> Vec<String> {
        if self.active_script.is_some() {
            self.abort_script();
        }

        let script = match self.get_script(script_name) {
            Some(s) => s.clone(),
            None => return vec![format!("Unknown script \"{}\"", script_name)],
        };

        let errors = self.check_script_for_errors(&script);
        if !errors.is_empty() {
            return errors;
        }

        self.active_script = Some(ScriptExecutionContext::new(script.clone()));
        self.events.emit(Event::ScriptStarted(script));
        let now = Self::now_utime();
        self.advance_script_at(now);
        Vec::new()
    }

    /// Cancels the active script without running further actions or
    /// reverting any command state.
    pub fn abort_script(&mut self) {
        self.finish_script();
    }

    fn finish_script(&mut self) {
        if let Some(ctx) = self.active_script.take() {
            self.waiting_on_commands.clear();
            self.waiting_for_status = None;
            self.events.emit(Event::ScriptFinished(ctx.script().clone()));
        }
    }

    /// Drives the script engine forward: call on a timer or whenever
    /// other state changes so that `wait_ms` deadlines and wait-status
    /// polling get a chance to fire.
    pub fn tick(&mut self) {
        self.tick_at(Self::now_utime());
    }

    pub(crate) fn tick_at(&mut self, now: u64) {
        if let Some(deadline) = self.wait_ms_deadline {
            if now >= deadline {
                self.wait_ms_deadline = None;
                self.advance_script_at(now);
                return;
            }
        }
        self.check_wait_action_status_at(now);
    }

    pub(crate) fn check_wait_action_status(&mut self) {
        self.check_wait_action_status_at(Self::now_utime());
    }

    pub(crate) fn check_wait_action_status_at(&mut self, now: u64) {
        if self.waiting_on_commands.is_empty() {
            return;
        }
        let last = match self.last_script_action_time {
            Some(t) => t,
            None => return,
        };
        if now.saturating_sub(last) < SCRIPT_ACTION_RATE_LIMIT_MICROS {
            return;
        }

        let acceptable: &[Status] = match self.waiting_for_status {
            Some(WaitStatus::Running) => &[Status::Running],
            Some(WaitStatus::Stopped) => &[Status::StoppedOk, Status::StoppedError],
            None => return,
        };

        let all_ready = self.waiting_on_commands.iter().all(|id| {
            self.get_command_by_id(*id)
                .ok()
                .map(|c| acceptable.contains(&c.status()))
                .unwrap_or(false)
        });
        if !all_ready {
            return;
        }

        self.waiting_on_commands.clear();
        self.waiting_for_status = None;
        self.advance_script_at(now);
    }

    fn advance_script_at(&mut self, now: u64) {
        loop {
            let mut ctx = match self.active_script.take() {
                Some(ctx) => ctx,
                None => return,
            };
            let scripts_snapshot: Vec<Script> = self.get_scripts().to_vec();
            let find_script = |name: &str| scripts_snapshot.iter().find(|s| s.name == name).cloned();
            let next = ctx.get_next_action(&find_script);
            let current_script = ctx.script().clone();
            self.active_script = Some(ctx);

            let action = match next {
                Some(a) => a,
                None => {
                    self.finish_script();
                    return;
                }
            };

            self.events
                .emit(Event::ScriptActionExecuting(current_script, action.clone()));

            match action {
                Action::WaitMs { delay_ms } => {
                    self.wait_ms_deadline = Some(now + delay_ms * 1000);
                    return;
                }
                Action::Start { ident_type, ident, wait_status } => {
                    let targets = self.resolve_idents(ident_type, &ident);
                    for cmd in &targets {
                        let _ = self.start_command(cmd.sheriff_id);
                    }
                    self.last_script_action_time = Some(now);
                    if self.await_targets(targets, wait_status, now) {
                        return;
                    }
                }
                Action::Stop { ident_type, ident, wait_status } => {
                    let targets = self.resolve_idents(ident_type, &ident);
                    for cmd in &targets {
                        let _ = self.stop_command(cmd.sheriff_id);
                    }
                    self.last_script_action_time = Some(now);
                    if self.await_targets(targets, wait_status, now) {
                        return;
                    }
                }
                Action::Restart { ident_type, ident, wait_status } => {
                    let targets = self.resolve_idents(ident_type, &ident);
                    for cmd in &targets {
                        let _ = self.restart_command(cmd.sheriff_id);
                    }
                    self.last_script_action_time = Some(now);
                    if self.await_targets(targets, wait_status, now) {
                        return;
                    }
                }
                Action::WaitForStatus { ident_type, ident, wait_status } => {
                    let targets = self.resolve_idents(ident_type, &ident);
                    self.last_script_action_time = Some(now);
                    if self.await_targets(targets, Some(wait_status), now) {
                        return;
                    }
                }
                Action::RunScript { .. } => {
                    unreachable!("run_script actions are resolved inside ScriptExecutionContext and never returned")
                }
            }
        }
    }

    /// Arms `waiting_on_commands`/`waiting_for_status` when the action
    /// requested a wait, then immediately polls once in case the
    /// targets already satisfy it. Returns `true` if the caller should
    /// stop stepping (a wait is pending), `false` to keep trampolining.
    fn await_targets(&mut self, targets: Vec<DeputyCommand>, wait_status: Option<WaitStatus>, now: u64) -> bool {
        let wait_status = match wait_status {
            Some(ws) => ws,
            None => return false,
        };
        self.waiting_on_commands = targets.iter().map(|c| c.sheriff_id).collect();
        self.waiting_for_status = Some(wait_status);
        self.check_wait_action_status_at(now);
        self.waiting_for_status.is_some()
    }
}
