//! The sheriff: owns every deputy, assigns command identities, and
//! reconciles desired against actual state.

pub mod error;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::bus::OrdersTransport;
use crate::deputy::command::{group_matches_prefix, normalize_group, DeputyCommand};
use crate::deputy::{Deputy, InfoFrame, OrdersFrame};
use crate::event::{Event, EventBus};
use crate::script::{Script, ScriptExecutionContext, WaitStatus};
use error::SheriffError;

/// Frames older than this (by `utime`, in microseconds) are dropped by
/// a live (non-observer) sheriff. An observer has no deputies of its
/// own reporting fresh frames to compare against, so this check is
/// gated on `!is_observer` rather than applying unconditionally (see
/// DESIGN.md).
const STALE_INFO_CUTOFF_MICROS: i64 = 30 * 1_000_000;

const MAX_ID_DRAWS: u32 = 1 << 16;

pub struct Sheriff {
    deputies: HashMap<String, Deputy>,
    is_observer: bool,
    identity: String,
    scripts: Vec<Script>,
    pub(crate) active_script: Option<ScriptExecutionContext>,
    pub(crate) waiting_on_commands: Vec<u32>,
    pub(crate) waiting_for_status: Option<WaitStatus>,
    pub(crate) last_script_action_time: Option<u64>,
    pub(crate) wait_ms_deadline: Option<u64>,
    pub events: EventBus,
    transport: Option<Box<dyn OrdersTransport>>,
}

impl Sheriff {
    pub fn new() -> Self {
        Self::with_identity(default_identity())
    }

    pub fn with_identity(identity: String) -> Self {
        Self {
            deputies: HashMap::new(),
            is_observer: false,
            identity,
            scripts: Vec::new(),
            active_script: None,
            waiting_on_commands: Vec::new(),
            waiting_for_status: None,
            last_script_action_time: None,
            wait_ms_deadline: None,
            events: EventBus::new(),
            transport: None,
        }
    }

    /// Wires up the collaborator orders frames are published through.
    /// Without one, local mutators still reconcile state and emit
    /// events, they just have nowhere to broadcast to.
    pub fn set_orders_transport(&mut self, transport: Box<dyn OrdersTransport>) {
        self.transport = Some(transport);
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_observer(&self) -> bool {
        self.is_observer
    }

    pub fn set_observer(&mut self, is_observer: bool) {
        self.is_observer = is_observer;
    }

    fn require_not_observer(&self) -> Result<(), SheriffError> {
        if self.is_observer {
            Err(SheriffError::ObserverMode)
        } else {
            Ok(())
        }
    }

    pub fn now_utime() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64
    }

    // ---- deputy lookups -------------------------------------------------

    pub fn deputies(&self) -> impl Iterator<Item = &Deputy> {
        self.deputies.values()
    }

    pub fn find_deputy(&self, name: &str) -> Result<&Deputy, SheriffError> {
        self.deputies
            .get(name)
            .ok_or_else(|| SheriffError::UnknownDeputy(name.to_string()))
    }

    fn get_or_make_deputy(&mut self, name: &str) -> &mut Deputy {
        self.deputies
            .entry(name.to_string())
            .or_insert_with(|| Deputy::new(name.to_string()))
    }

    pub fn get_command_by_id(&self, sheriff_id: u32) -> Result<&DeputyCommand, SheriffError> {
        self.deputies
            .values()
            .find_map(|d| d.command(sheriff_id))
            .ok_or(SheriffError::UnknownCommand(sheriff_id))
    }

    pub fn get_command_deputy(&self, sheriff_id: u32) -> Result<&Deputy, SheriffError> {
        self.deputies
            .values()
            .find(|d| d.owns_command(sheriff_id))
            .ok_or(SheriffError::UnknownCommand(sheriff_id))
    }

    pub fn get_all_commands(&self) -> Vec<DeputyCommand> {
        self.deputies
            .values()
            .flat_map(|d| d.commands().cloned())
            .collect()
    }

    pub fn get_commands_by_nickname(&self, nickname: &str) -> Vec<DeputyCommand> {
        self.deputies
            .values()
            .flat_map(|d| d.commands())
            .filter(|c| c.nickname == nickname)
            .cloned()
            .collect()
    }

    pub fn get_commands_by_group(&self, group_name: &str) -> Vec<DeputyCommand> {
        self.deputies
            .values()
            .flat_map(|d| d.commands())
            .filter(|c| group_matches_prefix(c.group(), group_name))
            .cloned()
            .collect()
    }

    fn is_sheriff_id_in_use(&self, sheriff_id: u32) -> bool {
        self.deputies.values().any(|d| d.owns_command(sheriff_id))
    }

    /// Draws a 31-bit, non-zero sheriff id unused by any deputy, by
    /// returning the first non-colliding draw (see DESIGN.md).
    fn get_free_sheriff_id(&self) -> Result<u32, SheriffError> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_ID_DRAWS {
            let candidate: u32 = rng.gen_range(1..(1u32 << 31));
            if !self.is_sheriff_id_in_use(candidate) {
                return Ok(candidate);
            }
        }
        Err(SheriffError::IdExhaustion)
    }

    // ---- event plumbing ---------------------------------------------------

    fn emit_status_changes(
        &mut self,
        deputy_name: &str,
        changes: Vec<(DeputyCommand, Option<crate::deputy::command::Status>, Option<crate::deputy::command::Status>)>,
    ) {
        for (cmd, old_status, new_status) in changes {
            match (old_status, new_status) {
                (None, Some(_)) => {
                    let deputy = self.deputies.get(deputy_name).cloned().unwrap();
                    self.events.emit(Event::CommandAdded(deputy, cmd));
                }
                (Some(_), None) => {
                    let deputy = self.deputies.get(deputy_name).cloned().unwrap();
                    self.events.emit(Event::CommandRemoved(deputy, cmd));
                }
                (Some(old), Some(new)) if old != new => {
                    self.check_wait_action_status();
                    self.events.emit(Event::CommandStatusChanged(cmd, Some(old), new));
                }
                _ => {}
            }
        }
    }

    // ---- inbound frames ----------------------------------------------------

    /// Handles an inbound `PMD_INFO` frame, including first-contact
    /// adoption of any matching local commands.
    pub fn receive_info(&mut self, frame: InfoFrame) {
        self.receive_info_at(frame, Self::now_utime());
    }

    pub(crate) fn receive_info_at(&mut self, frame: InfoFrame, now: u64) {
        let age_micros = now as i64 - frame.utime as i64;
        if !self.is_observer && age_micros > STALE_INFO_CUTOFF_MICROS {
            warn!(host = %frame.host, "dropping stale info frame");
            return;
        }

        self.get_or_make_deputy(&frame.host);
        self.try_adopt(&frame);

        let deputy = self.deputies.get_mut(&frame.host).unwrap();
        let changes = deputy.merge_info(&frame, now);

        let deputy_snapshot = self.deputies.get(&frame.host).cloned().unwrap();
        self.events.emit(Event::DeputyInfoReceived(deputy_snapshot));
        self.emit_status_changes(&frame.host, changes);
    }

    /// First-contact adoption: reconcile pre-existing local commands with
    /// a deputy's freshly reported identities.
    fn try_adopt(&mut self, frame: &InfoFrame) {
        let deputy = self.deputies.get(&frame.host).unwrap();
        if deputy.last_update_utime != 0 || deputy.commands().next().is_none() {
            return;
        }

        let local_ids: Vec<u32> = deputy.commands().map(|c| c.sheriff_id).collect();
        let mut rekeys = Vec::new();

        for local_id in local_ids {
            let deputy = self.deputies.get(&frame.host).unwrap();
            let local_cmd = match deputy.command(local_id) {
                Some(c) => c.clone(),
                None => continue,
            };
            if let Some(matched) = frame.cmds.iter().find(|ci| {
                ci.name == local_cmd.name
                    && ci.nickname == local_cmd.nickname
                    && normalize_group(&ci.group) == local_cmd.group()
                    && ci.auto_respawn == local_cmd.auto_respawn
            }) {
                if matched.sheriff_id == local_id {
                    continue;
                }
                if !self.is_sheriff_id_in_use(matched.sheriff_id) {
                    rekeys.push((local_id, matched.sheriff_id));
                }
            }
        }

        let deputy = self.deputies.get_mut(&frame.host).unwrap();
        for (old_id, new_id) in rekeys {
            debug!(old_id, new_id, "adopting command reported by deputy");
            deputy.rekey_command(old_id, new_id);
        }
    }

    /// Handles an inbound `PMD_ORDERS` frame. Only meaningful (and only
    /// processed) in observer mode.
    pub fn receive_orders(&mut self, frame: OrdersFrame) {
        if !self.is_observer {
            return;
        }
        self.get_or_make_deputy(&frame.host);
        let deputy = self.deputies.get_mut(&frame.host).unwrap();
        let changes = deputy.merge_orders(&frame);
        self.emit_status_changes(&frame.host, changes);
    }

    /// Publishes an orders frame to every deputy that has reported in
    /// at least once. Returns the frames built, for the host
    /// application's transport layer to send.
    pub fn send_orders(&mut self) -> Result<Vec<OrdersFrame>, SheriffError> {
        self.require_not_observer()?;
        let now = Self::now_utime();
        let identity = self.identity.clone();
        let frames = self
            .deputies
            .values()
            .filter(|d| d.last_update_utime > 0)
            .map(|d| d.build_orders(&identity, now))
            .collect();
        Ok(frames)
    }

    /// Builds an orders frame for every deputy and publishes each
    /// through the configured transport, if any. Local mutators call
    /// this so that a command change is broadcast before the next
    /// scheduled `send_orders`, per the host's periodic broadcast.
    fn broadcast_orders(&mut self) {
        let frames = match self.send_orders() {
            Ok(frames) => frames,
            Err(_) => return,
        };
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        for frame in frames {
            if let Err(e) = transport.publish_orders(&frame) {
                warn!(host = %frame.host, error = %e, "failed to publish orders frame");
            }
        }
    }

    // ---- local mutators ----------------------------------------------------

    pub fn add_command(
        &mut self,
        deputy_name: &str,
        exec: &str,
        nickname: &str,
        group: &str,
        auto_respawn: bool,
    ) -> Result<DeputyCommand, SheriffError> {
        self.require_not_observer()?;
        let sheriff_id = self.get_free_sheriff_id()?;
        let cmd = DeputyCommand::new(
            sheriff_id,
            exec.to_string(),
            nickname.to_string(),
            group.to_string(),
            auto_respawn,
        );
        let deputy = self.get_or_make_deputy(deputy_name);
        deputy.add_command(cmd.clone());
        info!(deputy_name, sheriff_id, "command added");

        let deputy_snapshot = self.deputies.get(deputy_name).cloned().unwrap();
        self.events.emit(Event::CommandAdded(deputy_snapshot, cmd.clone()));
        self.broadcast_orders();
        Ok(cmd)
    }

    fn mutate_command<F>(&mut self, sheriff_id: u32, mutate: F) -> Result<(), SheriffError>
    where
        F: FnOnce(&mut DeputyCommand),
    {
        self.require_not_observer()?;
        let deputy_name = self.get_command_deputy(sheriff_id)?.name.clone();
        let deputy = self.deputies.get_mut(&deputy_name).unwrap();
        let cmd = deputy.command_mut(sheriff_id).ok_or(SheriffError::UnknownCommand(sheriff_id))?;
        let old_status = cmd.status();
        mutate(cmd);
        let new_status = cmd.status();
        let new_cmd = cmd.clone();

        if old_status != new_status {
            self.check_wait_action_status();
            self.events
                .emit(Event::CommandStatusChanged(new_cmd, Some(old_status), new_status));
        }
        self.broadcast_orders();
        Ok(())
    }

    pub fn start_command(&mut self, sheriff_id: u32) -> Result<(), SheriffError> {
        self.mutate_command(sheriff_id, DeputyCommand::start)
    }

    pub fn stop_command(&mut self, sheriff_id: u32) -> Result<(), SheriffError> {
        self.mutate_command(sheriff_id, DeputyCommand::stop)
    }

    pub fn restart_command(&mut self, sheriff_id: u32) -> Result<(), SheriffError> {
        self.mutate_command(sheriff_id, DeputyCommand::restart)
    }

    pub fn set_auto_respawn(&mut self, sheriff_id: u32, auto_respawn: bool) -> Result<(), SheriffError> {
        self.require_not_observer()?;
        let deputy_name = self.get_command_deputy(sheriff_id)?.name.clone();
        let deputy = self.deputies.get_mut(&deputy_name).unwrap();
        let cmd = deputy.command_mut(sheriff_id).ok_or(SheriffError::UnknownCommand(sheriff_id))?;
        cmd.auto_respawn = auto_respawn;
        Ok(())
    }

    pub fn set_command_group(&mut self, sheriff_id: u32, group_name: &str) -> Result<(), SheriffError> {
        self.require_not_observer()?;
        let deputy_name = self.get_command_deputy(sheriff_id)?.name.clone();
        let deputy = self.deputies.get_mut(&deputy_name).unwrap();
        let cmd = deputy.command_mut(sheriff_id).ok_or(SheriffError::UnknownCommand(sheriff_id))?;
        if cmd.set_group(group_name) {
            let snapshot = cmd.clone();
            self.events.emit(Event::CommandGroupChanged(snapshot));
        }
        Ok(())
    }

    pub fn schedule_command_for_removal(&mut self, sheriff_id: u32) -> Result<(), SheriffError> {
        self.require_not_observer()?;
        let deputy_name = self.get_command_deputy(sheriff_id)?.name.clone();
        let deputy = self.deputies.get_mut(&deputy_name).unwrap();
        if let Some(change) = deputy.schedule_for_removal(sheriff_id) {
            self.emit_status_changes(&deputy_name, vec![change]);
        }
        self.broadcast_orders();
        Ok(())
    }

    /// Moves a command to a different deputy: schedule the old one for
    /// removal and add an equivalent new one, which receives a fresh
    /// sheriff id.
    pub fn move_command_to_deputy(
        &mut self,
        sheriff_id: u32,
        new_deputy_name: &str,
    ) -> Result<DeputyCommand, SheriffError> {
        self.require_not_observer()?;
        let old_cmd = self.get_command_by_id(sheriff_id)?.clone();
        self.schedule_command_for_removal(sheriff_id)?;
        self.add_command(
            new_deputy_name,
            &old_cmd.name,
            &old_cmd.nickname,
            old_cmd.group(),
            old_cmd.auto_respawn,
        )
    }

    /// Deletes any deputy with no commands, or whose commands are all
    /// scheduled for removal.
    pub fn purge_useless_deputies(&mut self) {
        self.deputies.retain(|_, d| !d.is_useless());
    }

    // ---- scripts ------------------------------------------------------------

    pub fn get_script(&self, name: &str) -> Option<&Script> {
        self.scripts.iter().find(|s| s.name == name)
    }

    pub fn get_scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn get_active_script(&self) -> Option<&Script> {
        self.active_script.as_ref().map(|ctx| ctx.script())
    }

    pub fn add_script(&mut self, script: Script) -> Result<(), SheriffError> {
        if self.get_script(&script.name).is_some() {
            return Err(SheriffError::DuplicateScript(script.name.clone()));
        }
        self.scripts.push(script.clone());
        self.events.emit(Event::ScriptAdded(script));
        Ok(())
    }

    pub fn remove_script(&mut self, name: &str) -> Result<(), SheriffError> {
        if self.active_script.is_some() {
            return Err(SheriffError::ScriptActive(name.to_string()));
        }
        let idx = self
            .scripts
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SheriffError::UnknownScript(name.to_string()))?;
        let script = self.scripts.remove(idx);
        self.events.emit(Event::ScriptRemoved(script));
        Ok(())
    }
}

impl Default for Sheriff {
    fn default() -> Self {
        Self::new()
    }
}

fn default_identity() -> String {
    let hostname = std::fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "sheriff".to_string());
    format!("{}:{}:{}", hostname, std::process::id(), Sheriff::now_utime())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deputy::CmdInfo;

    fn info_frame(host: &str, utime: u64, cmds: Vec<CmdInfo>) -> InfoFrame {
        InfoFrame {
            utime,
            host: host.to_string(),
            cmds,
            ..Default::default()
        }
    }

    fn cmd_info(sheriff_id: u32, name: &str, nickname: &str, group: &str, auto_respawn: bool, pid: u32, actual_runid: u32, exit_code: i32) -> CmdInfo {
        CmdInfo {
            sheriff_id,
            name: name.to_string(),
            nickname: nickname.to_string(),
            group: group.to_string(),
            pid,
            actual_runid,
            exit_code,
            cpu_usage: 0.0,
            mem_vsize_bytes: 0,
            mem_rss_bytes: 0,
            auto_respawn,
        }
    }

    #[test]
    fn cold_start_adds_command_in_unknown_state() {
        let mut sheriff = Sheriff::with_identity("test".into());
        let cmd = sheriff
            .add_command("alice", "/bin/echo hi", "greet", "demo", false)
            .unwrap();
        assert_ne!(cmd.sheriff_id, 0);
        assert_eq!(cmd.status(), crate::deputy::command::Status::Unknown);
        assert_eq!(sheriff.find_deputy("alice").unwrap().last_update_utime, 0);
    }

    #[test]
    fn first_deputy_contact_adopts_preexisting_command() {
        let mut sheriff = Sheriff::with_identity("test".into());
        let cmd = sheriff
            .add_command("alice", "/bin/echo hi", "greet", "demo", false)
            .unwrap();
        assert_ne!(cmd.sheriff_id, 42);

        let frame = info_frame(
            "alice",
            1,
            vec![cmd_info(42, "/bin/echo hi", "greet", "demo", false, 0, 0, 0)],
        );
        sheriff.receive_info_at(frame, 1);

        let commands = sheriff.get_all_commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].sheriff_id, 42);
        assert_eq!(commands[0].status(), crate::deputy::command::Status::StoppedOk);
    }

    #[test]
    fn start_and_run_then_clean_stop() {
        let mut sheriff = Sheriff::with_identity("test".into());
        let cmd = sheriff
            .add_command("alice", "/bin/echo hi", "greet", "demo", false)
            .unwrap();
        let id = cmd.sheriff_id;

        // adopt via info so updated_from_info flips on.
        sheriff.receive_info_at(
            info_frame("alice", 1, vec![cmd_info(id, "/bin/echo hi", "greet", "demo", false, 0, 0, 0)]),
            1,
        );

        sheriff.start_command(id).unwrap();
        assert_eq!(
            sheriff.get_command_by_id(id).unwrap().status(),
            crate::deputy::command::Status::TryingToStart
        );

        sheriff.receive_info_at(
            info_frame("alice", 2, vec![cmd_info(id, "/bin/echo hi", "greet", "demo", false, 12345, 1, 0)]),
            2,
        );
        assert_eq!(sheriff.get_command_by_id(id).unwrap().status(), crate::deputy::command::Status::Running);

        sheriff.stop_command(id).unwrap();
        assert_eq!(
            sheriff.get_command_by_id(id).unwrap().status(),
            crate::deputy::command::Status::TryingToStop
        );

        sheriff.receive_info_at(
            info_frame("alice", 3, vec![cmd_info(id, "/bin/echo hi", "greet", "demo", false, 0, 1, 0)]),
            3,
        );
        assert_eq!(sheriff.get_command_by_id(id).unwrap().status(), crate::deputy::command::Status::StoppedOk);
    }

    #[test]
    fn signal_terminated_stop_is_still_ok() {
        let mut sheriff = Sheriff::with_identity("test".into());
        let cmd = sheriff
            .add_command("alice", "/bin/echo hi", "greet", "demo", false)
            .unwrap();
        let id = cmd.sheriff_id;
        sheriff.receive_info_at(
            info_frame("alice", 1, vec![cmd_info(id, "/bin/echo hi", "greet", "demo", false, 123, 1, 0)]),
            1,
        );
        sheriff.stop_command(id).unwrap();

        const SIGTERM: i32 = 15;
        sheriff.receive_info_at(
            info_frame("alice", 2, vec![cmd_info(id, "/bin/echo hi", "greet", "demo", false, 0, 1, SIGTERM)]),
            2,
        );
        assert_eq!(sheriff.get_command_by_id(id).unwrap().status(), crate::deputy::command::Status::StoppedOk);
    }

    #[test]
    fn observer_mode_rejects_mutators() {
        let mut sheriff = Sheriff::with_identity("test".into());
        sheriff.set_observer(true);
        let err = sheriff.add_command("alice", "x", "x", "", false).unwrap_err();
        assert!(matches!(err, SheriffError::ObserverMode));
    }

    #[test]
    fn observer_mode_ignores_orders_when_disabled() {
        let mut sheriff = Sheriff::with_identity("test".into());
        sheriff.receive_orders(OrdersFrame {
            host: "bob".into(),
            ..Default::default()
        });
        assert!(sheriff.find_deputy("bob").is_err());
    }

    #[test]
    fn observer_mode_processes_orders_when_enabled() {
        let mut sheriff = Sheriff::with_identity("test".into());
        sheriff.set_observer(true);
        sheriff.receive_orders(OrdersFrame {
            host: "bob".into(),
            cmds: vec![crate::deputy::CmdOrder {
                sheriff_id: 7,
                name: "x".into(),
                nickname: "x".into(),
                group: "".into(),
                desired_runid: 1,
                force_quit: false,
                auto_respawn: false,
            }],
            ..Default::default()
        });
        assert!(sheriff.find_deputy("bob").unwrap().owns_command(7));
    }

    #[test]
    fn send_orders_fails_in_observer_mode() {
        let mut sheriff = Sheriff::with_identity("test".into());
        sheriff.set_observer(true);
        assert!(sheriff.send_orders().is_err());
    }

    #[test]
    fn send_orders_skips_deputies_never_heard_from() {
        let mut sheriff = Sheriff::with_identity("test".into());
        sheriff.add_command("alice", "x", "x", "", false).unwrap();
        let frames = sheriff.send_orders().unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn move_command_to_deputy_reassigns_sheriff_id() {
        let mut sheriff = Sheriff::with_identity("test".into());
        let cmd = sheriff.add_command("alice", "x", "nick", "grp", false).unwrap();
        let old_id = cmd.sheriff_id;
        let moved = sheriff.move_command_to_deputy(old_id, "bob").unwrap();
        assert_ne!(moved.sheriff_id, old_id);
        assert_eq!(moved.name, "x");
        assert!(sheriff.find_deputy("bob").unwrap().owns_command(moved.sheriff_id));
    }

    #[test]
    fn purge_useless_deputies_removes_empty_and_fully_scheduled() {
        let mut sheriff = Sheriff::with_identity("test".into());
        sheriff.add_command("alice", "x", "x", "", false).unwrap();
        sheriff.deputies.insert("empty".into(), Deputy::new("empty".into()));
        sheriff.purge_useless_deputies();
        assert!(sheriff.find_deputy("empty").is_err());
        assert!(sheriff.find_deputy("alice").is_ok());
    }

    #[test]
    fn duplicate_script_name_rejected() {
        let mut sheriff = Sheriff::with_identity("test".into());
        let script = Script { name: "s".into(), actions: vec![] };
        sheriff.add_script(script.clone()).unwrap();
        assert!(matches!(sheriff.add_script(script).unwrap_err(), SheriffError::DuplicateScript(_)));
    }

    #[test]
    fn sheriff_id_never_zero() {
        let mut sheriff = Sheriff::with_identity("test".into());
        for _ in 0..50 {
            let cmd = sheriff.add_command("alice", "x", "x", "", false).unwrap();
            assert_ne!(cmd.sheriff_id, 0);
        }
    }

    #[test]
    fn no_sheriff_id_shared_across_deputies() {
        let mut sheriff = Sheriff::with_identity("test".into());
        let mut ids = std::collections::HashSet::new();
        for dep in ["alice", "bob", "carol"] {
            for _ in 0..20 {
                let cmd = sheriff.add_command(dep, "x", "x", "", false).unwrap();
                assert!(ids.insert(cmd.sheriff_id), "sheriff_id collision");
            }
        }
    }
}
