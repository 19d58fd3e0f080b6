//! A deputy as seen by the sheriff: a collection of commands plus
//! per-host telemetry.

pub mod command;

use std::collections::HashMap;

use command::{DeputyCommand, Status};

/// One reported command in an inbound info frame (`PMD_INFO` payload
/// `cmds[]`).
#[derive(Debug, Clone)]
pub struct CmdInfo {
    pub sheriff_id: u32,
    pub name: String,
    pub nickname: String,
    pub group: String,
    pub pid: u32,
    pub actual_runid: u32,
    pub exit_code: i32,
    pub cpu_usage: f32,
    pub mem_vsize_bytes: u64,
    pub mem_rss_bytes: u64,
    pub auto_respawn: bool,
}

/// An inbound info frame (`PMD_INFO`).
#[derive(Debug, Clone, Default)]
pub struct InfoFrame {
    pub utime: u64,
    pub host: String,
    pub cpu_load: f32,
    pub phys_mem_total_bytes: u64,
    pub phys_mem_free_bytes: u64,
    pub cmds: Vec<CmdInfo>,
    pub variables: HashMap<String, String>,
}

/// One reported command in an inbound orders frame (observer mode).
#[derive(Debug, Clone)]
pub struct CmdOrder {
    pub sheriff_id: u32,
    pub name: String,
    pub nickname: String,
    pub group: String,
    pub desired_runid: u32,
    pub force_quit: bool,
    pub auto_respawn: bool,
}

/// An inbound/outbound orders frame (`PMD_ORDERS`).
#[derive(Debug, Clone, Default)]
pub struct OrdersFrame {
    pub utime: u64,
    pub host: String,
    pub sheriff_name: String,
    pub ncmds: usize,
    pub cmds: Vec<CmdOrder>,
    pub varnames: Vec<String>,
    pub varvals: Vec<String>,
}

/// `(command, old_status, new_status)`. `old_status == None` means the
/// command was just created; `new_status == None` means it was just
/// removed (both encoded via `Option<Status>` on the *new* slot only,
/// since a command is never both created and removed in one update).
pub type StatusChange = (DeputyCommand, Option<Status>, Option<Status>);

#[derive(Debug, Clone)]
pub struct Deputy {
    pub name: String,
    commands: HashMap<u32, DeputyCommand>,
    pub last_update_utime: u64,
    pub cpu_load: f32,
    pub phys_mem_total_bytes: u64,
    pub phys_mem_free_bytes: u64,
    pub variables: HashMap<String, String>,
}

impl Deputy {
    pub fn new(name: String) -> Self {
        Self {
            name,
            commands: HashMap::new(),
            last_update_utime: 0,
            cpu_load: 0.0,
            phys_mem_total_bytes: 0,
            phys_mem_free_bytes: 0,
            variables: HashMap::new(),
        }
    }

    pub fn commands(&self) -> impl Iterator<Item = &DeputyCommand> {
        self.commands.values()
    }

    pub fn command(&self, sheriff_id: u32) -> Option<&DeputyCommand> {
        self.commands.get(&sheriff_id)
    }

    pub fn command_mut(&mut self, sheriff_id: u32) -> Option<&mut DeputyCommand> {
        self.commands.get_mut(&sheriff_id)
    }

    pub fn owns_command(&self, sheriff_id: u32) -> bool {
        self.commands.contains_key(&sheriff_id)
    }

    pub fn add_command(&mut self, cmd: DeputyCommand) {
        assert_ne!(cmd.sheriff_id, 0);
        self.commands.insert(cmd.sheriff_id, cmd);
    }

    /// Re-keys a command to a new `sheriff_id` (first-contact adoption).
    pub(crate) fn rekey_command(&mut self, old_id: u32, new_id: u32) {
        if let Some(mut cmd) = self.commands.remove(&old_id) {
            cmd.sheriff_id = new_id;
            self.commands.insert(new_id, cmd);
        }
    }

    /// Merge an inbound info frame. Returns the list of status changes
    /// in frame order.
    pub(crate) fn merge_info(&mut self, frame: &InfoFrame, now: u64) -> Vec<StatusChange> {
        let mut changes = Vec::new();

        for cmd_info in &frame.cmds {
            let old_status = self.commands.get(&cmd_info.sheriff_id).map(|c| c.status());

            let cmd = self.commands.entry(cmd_info.sheriff_id).or_insert_with(|| {
                let mut new_cmd = DeputyCommand::new(
                    cmd_info.sheriff_id,
                    cmd_info.name.clone(),
                    cmd_info.nickname.clone(),
                    cmd_info.group.clone(),
                    cmd_info.auto_respawn,
                );
                new_cmd.desired_runid = cmd_info.actual_runid;
                new_cmd
            });

            cmd.apply_info(
                cmd_info.pid,
                cmd_info.actual_runid,
                cmd_info.exit_code,
                cmd_info.cpu_usage,
                cmd_info.mem_vsize_bytes,
                cmd_info.mem_rss_bytes,
            );
            let new_status = cmd.status();

            if old_status != Some(new_status) {
                changes.push((cmd.clone(), old_status, Some(new_status)));
            }
        }

        let reported_ids: std::collections::HashSet<u32> =
            frame.cmds.iter().map(|c| c.sheriff_id).collect();
        let to_remove: Vec<u32> = self
            .commands
            .values()
            .filter(|c| c.scheduled_for_removal && !reported_ids.contains(&c.sheriff_id))
            .map(|c| c.sheriff_id)
            .collect();
        for id in to_remove {
            if let Some(cmd) = self.commands.remove(&id) {
                let old_status = cmd.status();
                changes.push((cmd, Some(old_status), None));
            }
        }

        // Overwrite semantics: the deputy's reported variables replace
        // ours wholesale, since the deputy is authoritative for its own
        // actual state.
        self.variables = frame.variables.clone();

        self.last_update_utime = now;
        self.cpu_load = frame.cpu_load;
        self.phys_mem_total_bytes = frame.phys_mem_total_bytes;
        self.phys_mem_free_bytes = frame.phys_mem_free_bytes;

        changes
    }

    /// Merge an inbound orders frame (observer mode only).
    pub(crate) fn merge_orders(&mut self, frame: &OrdersFrame) -> Vec<StatusChange> {
        let mut changes = Vec::new();

        for cmd_order in &frame.cmds {
            let old_status = self.commands.get(&cmd_order.sheriff_id).map(|c| c.status());

            let cmd = self.commands.entry(cmd_order.sheriff_id).or_insert_with(|| {
                DeputyCommand::new(
                    cmd_order.sheriff_id,
                    cmd_order.name.clone(),
                    cmd_order.nickname.clone(),
                    cmd_order.group.clone(),
                    cmd_order.auto_respawn,
                )
            });

            cmd.apply_order(
                cmd_order.name.clone(),
                cmd_order.nickname.clone(),
                cmd_order.group.clone(),
                cmd_order.desired_runid,
                cmd_order.force_quit,
            );
            let new_status = cmd.status();

            if old_status != Some(new_status) {
                changes.push((cmd.clone(), old_status, Some(new_status)));
            }
        }

        let reported_ids: std::collections::HashSet<u32> =
            frame.cmds.iter().map(|c| c.sheriff_id).collect();
        let to_schedule: Vec<u32> = self
            .commands
            .values()
            .filter(|c| !reported_ids.contains(&c.sheriff_id))
            .map(|c| c.sheriff_id)
            .collect();
        for id in to_schedule {
            let cmd = self.commands.get_mut(&id).unwrap();
            let old_status = cmd.status();
            cmd.scheduled_for_removal = true;
            let new_status = cmd.status();
            if old_status != new_status {
                changes.push((cmd.clone(), Some(old_status), Some(new_status)));
            }
        }

        changes
    }

    /// Schedules a local command for removal. If the deputy has never
    /// reported in, the command is deleted immediately since there is
    /// no confirmation to wait for.
    pub(crate) fn schedule_for_removal(&mut self, sheriff_id: u32) -> Option<StatusChange> {
        let cmd = self.commands.get_mut(&sheriff_id)?;
        let old_status = cmd.status();
        cmd.scheduled_for_removal = true;

        if self.last_update_utime == 0 {
            let cmd = self.commands.remove(&sheriff_id).unwrap();
            Some((cmd, Some(old_status), None))
        } else {
            let new_status = cmd.status();
            if old_status == new_status {
                None
            } else {
                Some((cmd.clone(), Some(old_status), Some(new_status)))
            }
        }
    }

    /// Builds the outbound orders frame for this deputy.
    pub fn build_orders(&self, sheriff_name: &str, now: u64) -> OrdersFrame {
        let cmds: Vec<CmdOrder> = self
            .commands
            .values()
            .filter(|c| !c.scheduled_for_removal)
            .map(|c| CmdOrder {
                sheriff_id: c.sheriff_id,
                name: c.name.clone(),
                nickname: c.nickname.clone(),
                group: c.group().to_string(),
                desired_runid: c.desired_runid,
                force_quit: c.force_quit,
                auto_respawn: c.auto_respawn,
            })
            .collect();

        OrdersFrame {
            utime: now,
            host: self.name.clone(),
            sheriff_name: sheriff_name.to_string(),
            ncmds: cmds.len(),
            varnames: self.variables.keys().cloned().collect(),
            varvals: self.variables.values().cloned().collect(),
            cmds,
        }
    }

    pub fn is_useless(&self) -> bool {
        self.commands.is_empty() || self.commands.values().all(|c| c.scheduled_for_removal)
    }
}
