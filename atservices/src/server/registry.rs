use std::collections::HashMap;
use std::sync::Arc;

use heapless::String;

use crate::handle::Arena;
use crate::helpers::bounded;
use crate::{CommandRef, DeviceRef, Error, COMMAND_MAX_LEN, PARAMETER_MAX_LEN};

/// Parameter of a parsed command.
pub type Parameter = String<PARAMETER_MAX_LEN>;

/// Called on the device worker when a subscribed command is received, with
/// the parsed command type and the number of parameters.
pub type CommandHandler = Arc<dyn Fn(CommandRef, CommandType, usize) + Send + Sync>;

/// Form in which a command was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandType {
    /// `AT+CMD=?`
    Test,
    /// `AT+CMD?`
    Read,
    /// `AT+CMD=<params>`
    Para,
    /// `AT+CMD`, or a basic command such as `ATE1`
    Act,
}

pub(crate) struct Subscribed {
    pub name: String<COMMAND_MAX_LEN>,
    pub refs: usize,
    pub handler: Option<CommandHandler>,
    pub kind: CommandType,
    pub params: Vec<Parameter>,
    pub processing: bool,
    pub device: Option<DeviceRef>,
    pub basic: bool,
    pub dial: bool,
}

/// Commands subscribed on a server, by reference and by name.
#[derive(Default)]
pub(crate) struct Registry {
    commands: Arena<Subscribed>,
    names: HashMap<std::string::String, CommandRef>,
}

impl Registry {
    /// Subscribe `name`, or take another reference on it if it already is.
    pub fn create(&mut self, name: &str) -> Result<CommandRef, Error> {
        let name = name.to_ascii_uppercase();
        if let Some(&cmd) = self.names.get(&name) {
            if let Some(entry) = self.commands.get_mut(cmd.0) {
                entry.refs += 1;
                return Ok(cmd);
            }
        }

        let bounded_name = bounded(&name)?;
        let cmd = CommandRef(self.commands.insert(Subscribed {
            name: bounded_name,
            refs: 1,
            handler: None,
            kind: CommandType::Act,
            params: Vec::new(),
            processing: false,
            device: None,
            basic: false,
            dial: name.starts_with("ATD"),
        }));
        debug!("Created {:?}", name.as_str());
        self.names.insert(name, cmd);
        Ok(cmd)
    }

    /// Drop a reference on `cmd`, removing it with the last one.
    ///
    /// Returns `None` for a stale reference.
    pub fn delete(&mut self, cmd: CommandRef) -> Option<Result<(), Error>> {
        let entry = self.commands.get_mut(cmd.0)?;
        if entry.processing {
            return Some(Err(Error::Busy));
        }
        entry.refs -= 1;
        if entry.refs == 0 {
            if let Some(entry) = self.commands.remove(cmd.0) {
                debug!("Deleted {:?}", entry.name.as_str());
                self.names.remove(entry.name.as_str());
            }
        }
        Some(Ok(()))
    }

    pub fn get(&self, cmd: CommandRef) -> Option<&Subscribed> {
        self.commands.get(cmd.0)
    }

    pub fn get_mut(&mut self, cmd: CommandRef) -> Option<&mut Subscribed> {
        self.commands.get_mut(cmd.0)
    }

    /// Whether `name`, already in upper case, is subscribed.
    pub fn contains(&self, name: &[u8]) -> bool {
        core::str::from_utf8(name).map_or(false, |name| self.names.contains_key(name))
    }

    /// Mark the command called `name` as processing on `device`.
    pub fn acquire(&mut self, name: &[u8], device: DeviceRef) -> Result<CommandRef, Error> {
        let name = core::str::from_utf8(name).map_err(|_| Error::NotFound)?;
        let Some(&cmd) = self.names.get(name) else {
            debug!("Command {:?} not found", name);
            return Err(Error::NotFound);
        };
        let entry = self.commands.get_mut(cmd.0).ok_or(Error::NotFound)?;
        if entry.processing {
            debug!("Command {:?} is already processing", name);
            return Err(Error::Busy);
        }
        entry.processing = true;
        entry.device = Some(device);
        entry.basic = false;
        entry.params.clear();
        Ok(cmd)
    }

    /// Clear the parse state of `cmd`, making it available again.
    pub fn release(&mut self, cmd: CommandRef) {
        if let Some(entry) = self.commands.get_mut(cmd.0) {
            entry.params.clear();
            entry.processing = false;
            entry.device = None;
        }
    }
}
