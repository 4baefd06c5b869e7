//! AT command client.
//!
//! An [`AtClient`] sends [`Command`]s to modems and matches the lines coming
//! back. Each started device is served by a worker thread that owns the
//! device's writer, its receive buffer and its command queue; the public API
//! marshals every request onto that thread and, for [`AtClient::send`],
//! blocks until the command completes.

mod command;
mod config;
mod device;
mod rx_parser;
mod state;
mod urc;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;

pub use self::command::{Command, Line};
pub use self::config::Config;
pub use self::urc::UnsolicitedHandler;

use self::device::{spawn_worker, Event};
use self::state::Pending;
use self::urc::Subscription;
use crate::device::Opener;
use crate::handle::Arena;
use crate::helpers::bounded as bounded_str;
use crate::{DeviceRef, Error, UnsolicitedRef};

struct DeviceEntry {
    path: String,
    refs: usize,
    events: Sender<Event>,
    worker: Option<JoinHandle<()>>,
}

impl DeviceEntry {
    fn shutdown(mut self) -> Result<(), Error> {
        info!("Stopping {}", self.path.as_str());
        self.events.send(Event::Stop).ok();
        match self.worker.take() {
            // A handler stopping its own device cannot wait for itself.
            Some(worker) if worker.thread().id() != thread::current().id() => {
                worker.join().map_err(|_| Error::Fault)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
struct Devices {
    arena: Arena<DeviceEntry>,
    by_path: HashMap<String, DeviceRef>,
}

struct Inner<O> {
    opener: Arc<O>,
    config: Config,
    devices: Mutex<Devices>,
    next_worker: AtomicUsize,
    next_unsolicited: AtomicU32,
}

impl<O> Drop for Inner<O> {
    fn drop(&mut self) {
        let devices = core::mem::take(&mut *self.devices.lock());
        for entry in devices.arena.into_values() {
            entry.shutdown().ok();
        }
    }
}

/// Client side of AT command links.
///
/// Cloning an `AtClient` yields another handle to the same devices. Devices
/// still started when the last handle is dropped are stopped.
pub struct AtClient<O: Opener> {
    inner: Arc<Inner<O>>,
}

impl<O: Opener> Clone for AtClient<O> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<O: Opener> AtClient<O> {
    pub fn new(opener: O, config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                opener: Arc::new(opener),
                config,
                devices: Mutex::new(Devices::default()),
                next_worker: AtomicUsize::new(0),
                next_unsolicited: AtomicU32::new(0),
            }),
        }
    }

    /// Start serving the device at `path`.
    ///
    /// Starting a path that is already started returns the same reference
    /// and takes another reference on it; every `start` must be paired with a
    /// [`stop`](Self::stop).
    pub fn start(&self, path: &str) -> Result<DeviceRef, Error> {
        let mut devices = self.inner.devices.lock();
        if let Some(&device) = devices.by_path.get(path) {
            if let Some(entry) = devices.arena.get_mut(device.0) {
                entry.refs += 1;
                debug!("{} has {} references", path, entry.refs);
                return Ok(device);
            }
        }

        let n = self.inner.next_worker.fetch_add(1, Ordering::Relaxed);
        let (events, worker) = spawn_worker(
            self.inner.opener.clone(),
            path,
            format!("atclient-{}", n),
            self.inner.config.read_chunk,
        )?;

        let device = DeviceRef(devices.arena.insert(DeviceEntry {
            path: path.to_string(),
            refs: 1,
            events,
            worker: Some(worker),
        }));
        devices.by_path.insert(path.to_string(), device);
        Ok(device)
    }

    /// Drop a reference on a started device. The last reference stops the
    /// worker; commands still queued or in flight fail with
    /// [`Error::Cancelled`].
    pub fn stop(&self, device: DeviceRef) -> Result<(), Error> {
        let entry = {
            let mut devices = self.inner.devices.lock();
            let Some(entry) = devices.arena.get_mut(device.0) else {
                drop(devices);
                return self.inner.config.kill_policy.stale("device");
            };
            entry.refs -= 1;
            if entry.refs > 0 {
                return Ok(());
            }
            let Some(entry) = devices.arena.remove(device.0) else {
                return Err(Error::Fault);
            };
            devices.by_path.remove(&entry.path);
            entry
        };
        entry.shutdown()
    }

    fn events(&self, device: DeviceRef) -> Result<Sender<Event>, Error> {
        let events = self
            .inner
            .devices
            .lock()
            .arena
            .get(device.0)
            .map(|entry| entry.events.clone());
        match events {
            Some(events) => Ok(events),
            None => self.inner.config.kill_policy.stale("device"),
        }
    }

    /// Whether the calling thread is the worker serving `device`, i.e. an
    /// unsolicited response handler of that device.
    fn on_worker(&self, device: DeviceRef) -> bool {
        self.inner
            .devices
            .lock()
            .arena
            .get(device.0)
            .and_then(|entry| entry.worker.as_ref())
            .map_or(false, |worker| worker.thread().id() == thread::current().id())
    }

    /// Send `cmd` and block until it completes.
    ///
    /// The command must have a device and at least one final response
    /// pattern. On return, the captured lines are available from `cmd` even
    /// if the command failed.
    ///
    /// Unsolicited response handlers run on the device worker and cannot
    /// wait for it: sending to their own device from a handler fails with
    /// [`Error::Busy`]. Hand the command to another thread instead.
    pub fn send(&self, cmd: &mut Command) -> Result<(), Error> {
        let Some(device) = cmd.device else {
            error!("Command {:?} has no device", cmd.command.as_str());
            return Err(Error::Fault);
        };
        if cmd.finals.is_empty() {
            error!("Command {:?} has no final response", cmd.command.as_str());
            return Err(Error::Fault);
        }
        if self.on_worker(device) {
            error!(
                "Command {:?} sent from its device worker",
                cmd.command.as_str()
            );
            return Err(Error::Busy);
        }
        let events = self.events(device)?;

        cmd.reset_responses();
        let (done, completion) = bounded(1);
        let pending = Pending {
            command: cmd.command.clone(),
            intermediate: if cmd.intermediate.is_empty() {
                vec![Line::new()]
            } else {
                cmd.intermediate.clone()
            },
            finals: cmd.finals.clone(),
            text: cmd.text.clone(),
            timeout: cmd.timeout.unwrap_or(self.inner.config.default_timeout),
            responses: Vec::new(),
            done,
        };

        let result = if events.send(Event::Send(pending)).is_err() {
            Err(Error::Cancelled)
        } else {
            match completion.recv() {
                Ok(completion) => {
                    cmd.responses = completion.responses;
                    completion.result
                }
                Err(_) => Err(Error::Cancelled),
            }
        };
        cmd.result = Some(result);
        result
    }

    /// Build a command and send it. A `timeout` of 0 keeps the default.
    pub fn set_command_and_send(
        &self,
        device: DeviceRef,
        command: &str,
        intermediate: &str,
        finals: &str,
        timeout: u32,
    ) -> Result<Command, Error> {
        let mut cmd = Command::new();
        cmd.set_device(device);
        cmd.set_command(command)?;
        cmd.set_intermediate_response(intermediate)?;
        cmd.set_final_response(finals)?;
        if timeout > 0 {
            cmd.set_timeout(timeout);
        }
        self.send(&mut cmd)?;
        Ok(cmd)
    }

    /// Call `handler` for every unsolicited response starting with `pattern`.
    ///
    /// The handler runs on the device worker thread, see [`send`](Self::send).
    ///
    /// With a `line_count` above one, the handler gets the matching line and
    /// the `line_count - 1` lines following it, joined by `\r\n`.
    pub fn add_unsolicited_response_handler<F>(
        &self,
        pattern: &str,
        device: DeviceRef,
        handler: F,
        line_count: u32,
    ) -> Result<UnsolicitedRef, Error>
    where
        F: FnMut(&str) + Send + 'static,
    {
        let pattern = bounded_str(pattern)?;
        let events = self.events(device)?;
        let id = self.inner.next_unsolicited.fetch_add(1, Ordering::Relaxed);
        events
            .send(Event::AddUnsolicited(
                id,
                Subscription::new(pattern, line_count, Box::new(handler)),
            ))
            .map_err(|_| Error::Fault)?;
        Ok(UnsolicitedRef { device, id })
    }

    pub fn remove_unsolicited_response_handler(
        &self,
        unsolicited: UnsolicitedRef,
    ) -> Result<(), Error> {
        self.events(unsolicited.device)?
            .send(Event::RemoveUnsolicited(unsolicited.id))
            .map_err(|_| Error::Fault)
    }
}
