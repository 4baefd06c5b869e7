//! AT command server.
//!
//! An [`AtServer`] reads command lines from its devices, parses them into
//! sub-commands and calls the handler registered for each one. Handlers run
//! on the device worker thread and answer, right away or later from any
//! thread, with [`AtServer::send_intermediate_response`] and
//! [`AtServer::send_final_response`].
//!
//! The sub-commands of a line are handled one at a time: the next one is
//! parsed once the previous one got a non-error final response, and a single
//! final response is written when the line is done. Unsolicited responses
//! sent while a line is in progress are written after its final response.

mod config;
mod framer;
mod parser;
mod registry;
mod response;
mod session;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use embedded_io::{Read, Write};
use heapless::String;
use parking_lot::{Mutex, MutexGuard};

pub use self::config::{Config, ErrorCodes};
pub use self::registry::{CommandHandler, CommandType, Parameter};
pub use self::response::{FinalResponse, Response, CME_ERROR, CMS_ERROR, USER_ERROR_CODE_START};

use self::registry::Registry;
use self::session::{Event, Shared, Worker};
use crate::device::spawn_reader;
use crate::handle::Arena;
use crate::helpers::bounded;
use crate::{CommandRef, DeviceRef, Error, ErrorCodeRef, COMMAND_MAX_LEN, RESPONSE_MAX_LEN};

/// Devices an unsolicited response is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scope {
    AllDevices,
    Device(DeviceRef),
}

struct DeviceEntry {
    name: std::string::String,
    events: Sender<Event>,
    worker: Option<JoinHandle<()>>,
}

impl DeviceEntry {
    fn shutdown(mut self) -> Result<(), Error> {
        info!("Closing {}", self.name.as_str());
        self.events.send(Event::Stop).ok();
        match self.worker.take() {
            // A handler closing its own device cannot wait for itself.
            Some(worker) if worker.thread().id() != thread::current().id() => {
                worker.join().map_err(|_| Error::Fault)
            }
            _ => Ok(()),
        }
    }
}

struct Inner {
    shared: Arc<Shared>,
    config: Config,
    devices: Mutex<Arena<DeviceEntry>>,
    next_worker: AtomicUsize,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let devices = core::mem::take(&mut *self.devices.lock());
        for entry in devices.into_values() {
            entry.shutdown().ok();
        }
    }
}

/// Server side of AT command links.
///
/// Cloning an `AtServer` yields another handle to the same commands and
/// devices. Devices still open when the last handle is dropped are closed;
/// a handler that holds a clone of the server keeps it alive until the
/// handler is removed.
#[derive(Clone)]
pub struct AtServer {
    inner: Arc<Inner>,
}

impl AtServer {
    pub fn new(config: Config) -> Self {
        let shared = Shared::default();
        *shared.error_codes.lock() = config.error_codes;
        Self {
            inner: Arc::new(Inner {
                shared: Arc::new(shared),
                config,
                devices: Mutex::new(Arena::new()),
                next_worker: AtomicUsize::new(0),
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.shared.registry.lock()
    }

    fn stale<T>(&self, what: &'static str) -> Result<T, Error> {
        self.inner.config.kill_policy.stale(what)
    }

    /// Subscribe the command `name`, e.g. `AT+CGMI` or `ATE`.
    ///
    /// Names are case insensitive. Creating a name that already exists
    /// returns the same reference and takes another reference on it.
    pub fn create(&self, name: &str) -> Result<CommandRef, Error> {
        self.registry().create(name)
    }

    /// Drop a reference on `cmd`; the last one unsubscribes it. Fails with
    /// [`Error::Busy`] while the command is processing.
    pub fn delete(&self, cmd: CommandRef) -> Result<(), Error> {
        let res = self.registry().delete(cmd);
        res.unwrap_or_else(|| self.stale("command"))
    }

    /// Set the handler called when `cmd` is received.
    ///
    /// The handler must answer every call with
    /// [`send_final_response`](Self::send_final_response).
    pub fn add_command_handler<F>(&self, cmd: CommandRef, handler: F) -> Result<(), Error>
    where
        F: Fn(CommandRef, CommandType, usize) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let Some(entry) = registry.get_mut(cmd) else {
            drop(registry);
            return self.stale("command");
        };
        if entry.handler.is_some() {
            return Err(Error::Busy);
        }
        entry.handler = Some(Arc::new(handler));
        Ok(())
    }

    /// Remove the handler of `cmd`. The command is then answered with
    /// `ERROR`.
    pub fn remove_command_handler(&self, cmd: CommandRef) -> Result<(), Error> {
        let mut registry = self.registry();
        let Some(entry) = registry.get_mut(cmd) else {
            drop(registry);
            return self.stale("command");
        };
        entry.handler = None;
        Ok(())
    }

    /// Parameter `index` of the command being processed.
    pub fn parameter(&self, cmd: CommandRef, index: usize) -> Result<Parameter, Error> {
        let registry = self.registry();
        let Some(entry) = registry.get(cmd) else {
            drop(registry);
            return self.stale("command");
        };
        entry.params.get(index).cloned().ok_or(Error::BadParameter)
    }

    /// Upper case name of `cmd`, as given to [`create`](Self::create).
    pub fn command_name(&self, cmd: CommandRef) -> Result<String<COMMAND_MAX_LEN>, Error> {
        let registry = self.registry();
        match registry.get(cmd) {
            Some(entry) => Ok(entry.name.clone()),
            None => {
                drop(registry);
                self.stale("command")
            }
        }
    }

    /// Device `cmd` is processing on.
    pub fn device(&self, cmd: CommandRef) -> Result<DeviceRef, Error> {
        let registry = self.registry();
        match registry.get(cmd) {
            Some(entry) => entry.device.ok_or(Error::Fault),
            None => {
                drop(registry);
                self.stale("command")
            }
        }
    }

    /// Device `cmd` is processing on, after checking that it is.
    fn processing_device(&self, cmd: CommandRef) -> Result<DeviceRef, Error> {
        let registry = self.registry();
        let Some(entry) = registry.get(cmd) else {
            drop(registry);
            return self.stale("command");
        };
        match entry.device {
            Some(device) if entry.processing => Ok(device),
            _ => {
                error!("Command {:?} is not processing", entry.name.as_str());
                Err(Error::Fault)
            }
        }
    }

    fn post(&self, device: DeviceRef, event: Event) -> Result<(), Error> {
        let events = self
            .inner
            .devices
            .lock()
            .get(device.0)
            .map(|entry| entry.events.clone())
            .ok_or(Error::Fault)?;
        events.send(event).map_err(|_| Error::Fault)
    }

    /// Send an intermediate response to the device `cmd` is processing on.
    pub fn send_intermediate_response(&self, cmd: CommandRef, text: &str) -> Result<(), Error> {
        let text = bounded(text)?;
        let device = self.processing_device(cmd)?;
        self.post(device, Event::Intermediate(cmd, text))
    }

    /// Answer `cmd`.
    ///
    /// For [`FinalResponse::Error`], `pattern` and `error_code` build the
    /// response in the [`ErrorCodes::Extended`] and [`ErrorCodes::Verbose`]
    /// modes, e.g. `Some(CME_ERROR)` and `10`. For the other results a
    /// pattern replaces the default text, e.g. `Some("CONNECT 9600")`.
    ///
    /// Any other result lets the next sub-command of the line run; the final
    /// response is written once the whole line is answered.
    pub fn send_final_response(
        &self,
        cmd: CommandRef,
        kind: FinalResponse,
        pattern: Option<&str>,
        error_code: u32,
    ) -> Result<(), Error> {
        let pattern = pattern.map(bounded::<RESPONSE_MAX_LEN>).transpose()?;
        let device = self.processing_device(cmd)?;
        self.registry().release(cmd);
        self.post(device, Event::Final(cmd, kind, pattern, error_code))
    }

    /// Send an unsolicited response. Devices in the middle of a command line
    /// write it after the final response.
    pub fn send_unsolicited_response(&self, text: &str, scope: Scope) -> Result<(), Error> {
        let text: Response = bounded(text)?;
        match scope {
            Scope::Device(device) => {
                let events = self.events(device)?;
                events
                    .send(Event::Unsolicited(text))
                    .map_err(|_| Error::Fault)
            }
            Scope::AllDevices => {
                let all: Vec<_> = self
                    .inner
                    .devices
                    .lock()
                    .iter()
                    .map(|(_, entry)| (entry.name.clone(), entry.events.clone()))
                    .collect();
                for (name, events) in all {
                    if events.send(Event::Unsolicited(text.clone())).is_err() {
                        warn!("{}: worker gone, unsolicited response dropped", name.as_str());
                    }
                }
                Ok(())
            }
        }
    }

    /// Define a user error code, for [`ErrorCodes::Verbose`] responses to
    /// `pattern` errors. Codes below [`USER_ERROR_CODE_START`] are standard
    /// ones and are refused.
    pub fn create_error_code(&self, code: u32, pattern: &str) -> Result<ErrorCodeRef, Error> {
        self.inner.shared.errors.lock().create(code, pattern)
    }

    pub fn delete_error_code(&self, error: ErrorCodeRef) -> Result<(), Error> {
        let res = self.inner.shared.errors.lock().delete(error);
        match res {
            Some(()) => Ok(()),
            None => self.stale("error code"),
        }
    }

    /// Message written for `error` in [`ErrorCodes::Verbose`] mode.
    pub fn set_verbose_error_code(&self, error: ErrorCodeRef, message: &str) -> Result<(), Error> {
        let res = self.inner.shared.errors.lock().set_verbose(error, message);
        res.unwrap_or_else(|| self.stale("error code"))
    }

    pub fn set_error_codes(&self, mode: ErrorCodes) {
        *self.inner.shared.error_codes.lock() = mode;
    }

    /// Start serving a device.
    ///
    /// A worker thread answers the device, and a reader thread feeds it
    /// whatever `reader` returns.
    pub fn open<R, W>(&self, reader: R, writer: W) -> Result<DeviceRef, Error>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let n = self.inner.next_worker.fetch_add(1, Ordering::Relaxed);
        let name = format!("atserver-{}", n);
        let (events, rx) = unbounded();

        let mut devices = self.inner.devices.lock();
        let device = DeviceRef(devices.insert(DeviceEntry {
            name: name.clone(),
            events: events.clone(),
            worker: None,
        }));

        let worker = Worker::new(
            name.clone(),
            device,
            writer,
            self.inner.shared.clone(),
            self.inner.config.echo,
        );
        let spawned = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run(rx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(_) => {
                devices.remove(device.0);
                return Err(Error::Fault);
            }
        };

        let reader_events = events.clone();
        let forward = move |data: Option<Vec<u8>>| {
            reader_events
                .send(data.map_or(Event::Closed, Event::Rx))
                .is_ok()
        };
        let read_chunk = self.inner.config.read_chunk;
        if let Err(e) = spawn_reader(format!("{}-rx", name), reader, read_chunk, forward) {
            if let Some(mut entry) = devices.remove(device.0) {
                entry.worker = Some(handle);
                drop(devices);
                entry.shutdown().ok();
            }
            return Err(e);
        }

        if let Some(entry) = devices.get_mut(device.0) {
            entry.worker = Some(handle);
        }
        info!("Opened {}", name.as_str());
        Ok(device)
    }

    /// Stop serving `device`. A command in progress on it is released, and
    /// unsolicited responses not written yet are dropped.
    pub fn close(&self, device: DeviceRef) -> Result<(), Error> {
        let entry = self.inner.devices.lock().remove(device.0);
        match entry {
            Some(entry) => entry.shutdown(),
            None => self.stale("device"),
        }
    }

    fn events(&self, device: DeviceRef) -> Result<Sender<Event>, Error> {
        let events = self
            .inner
            .devices
            .lock()
            .get(device.0)
            .map(|entry| entry.events.clone());
        match events {
            Some(events) => Ok(events),
            None => self.stale("device"),
        }
    }

    pub fn enable_echo(&self, device: DeviceRef) -> Result<(), Error> {
        self.events(device)?
            .send(Event::Echo(true))
            .map_err(|_| Error::Fault)
    }

    pub fn disable_echo(&self, device: DeviceRef) -> Result<(), Error> {
        self.events(device)?
            .send(Event::Echo(false))
            .map_err(|_| Error::Fault)
    }
}
