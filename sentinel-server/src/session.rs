//! Camera session manager
//!
//! One physical camera is shared by two logical sections. At most one
//! section holds it at a time. Toggles and teardown are serialized by
//! their own lock; the state lock is only held for short reads and
//! updates, never across opening or releasing the device.

use parking_lot::Mutex;
use sentinel_core::{CameraSection, Error, Result};
use sentinel_eye::{CameraDevice, CameraOpener};
use sentinel_spk::AlertDeduplicator;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handle to the open device, shared with the stream reading from it.
pub type SharedDevice = Arc<Mutex<Box<dyn CameraDevice>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    On,
    Off,
}

impl FromStr for ToggleAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "on" => Ok(ToggleAction::On),
            "off" => Ok(ToggleAction::Off),
            other => Err(Error::Validation(format!("Invalid action: {}", other))),
        }
    }
}

/// What a toggle actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    TurnedOn,
    AlreadyOn,
    TurnedOff,
    AlreadyOff,
}

impl ToggleOutcome {
    pub fn message(&self, section: CameraSection) -> String {
        match self {
            ToggleOutcome::TurnedOn => format!("{} camera turned on", section),
            ToggleOutcome::AlreadyOn => format!("{} camera is already on", section),
            ToggleOutcome::TurnedOff => format!("{} camera turned off", section),
            ToggleOutcome::AlreadyOff => format!("{} camera is already off", section),
        }
    }
}

/// Snapshot of which section holds the camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub sections: BTreeMap<&'static str, bool>,
    pub active: Option<CameraSection>,
}

struct SessionState {
    active: Option<CameraSection>,
    device: Option<SharedDevice>,
}

pub struct CameraSessionManager {
    opener: Arc<dyn CameraOpener>,
    alerts: Arc<AlertDeduplicator>,
    toggle: Mutex<()>,
    state: Mutex<SessionState>,
}

impl fmt::Debug for CameraSessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraSessionManager")
            .field("active", &self.active())
            .finish()
    }
}

impl CameraSessionManager {
    pub fn new(opener: Arc<dyn CameraOpener>, alerts: Arc<AlertDeduplicator>) -> Self {
        Self {
            opener,
            alerts,
            toggle: Mutex::new(()),
            state: Mutex::new(SessionState {
                active: None,
                device: None,
            }),
        }
    }

    /// Turn `section`'s camera on or off. May block while the device opens
    /// or while an in-flight read finishes.
    pub fn set_section(&self, section: CameraSection, action: ToggleAction) -> Result<ToggleOutcome> {
        let _toggle = self.toggle.lock();
        match action {
            ToggleAction::On => {
                match self.active() {
                    Some(active) if active == section => return Ok(ToggleOutcome::AlreadyOn),
                    Some(active) => {
                        warn!("Camera requested for {} while held by {}", section, active);
                        return Err(Error::Conflict(active.to_string()));
                    }
                    None => {}
                }
                let device = self.opener.open().map_err(|e| {
                    warn!("Failed to open camera for {}: {}", section, e);
                    Error::DeviceUnavailable(format!("Failed to open {} camera", section))
                })?;
                let mut state = self.state.lock();
                state.device = Some(Arc::new(Mutex::new(device)));
                state.active = Some(section);
                info!("Camera turned on for {}", section);
                Ok(ToggleOutcome::TurnedOn)
            }
            ToggleAction::Off => {
                let device = {
                    let mut state = self.state.lock();
                    if state.active != Some(section) {
                        return Ok(ToggleOutcome::AlreadyOff);
                    }
                    state.active = None;
                    state.device.take()
                };
                // Waits for a read in progress on the stream.
                if let Some(device) = device {
                    device.lock().release();
                }
                self.alerts.clear();
                debug!("Cleared alert memory and discarded pending alerts");
                info!("Camera turned off for {}", section);
                Ok(ToggleOutcome::TurnedOff)
            }
        }
    }

    /// The device for a stream on `section`. Fails with `NotActive` unless
    /// `section` currently holds the camera.
    pub fn open_stream(&self, section: CameraSection) -> Result<SharedDevice> {
        let state = self.state.lock();
        match (&state.active, &state.device) {
            (Some(active), Some(device)) if *active == section => Ok(device.clone()),
            _ => Err(Error::NotActive(section.to_string())),
        }
    }

    pub fn active(&self) -> Option<CameraSection> {
        self.state.lock().active
    }

    pub fn is_in_use(&self, section: CameraSection) -> bool {
        self.active() == Some(section)
    }

    pub fn status(&self) -> SessionStatus {
        let active = self.active();
        let sections = CameraSection::ALL
            .iter()
            .map(|s| (s.as_str(), active == Some(*s)))
            .collect();
        SessionStatus { sections, active }
    }

    /// Release the camera and stop accepting alerts.
    pub fn shutdown(&self) {
        let _toggle = self.toggle.lock();
        let device = {
            let mut state = self.state.lock();
            state.active = None;
            state.device.take()
        };
        if let Some(device) = device {
            device.lock().release();
            info!("Camera released on shutdown");
        }
        self.alerts.close();
    }
}
