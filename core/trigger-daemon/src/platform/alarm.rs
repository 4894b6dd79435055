//! Wake-capable rearm alarm on Linux `timerfd`.
//!
//! `CLOCK_BOOTTIME_ALARM` keeps counting through suspend and wakes the host
//! when it expires, so the rearm tick fires even if nothing else would have
//! woken the machine. It needs `CAP_WAKE_ALARM`; without it the timer falls
//! back to `CLOCK_BOOTTIME`, which still counts suspended time and fires as
//! soon as the host resumes.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::atomic::Ordering;
use std::time::Duration;

use trigger_core::platform::{PeriodicScheduler, PlatformError};
use trigger_core::Input;

use super::Worker;
use crate::dispatch::EventSink;

const WAIT_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmClock {
    BootTimeAlarm,
    BootTime,
}

impl AlarmClock {
    fn id(self) -> libc::clockid_t {
        match self {
            AlarmClock::BootTimeAlarm => libc::CLOCK_BOOTTIME_ALARM,
            AlarmClock::BootTime => libc::CLOCK_BOOTTIME,
        }
    }
}

pub struct AlarmTimer {
    fd: OwnedFd,
    clock: AlarmClock,
}

impl AlarmTimer {
    pub fn create() -> Result<Self, PlatformError> {
        match Self::with_clock(AlarmClock::BootTimeAlarm) {
            Ok(timer) => Ok(timer),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Wake alarm unavailable (needs CAP_WAKE_ALARM); rearm will wait for resume"
                );
                Self::with_clock(AlarmClock::BootTime)
                    .map_err(|err| PlatformError::Failed(format!("timerfd_create: {}", err)))
            }
        }
    }

    pub fn with_clock(clock: AlarmClock) -> io::Result<Self> {
        let flags = libc::TFD_CLOEXEC | libc::TFD_NONBLOCK;
        // SAFETY: timerfd_create takes no pointers; a non-negative return is a
        // fresh descriptor nothing else owns.
        let raw = unsafe { libc::timerfd_create(clock.id(), flags) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `raw` was just returned by timerfd_create and is owned here only.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(AlarmTimer { fd, clock })
    }

    pub fn clock(&self) -> AlarmClock {
        self.clock
    }

    /// First expiry one interval from now, then every interval.
    pub fn arm_periodic(&self, interval: Duration) -> io::Result<()> {
        let spec = libc::itimerspec {
            it_interval: timespec(interval),
            it_value: timespec(interval),
        };
        // SAFETY: `spec` outlives the call; a null old-value pointer is allowed.
        let rc = unsafe {
            libc::timerfd_settime(self.fd.as_raw_fd(), 0, &spec, std::ptr::null_mut())
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Waits up to `timeout` and returns the expirations since the last call
    /// (0 on timeout). Expirations missed while busy arrive as one count.
    pub fn wait(&self, timeout: Duration) -> io::Result<u64> {
        let mut pollfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        // SAFETY: one valid pollfd for the duration of the call.
        let ready = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::Interrupted => Ok(0),
                _ => Err(err),
            };
        }
        if ready == 0 {
            return Ok(0);
        }

        let mut expirations = 0u64;
        // SAFETY: reads at most 8 bytes into a u64 owned by this frame.
        let read = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                &mut expirations as *mut u64 as *mut libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if read < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(0),
                _ => Err(err),
            };
        }
        Ok(expirations)
    }
}

fn timespec(duration: Duration) -> libc::timespec {
    // SAFETY: timespec is plain integers; zeroed covers any padding fields.
    let mut spec: libc::timespec = unsafe { std::mem::zeroed() };
    spec.tv_sec = duration.as_secs() as libc::time_t;
    spec.tv_nsec = duration.subsec_nanos() as libc::c_long;
    spec
}

/// Rearm scheduler backed by [`AlarmTimer`]. The descriptor closes, and the
/// alarm disarms, when the worker is dropped.
pub struct AlarmPeriodicScheduler {
    sink: EventSink,
    worker: Option<Worker>,
}

impl AlarmPeriodicScheduler {
    pub fn new(sink: EventSink) -> Self {
        AlarmPeriodicScheduler { sink, worker: None }
    }
}

impl PeriodicScheduler for AlarmPeriodicScheduler {
    fn register(&mut self, interval: Duration, payload: &str) -> Result<(), PlatformError> {
        if interval.is_zero() {
            return Err(PlatformError::Failed("rearm interval must be positive".to_string()));
        }
        self.worker = None;

        let timer = AlarmTimer::create()?;
        timer
            .arm_periodic(interval)
            .map_err(|err| PlatformError::Failed(format!("timerfd_settime: {}", err)))?;
        tracing::info!(
            clock = ?timer.clock(),
            interval_ms = interval.as_millis() as u64,
            payload,
            "Rearm alarm registered"
        );

        let sink = self.sink.clone();
        let payload = payload.to_string();
        self.worker = Some(Worker::spawn("rearm-alarm", move |stop| {
            while !stop.load(Ordering::SeqCst) {
                match timer.wait(WAIT_SLICE) {
                    Ok(0) => {}
                    Ok(expirations) => {
                        tracing::debug!(payload = %payload, expirations, "Rearm alarm");
                        if !sink.send(Input::RearmTick) {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Rearm alarm wait failed");
                        break;
                    }
                }
            }
        })?);
        Ok(())
    }

    fn cancel(&mut self) {
        self.worker = None;
    }
}
