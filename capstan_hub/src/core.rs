//! Hub struct and loop thread management.
//!
//! The `Hub` owns the shared DAQ and a registry of Capstan Modules, and runs
//! one loop thread that ticks every device at the sample rate.
//!
//! ## Locking
//!
//! The hub lock guards the DAQ, the loop statistics and the run state, and
//! is held for a whole tick. Inside it the tick takes each device's own
//! lock in id order. Registration changes also take the hub lock first, so
//! hub-then-device is the only nesting. Device lookups and cached queries
//! go through `ArcSwap` and never touch the hub lock.
//!
//! ## Tick
//!
//! `read_all` → every device's `update(t)` → `write_all` → statistics →
//! publish `HubQuery` → sleep to the next absolute deadline. Soft mode skips
//! both DAQ transfers. A DAQ or device failure ends the loop in
//! `HubStatus::Error` until `stop`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use capstan_common::consts::{DEFAULT_SAMPLE_RATE, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use capstan_common::daq::driver::{Daq, DaqError};
use capstan_common::device::params::Params;
use capstan_common::device::query::Query;
use capstan_common::hub::{HubError, HubQuery, HubStatus};
use capstan_control::device::{CapstanModule, IoBinding};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::rt::{self, DEFAULT_RT_PRIORITY};
use crate::stats::LoopStats;

type DeviceMap = BTreeMap<u32, Arc<CapstanModule>>;

/// State guarded by the hub lock.
struct TickState {
    daq: Box<dyn Daq>,
    soft: bool,
    sample_rate: f64,
    rt_priority: i32,
    status: HubStatus,
    time: f64,
    stats: LoopStats,
}

impl TickState {
    /// One tick at loop time `t` [s].
    fn tick(&mut self, devices: &DeviceMap, t: f64) -> Result<(), DaqError> {
        self.time = t;
        if !self.soft {
            self.daq
                .read_all()
                .inspect_err(|e| error!("DAQ read failed: {e}"))?;
        }
        for (&id, device) in devices {
            device
                .update(t, &mut *self.daq)
                .inspect_err(|e| error!(id, device = device.name(), "Device update failed: {e}"))?;
        }
        if !self.soft {
            self.daq
                .write_all()
                .inspect_err(|e| error!("DAQ write failed: {e}"))?;
        }
        Ok(())
    }

    /// Disable every device, push the safe outputs and release the DAQ.
    /// Best effort: failures are logged and the sequence continues.
    fn power_down(&mut self, devices: &DeviceMap) {
        for (&id, device) in devices {
            if let Err(e) = device.shutdown(&mut *self.daq) {
                warn!(id, device = device.name(), "Device shutdown failed: {e}");
            }
        }
        if !self.soft {
            if let Err(e) = self.daq.write_all() {
                warn!("DAQ write during shutdown failed: {e}");
            }
            self.release_daq();
        }
    }

    fn release_daq(&mut self) {
        if let Err(e) = self.daq.disable() {
            warn!("DAQ disable failed: {e}");
        }
        if let Err(e) = self.daq.close() {
            warn!("DAQ close failed: {e}");
        }
    }
}

/// State shared between the hub handle and its loop thread.
struct HubShared {
    tick: Mutex<TickState>,
    devices: ArcSwap<DeviceMap>,
    snapshot: ArcSwap<HubQuery>,
    stop_requested: AtomicBool,
    contentions: AtomicU64,
}

impl HubShared {
    fn hub_query(&self, st: &TickState) -> HubQuery {
        HubQuery {
            status: st.status,
            device_count: self.devices.load().len(),
            time: st.time,
            ticks: st.stats.ticks,
            sample_rate: st.sample_rate,
            missed_deadlines: st.stats.missed_deadlines,
            miss_rate: st.stats.miss_rate(),
            lock_contentions: self.contentions.load(Ordering::Relaxed),
            loop_rate: st.stats.loop_rate,
        }
    }

    fn publish(&self, st: &TickState) {
        self.snapshot.store(Arc::new(self.hub_query(st)));
    }
}

/// Device hub: owns the DAQ and schedules every registered Capstan Module.
pub struct Hub {
    shared: Arc<HubShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Hub {
    /// Create an idle hub around `daq` at the default sample rate.
    pub fn new(daq: Box<dyn Daq>) -> Self {
        info!(driver = daq.name(), "Hub created");
        let state = TickState {
            daq,
            soft: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
            rt_priority: DEFAULT_RT_PRIORITY,
            status: HubStatus::Idle,
            time: 0.0,
            stats: LoopStats::new(),
        };
        let shared = HubShared {
            devices: ArcSwap::from_pointee(DeviceMap::new()),
            snapshot: ArcSwap::from_pointee(HubQuery::default()),
            stop_requested: AtomicBool::new(false),
            contentions: AtomicU64::new(0),
            tick: Mutex::new(state),
        };
        shared.publish(&shared.tick.lock());
        Self {
            shared: Arc::new(shared),
            worker: Mutex::new(None),
        }
    }

    // ─── Device registry ────────────────────────────────────────────

    /// Create a device bound to this hub's DAQ and register it under `id`.
    ///
    /// # Errors
    /// `InvalidParams` for inconsistent params, `InvalidId` if `id` is taken,
    /// `InvalidBinding` if a bound channel does not exist on the DAQ.
    pub fn create_device(
        &self,
        id: u32,
        name: impl Into<String>,
        binding: IoBinding,
        params: Params,
    ) -> Result<Arc<CapstanModule>, HubError> {
        let device = Arc::new(CapstanModule::new(name, binding, params)?);
        self.add_device(id, Arc::clone(&device))?;
        Ok(device)
    }

    /// Register an existing device under `id`. The device adopts the hub's
    /// sample rate and is ticked from the next tick on.
    ///
    /// # Errors
    /// `InvalidId` if `id` is taken or the device is already registered,
    /// `InvalidBinding` if a bound channel does not exist on the DAQ.
    pub fn add_device(&self, id: u32, device: Arc<CapstanModule>) -> Result<(), HubError> {
        let st = self.shared.tick.lock();
        let devices = self.shared.devices.load_full();

        if devices.contains_key(&id) {
            warn!(id, "Device id already registered");
            return Err(HubError::InvalidId(id));
        }
        if devices.values().any(|d| Arc::ptr_eq(d, &device)) {
            warn!(id, device = device.name(), "Device already registered under another id");
            return Err(HubError::InvalidId(id));
        }
        device
            .validate_binding(&st.daq.channel_counts())
            .map_err(|source| {
                warn!(id, device = device.name(), "Invalid binding: {source}");
                HubError::InvalidBinding { id, source }
            })?;
        device.set_sample_rate(st.sample_rate);

        let mut next = DeviceMap::clone(&devices);
        next.insert(id, Arc::clone(&device));
        self.shared.devices.store(Arc::new(next));
        self.shared.publish(&st);
        info!(id, device = device.name(), "Device registered");
        Ok(())
    }

    /// Disable device `id`, zero its outputs and remove it.
    ///
    /// # Errors
    /// `InvalidId` if no device is registered under `id`.
    pub fn destroy_device(&self, id: u32) -> Result<(), HubError> {
        let mut st = self.shared.tick.lock();
        let mut next = DeviceMap::clone(&self.shared.devices.load());
        let Some(device) = next.remove(&id) else {
            warn!(id, "Cannot destroy unknown device");
            return Err(HubError::InvalidId(id));
        };
        self.shared.devices.store(Arc::new(next));

        if let Err(e) = device.shutdown(&mut *st.daq) {
            warn!(id, device = device.name(), "Device shutdown failed: {e}");
        }
        if st.daq.is_open() {
            if let Err(e) = st.daq.write_all() {
                warn!(id, "DAQ write after device removal failed: {e}");
            }
        }
        self.shared.publish(&st);
        info!(id, device = device.name(), "Device destroyed");
        Ok(())
    }

    /// Device registered under `id`.
    pub fn device(&self, id: u32) -> Option<Arc<CapstanModule>> {
        self.shared.devices.load().get(&id).cloned()
    }

    /// Whether `id` is registered. Logs a warning when it is not.
    pub fn validate_device_id(&self, id: u32) -> bool {
        let known = self.shared.devices.load().contains_key(&id);
        if !known {
            warn!(id, "Unknown device id");
        }
        known
    }

    /// Registered ids in tick order.
    pub fn device_ids(&self) -> Vec<u32> {
        self.shared.devices.load().keys().copied().collect()
    }

    /// Snapshot of device `id`. See [`CapstanModule::query`].
    ///
    /// # Errors
    /// `InvalidId` if no device is registered under `id`.
    pub fn device_query(&self, id: u32, immediate: bool) -> Result<Query, HubError> {
        if !self.validate_device_id(id) {
            return Err(HubError::InvalidId(id));
        }
        self.device(id)
            .map(|device| device.query(immediate))
            .ok_or(HubError::InvalidId(id))
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Open and enable the DAQ (skipped when `soft`) and spawn the loop
    /// thread.
    ///
    /// # Errors
    /// `AlreadyRunning` while a loop thread exists (including after an
    /// error, until `stop`), `DaqOpenFailed`, `DaqEnableFailed`,
    /// `ThreadSpawn`.
    pub fn start(&self, soft: bool) -> Result<(), HubError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            warn!("Hub already running");
            return Err(HubError::AlreadyRunning);
        }

        {
            let mut st = self.shared.tick.lock();
            if !soft {
                st.daq.open().map_err(|e| {
                    error!("DAQ open failed: {e}");
                    HubError::DaqOpenFailed(e)
                })?;
                if let Err(e) = st.daq.enable() {
                    error!("DAQ enable failed: {e}");
                    if let Err(close_err) = st.daq.close() {
                        warn!("DAQ close failed: {close_err}");
                    }
                    return Err(HubError::DaqEnableFailed(e));
                }
            }
            st.soft = soft;
            st.status = HubStatus::Running;
            st.time = 0.0;
            st.stats = LoopStats::new();
            self.shared.contentions.store(0, Ordering::Relaxed);
            self.shared.stop_requested.store(false, Ordering::Release);
            self.shared.publish(&st);
        }

        let shared = Arc::clone(&self.shared);
        match thread::Builder::new()
            .name("capstan-hub".to_string())
            .spawn(move || run_loop(shared))
        {
            Ok(handle) => {
                *worker = Some(handle);
                info!(soft, "Hub started");
                Ok(())
            }
            Err(e) => {
                error!("Failed to spawn hub loop thread: {e}");
                let mut st = self.shared.tick.lock();
                if !soft {
                    st.release_daq();
                }
                st.status = HubStatus::Idle;
                self.shared.publish(&st);
                Err(HubError::ThreadSpawn(e.to_string()))
            }
        }
    }

    /// Stop the loop thread and wait for it to power down. Also clears an
    /// Error state.
    ///
    /// # Errors
    /// `NotRunning` if no loop thread was started.
    pub fn stop(&self) -> Result<(), HubError> {
        let mut worker = self.worker.lock();
        let handle = worker.take().ok_or(HubError::NotRunning)?;

        self.shared.stop_requested.store(true, Ordering::Release);
        if handle.join().is_err() {
            error!("Hub loop thread panicked");
        }

        let mut st = self.shared.tick.lock();
        if st.status == HubStatus::Error {
            info!("Hub error state cleared");
        }
        st.status = HubStatus::Idle;
        self.shared.publish(&st);
        info!(ticks = st.stats.ticks, "Hub stopped");
        Ok(())
    }

    // ─── Queries & settings ─────────────────────────────────────────

    /// Hub snapshot: fresh under the hub lock when `immediate`, else the
    /// one published by the last tick (never blocks).
    pub fn query(&self, immediate: bool) -> HubQuery {
        if immediate {
            let st = self.shared.tick.lock();
            self.shared.hub_query(&st)
        } else {
            **self.shared.snapshot.load()
        }
    }

    /// Current run state.
    pub fn status(&self) -> HubStatus {
        self.shared.snapshot.load().status
    }

    /// Loop rate [Hz].
    pub fn sample_rate(&self) -> f64 {
        self.shared.snapshot.load().sample_rate
    }

    /// Change the loop rate. Devices redesign their filters, the new period
    /// applies from the next tick.
    ///
    /// # Errors
    /// `InvalidSampleRate` outside `[MIN_SAMPLE_RATE, MAX_SAMPLE_RATE]`.
    pub fn set_sample_rate(&self, sample_rate: f64) -> Result<(), HubError> {
        if !(sample_rate.is_finite() && (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate)) {
            warn!(sample_rate, "Sample rate out of range");
            return Err(HubError::InvalidSampleRate(sample_rate));
        }
        let mut st = self.shared.tick.lock();
        st.sample_rate = sample_rate;
        for device in self.shared.devices.load().values() {
            device.set_sample_rate(sample_rate);
        }
        self.shared.publish(&st);
        info!(sample_rate, "Sample rate set");
        Ok(())
    }

    /// `SCHED_FIFO` priority requested by the loop thread on its next start
    /// (`rt` feature only).
    pub fn set_rt_priority(&self, priority: i32) {
        self.shared.tick.lock().rt_priority = priority;
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        if self.worker.get_mut().is_some() {
            if let Err(e) = self.stop() {
                warn!("Failed to stop hub on drop: {e}");
            }
        }
    }
}

/// Loop thread body.
fn run_loop(shared: Arc<HubShared>) {
    let priority = shared.tick.lock().rt_priority;
    if let Err(e) = rt::rt_setup(priority) {
        warn!("{e}; continuing without real-time guarantees");
    }
    if rt::detect_rt_mode() {
        info!("Hub loop running in real-time mode");
    } else {
        info!("Hub loop running in standard (non-RT) mode");
    }

    let start = Instant::now();
    let mut deadline = start;

    loop {
        if shared.stop_requested.load(Ordering::Acquire) {
            let mut st = shared.tick.lock();
            st.power_down(&shared.devices.load_full());
            info!(
                ticks = st.stats.ticks,
                missed = st.stats.missed_deadlines,
                "Hub loop stopped"
            );
            return;
        }

        let mut st = match shared.tick.try_lock() {
            Some(guard) => guard,
            None => {
                shared.contentions.fetch_add(1, Ordering::Relaxed);
                shared.tick.lock()
            }
        };

        let tick_start = Instant::now();
        deadline += Duration::from_secs_f64(1.0 / st.sample_rate);
        let t = tick_start.duration_since(start).as_secs_f64();
        let devices = shared.devices.load_full();

        if let Err(e) = st.tick(&devices, t) {
            error!("Hub tick failed, entering error state: {e}");
            st.status = HubStatus::Error;
            st.power_down(&devices);
            shared.publish(&st);
            return;
        }

        let finished = Instant::now();
        let missed = finished > deadline;
        let tick_ns = finished.duration_since(tick_start).as_nanos() as u64;
        st.stats.record(t, tick_ns, missed);

        if missed {
            let misses = st.stats.missed_deadlines;
            if misses <= 10 || misses % 1000 == 0 {
                warn!(
                    "Deadline miss #{misses}: tick took {tick_ns}ns (period {:.0}ns)",
                    1e9 / st.sample_rate
                );
            }
        }
        if st.stats.ticks % 1000 == 0 {
            debug!(
                "Hub loop: {} ticks, avg={}ns, max={}ns, misses={}, rate={:.1}Hz",
                st.stats.ticks,
                st.stats.avg_tick_ns(),
                st.stats.max_tick_ns,
                st.stats.missed_deadlines,
                st.stats.loop_rate
            );
        }

        shared.publish(&st);
        drop(st);

        let now = Instant::now();
        if missed {
            deadline = now;
        } else if deadline > now {
            thread::sleep(deadline - now);
        }
    }
}
