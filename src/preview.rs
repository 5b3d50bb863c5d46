//! Live previews.
//!
//! Each preview runs in its own `PreviewSession` thread that pulls frames from a
//! `FrameSource`, scales them to the slot size and hands them to the caller over a
//! channel. `PreviewManager` owns the sessions, enforces the preview limit and
//! keeps the tile grid layout.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::frame::{Frame, SlotSize};
use crate::ingest::{redact_credentials, SourceFactory};
use crate::table::CameraTable;

/// Consecutive failed reads after which a stream is considered lost.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Tiles per grid row.
pub const GRID_COLUMNS: usize = 3;

#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    pub max_consecutive_failures: u32,
    /// Pause after a failed read.
    pub retry_delay: Duration,
    /// Lower bound between delivered frames.
    pub min_frame_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_consecutive_failures: MAX_CONSECUTIVE_FAILURES,
            retry_delay: Duration::from_millis(100),
            min_frame_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Tile,
    Enlarged,
}

#[derive(Debug)]
pub enum PreviewEvent {
    Frame {
        cam_id: u32,
        slot: SlotKind,
        frame: Frame,
    },
    OpenFailed {
        cam_id: u32,
        slot: SlotKind,
        error: String,
    },
    /// Too many consecutive read failures.
    Disconnected { cam_id: u32, slot: SlotKind },
    /// The session ended and released its stream.
    Closed { cam_id: u32, slot: SlotKind },
}

/// One background frame reader.
pub struct PreviewSession {
    cam_id: u32,
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl PreviewSession {
    pub fn spawn(
        cam_id: u32,
        slot: SlotKind,
        url: String,
        size: SlotSize,
        factory: SourceFactory,
        options: SessionOptions,
        events: Sender<PreviewEvent>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let join = std::thread::spawn(move || {
            run_session(cam_id, slot, &url, size, factory, options, &flag, &events);
            flag.store(false, Ordering::SeqCst);
            let _ = events.send(PreviewEvent::Closed { cam_id, slot });
        });
        Self {
            cam_id,
            running,
            join: Some(join),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.join.as_ref().map(|j| !j.is_finished()).unwrap_or(false)
    }

    /// Signal the reader to stop and wait for it to release the stream.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("preview session #{} panicked", self.cam_id);
            }
        }
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::too_many_arguments)]
fn run_session(
    cam_id: u32,
    slot: SlotKind,
    url: &str,
    size: SlotSize,
    factory: SourceFactory,
    options: SessionOptions,
    running: &AtomicBool,
    events: &Sender<PreviewEvent>,
) {
    let opened = factory(url).and_then(|mut source| {
        source.connect()?;
        Ok(source)
    });
    let mut source = match opened {
        Ok(source) => source,
        Err(err) => {
            log::warn!(
                "preview #{}: cannot open {}: {}",
                cam_id,
                redact_credentials(url),
                err
            );
            let _ = events.send(PreviewEvent::OpenFailed {
                cam_id,
                slot,
                error: err.to_string(),
            });
            return;
        }
    };
    log::info!("preview #{} ({:?}) streaming {}", cam_id, slot, redact_credentials(url));

    let mut consecutive_failures = 0u32;
    let mut last_delivery: Option<Instant> = None;
    while running.load(Ordering::SeqCst) {
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                consecutive_failures += 1;
                log::debug!(
                    "preview #{}: read failed ({}/{}): {}",
                    cam_id,
                    consecutive_failures,
                    options.max_consecutive_failures,
                    err
                );
                if consecutive_failures >= options.max_consecutive_failures {
                    log::warn!("preview #{}: stream lost", cam_id);
                    let _ = events.send(PreviewEvent::Disconnected { cam_id, slot });
                    return;
                }
                std::thread::sleep(options.retry_delay);
                continue;
            }
        };
        consecutive_failures = 0;

        let frame = frame.scaled(size);
        if events
            .send(PreviewEvent::Frame {
                cam_id,
                slot,
                frame,
            })
            .is_err()
        {
            return;
        }

        if let Some(last) = last_delivery {
            let since = last.elapsed();
            if since < options.min_frame_interval {
                std::thread::sleep(options.min_frame_interval - since);
            }
        }
        last_delivery = Some(Instant::now());
    }
}

/// Why `PreviewManager::start` opened nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartRefusal {
    NoSuccessfulCameras,
    LimitReached,
}

impl fmt::Display for StartRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartRefusal::NoSuccessfulCameras => f.write_str("no successful cameras to open"),
            StartRefusal::LimitReached => f.write_str("preview limit reached"),
        }
    }
}

impl std::error::Error for StartRefusal {}

/// Grid cell of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub column: usize,
}

pub fn grid_cell(index: usize) -> GridCell {
    GridCell {
        row: index / GRID_COLUMNS,
        column: index % GRID_COLUMNS,
    }
}

pub struct PreviewManager {
    max_previews: usize,
    factory: SourceFactory,
    options: SessionOptions,
    tiles: BTreeMap<u32, PreviewSession>,
    /// Tile ids in the order they were opened; drives the grid layout.
    order: Vec<u32>,
    enlarged: HashMap<u32, PreviewSession>,
    tx: Sender<PreviewEvent>,
    rx: Receiver<PreviewEvent>,
}

impl PreviewManager {
    pub fn new(max_previews: usize, factory: SourceFactory) -> Self {
        Self::with_options(max_previews, factory, SessionOptions::default())
    }

    pub fn with_options(max_previews: usize, factory: SourceFactory, options: SessionOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            max_previews: max_previews.max(1),
            factory,
            options,
            tiles: BTreeMap::new(),
            order: Vec::new(),
            enlarged: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_previewing(&self, cam_id: u32) -> bool {
        self.tiles.contains_key(&cam_id)
    }

    /// Open tiles for the previewable cameras among `ids`, up to the free slots.
    pub fn start(&mut self, ids: &[u32], table: &CameraTable) -> Result<Vec<u32>, StartRefusal> {
        let candidates: Vec<(u32, String)> = ids
            .iter()
            .filter_map(|id| table.get(*id))
            .filter(|camera| camera.is_previewable())
            .map(|camera| (camera.id, camera.url.clone()))
            .collect();
        if candidates.is_empty() {
            return Err(StartRefusal::NoSuccessfulCameras);
        }
        let slots = self.max_previews.saturating_sub(self.tiles.len());
        if slots == 0 {
            return Err(StartRefusal::LimitReached);
        }

        let fresh: Vec<(u32, String)> = candidates
            .into_iter()
            .filter(|(cam_id, _)| !self.tiles.contains_key(cam_id))
            .take(slots)
            .collect();
        let mut started = Vec::new();
        for (cam_id, url) in fresh {
            let session = PreviewSession::spawn(
                cam_id,
                SlotKind::Tile,
                url,
                SlotSize::tile(),
                self.factory.clone(),
                self.options,
                self.tx.clone(),
            );
            self.tiles.insert(cam_id, session);
            self.order.push(cam_id);
            started.push(cam_id);
        }
        Ok(started)
    }

    /// Stop the tiles of `ids`; an empty selection stops every tile.
    pub fn stop(&mut self, ids: &[u32]) -> Vec<u32> {
        let targets: Vec<u32> = if ids.is_empty() {
            self.tiles.keys().copied().collect()
        } else {
            ids.iter()
                .copied()
                .filter(|id| self.tiles.contains_key(id))
                .collect()
        };
        for id in &targets {
            if let Some(mut session) = self.tiles.remove(id) {
                session.stop();
            }
        }
        self.order.retain(|id| !targets.contains(id));
        targets
    }

    /// Stop tiles and enlarged previews.
    pub fn stop_all(&mut self) {
        self.stop(&[]);
        for (_, mut session) in self.enlarged.drain() {
            session.stop();
        }
    }

    /// Open (or keep) the enlarged preview of a camera. Returns false when an
    /// enlarged preview for it is already running.
    pub fn open_enlarged(
        &mut self,
        cam_id: u32,
        table: &CameraTable,
        requested: Option<(u32, u32)>,
    ) -> Result<bool, StartRefusal> {
        if self
            .enlarged
            .get(&cam_id)
            .map(PreviewSession::is_running)
            .unwrap_or(false)
        {
            return Ok(false);
        }
        let camera = table
            .get(cam_id)
            .filter(|camera| camera.is_previewable())
            .ok_or(StartRefusal::NoSuccessfulCameras)?;
        let session = PreviewSession::spawn(
            cam_id,
            SlotKind::Enlarged,
            camera.url.clone(),
            SlotSize::enlarged(requested),
            self.factory.clone(),
            self.options,
            self.tx.clone(),
        );
        if let Some(mut previous) = self.enlarged.insert(cam_id, session) {
            previous.stop();
        }
        Ok(true)
    }

    /// Grid cells of the open tiles in opening order.
    pub fn layout(&self) -> Vec<(u32, GridCell)> {
        self.order
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, grid_cell(index)))
            .collect()
    }

    /// Next event from any session. `Closed` events free the slot before returning.
    pub fn next_event(&mut self, timeout: Duration) -> Option<PreviewEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => {
                if let PreviewEvent::Closed { cam_id, slot } = &event {
                    self.on_closed(*cam_id, *slot);
                }
                Some(event)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn on_closed(&mut self, cam_id: u32, slot: SlotKind) {
        match slot {
            SlotKind::Tile => {
                let finished = self
                    .tiles
                    .get(&cam_id)
                    .map(|session| !session.is_running())
                    .unwrap_or(false);
                if finished {
                    if let Some(mut session) = self.tiles.remove(&cam_id) {
                        session.stop();
                    }
                    self.order.retain(|id| *id != cam_id);
                }
            }
            SlotKind::Enlarged => {
                let finished = self
                    .enlarged
                    .get(&cam_id)
                    .map(|session| !session.is_running())
                    .unwrap_or(false);
                if finished {
                    if let Some(mut session) = self.enlarged.remove(&cam_id) {
                        session.stop();
                    }
                }
            }
        }
    }
}

impl Drop for PreviewManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}
