//! camdash: RTSP camera dashboard
//!
//! Operators paste a list of camera IPs, probe them to discover a working RTSP
//! URL (vendor fingerprinting, per-vendor ports, paths and default credentials),
//! and then preview, snapshot or export the working streams.
//!
//! # Module Structure
//!
//! - `camera`: camera rows, credentials and status types
//! - `vendor`: vendor profiles, fingerprinting and error hints
//! - `probe`: reachability checks, RTSP DESCRIBE, URL candidates and the worker pool
//! - `table`: the editable camera table (add, filter, sort, copy, set path)
//! - `ingest`: frame sources (RTSP via GStreamer, `stub://` synthetic streams)
//! - `frame`: decoded frames and slot sizing
//! - `preview`: background preview sessions and the preview manager
//! - `snapshot`: single-frame capture to PNG or JPEG
//! - `storage`: SQLite persistence for the table and discovery cache
//! - `config`: operator preferences
//! - `i18n`: Arabic and English status messages
//! - `ui`: stderr progress and status output

pub mod camera;
pub mod config;
pub mod frame;
pub mod i18n;
pub mod ingest;
pub mod preview;
pub mod probe;
pub mod snapshot;
pub mod storage;
pub mod table;
pub mod ui;
pub mod vendor;

pub use camera::{Camera, CameraStatus, Credentials, DiscoveryEntry, PathSetting};
pub use config::Settings;
pub use frame::{Frame, SlotSize};
pub use i18n::{Lang, Msg};
pub use ingest::{rtsp_factory, FrameSource, RtspConfig, RtspSource, SourceFactory};
pub use preview::{PreviewEvent, PreviewManager, PreviewSession, StartRefusal};
pub use probe::{
    probe_all, probe_camera, NetTransport, ProbeOptions, ProbeOutcome, ProbeRequest,
    ProbeSummary, ProbeTransport, ProbeVerdict,
};
pub use storage::{DashboardStore, SqliteStore};
pub use table::{AddDefaults, CameraTable, Column, CopyKind, StatusFilter};
