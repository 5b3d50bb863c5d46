//! The camera table: adding, filtering, sorting and copying rows.

use anyhow::{anyhow, bail, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::camera::{Camera, CameraStatus, Credentials, DiscoveryEntry, PathSetting};
use crate::probe::{ProbeOutcome, ProbeRequest, ProbeVerdict};
use crate::vendor;

/// Row filter by probe status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Success,
    Failed,
}

impl StatusFilter {
    fn admits(&self, status: CameraStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Success => status == CameraStatus::Success,
            StatusFilter::Failed => status == CameraStatus::Failed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "success" => Ok(StatusFilter::Success),
            "failed" => Ok(StatusFilter::Failed),
            other => Err(anyhow!("unknown status filter '{}' (all|success|failed)", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Id,
    Ip,
    Vendor,
    Path,
    Status,
    Latency,
    Url,
}

impl FromStr for Column {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(Column::Id),
            "ip" => Ok(Column::Ip),
            "vendor" => Ok(Column::Vendor),
            "path" => Ok(Column::Path),
            "status" => Ok(Column::Status),
            "latency" => Ok(Column::Latency),
            "url" => Ok(Column::Url),
            other => Err(anyhow!("unknown column '{}'", other)),
        }
    }
}

/// What `copy` extracts from the selected rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyKind {
    Ip,
    Url,
    Row,
}

impl FromStr for CopyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ip" => Ok(CopyKind::Ip),
            "url" => Ok(CopyKind::Url),
            "row" => Ok(CopyKind::Row),
            other => Err(anyhow!("unknown copy kind '{}' (ip|url|row)", other)),
        }
    }
}

impl fmt::Display for CopyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CopyKind::Ip => "ip",
            CopyKind::Url => "url",
            CopyKind::Row => "row",
        })
    }
}

/// Values used for cameras added without explicit settings.
#[derive(Clone, Debug)]
pub struct AddDefaults {
    pub port: u16,
    pub credentials: Credentials,
}

#[derive(Clone, Debug, Default)]
pub struct CameraTable {
    rows: BTreeMap<u32, Camera>,
}

impl CameraTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Camera>) -> Self {
        Self {
            rows: rows.into_iter().map(|camera| (camera.id, camera)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Camera> {
        self.rows.get(&id)
    }

    pub fn cameras(&self) -> impl Iterator<Item = &Camera> {
        self.rows.values()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.rows.keys().copied().collect()
    }

    fn next_id(&self) -> u32 {
        self.rows.keys().next_back().map(|id| id + 1).unwrap_or(1)
    }

    /// Add one camera per non-empty line of `text`, returning the new ids.
    ///
    /// A discovery cache hit for the ip replaces the defaults.
    pub fn add_ips(
        &mut self,
        text: &str,
        defaults: &AddDefaults,
        cache: &HashMap<String, DiscoveryEntry>,
    ) -> Result<Vec<u32>> {
        let ips: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if ips.is_empty() {
            bail!("no IP addresses given");
        }

        let mut added = Vec::with_capacity(ips.len());
        for ip in ips {
            let id = self.next_id();
            let camera = match cache.get(ip) {
                Some(hit) => Camera {
                    id,
                    ip: ip.to_string(),
                    port: hit.port,
                    credentials: hit.credentials.clone(),
                    vendor: hit.vendor.clone(),
                    path: PathSetting::Fixed(hit.path.clone()),
                    status: CameraStatus::New,
                    latency_ms: None,
                    url: String::new(),
                    note: None,
                },
                None => Camera {
                    id,
                    ip: ip.to_string(),
                    port: defaults.port,
                    credentials: defaults.credentials.clone(),
                    vendor: vendor::UNKNOWN.to_string(),
                    path: PathSetting::Auto,
                    status: CameraStatus::New,
                    latency_ms: None,
                    url: String::new(),
                    note: None,
                },
            };
            self.rows.insert(id, camera);
            added.push(id);
        }
        Ok(added)
    }

    /// Set the stream path of `ids` and reset them for a fresh probe.
    pub fn set_path(&mut self, ids: &[u32], path: PathSetting) -> Result<()> {
        self.check_ids(ids)?;
        for id in ids {
            if let Some(camera) = self.rows.get_mut(id) {
                camera.path = path.clone();
                camera.status = CameraStatus::New;
                camera.url.clear();
                camera.latency_ms = None;
            }
        }
        Ok(())
    }

    pub fn probe_request(&self, id: u32) -> Option<ProbeRequest> {
        self.rows.get(&id).map(|camera| ProbeRequest {
            id,
            ip: camera.ip.clone(),
            port: camera.port,
            credentials: camera.credentials.clone(),
            path: camera.path.clone(),
            known_vendor: camera.vendor.clone(),
        })
    }

    /// Record a probe outcome. Successful probes return the entry to cache.
    pub fn apply_probe(&mut self, outcome: ProbeOutcome) -> Option<(String, DiscoveryEntry)> {
        let camera = self.rows.get_mut(&outcome.id)?;
        camera.vendor = outcome.vendor;
        camera.latency_ms = Some(outcome.elapsed.as_secs_f64() * 1000.0);
        camera.note = outcome.hint;
        match outcome.verdict {
            ProbeVerdict::Success {
                url,
                credentials,
                port,
            } => {
                camera.status = CameraStatus::Success;
                camera.url = url;
                camera.port = port;
                camera.path = PathSetting::Fixed(outcome.path.clone());
                camera.credentials = credentials.clone();
                Some((
                    camera.ip.clone(),
                    DiscoveryEntry {
                        vendor: camera.vendor.clone(),
                        path: outcome.path,
                        credentials,
                        port,
                    },
                ))
            }
            ProbeVerdict::Failed => {
                camera.status = CameraStatus::Failed;
                camera.url.clear();
                None
            }
        }
    }

    /// Rows passing both filters, in id order.
    pub fn view(&self, status: StatusFilter, text: &str) -> Vec<&Camera> {
        let needle = text.trim().to_lowercase();
        self.rows
            .values()
            .filter(|camera| status.admits(camera.status))
            .filter(|camera| needle.is_empty() || camera.search_text().contains(&needle))
            .collect()
    }

    /// Copy text for the selected rows, one line per row.
    ///
    /// Returns an empty string when the selection has nothing of `kind`.
    pub fn copy(&self, ids: &[u32], kind: CopyKind) -> Result<String> {
        if ids.is_empty() {
            bail!("select rows first");
        }
        self.check_ids(ids)?;
        let lines: Vec<String> = ids
            .iter()
            .filter_map(|id| self.rows.get(id))
            .filter_map(|camera| match kind {
                CopyKind::Ip => Some(camera.ip.clone()),
                CopyKind::Url if camera.url.is_empty() => None,
                CopyKind::Url => Some(camera.url.clone()),
                CopyKind::Row => Some(camera.display_values().join("\t")),
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn check_ids(&self, ids: &[u32]) -> Result<()> {
        match ids.iter().find(|id| !self.rows.contains_key(*id)) {
            Some(missing) => Err(anyhow!("no camera with id {}", missing)),
            None => Ok(()),
        }
    }
}

/// Sort rows by `column`. Latency sorts numerically with unprobed rows last.
pub fn sort_rows(rows: &mut [&Camera], column: Column, descending: bool) {
    rows.sort_by(|a, b| {
        let ordering = compare(a, b, column);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    if descending && column == Column::Latency {
        // Keep unprobed rows at the bottom either way.
        rows.sort_by_key(|camera| camera.latency_ms.is_none());
    }
}

fn compare(a: &Camera, b: &Camera, column: Column) -> Ordering {
    match column {
        Column::Id => a.id.cmp(&b.id),
        Column::Ip => a.ip.cmp(&b.ip),
        Column::Vendor => a.vendor.cmp(&b.vendor),
        Column::Path => a.path.to_string().cmp(&b.path.to_string()),
        Column::Status => a.status.as_str().cmp(b.status.as_str()),
        Column::Url => a.url.cmp(&b.url),
        Column::Latency => match (a.latency_ms, b.latency_ms) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}
