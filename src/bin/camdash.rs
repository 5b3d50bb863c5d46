//! camdash - RTSP camera dashboard
//!
//! Each subcommand is one dashboard action over the persisted camera table:
//! add IPs, probe them for a working stream, list/filter/sort, copy, set a fixed
//! path, preview live streams and take snapshots.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use camdash::preview::{PreviewEvent, SlotKind};
use camdash::probe::ProbeOptions;
use camdash::table::sort_rows;
use camdash::ui::Ui;
use camdash::{
    probe_all, rtsp_factory, snapshot, AddDefaults, CameraTable, Column, CopyKind, Credentials,
    DashboardStore, Lang, Msg, NetTransport, PathSetting, PreviewManager, Settings, SqliteStore,
    StartRefusal, StatusFilter,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, global = true, default_value = "auto", value_name = "MODE")]
    ui: String,
    /// Status message language for this run (ar|en). Defaults to the saved
    /// preference, which `CAMDASH_LANG` overrides.
    #[arg(long = "ui-lang", global = true, value_name = "LANG")]
    ui_lang: Option<Lang>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add cameras from a list of IPs, one per line.
    Add {
        /// RTSP port for the new cameras (defaults to the saved preference).
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, env = "CAMDASH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// File with IPs; `-` or nothing reads stdin.
        file: Option<PathBuf>,
    },
    /// Show the camera table.
    List {
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// Case-insensitive text filter over all columns.
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        sort: Option<Column>,
        #[arg(long)]
        desc: bool,
    },
    /// Probe cameras for a working RTSP URL.
    Probe {
        /// Camera ids; all cameras when omitted.
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u32>,
        #[arg(long)]
        threads: Option<usize>,
        /// Also try up to three vendor default logins per port.
        #[arg(long)]
        try_defaults: bool,
        /// Skip the DESCRIBE fingerprint and use the known vendor.
        #[arg(long)]
        no_smart: bool,
    },
    /// Pin a stream path; an empty path returns to automatic discovery.
    SetPath {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u32>,
        path: Option<String>,
    },
    /// Print the ip, url or full row of the selected cameras.
    Copy {
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u32>,
        kind: CopyKind,
    },
    /// Stream previews of successful cameras.
    Preview {
        /// Camera ids; all successful cameras when omitted.
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u32>,
        /// Stop after this many seconds; 0 runs until Ctrl-C.
        #[arg(long, default_value_t = 10)]
        seconds: u64,
        /// Open an enlarged preview of the first camera instead of tiles.
        #[arg(long)]
        enlarged: bool,
    },
    /// Save one frame of a camera to a PNG or JPEG file.
    Snapshot {
        #[arg(long)]
        id: u32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Show or change saved preferences.
    Prefs {
        #[arg(long)]
        probe_threads: Option<usize>,
        #[arg(long)]
        max_previews: Option<usize>,
        #[arg(long)]
        port: Option<u16>,
        /// Saved status message language (ar|en).
        #[arg(long)]
        lang: Option<Lang>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings = Settings::load()?;
    let lang = args.ui_lang.unwrap_or(settings.lang);
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty, lang);

    match args.command {
        Command::Prefs {
            probe_threads,
            max_previews,
            port,
            lang,
        } => run_prefs(&ui, &mut settings, probe_threads, max_previews, port, lang),
        command => {
            let mut store = {
                let _stage = ui.stage("Open database");
                SqliteStore::open(&settings.db_path)?
            };
            let mut table = CameraTable::from_rows(store.load_cameras()?);
            run_table_command(&ui, &mut settings, &mut store, &mut table, command)
        }
    }
}

fn run_table_command(
    ui: &Ui,
    settings: &mut Settings,
    store: &mut SqliteStore,
    table: &mut CameraTable,
    command: Command,
) -> Result<()> {
    match command {
        Command::Add {
            port,
            user,
            password,
            file,
        } => {
            let text = match file {
                Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(&path)
                    .map_err(|e| anyhow!("failed to read {}: {}", path.display(), e))?,
                _ => std::io::read_to_string(std::io::stdin())?,
            };
            if text.trim().is_empty() {
                return Err(refuse(ui, Msg::PasteIpsFirst));
            }
            if let Some(port) = port {
                settings.port = port;
                settings.save()?;
            }
            let defaults = AddDefaults {
                port: settings.port,
                credentials: Credentials::new(user.as_deref(), password.as_deref()),
            };
            let cache = store.load_cache()?;
            let added = table.add_ips(&text, &defaults, &cache)?;
            persist(store, table, &added)?;
            ui.status(&Msg::Added(added.len()));
            Ok(())
        }
        Command::List {
            status,
            filter,
            sort,
            desc,
        } => {
            let mut rows = table.view(status, filter.as_deref().unwrap_or(""));
            if let Some(column) = sort {
                sort_rows(&mut rows, column, desc);
            }
            println!("ID\tIP\tVendor\tPath\tStatus\tLatency\tURL");
            for camera in rows {
                println!("{}", camera.display_values().join("\t"));
            }
            Ok(())
        }
        Command::Probe {
            ids,
            threads,
            try_defaults,
            no_smart,
        } => {
            let ids = if ids.is_empty() { table.ids() } else { ids };
            let requests: Vec<_> = ids.iter().filter_map(|id| table.probe_request(*id)).collect();
            if requests.is_empty() {
                return Err(refuse(ui, Msg::SelectRowsFirst));
            }
            let options = ProbeOptions {
                smart: settings.smart_probe && !no_smart,
                try_defaults: settings.try_defaults || try_defaults,
            };
            let workers = threads.unwrap_or(settings.probe_threads);
            let transport = NetTransport::default();
            let progress = ui.probe_progress(requests.len());
            ui.status(&Msg::ProbeRunning);
            log::info!(
                "probing {} camera(s) on {} worker(s), smart={}, defaults={}",
                requests.len(),
                workers,
                options.smart,
                options.try_defaults
            );

            let mut discovered = Vec::new();
            let summary = probe_all(&transport, requests, options, workers, |outcome| {
                progress.inc(1);
                if let Some(entry) = table.apply_probe(outcome) {
                    discovered.push(entry);
                }
            });
            progress.finish_and_clear();

            {
                let _stage = ui.stage("Save results");
                for (ip, entry) in &discovered {
                    store.put_cache_entry(ip, entry)?;
                }
                persist(store, table, &ids)?;
            }
            ui.status(&Msg::ProbeFinished {
                succeeded: summary.succeeded,
                failed: summary.failed,
            });
            Ok(())
        }
        Command::SetPath { ids, path } => {
            let setting = PathSetting::from_input(path.as_deref().unwrap_or(""));
            table.set_path(&ids, setting)?;
            persist(store, table, &ids)?;
            ui.status(&Msg::PathUpdated(ids.len()));
            Ok(())
        }
        Command::Copy { ids, kind } => {
            if ids.is_empty() {
                return Err(refuse(ui, Msg::SelectRowsFirst));
            }
            let text = table.copy(&ids, kind)?;
            if text.is_empty() {
                return Err(refuse(ui, Msg::NothingToCopy));
            }
            println!("{}", text);
            ui.status(&Msg::Copied(text.lines().count()));
            Ok(())
        }
        Command::Preview {
            ids,
            seconds,
            enlarged,
        } => run_preview(ui, settings, table, ids, seconds, enlarged),
        Command::Snapshot { id, output } => {
            let camera = table
                .get(id)
                .ok_or_else(|| anyhow!("unknown camera id {}", id))?;
            if !camera.is_previewable() {
                return Err(refuse(ui, Msg::NotSuccessful(id)));
            }
            match snapshot::capture(camera, &rtsp_factory(), &output) {
                Ok(_) => {
                    ui.status(&Msg::SnapshotSaved(output.display().to_string()));
                    Ok(())
                }
                Err(err) => {
                    ui.status(&Msg::SnapshotFailed);
                    Err(err)
                }
            }
        }
        Command::Prefs { .. } => Err(anyhow!("prefs does not use the camera table")),
    }
}

fn run_preview(
    ui: &Ui,
    settings: &Settings,
    table: &CameraTable,
    ids: Vec<u32>,
    seconds: u64,
    enlarged: bool,
) -> Result<()> {
    let ids: Vec<u32> = if ids.is_empty() {
        table
            .cameras()
            .filter(|camera| camera.is_previewable())
            .map(|camera| camera.id)
            .collect()
    } else {
        ids
    };

    let mut manager = PreviewManager::new(settings.max_previews, rtsp_factory());
    let started = if enlarged {
        let first = ids.first().copied().ok_or_else(|| refuse(ui, Msg::SelectRowsFirst))?;
        manager
            .open_enlarged(first, table, None)
            .map(|_| vec![first])
    } else {
        manager.start(&ids, table)
    };
    let started = match started {
        Ok(started) => started,
        Err(StartRefusal::NoSuccessfulCameras) => {
            return Err(refuse(ui, Msg::NoSuccessfulCameras))
        }
        Err(StartRefusal::LimitReached) => return Err(refuse(ui, Msg::PreviewLimitReached)),
    };
    for id in &started {
        ui.status(&Msg::PreviewStarted(*id));
    }
    for (id, cell) in manager.layout() {
        log::info!("camera #{} tile at row {} column {}", id, cell.row, cell.column);
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let deadline = (seconds > 0).then(|| Instant::now() + Duration::from_secs(seconds));
    let mut frames: BTreeMap<u32, u64> = BTreeMap::new();
    let mut open = started.len();
    while open > 0 && !stop.load(Ordering::SeqCst) {
        if deadline.map(|d| Instant::now() >= d).unwrap_or(false) {
            break;
        }
        let Some(event) = manager.next_event(Duration::from_millis(200)) else {
            continue;
        };
        match event {
            PreviewEvent::Frame { cam_id, frame, .. } => {
                let count = frames.entry(cam_id).or_insert(0);
                *count += 1;
                log::debug!(
                    "camera #{} frame {} ({}x{})",
                    cam_id,
                    count,
                    frame.width(),
                    frame.height()
                );
            }
            PreviewEvent::OpenFailed { cam_id, .. } => ui.status(&Msg::StreamOpenFailed(cam_id)),
            PreviewEvent::Disconnected { cam_id, .. } => ui.status(&Msg::StreamLost(cam_id)),
            PreviewEvent::Closed { cam_id, slot } => {
                log::debug!("camera #{} {:?} session closed", cam_id, slot);
                if slot == SlotKind::Tile || enlarged {
                    open = open.saturating_sub(1);
                }
            }
        }
    }
    manager.stop_all();

    for id in &started {
        println!("camera #{}: {} frame(s)", id, frames.get(id).copied().unwrap_or(0));
    }
    Ok(())
}

fn run_prefs(
    ui: &Ui,
    settings: &mut Settings,
    probe_threads: Option<usize>,
    max_previews: Option<usize>,
    port: Option<u16>,
    lang: Option<Lang>,
) -> Result<()> {
    let changed = probe_threads.is_some() || max_previews.is_some() || port.is_some() || lang.is_some();
    if let Some(threads) = probe_threads {
        settings.probe_threads = threads;
    }
    if let Some(previews) = max_previews {
        settings.max_previews = previews;
    }
    if let Some(port) = port {
        settings.port = port;
    }
    if let Some(lang) = lang {
        settings.lang = lang;
    }
    if changed {
        settings.save()?;
        ui.status(&Msg::PrefsSaved);
    }
    println!("probe_threads\t{}", settings.probe_threads);
    println!("max_previews\t{}", settings.max_previews);
    println!("port\t{}", settings.port);
    println!("lang\t{}", settings.lang.code());
    println!("db_path\t{}", settings.db_path);
    println!("file\t{}", settings.source_path.display());
    Ok(())
}

fn persist(store: &mut SqliteStore, table: &CameraTable, ids: &[u32]) -> Result<()> {
    let mut rows = ids.iter().filter_map(|id| table.get(*id));
    store.save_cameras(&mut rows)
}

/// Report a refused action in the operator's language and turn it into an error.
fn refuse(ui: &Ui, msg: Msg) -> anyhow::Error {
    ui.status(&msg);
    anyhow!("{}", msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn prefs_lang_is_saved_not_shadowed() -> Result<()> {
        let args = Args::try_parse_from(["camdash", "--ui", "plain", "prefs", "--lang", "en"])?;
        assert_eq!(args.ui_lang, None);
        let Command::Prefs { lang, .. } = args.command else {
            panic!("expected prefs");
        };
        assert_eq!(lang, Some(Lang::En));

        let dir = tempfile::tempdir()?;
        let mut settings = Settings {
            source_path: dir.path().join("prefs.json"),
            ..Settings::default()
        };
        let ui = Ui::from_args(Some("plain"), false, true, Lang::Ar);
        run_prefs(&ui, &mut settings, None, None, None, lang)?;
        assert_eq!(Settings::load_from(&settings.source_path)?.lang, Lang::En);
        Ok(())
    }

    #[test]
    fn run_language_flag_is_separate() -> Result<()> {
        let args = Args::try_parse_from(["camdash", "--ui-lang", "en", "list"])?;
        assert_eq!(args.ui_lang, Some(Lang::En));

        let cmd = Args::command();
        let flag = cmd
            .get_arguments()
            .find(|arg| arg.get_id() == "ui_lang")
            .expect("ui-lang flag");
        assert!(flag.get_env().is_none());
        Ok(())
    }
}
