use anyhow::{anyhow, bail, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::camera::Camera;
use crate::frame::Frame;
use crate::ingest::{redact_credentials, SourceFactory};

pub const JPEG_QUALITY: u8 = 90;

/// Encoding picked from the output extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotFormat {
    Png,
    Jpeg,
}

impl SnapshotFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => SnapshotFormat::Png,
            _ => SnapshotFormat::Jpeg,
        }
    }
}

/// Read one frame from a successful camera and write it to `output`.
pub fn capture(camera: &Camera, factory: &SourceFactory, output: &Path) -> Result<SnapshotFormat> {
    if !camera.is_previewable() {
        bail!("camera #{} is not in a successful state", camera.id);
    }
    let mut source = factory(&camera.url)?;
    source
        .connect()
        .with_context(|| format!("open {}", redact_credentials(&camera.url)))?;
    let frame = source
        .next_frame()
        .map_err(|e| anyhow!("camera #{}: no frame received: {}", camera.id, e))?;
    let format = SnapshotFormat::for_path(output);
    write_frame(&frame, output, format)?;
    log::info!(
        "snapshot of camera #{} ({}x{}) written to {}",
        camera.id,
        frame.width(),
        frame.height(),
        output.display()
    );
    Ok(format)
}

pub fn write_frame(frame: &Frame, output: &Path, format: SnapshotFormat) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("failed to create snapshot {}", output.display()))?;
    encode_frame(frame, format, file)
        .with_context(|| format!("failed to write snapshot {}", output.display()))
}

fn encode_frame<W: Write>(frame: &Frame, format: SnapshotFormat, sink: W) -> Result<()> {
    let mut writer = BufWriter::new(sink);
    let image = frame.image();
    match format {
        SnapshotFormat::Png => image.write_with_encoder(PngEncoder::new(&mut writer))?,
        SnapshotFormat::Jpeg => {
            image.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))?
        }
    }
    writer.flush().context("flush encoded image")?;
    Ok(())
}
