use std::fs::File;
use std::path::PathBuf;

use m3u8_scan::{parse, Flow, MediaSegment, Playlist, PlaylistHandler, VariantStream};
use tracing_subscriber::EnvFilter;
use url::Url;

struct Printer;

impl PlaylistHandler for Printer {
    fn media_segment(&mut self, segment: &MediaSegment) -> Flow {
        println!("#{} {:>8.3}s {}", segment.media_sequence, segment.duration, segment.uri);
        Flow::Continue
    }

    fn variant_stream(&mut self, stream: &VariantStream) -> Flow {
        println!("{:>10} bps {}", stream.stream.bandwidth, stream.uri);
        Flow::Continue
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| "playlist.m3u8".into());
    let base = Url::from_file_path(std::fs::canonicalize(&path)?)
        .map_err(|_| format!("can't make a URL of {}", path.display()))?;

    match parse(File::open(&path)?, &base, &mut Printer)? {
        Playlist::MasterPlaylist(pl) => println!("Master playlist, version {}", pl.version),
        Playlist::MediaPlaylist(pl) => println!(
            "Media playlist, version {}, {} segments, {:.3}s",
            pl.version,
            pl.segments.len(),
            pl.duration()
        ),
    }
    Ok(())
}
