//! A line scanner that turns an m3u8 byte stream into a [`Playlist`],
//! reporting every finished segment or stream to a [`PlaylistHandler`] as
//! soon as its last line has been read.
//!
//! # Example
//!
//! Parsing a playlist and let the parser figure out if it's a media or master playlist.
//!
//! ```
//! use m3u8_scan::{parse_playlist, Playlist};
//! use url::Url;
//!
//! let bytes = b"#EXTM3U\n#EXTINF:10.0,\nsegment0.ts\n#EXT-X-ENDLIST\n";
//! let base = Url::parse("https://example.com/vod/index.m3u8").unwrap();
//!
//! match parse_playlist(bytes, &base).unwrap() {
//!     Playlist::MediaPlaylist(pl) => assert_eq!(pl.segments.len(), 1),
//!     Playlist::MasterPlaylist(_) => unreachable!(),
//! }
//! ```
//!
//! Stopping early from a callback:
//!
//! ```
//! use m3u8_scan::{parse, Flow, MediaSegment, PlaylistHandler};
//! use url::Url;
//!
//! struct FirstOnly;
//!
//! impl PlaylistHandler for FirstOnly {
//!     fn media_segment(&mut self, _segment: &MediaSegment) -> Flow {
//!         Flow::Stop
//!     }
//! }
//!
//! let bytes: &[u8] = b"#EXTINF:4,\na.ts\n#EXTINF:4,\nb.ts\n";
//! let base = Url::parse("https://example.com/").unwrap();
//! let playlist = parse(bytes, &base, &mut FirstOnly).unwrap();
//! assert_eq!(playlist.as_media().unwrap().segments.len(), 1);
//! ```

use std::io::{BufRead, BufReader, Read};
use std::mem;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use nom::character::complete::{char, digit1};
use nom::combinator::{map_res, opt, rest};
use nom::number::complete::double;
use nom::sequence::{pair, preceded};
use nom::IResult;
use tracing::{debug, trace};
use url::Url;

use crate::error::{FormatError, FormatErrorKind, Result};
use crate::playlist::*;
use crate::tag::{Line, Tag};

/// Longest accepted line, in bytes, excluding the line terminator.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    pub max_line_length: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ParserOptions {
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }
}

/// Returned by the per-entity callbacks of a [`PlaylistHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop scanning after the current line. The playlist read so far is
    /// still returned and the end-of-playlist callback still fires.
    Stop,
}

/// Callbacks invoked synchronously, in file order, while a playlist is
/// being scanned. Every method has a no-op default.
pub trait PlaylistHandler {
    fn media_segment(&mut self, _segment: &MediaSegment) -> Flow {
        Flow::Continue
    }

    fn variant_stream(&mut self, _stream: &VariantStream) -> Flow {
        Flow::Continue
    }

    fn iframe_stream(&mut self, _stream: &IframeStream) -> Flow {
        Flow::Continue
    }

    /// Fires once, after the last line of a media playlist.
    fn media_playlist(&mut self, _playlist: &MediaPlaylist) {}

    /// Fires once, after the last line of a master playlist.
    fn master_playlist(&mut self, _playlist: &MasterPlaylist) {}
}

impl PlaylistHandler for () {}

/// Parse a playlist from a byte slice, without callbacks.
pub fn parse_playlist(input: &[u8], base_url: &Url) -> Result<Playlist> {
    parse(input, base_url, &mut ())
}

/// Parse a playlist, detecting whether it is a media or a master playlist.
///
/// URI lines and `URI` attributes are resolved against `base_url`.
pub fn parse<R: Read, H: PlaylistHandler>(reader: R, base_url: &Url, handler: &mut H) -> Result<Playlist> {
    parse_with_options(reader, base_url, handler, &ParserOptions::default())
}

pub fn parse_with_options<R: Read, H: PlaylistHandler>(
    reader: R,
    base_url: &Url,
    handler: &mut H,
    options: &ParserOptions,
) -> Result<Playlist> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut ctx = ScanContext::new(base_url);
    // Room for the longest line plus "\r\n".
    let limit = (options.max_line_length as u64).saturating_add(2);

    loop {
        buf.clear();
        if (&mut reader).take(limit).read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        ctx.line += 1;
        let line = ctx.line;

        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        if buf.len() > options.max_line_length {
            let kind = FormatErrorKind::LineTooLong {
                max: options.max_line_length,
            };
            return Err(FormatError::from(kind).at_line(line).into());
        }
        let mut text = std::str::from_utf8(&buf)
            .map_err(|_| FormatError::from(FormatErrorKind::InvalidUtf8).at_line(line))?;
        if line == 1 {
            text = text.strip_prefix('\u{feff}').unwrap_or(text);
        }

        if ctx.scan_line(text, handler).map_err(|e| e.at_line(line))? == Flow::Stop {
            debug!(line, "scan stopped by handler");
            break;
        }
    }

    Ok(ctx.finish(handler)?)
}

/// The playlist kind, and the playlist once the kind is known.
enum Kind {
    Undetermined,
    Media(MediaPlaylist),
    Master(MasterPlaylist),
}

/// Fields of the segment whose URI line hasn't been read yet.
#[derive(Default)]
struct PendingSegment {
    tag_line: Option<usize>,
    duration: f64,
    title: Option<String>,
    byte_range: Option<ByteRange>,
    discontinuity: bool,
    gap: bool,
    program_date_time: Option<DateTime<FixedOffset>>,
}

/// All state of a single scan.
struct ScanContext<'a> {
    base_url: &'a Url,
    kind: Kind,
    lines: Vec<Line>,
    version: u64,
    independent_segments: bool,
    /// 1-based number of the line being scanned.
    line: usize,

    /// `None` once the previous segment took `u64::MAX`.
    media_sequence: Option<u64>,
    discontinuity_sequence: u64,
    key: Option<Arc<Key>>,
    init_section: Option<Arc<MediaInitMap>>,
    byte_range_offset: u64,
    segment: PendingSegment,
    stream_inf: Option<(usize, StreamInf)>,
}

impl<'a> ScanContext<'a> {
    fn new(base_url: &'a Url) -> Self {
        ScanContext {
            base_url,
            kind: Kind::Undetermined,
            lines: Vec::new(),
            version: 1,
            independent_segments: false,
            line: 0,
            media_sequence: Some(0),
            discontinuity_sequence: 0,
            key: None,
            init_section: None,
            byte_range_offset: 0,
            segment: PendingSegment::default(),
            stream_inf: None,
        }
    }

    fn media(&mut self) -> std::result::Result<&mut MediaPlaylist, FormatError> {
        if let Kind::Undetermined = self.kind {
            debug!(line = self.line, "playlist is a media playlist");
            self.kind = Kind::Media(MediaPlaylist::default());
        }
        match &mut self.kind {
            Kind::Media(playlist) => Ok(playlist),
            _ => Err(FormatErrorKind::MixedPlaylist.into()),
        }
    }

    fn master(&mut self) -> std::result::Result<&mut MasterPlaylist, FormatError> {
        if let Kind::Undetermined = self.kind {
            debug!(line = self.line, "playlist is a master playlist");
            self.kind = Kind::Master(MasterPlaylist::default());
        }
        match &mut self.kind {
            Kind::Master(playlist) => Ok(playlist),
            _ => Err(FormatErrorKind::MixedPlaylist.into()),
        }
    }

    fn scan_line<H: PlaylistHandler>(
        &mut self,
        text: &str,
        handler: &mut H,
    ) -> std::result::Result<Flow, FormatError> {
        let index = self.lines.len();
        let trimmed = text.trim_start_matches([' ', '\t']);

        if trimmed.trim_end().is_empty() {
            self.lines.push(Line::Blank(text.to_string()));
            Ok(Flow::Continue)
        } else if trimmed.starts_with('#') {
            let mut tag = Tag::from_line(text);
            let flow = self.directive(&mut tag, index, handler)?;
            self.lines.push(Line::Tag(tag));
            Ok(flow)
        } else {
            let flow = self.resource(trimmed, index, handler)?;
            self.lines.push(Line::Uri(text.to_string()));
            Ok(flow)
        }
    }

    fn directive<H: PlaylistHandler>(
        &mut self,
        tag: &mut Tag,
        index: usize,
        handler: &mut H,
    ) -> std::result::Result<Flow, FormatError> {
        trace!(line = self.line, tag = tag.name(), "directive");

        match tag.name() {
            "EXT-X-VERSION" => self.version = decimal("EXT-X-VERSION", tag.value())?,
            "EXT-X-INDEPENDENT-SEGMENTS" => self.independent_segments = true,
            "EXT-X-KEY" => {
                let key = Key::from_attributes(tag.attributes()?, self.base_url, index)?;
                self.key = Some(Arc::new(key));
            }
            "EXT-X-MAP" => {
                let map = MediaInitMap::from_attributes(
                    tag.attributes()?,
                    self.base_url,
                    index,
                    self.key.clone(),
                )?;
                self.init_section = Some(Arc::new(map));
            }

            // Master playlist tags
            "EXT-X-STREAM-INF" => {
                self.master()?;
                let stream = StreamInf::from_attributes(tag.attributes()?, "EXT-X-STREAM-INF")?;
                self.stream_inf = Some((index, stream));
            }
            "EXT-X-I-FRAME-STREAM-INF" => {
                self.master()?;
                let stream = IframeStream::from_attributes(tag.attributes()?, self.base_url, index)?;
                let flow = handler.iframe_stream(&stream);
                self.master()?.iframe_streams.push(stream);
                return Ok(flow);
            }
            "EXT-X-MEDIA" => {
                self.master()?;
                let rendition = Rendition::from_attributes(tag.attributes()?, self.base_url, index)?;
                self.master()?.push_rendition(rendition);
            }

            // Media playlist tags
            "EXT-X-MEDIA-SEQUENCE" => {
                let sequence = decimal("EXT-X-MEDIA-SEQUENCE", tag.value())?;
                self.media()?.media_sequence = sequence;
                self.media_sequence = Some(sequence);
            }
            "EXT-X-DISCONTINUITY-SEQUENCE" => {
                let sequence = decimal("EXT-X-DISCONTINUITY-SEQUENCE", tag.value())?;
                self.media()?.discontinuity_sequence = sequence;
                self.discontinuity_sequence = sequence;
            }
            "EXT-X-TARGETDURATION" => {
                let duration = decimal("EXT-X-TARGETDURATION", tag.value())?;
                self.media()?.target_duration = Some(duration);
            }
            "EXT-X-PLAYLIST-TYPE" => {
                let value = tag.value().trim();
                let playlist_type: MediaPlaylistType = value.parse().map_err(|_| FormatErrorKind::InvalidValue {
                    tag: "EXT-X-PLAYLIST-TYPE",
                    value: value.to_string(),
                    expected: "EVENT or VOD",
                })?;
                self.media()?.playlist_type = Some(playlist_type);
            }
            "EXT-X-ENDLIST" => self.media()?.end_list = true,
            "EXT-X-I-FRAMES-ONLY" => self.media()?.i_frames_only = true,

            // Media segment tags
            "EXTINF" => {
                self.media()?;
                let (duration, title) = extinf(tag.value())?;
                self.segment.tag_line = Some(index);
                self.segment.duration = duration;
                self.segment.title = title;
            }
            "EXT-X-BYTERANGE" => {
                self.media()?;
                let range = ByteRange::parse(tag.value().trim(), self.byte_range_offset)?;
                self.byte_range_offset = range.end().ok_or(FormatErrorKind::CounterOverflow {
                    tag: "EXT-X-BYTERANGE",
                })?;
                self.segment.byte_range = Some(range);
            }
            "EXT-X-DISCONTINUITY" => {
                self.media()?;
                self.discontinuity_sequence = self.discontinuity_sequence.checked_add(1).ok_or(
                    FormatErrorKind::CounterOverflow {
                        tag: "EXT-X-DISCONTINUITY-SEQUENCE",
                    },
                )?;
                self.segment.discontinuity = true;
            }
            "EXT-X-GAP" => {
                self.media()?;
                self.segment.gap = true;
            }
            "EXT-X-PROGRAM-DATE-TIME" => {
                self.media()?;
                self.segment.program_date_time = Some(program_date_time(tag.value())?);
            }

            name => trace!(line = self.line, tag = name, "ignoring directive"),
        }

        Ok(Flow::Continue)
    }

    /// A URI line ends the pending variant stream in a master playlist, and
    /// the pending segment otherwise.
    fn resource<H: PlaylistHandler>(
        &mut self,
        text: &str,
        index: usize,
        handler: &mut H,
    ) -> std::result::Result<Flow, FormatError> {
        let text = text.trim_end();
        let uri = self.base_url.join(text).map_err(|source| FormatErrorKind::InvalidUrl {
            text: text.to_string(),
            source,
        })?;

        if let Kind::Master(_) = self.kind {
            let (tag_line, stream) = self
                .stream_inf
                .take()
                .ok_or_else(|| FormatError::from(FormatErrorKind::OrphanUri))?;
            let stream = VariantStream {
                uri,
                uri_line: index,
                tag_line,
                stream,
            };
            let flow = handler.variant_stream(&stream);
            self.master()?.variant_streams.push(stream);
            return Ok(flow);
        }

        let media_sequence = self.media_sequence.ok_or(FormatErrorKind::CounterOverflow {
            tag: "EXT-X-MEDIA-SEQUENCE",
        })?;
        let pending = mem::take(&mut self.segment);
        let segment = MediaSegment {
            uri,
            uri_line: index,
            tag_line: pending.tag_line,
            duration: pending.duration,
            title: pending.title,
            byte_range: pending.byte_range,
            discontinuity: pending.discontinuity,
            gap: pending.gap,
            program_date_time: pending.program_date_time,
            media_sequence,
            discontinuity_sequence: self.discontinuity_sequence,
            key: self.key.clone(),
            init_section: self.init_section.clone(),
            bitrate: None,
        };
        self.media_sequence = media_sequence.checked_add(1);

        let playlist = self.media()?;
        let flow = handler.media_segment(&segment);
        playlist.segments.push(segment);
        Ok(flow)
    }

    fn finish<H: PlaylistHandler>(self, handler: &mut H) -> std::result::Result<Playlist, FormatError> {
        match self.kind {
            Kind::Undetermined => Err(FormatErrorKind::AmbiguousPlaylist.into()),
            Kind::Media(mut playlist) => {
                playlist.version = self.version;
                playlist.lines = self.lines;
                playlist.independent_segments = self.independent_segments;
                debug!(
                    lines = playlist.lines.len(),
                    segments = playlist.segments.len(),
                    "parsed media playlist"
                );
                handler.media_playlist(&playlist);
                Ok(Playlist::MediaPlaylist(playlist))
            }
            Kind::Master(mut playlist) => {
                playlist.version = self.version;
                playlist.lines = self.lines;
                playlist.independent_segments = self.independent_segments;
                debug!(
                    lines = playlist.lines.len(),
                    variants = playlist.variant_streams.len(),
                    iframes = playlist.iframe_streams.len(),
                    "parsed master playlist"
                );
                handler.master_playlist(&playlist);
                Ok(Playlist::MasterPlaylist(playlist))
            }
        }
    }
}

// -----------------------------------------------------------------------------------------------
// Directive values
// -----------------------------------------------------------------------------------------------

fn decimal(tag: &'static str, value: &str) -> std::result::Result<u64, FormatError> {
    let value = value.trim();
    match number(value) {
        Ok(("", n)) => Ok(n),
        _ => Err(FormatErrorKind::InvalidValue {
            tag,
            value: value.to_string(),
            expected: "a decimal integer",
        }
        .into()),
    }
}

/// `#EXTINF:<duration>,[<title>]`
fn extinf(value: &str) -> std::result::Result<(f64, Option<String>), FormatError> {
    let value = value.trim();
    match duration_title_tag(value) {
        Ok(("", (duration, title))) => {
            let title = title.map(str::trim).filter(|t| !t.is_empty()).map(String::from);
            Ok((duration, title))
        }
        _ => Err(FormatErrorKind::InvalidValue {
            tag: "EXTINF",
            value: value.to_string(),
            expected: "<duration>,[<title>]",
        }
        .into()),
    }
}

fn program_date_time(value: &str) -> std::result::Result<DateTime<FixedOffset>, FormatError> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value).map_err(|source| {
        FormatErrorKind::InvalidTimestamp {
            text: value.to_string(),
            source,
        }
        .into()
    })
}

fn duration_title_tag(i: &str) -> IResult<&str, (f64, Option<&str>)> {
    pair(double, opt(preceded(char(','), rest)))(i)
}

pub(crate) fn number(i: &str) -> IResult<&str, u64> {
    map_res(digit1, str::parse::<u64>)(i)
}

pub(crate) fn byte_range_val(i: &str) -> IResult<&str, (u64, Option<u64>)> {
    pair(number, opt(preceded(char('@'), number)))(i)
}
