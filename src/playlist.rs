//! Contains all the structs produced by the scanner.
//!
//! The main type here is the `Playlist` enum.
//! Which is either a `MasterPlaylist` or a `MediaPlaylist`.
//!
//! Both keep every line they were parsed from, so the playlist can be
//! written back out. The segments, streams and renditions are the decoded
//! view of those lines; their `*_line` fields index into `lines`.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use url::Url;

use crate::attributes::AttributeList;
use crate::error::{FormatError, FormatErrorKind, WrongTypeError};
use crate::parser::byte_range_val;
use crate::tag::Line;
use crate::value::{Resolution, Value};

/// [Playlist](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.1),
/// can either be a `MasterPlaylist` or a `MediaPlaylist`.
///
/// A Playlist is a Media Playlist if all URI lines in the Playlist
/// identify Media Segments.  A Playlist is a Master Playlist if all URI
/// lines in the Playlist identify Media Playlists.  A Playlist MUST be
/// either a Media Playlist or a Master Playlist; all other Playlists are invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    MasterPlaylist(MasterPlaylist),
    MediaPlaylist(MediaPlaylist),
}

impl Playlist {
    pub fn version(&self) -> u64 {
        match self {
            Playlist::MasterPlaylist(p) => p.version,
            Playlist::MediaPlaylist(p) => p.version,
        }
    }

    pub fn lines(&self) -> &[Line] {
        match self {
            Playlist::MasterPlaylist(p) => &p.lines,
            Playlist::MediaPlaylist(p) => &p.lines,
        }
    }

    pub fn as_master(&self) -> Option<&MasterPlaylist> {
        match self {
            Playlist::MasterPlaylist(p) => Some(p),
            Playlist::MediaPlaylist(_) => None,
        }
    }

    pub fn as_media(&self) -> Option<&MediaPlaylist> {
        match self {
            Playlist::MediaPlaylist(p) => Some(p),
            Playlist::MasterPlaylist(_) => None,
        }
    }

    pub fn normalize(&mut self) {
        match self {
            Playlist::MasterPlaylist(p) => p.normalize(),
            Playlist::MediaPlaylist(p) => p.normalize(),
        }
    }

    pub fn write_to<T: Write>(&self, w: &mut T) -> io::Result<()> {
        write_lines(self.lines(), w)
    }
}

// -----------------------------------------------------------------------------------------------
// Master Playlist
// -----------------------------------------------------------------------------------------------

/// A [Master Playlist](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.4)
/// provides a set of Variant Streams, each of which
/// describes a different version of the same content.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterPlaylist {
    /// `#EXT-X-VERSION:<n>`, 1 when absent.
    pub version: u64,
    pub lines: Vec<Line>,
    pub variant_streams: Vec<VariantStream>,
    pub iframe_streams: Vec<IframeStream>,
    /// `#EXT-X-MEDIA` renditions by type and `GROUP-ID`, in declaration order.
    pub rendition_groups: HashMap<RenditionType, HashMap<String, Vec<Rendition>>>,
    /// `#EXT-X-INDEPENDENT-SEGMENTS`
    pub independent_segments: bool,
}

impl Default for MasterPlaylist {
    fn default() -> Self {
        MasterPlaylist {
            version: 1,
            lines: Vec::new(),
            variant_streams: Vec::new(),
            iframe_streams: Vec::new(),
            rendition_groups: HashMap::new(),
            independent_segments: false,
        }
    }
}

impl MasterPlaylist {
    /// The renditions of one group, empty when the group doesn't exist.
    pub fn renditions(&self, rendition_type: RenditionType, group_id: &str) -> &[Rendition] {
        self.rendition_groups
            .get(&rendition_type)
            .and_then(|groups| groups.get(group_id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn push_rendition(&mut self, rendition: Rendition) {
        self.rendition_groups
            .entry(rendition.rendition_type)
            .or_default()
            .entry(rendition.group_id.clone())
            .or_default()
            .push(rendition);
    }

    /// Write every parsed attribute list back into its tag.
    pub fn normalize(&mut self) {
        normalize_lines(&mut self.lines);
    }

    pub fn write_to<T: Write>(&self, w: &mut T) -> io::Result<()> {
        write_lines(&self.lines, w)
    }
}

/// Attributes shared by [`#EXT-X-STREAM-INF`](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.4.2)
/// and [`#EXT-X-I-FRAME-STREAM-INF`](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.4.3).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamInf {
    /// Peak segment bit rate in bits per second. Required.
    pub bandwidth: u64,
    pub average_bandwidth: Option<u64>,
    pub score: Option<f64>,
    pub codecs: Option<String>,
    pub resolution: Option<Resolution>,
    pub hdcp_level: Option<HdcpLevel>,
    pub allowed_cpc: Option<String>,
    /// `SDR`, `HLG` or `PQ`
    pub video_range: Option<String>,
    pub stable_variant_id: Option<String>,
    pub video: Option<String>,
    // Only meaningful on EXT-X-STREAM-INF.
    pub frame_rate: Option<f64>,
    pub audio: Option<String>,
    pub subtitles: Option<String>,
    pub closed_captions: Option<ClosedCaptions>,
}

impl StreamInf {
    pub fn from_attributes(attrs: &AttributeList, tag: &'static str) -> Result<StreamInf, FormatError> {
        Ok(StreamInf {
            bandwidth: typed("BANDWIDTH", required(attrs, tag, "BANDWIDTH")?.as_unsigned())?,
            average_bandwidth: optional(attrs, "AVERAGE-BANDWIDTH", Value::as_unsigned)?,
            score: optional(attrs, "SCORE", Value::as_number)?,
            codecs: optional_string(attrs, "CODECS")?,
            resolution: optional(attrs, "RESOLUTION", Value::as_resolution)?,
            hdcp_level: optional_enum(attrs, "HDCP-LEVEL")?,
            allowed_cpc: optional_string(attrs, "ALLOWED-CPC")?,
            video_range: optional(attrs, "VIDEO-RANGE", |v| v.as_enum().map(String::from))?,
            stable_variant_id: optional_string(attrs, "STABLE-VARIANT-ID")?,
            video: optional_string(attrs, "VIDEO")?,
            frame_rate: optional(attrs, "FRAME-RATE", Value::as_number)?,
            audio: optional_string(attrs, "AUDIO")?,
            subtitles: optional_string(attrs, "SUBTITLES")?,
            closed_captions: match attribute(attrs, "CLOSED-CAPTIONS") {
                None => None,
                Some(value) => Some(ClosedCaptions::from_value(value)?),
            },
        })
    }
}

/// [`#EXT-X-STREAM-INF:<attribute-list>`](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.4.2)
/// followed by its URI line.
///
/// A Variant Stream includes a Media Playlist that specifies media
/// encoded at a particular bit rate, in a particular format, and at a
/// particular resolution for media containing video.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantStream {
    pub uri: Url,
    pub uri_line: usize,
    pub tag_line: usize,
    pub stream: StreamInf,
}

/// [`#EXT-X-I-FRAME-STREAM-INF:<attribute-list>`](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.4.3)
///
/// Carries its own `URI` attribute, so the tag line alone declares it.
#[derive(Debug, Clone, PartialEq)]
pub struct IframeStream {
    pub uri: Url,
    pub tag_line: usize,
    pub stream: StreamInf,
}

impl IframeStream {
    pub fn from_attributes(
        attrs: &AttributeList,
        base_url: &Url,
        tag_line: usize,
    ) -> Result<IframeStream, FormatError> {
        const TAG: &str = "EXT-X-I-FRAME-STREAM-INF";
        let stream = StreamInf::from_attributes(attrs, TAG)?;
        let uri = typed("URI", required(attrs, TAG, "URI")?.as_string())?;
        Ok(IframeStream {
            uri: resolve(base_url, uri)?,
            tag_line,
            stream,
        })
    }
}

/// [`#EXT-X-MEDIA:<attribute-list>`](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.4.1)
///
/// The EXT-X-MEDIA tag is used to relate Media Playlists that contain
/// alternative Renditions of the same content.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendition {
    pub tag_line: usize,
    pub rendition_type: RenditionType,
    /// Absent only for closed captions.
    pub uri: Option<Url>,
    pub group_id: String,
    pub name: String, // All EXT-X-MEDIA tags in the same Group MUST have different NAME attributes.
    pub language: Option<String>,
    pub assoc_language: Option<String>,
    pub stable_rendition_id: Option<String>,
    pub default: bool,    // Its absence indicates an implicit value of NO
    pub autoselect: bool, // Its absence indicates an implicit value of NO
    pub forced: bool,     // Its absence indicates an implicit value of NO
    pub instream_id: Option<String>,
    pub characteristics: Vec<String>,
    pub channels: Option<RenditionChannels>,
}

impl Rendition {
    pub fn from_attributes(
        attrs: &AttributeList,
        base_url: &Url,
        tag_line: usize,
    ) -> Result<Rendition, FormatError> {
        const TAG: &str = "EXT-X-MEDIA";
        let rendition_type: RenditionType = parse_enum("TYPE", required(attrs, TAG, "TYPE")?)?;
        let uri = match attribute(attrs, "URI") {
            Some(value) => Some(resolve(base_url, typed("URI", value.as_string())?)?),
            None if rendition_type == RenditionType::ClosedCaptions => None,
            None => {
                return Err(FormatErrorKind::MissingAttribute {
                    tag: TAG,
                    name: "URI",
                }
                .into())
            }
        };
        let channels = match optional_string(attrs, "CHANNELS")? {
            Some(text) => Some(RenditionChannels::parse(rendition_type, &text)?),
            None => None,
        };

        Ok(Rendition {
            tag_line,
            rendition_type,
            uri,
            group_id: typed("GROUP-ID", required(attrs, TAG, "GROUP-ID")?.as_string())?.to_string(),
            name: typed("NAME", required(attrs, TAG, "NAME")?.as_string())?.to_string(),
            language: optional_string(attrs, "LANGUAGE")?,
            assoc_language: optional_string(attrs, "ASSOC-LANGUAGE")?,
            stable_rendition_id: optional_string(attrs, "STABLE-RENDITION-ID")?,
            default: optional(attrs, "DEFAULT", Value::as_yes_no)?.unwrap_or(false),
            autoselect: optional(attrs, "AUTOSELECT", Value::as_yes_no)?.unwrap_or(false),
            forced: optional(attrs, "FORCED", Value::as_yes_no)?.unwrap_or(false),
            instream_id: optional_string(attrs, "INSTREAM-ID")?,
            characteristics: optional_string(attrs, "CHARACTERISTICS")?
                .map(|text| text.split(',').map(String::from).collect())
                .unwrap_or_default(),
            channels,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenditionType {
    Audio,
    Video,
    Subtitles,
    ClosedCaptions,
}

impl FromStr for RenditionType {
    type Err = String;

    fn from_str(s: &str) -> Result<RenditionType, String> {
        match s {
            "AUDIO" => Ok(RenditionType::Audio),
            "VIDEO" => Ok(RenditionType::Video),
            "SUBTITLES" => Ok(RenditionType::Subtitles),
            "CLOSED-CAPTIONS" => Ok(RenditionType::ClosedCaptions),
            _ => Err(format!("Unable to create RenditionType from {:?}", s)),
        }
    }
}

impl fmt::Display for RenditionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            RenditionType::Audio => "AUDIO",
            RenditionType::Video => "VIDEO",
            RenditionType::Subtitles => "SUBTITLES",
            RenditionType::ClosedCaptions => "CLOSED-CAPTIONS",
        })
    }
}

/// `CHANNELS="<count>[/<identifiers>]"`. Only audio renditions define its
/// parameters; for other types it is kept empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenditionChannels {
    pub count: Option<u64>,
    pub audio_coding_identifiers: Vec<String>,
}

impl RenditionChannels {
    pub fn parse(rendition_type: RenditionType, text: &str) -> Result<RenditionChannels, FormatError> {
        let mut channels = RenditionChannels::default();
        if rendition_type != RenditionType::Audio {
            return Ok(channels);
        }
        let mut parts = text.split('/');
        if let Some(count) = parts.next() {
            channels.count = Some(count.parse::<u64>().map_err(|_| FormatErrorKind::InvalidValue {
                tag: "CHANNELS",
                value: text.to_string(),
                expected: "a channel count",
            })?);
        }
        if let Some(identifiers) = parts.next() {
            channels.audio_coding_identifiers = identifiers.split(',').map(String::from).collect();
        }
        Ok(channels)
    }
}

// EXT-X-STREAM-INF
//
// HDCP-LEVEL
// The value is an enumerated-string; valid strings are TYPE-0, TYPE-
// 1, and NONE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdcpLevel {
    Type0,
    Type1,
    None,
}

impl FromStr for HdcpLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<HdcpLevel, String> {
        match s {
            "TYPE-0" => Ok(HdcpLevel::Type0),
            "TYPE-1" => Ok(HdcpLevel::Type1),
            "NONE" => Ok(HdcpLevel::None),
            _ => Err(format!("Unable to create HdcpLevel from {:?}", s)),
        }
    }
}

impl fmt::Display for HdcpLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            HdcpLevel::Type0 => "TYPE-0",
            HdcpLevel::Type1 => "TYPE-1",
            HdcpLevel::None => "NONE",
        })
    }
}

// EXT-X-STREAM-INF
//
// CLOSED-CAPTIONS
// The value can be either a quoted-string or an enumerated-string
// with the value NONE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosedCaptions {
    None,
    GroupId(String),
}

impl ClosedCaptions {
    fn from_value(value: &Value) -> Result<ClosedCaptions, FormatError> {
        let text = typed("CLOSED-CAPTIONS", value.as_string_or_enum())?;
        match value {
            Value::String(_) => Ok(ClosedCaptions::GroupId(text.to_string())),
            _ if text == "NONE" => Ok(ClosedCaptions::None),
            _ => Err(FormatErrorKind::InvalidEnum {
                name: "CLOSED-CAPTIONS",
                value: text.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for ClosedCaptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClosedCaptions::None => write!(f, "NONE"),
            ClosedCaptions::GroupId(gid) => write!(f, "\"{}\"", gid),
        }
    }
}

// -----------------------------------------------------------------------------------------------
// Media Playlist
// -----------------------------------------------------------------------------------------------

/// A [Media Playlist](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.3)
/// contains a list of Media Segments, which when played
/// sequentially will play the multimedia presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    /// `#EXT-X-VERSION:<n>`, 1 when absent.
    pub version: u64,
    pub lines: Vec<Line>,
    pub segments: Vec<MediaSegment>,
    /// `#EXT-X-MEDIA-SEQUENCE:<number>`
    pub media_sequence: u64,
    /// `#EXT-X-DISCONTINUITY-SEQUENCE:<number>`
    pub discontinuity_sequence: u64,
    /// `#EXT-X-TARGETDURATION:<s>`
    pub target_duration: Option<u64>,
    /// `#EXT-X-PLAYLIST-TYPE`
    pub playlist_type: Option<MediaPlaylistType>,
    /// `#EXT-X-ENDLIST`
    pub end_list: bool,
    /// `#EXT-X-I-FRAMES-ONLY`
    pub i_frames_only: bool,
    /// `#EXT-X-INDEPENDENT-SEGMENTS`
    pub independent_segments: bool,
}

impl Default for MediaPlaylist {
    fn default() -> Self {
        MediaPlaylist {
            version: 1,
            lines: Vec::new(),
            segments: Vec::new(),
            media_sequence: 0,
            discontinuity_sequence: 0,
            target_duration: None,
            playlist_type: None,
            end_list: false,
            i_frames_only: false,
            independent_segments: false,
        }
    }
}

impl MediaPlaylist {
    /// Sum of all segment durations, in seconds.
    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Write every parsed attribute list back into its tag.
    pub fn normalize(&mut self) {
        normalize_lines(&mut self.lines);
    }

    pub fn write_to<T: Write>(&self, w: &mut T) -> io::Result<()> {
        write_lines(&self.lines, w)
    }
}

/// [`#EXT-X-PLAYLIST-TYPE:<EVENT|VOD>`](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.3.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPlaylistType {
    Event,
    Vod,
}

impl FromStr for MediaPlaylistType {
    type Err = String;

    fn from_str(s: &str) -> Result<MediaPlaylistType, String> {
        match s {
            "EVENT" => Ok(MediaPlaylistType::Event),
            "VOD" => Ok(MediaPlaylistType::Vod),
            _ => Err(format!("Unable to create MediaPlaylistType from {:?}", s)),
        }
    }
}

// -----------------------------------------------------------------------------------------------
// Media Segment
// -----------------------------------------------------------------------------------------------

/// A [Media Segment](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-3)
/// is specified by a URI and optionally a byte range.
///
/// The last group of fields is not declared on the segment itself; the
/// scanner stamps the state in effect when the segment's URI line is read.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    pub uri: Url,
    pub uri_line: usize,
    /// Line of the `#EXTINF` tag, if the segment had one.
    pub tag_line: Option<usize>,
    /// `#EXTINF:<duration>,[<title>]`, in seconds
    pub duration: f64,
    /// `#EXTINF:<duration>,[<title>]`
    pub title: Option<String>,
    /// `#EXT-X-BYTERANGE:<n>[@<o>]`
    pub byte_range: Option<ByteRange>,
    /// `#EXT-X-DISCONTINUITY`
    pub discontinuity: bool,
    /// `#EXT-X-GAP`
    pub gap: bool,
    /// `#EXT-X-PROGRAM-DATE-TIME:<YYYY-MM-DDThh:mm:ssZ>`
    pub program_date_time: Option<DateTime<FixedOffset>>,

    pub media_sequence: u64,
    pub discontinuity_sequence: u64,
    /// `#EXT-X-KEY` in effect for this segment.
    pub key: Option<Arc<Key>>,
    /// `#EXT-X-MAP` in effect for this segment.
    pub init_section: Option<Arc<MediaInitMap>>,
    /// Reserved. No directive populates it.
    pub bitrate: Option<u64>,
}

/// [`#EXT-X-KEY:<attribute-list>`](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.2.4)
///
/// Media Segments MAY be encrypted.  The EXT-X-KEY tag specifies how to
/// decrypt them.  It applies to every Media Segment that appears between
/// it and the next EXT-X-KEY tag in the Playlist file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub tag_line: usize,
    pub method: KeyMethod,
    pub uri: Option<Url>,
    /// Initialization vector, 128 bits for `AES-128`. The length is not checked.
    pub iv: Option<Vec<u8>>,
    pub key_format: Option<String>,
    /// `KEYFORMATVERSIONS="1/2/5"`, `[1]` when absent.
    pub key_format_versions: Vec<u64>,
}

impl Key {
    pub fn from_attributes(
        attrs: &AttributeList,
        base_url: &Url,
        tag_line: usize,
    ) -> Result<Key, FormatError> {
        const TAG: &str = "EXT-X-KEY";
        let method: KeyMethod = parse_enum("METHOD", required(attrs, TAG, "METHOD")?)?;
        let uri = match optional_string(attrs, "URI")? {
            Some(text) => Some(resolve(base_url, &text)?),
            None => None,
        };
        let iv = optional(attrs, "IV", Value::as_bytes)?.map(<[u8]>::to_vec);
        let key_format_versions = match optional_string(attrs, "KEYFORMATVERSIONS")? {
            Some(text) => text
                .split('/')
                .map(|part| {
                    part.parse::<u64>().map_err(|_| {
                        FormatError::from(FormatErrorKind::InvalidValue {
                            tag: TAG,
                            value: text.clone(),
                            expected: "a '/' separated list of versions",
                        })
                    })
                })
                .collect::<Result<Vec<u64>, FormatError>>()?,
            None => vec![1],
        };

        Ok(Key {
            tag_line,
            method,
            uri,
            iv,
            key_format: optional_string(attrs, "KEYFORMAT")?,
            key_format_versions,
        })
    }
}

// EXT-X-KEY
//
// METHOD
// The value is an enumerated-string that specifies the encryption
// method. The methods defined are: NONE, AES-128, and SAMPLE-AES.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMethod {
    None,
    Aes128,
    SampleAes,
}

impl FromStr for KeyMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<KeyMethod, String> {
        match s {
            "NONE" => Ok(KeyMethod::None),
            "AES-128" => Ok(KeyMethod::Aes128),
            "SAMPLE-AES" => Ok(KeyMethod::SampleAes),
            _ => Err(format!("Unable to create KeyMethod from {:?}", s)),
        }
    }
}

impl fmt::Display for KeyMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyMethod::None => write!(f, "NONE"),
            KeyMethod::Aes128 => write!(f, "AES-128"),
            KeyMethod::SampleAes => write!(f, "SAMPLE-AES"),
        }
    }
}

/// [`#EXT-X-MAP:<attribute-list>`](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.2.5)
///
/// The EXT-X-MAP tag specifies how to obtain the Media Initialization Section
/// required to parse the applicable Media Segments.
/// It applies to every Media Segment that appears after it in the
/// Playlist until the next EXT-X-MAP tag or until the end of the
/// playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInitMap {
    pub tag_line: usize,
    pub uri: Url,
    pub byte_range: Option<ByteRange>,
    /// The `#EXT-X-KEY` in effect at the `#EXT-X-MAP` line.
    pub key: Option<Arc<Key>>,
}

impl MediaInitMap {
    pub fn from_attributes(
        attrs: &AttributeList,
        base_url: &Url,
        tag_line: usize,
        key: Option<Arc<Key>>,
    ) -> Result<MediaInitMap, FormatError> {
        const TAG: &str = "EXT-X-MAP";
        let uri = typed("URI", required(attrs, TAG, "URI")?.as_string())?;
        let byte_range = match optional_string(attrs, "BYTERANGE")? {
            Some(text) => Some(ByteRange::parse(&text, 0)?),
            None => None,
        };
        Ok(MediaInitMap {
            tag_line,
            uri: resolve(base_url, uri)?,
            byte_range,
            key,
        })
    }
}

/// [`#EXT-X-BYTERANGE:<n>[@<o>]`](https://tools.ietf.org/html/draft-pantos-http-live-streaming-19#section-4.3.2.2)
///
/// The EXT-X-BYTERANGE tag indicates that a Media Segment is a sub-range
/// of the resource identified by its URI.  It applies only to the next
/// URI line that follows it in the Playlist.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub length: u64,
    /// Taken from the end of the previous sub-range when not written.
    pub offset: u64,
}

impl ByteRange {
    /// Parse `<n>[@<o>]`, using `default_offset` when `@<o>` is absent.
    pub fn parse(text: &str, default_offset: u64) -> Result<ByteRange, FormatError> {
        match byte_range_val(text) {
            Ok(("", (length, offset))) => Ok(ByteRange {
                length,
                offset: offset.unwrap_or(default_offset),
            }),
            _ => Err(FormatErrorKind::InvalidValue {
                tag: "EXT-X-BYTERANGE",
                value: text.to_string(),
                expected: "<length>[@<offset>]",
            }
            .into()),
        }
    }

    /// First byte after the range, `None` when it lies past `u64::MAX`.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.length, self.offset)
    }
}

// -----------------------------------------------------------------------------------------------
// Rendering
// -----------------------------------------------------------------------------------------------

fn write_lines<T: Write>(lines: &[Line], w: &mut T) -> io::Result<()> {
    for line in lines {
        writeln!(w, "{}", line)?;
    }
    Ok(())
}

fn normalize_lines(lines: &mut [Line]) {
    for tag in lines.iter_mut().filter_map(Line::as_tag_mut) {
        tag.update_value();
    }
}

fn fmt_lines(lines: &[Line], f: &mut fmt::Formatter) -> fmt::Result {
    for line in lines {
        writeln!(f, "{}", line)?;
    }
    Ok(())
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_lines(self.lines(), f)
    }
}

impl fmt::Display for MasterPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_lines(&self.lines, f)
    }
}

impl fmt::Display for MediaPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_lines(&self.lines, f)
    }
}

// -----------------------------------------------------------------------------------------------
// Attribute helpers
// -----------------------------------------------------------------------------------------------

fn attribute<'a>(attrs: &'a AttributeList, name: &str) -> Option<&'a Value> {
    attrs.get_last(name).map(|attr| &attr.value)
}

fn required<'a>(
    attrs: &'a AttributeList,
    tag: &'static str,
    name: &'static str,
) -> Result<&'a Value, FormatError> {
    attribute(attrs, name).ok_or_else(|| FormatErrorKind::MissingAttribute { tag, name }.into())
}

fn typed<T>(name: &'static str, result: Result<T, WrongTypeError>) -> Result<T, FormatError> {
    result.map_err(|source| FormatErrorKind::InvalidAttribute { name, source }.into())
}

fn optional<'a, T, F>(attrs: &'a AttributeList, name: &'static str, get: F) -> Result<Option<T>, FormatError>
where
    F: FnOnce(&'a Value) -> Result<T, WrongTypeError>,
{
    attribute(attrs, name).map(|value| typed(name, get(value))).transpose()
}

fn optional_string(attrs: &AttributeList, name: &'static str) -> Result<Option<String>, FormatError> {
    optional(attrs, name, |v| v.as_string().map(String::from))
}

fn parse_enum<T: FromStr>(name: &'static str, value: &Value) -> Result<T, FormatError> {
    let text = typed(name, value.as_enum())?;
    text.parse().map_err(|_| {
        FormatErrorKind::InvalidEnum {
            name,
            value: text.to_string(),
        }
        .into()
    })
}

fn optional_enum<T: FromStr>(attrs: &AttributeList, name: &'static str) -> Result<Option<T>, FormatError> {
    attribute(attrs, name).map(|value| parse_enum(name, value)).transpose()
}

fn resolve(base_url: &Url, text: &str) -> Result<Url, FormatError> {
    base_url.join(text).map_err(|source| {
        FormatErrorKind::InvalidUrl {
            text: text.to_string(),
            source,
        }
        .into()
    })
}
