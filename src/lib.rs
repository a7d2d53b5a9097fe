//! A library to parse m3u8 playlists (HTTP Live Streaming) [link]
//! (https://tools.ietf.org/html/draft-pantos-http-live-streaming-19).
//!
//! The scanner reads a playlist line by line, keeps every line for exact
//! reconstruction and decodes the recognized directives into segments,
//! variant streams and renditions. A [`PlaylistHandler`] sees each of them as
//! soon as it is complete and can stop the scan early.
//!
//! # Examples
//!
//! Parsing a playlist and let the parser figure out if it's a media or master playlist.
//!
//! ```
//! use m3u8_scan::{parse, Playlist};
//! use url::Url;
//!
//! let input = "#EXTM3U
//! #EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720
//! mid/index.m3u8
//! ";
//! let base = Url::parse("https://example.com/master.m3u8").unwrap();
//!
//! match parse(input.as_bytes(), &base, &mut ()) {
//!     Ok(Playlist::MasterPlaylist(pl)) => {
//!         assert_eq!(pl.variant_streams[0].uri.as_str(), "https://example.com/mid/index.m3u8")
//!     }
//!     Ok(Playlist::MediaPlaylist(pl)) => println!("Media playlist:\n{:?}", pl),
//!     Err(e) => panic!("Parsing error: \n{}", e),
//! }
//! ```
//!
//! Editing the attributes of a directive and writing the playlist back out
//!
//! ```
//! use m3u8_scan::{parse_playlist, Value};
//! use url::Url;
//!
//! let input = b"#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"k.bin\"\n#EXTINF:4,\na.ts\n";
//! let base = Url::parse("https://example.com/index.m3u8").unwrap();
//! let mut playlist = parse_playlist(input, &base).unwrap();
//!
//! if let m3u8_scan::Playlist::MediaPlaylist(pl) = &mut playlist {
//!     let tag = pl.lines[1].as_tag_mut().unwrap();
//!     tag.attributes_mut().unwrap().set("URI", Value::string("other.bin"));
//! }
//! playlist.normalize();
//!
//! let mut v: Vec<u8> = Vec::new();
//! playlist.write_to(&mut v).unwrap();
//! assert_eq!(
//!     String::from_utf8(v).unwrap(),
//!     "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"other.bin\"\n#EXTINF:4,\na.ts\n"
//! );
//! ```

pub mod attributes;
pub mod error;
pub mod parser;
pub mod playlist;
pub mod tag;
pub mod value;

pub use attributes::{parse_attribute_list, Attribute, AttributeList};
pub use error::{Error, FormatError, FormatErrorKind, Location, Result, WrongTypeError};
pub use parser::{parse, parse_playlist, parse_with_options, Flow, ParserOptions, PlaylistHandler};
pub use playlist::{
    ByteRange, ClosedCaptions, HdcpLevel, IframeStream, Key, KeyMethod, MasterPlaylist,
    MediaInitMap, MediaPlaylist, MediaPlaylistType, MediaSegment, Playlist, Rendition,
    RenditionChannels, RenditionType, StreamInf, VariantStream,
};
pub use tag::{Line, Tag};
pub use value::{Resolution, Value, ValueKind};
