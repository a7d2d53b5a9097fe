use std::fs;
use std::path;
use std::sync::Arc;

use m3u8_scan::*;
use pretty_assertions::assert_eq;
use url::Url;

fn all_sample_m3u_playlists() -> Vec<path::PathBuf> {
    let path: std::path::PathBuf = ["sample-playlists"].iter().collect();
    fs::read_dir(path.to_str().unwrap())
        .unwrap()
        .filter_map(std::result::Result::ok)
        .map(|dir| dir.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "m3u8"))
        .collect()
}

fn get_sample_playlist(name: &str) -> String {
    let path: std::path::PathBuf = ["sample-playlists", name].iter().collect();
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Can't find m3u8: {}", path.display()))
}

fn base_url() -> Url {
    Url::parse("https://cdn.example.com/vod/playlist.m3u8").unwrap()
}

fn parse_sample(name: &str) -> Playlist {
    parse_str(&get_sample_playlist(name))
}

fn parse_str(input: &str) -> Playlist {
    match parse_playlist(input.as_bytes(), &base_url()) {
        Ok(playlist) => playlist,
        Err(e) => panic!("Parsing error: \n{}", e),
    }
}

fn media(playlist: &Playlist) -> &MediaPlaylist {
    playlist.as_media().expect("media playlist")
}

fn master(playlist: &Playlist) -> &MasterPlaylist {
    playlist.as_master().expect("master playlist")
}

// -----------------------------------------------------------------------------------------------
// Samples

#[test]
fn all_samples_parse_and_render_identically() {
    let samples = all_sample_m3u_playlists();
    assert!(!samples.is_empty());

    for path in samples {
        println!("Parsing playlist file: {:?}", path);
        let input = fs::read_to_string(&path).unwrap();
        let playlist = parse_str(&input);
        assert_eq!(playlist.to_string(), input);

        let mut written = Vec::new();
        playlist.write_to(&mut written).unwrap();
        assert_eq!(String::from_utf8(written).unwrap(), input);
    }
}

#[test]
fn rendered_samples_reparse_to_the_same_playlist() {
    for path in all_sample_m3u_playlists() {
        let playlist = parse_str(&fs::read_to_string(&path).unwrap());
        let reparsed = parse_str(&playlist.to_string());
        assert_eq!(reparsed, playlist);
    }
}

#[test]
fn master_with_alternatives() {
    let playlist = parse_sample("master-with-alternatives.m3u8");
    let pl = master(&playlist);

    assert_eq!(pl.version, 6);
    assert!(pl.independent_segments);
    assert_eq!(pl.variant_streams.len(), 3);
    assert_eq!(pl.iframe_streams.len(), 2);

    let hi = &pl.variant_streams[2];
    assert_eq!(hi.uri.as_str(), "https://cdn.example.com/vod/hi/index.m3u8");
    assert_eq!(hi.stream.bandwidth, 7680000);
    assert_eq!(hi.stream.resolution, Some(Resolution::new(1920, 1080)));
    assert_eq!(hi.stream.hdcp_level, Some(HdcpLevel::Type0));
    assert_eq!(hi.stream.frame_rate, Some(29.97));
    assert_eq!(hi.stream.audio.as_deref(), Some("aac"));
    assert_eq!(
        hi.stream.closed_captions,
        Some(ClosedCaptions::GroupId("cc".into()))
    );
    assert_eq!(pl.lines[hi.tag_line].as_tag().unwrap().name(), "EXT-X-STREAM-INF");
    assert_eq!(pl.lines[hi.uri_line], Line::Uri("hi/index.m3u8".into()));

    let audio: Vec<_> = pl
        .renditions(RenditionType::Audio, "aac")
        .iter()
        .map(|r| (r.name.as_str(), r.default))
        .collect();
    assert_eq!(audio, [("English", true), ("Deutsch", false)]);

    let cc = &pl.renditions(RenditionType::ClosedCaptions, "cc")[0];
    assert_eq!(cc.uri, None);
    assert_eq!(cc.instream_id.as_deref(), Some("CC1"));
    assert_eq!(pl.renditions(RenditionType::Subtitles, "subs").len(), 1);

    assert_eq!(
        pl.iframe_streams[1].uri.as_str(),
        "https://cdn.example.com/vod/mid/iframe.m3u8"
    );
}

#[test]
fn master_with_absolute_uris() {
    let playlist = parse_sample("master-simple.m3u8");
    let uris: Vec<_> = master(&playlist)
        .variant_streams
        .iter()
        .map(|v| v.uri.as_str())
        .collect();
    assert_eq!(
        uris,
        [
            "http://example.com/low.m3u8",
            "http://example.com/mid.m3u8",
            "http://example.com/hi.m3u8",
            "http://example.com/audio-only.m3u8",
        ]
    );
}

#[test]
fn media_sequence_numbers_follow_the_declared_start() {
    let playlist = parse_sample("media-playlist-vod.m3u8");
    let pl = media(&playlist);

    assert_eq!(pl.media_sequence, 5);
    assert_eq!(pl.target_duration, Some(10));
    assert_eq!(pl.playlist_type, Some(MediaPlaylistType::Vod));
    assert!(pl.end_list);

    let sequences: Vec<_> = pl.segments.iter().map(|s| s.media_sequence).collect();
    assert_eq!(sequences, [5, 6, 7]);
    assert_eq!(pl.segments[1].title.as_deref(), Some("Second segment"));
    assert_eq!(pl.segments[2].duration, 3.003);
    assert_eq!(pl.segments[0].uri.as_str(), "https://cdn.example.com/vod/segment5.ts");
}

#[test]
fn discontinuity_increments_before_the_next_segment() {
    let playlist = parse_sample("media-playlist-with-discontinuity.m3u8");
    let pl = media(&playlist);

    let stamped: Vec<_> = pl
        .segments
        .iter()
        .map(|s| (s.discontinuity, s.discontinuity_sequence))
        .collect();
    assert_eq!(stamped, [(false, 2), (true, 3), (false, 3), (true, 4)]);
    assert!(pl.segments[3].gap);
    assert!(!pl.segments[2].gap);
    assert!(pl.segments[1].program_date_time.is_some());
    assert!(pl.segments[2].program_date_time.is_none());
}

#[test]
fn discontinuity_sequence_defaults_to_zero() {
    let playlist = parse_str("#EXTM3U\n#EXTINF:4,\na.ts\n#EXT-X-DISCONTINUITY\n#EXTINF:4,\nb.ts\n");
    let sequences: Vec<_> = media(&playlist)
        .segments
        .iter()
        .map(|s| s.discontinuity_sequence)
        .collect();
    assert_eq!(sequences, [0, 1]);
}

#[test]
fn keys_stick_until_replaced() {
    let playlist = parse_sample("media-playlist-encrypted.m3u8");
    let segments = &media(&playlist).segments;
    assert_eq!(segments.len(), 5);

    let first = segments[0].key.as_ref().unwrap();
    assert_eq!(first.method, KeyMethod::Aes128);
    assert_eq!(first.iv.as_deref().map(<[u8]>::len), Some(16));
    assert_eq!(first.iv.as_ref().unwrap()[15], 0x0a);
    for segment in &segments[1..3] {
        assert!(Arc::ptr_eq(first, segment.key.as_ref().unwrap()));
    }

    let second = segments[3].key.as_ref().unwrap();
    assert_eq!(second.method, KeyMethod::SampleAes);
    assert_eq!(second.uri.as_ref().unwrap().as_str(), "skd://k2");
    assert_eq!(second.key_format.as_deref(), Some("com.apple.streamingkeydelivery"));

    assert_eq!(segments[4].key.as_ref().unwrap().method, KeyMethod::None);
}

#[test]
fn segments_before_any_key_have_none() {
    let playlist = parse_str("#EXTINF:4,\na.ts\n#EXT-X-KEY:METHOD=AES-128,URI=\"k\"\n#EXTINF:4,\nb.ts\n");
    let segments = &media(&playlist).segments;
    assert!(segments[0].key.is_none());
    assert!(segments[1].key.is_some());
}

#[test]
fn byte_ranges_default_to_the_previous_end() {
    let playlist = parse_sample("media-playlist-with-byterange.m3u8");
    let segments = &media(&playlist).segments;

    let ranges: Vec<_> = segments.iter().map(|s| s.byte_range.unwrap()).collect();
    assert_eq!(
        ranges,
        [
            ByteRange { length: 75232, offset: 720 },
            ByteRange { length: 82112, offset: 75952 },
            ByteRange { length: 69864, offset: 158064 },
        ]
    );

    let init = segments[0].init_section.as_ref().unwrap();
    assert_eq!(init.byte_range, Some(ByteRange { length: 720, offset: 0 }));
    assert!(Arc::ptr_eq(init, segments[2].init_section.as_ref().unwrap()));
}

#[test]
fn first_byte_range_without_offset_starts_at_zero() {
    let playlist = parse_str("#EXTINF:4,\n#EXT-X-BYTERANGE:100\na.ts\n#EXTINF:4,\n#EXT-X-BYTERANGE:50\na.ts\n");
    let ranges: Vec<_> = media(&playlist)
        .segments
        .iter()
        .map(|s| s.byte_range.unwrap())
        .collect();
    assert_eq!(
        ranges,
        [
            ByteRange { length: 100, offset: 0 },
            ByteRange { length: 50, offset: 100 },
        ]
    );
}

#[test]
fn unknown_tags_and_blank_lines_round_trip() {
    let input = get_sample_playlist("media-playlist-with-unknown-tags.m3u8");
    let mut playlist = parse_str(&input);
    assert_eq!(media(&playlist).segments.len(), 2);
    assert_eq!(playlist.lines()[5], Line::Blank("   ".into()));

    playlist.normalize();
    assert_eq!(playlist.to_string(), input);
}

// -----------------------------------------------------------------------------------------------
// Errors

#[test]
fn mixed_playlist_kinds_fail() {
    let input = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1000\nlow.m3u8\n#EXTINF:10.0,\nseg.ts\n";
    match parse_playlist(input.as_bytes(), &base_url()) {
        Err(Error::Format(e)) => {
            assert_eq!(e.kind, FormatErrorKind::MixedPlaylist);
            assert_eq!(e.line(), Some(4));
        }
        other => panic!("expected mixed playlist error, got {:?}", other),
    }

    let input = "#EXTINF:10.0,\nseg.ts\n#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"a\",NAME=\"a\",URI=\"a.m3u8\"\n";
    match parse_playlist(input.as_bytes(), &base_url()) {
        Err(Error::Format(e)) => assert_eq!(e.kind, FormatErrorKind::MixedPlaylist),
        other => panic!("expected mixed playlist error, got {:?}", other),
    }
}

#[test]
fn malformed_directive_aborts_the_scan() {
    let input = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1000,RESOLUTION=640x\nlow.m3u8\n";
    match parse_playlist(input.as_bytes(), &base_url()) {
        Err(Error::Format(e)) => {
            assert_eq!(e.kind, FormatErrorKind::MissingHeight);
            assert_eq!(e.line(), Some(2));
        }
        other => panic!("expected format error, got {:?}", other),
    }
}

// -----------------------------------------------------------------------------------------------
// Handler

#[derive(Default)]
struct StopAfter {
    limit: usize,
    segments: usize,
    media_playlists: usize,
    master_playlists: usize,
}

impl PlaylistHandler for StopAfter {
    fn media_segment(&mut self, _segment: &MediaSegment) -> Flow {
        self.segments += 1;
        if self.segments == self.limit {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn media_playlist(&mut self, _playlist: &MediaPlaylist) {
        self.media_playlists += 1;
    }

    fn master_playlist(&mut self, _playlist: &MasterPlaylist) {
        self.master_playlists += 1;
    }
}

#[test]
fn handler_stops_after_second_segment() {
    let input = (0..5)
        .map(|i| format!("#EXTINF:4.0,\nsegment{}.ts\n", i))
        .collect::<String>();
    let mut handler = StopAfter {
        limit: 2,
        ..Default::default()
    };

    let playlist = parse(input.as_bytes(), &base_url(), &mut handler).unwrap();
    let pl = media(&playlist);
    assert_eq!(pl.segments.len(), 2);
    assert_eq!(pl.lines.len(), 4);
    assert_eq!(handler.segments, 2);
    assert_eq!(handler.media_playlists, 1);
    assert_eq!(handler.master_playlists, 0);
}

#[test]
fn handler_sees_every_segment_in_order() {
    struct Collect(Vec<String>);

    impl PlaylistHandler for Collect {
        fn media_segment(&mut self, segment: &MediaSegment) -> Flow {
            self.0.push(segment.uri.path().to_string());
            Flow::Continue
        }
    }

    let mut handler = Collect(Vec::new());
    let input = get_sample_playlist("media-playlist-vod.m3u8");
    parse(input.as_bytes(), &base_url(), &mut handler).unwrap();
    assert_eq!(
        handler.0,
        ["/vod/segment5.ts", "/vod/segment6.ts", "/vod/segment7.ts"]
    );
}

#[test]
fn variant_streams_reach_the_handler() {
    struct Bandwidths(Vec<u64>);

    impl PlaylistHandler for Bandwidths {
        fn variant_stream(&mut self, stream: &VariantStream) -> Flow {
            self.0.push(stream.stream.bandwidth);
            Flow::Continue
        }
    }

    let mut handler = Bandwidths(Vec::new());
    let input = get_sample_playlist("master-simple.m3u8");
    parse(input.as_bytes(), &base_url(), &mut handler).unwrap();
    assert_eq!(handler.0, [1280000, 2560000, 7680000, 65000]);
}

// -----------------------------------------------------------------------------------------------
// Attributes

#[test]
fn group_id_attribute_list() {
    let text = "TYPE=AUDIO,GROUP-ID=\"aac\",BANDWIDTH=600000";
    let attrs = parse_attribute_list(text).unwrap();

    assert_eq!(attrs.get_first("TYPE").unwrap().value, Value::enumerated("AUDIO"));
    assert_eq!(attrs.get_first("GROUP-ID").unwrap().value, Value::string("aac"));
    assert_eq!(attrs.get_first("BANDWIDTH").unwrap().value, Value::integer(600000));
    assert_eq!(attrs.to_string(), text);
}

#[test]
fn attribute_value_kinds() {
    let attrs = parse_attribute_list("KEY=0xDEADBEEF, RES=1920x1080, N=0").unwrap();
    assert_eq!(
        attrs.get_first("KEY").unwrap().value,
        Value::bytes(vec![0xde, 0xad, 0xbe, 0xef])
    );
    assert_eq!(attrs.get_first("RES").unwrap().value, Value::resolution(1920, 1080));
    assert_eq!(attrs.get_first("N").unwrap().value, Value::integer(0));
    assert_eq!(attrs.to_string(), "KEY=0xDEADBEEF,RES=1920x1080,N=0");

    let err = parse_attribute_list("KEY=0xABC").unwrap_err();
    assert_eq!(
        err.kind,
        FormatErrorKind::OddHexLength {
            text: "0xABC".into()
        }
    );
}

#[test]
fn normalize_writes_edited_attributes_back() {
    let input = get_sample_playlist("media-playlist-encrypted.m3u8");
    let mut playlist = parse_str(&input);

    if let Playlist::MediaPlaylist(pl) = &mut playlist {
        let key_line = pl.segments[0].key.as_ref().unwrap().tag_line;
        let tag = pl.lines[key_line].as_tag_mut().unwrap();
        tag.attributes_mut()
            .unwrap()
            .set("IV", Value::bytes(vec![0xff; 16]));
    }
    playlist.normalize();

    let rendered = playlist.to_string();
    assert!(rendered.contains(
        "#EXT-X-KEY:METHOD=AES-128,URI=\"https://keys.example.com/k1\",IV=0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\n"
    ));
    assert!(rendered.contains("#EXTINF:6.0,\ns100.ts\n"));
}
