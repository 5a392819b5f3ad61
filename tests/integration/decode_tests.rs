//! Plane decoding through the reader.

use std::sync::Arc;
use std::thread;

use omexml_planes::error::{DecodeError, OmeXmlError};
use omexml_planes::format::{
    CodecSupport, Compression, OmeXmlReader, PixelsAttributeProvider, ReaderOptions,
};
use omexml_planes::io::{MemoryRangeReader, DEFAULT_WINDOW_SIZE};
use omexml_planes::plane::PlaneReader;

use super::test_utils::{two_series_fixture, Codec, OmeXmlBuilder, SeriesSpec};

fn open_with(data: Vec<u8>, options: &ReaderOptions) -> (MemoryRangeReader, OmeXmlReader) {
    let source = MemoryRangeReader::new(data, "fixture.ome.xml");
    let metadata = PixelsAttributeProvider::scan(&source, options.window_size).unwrap();
    let reader = OmeXmlReader::open(&source, &metadata, options).unwrap();
    (source, reader)
}

fn open(data: Vec<u8>) -> (MemoryRangeReader, OmeXmlReader) {
    open_with(data, &ReaderOptions::default())
}

fn assert_round_trip(spec: SeriesSpec) {
    let planes = spec.planes.clone();
    let fixture = OmeXmlBuilder::new().series(spec).build();
    let (source, reader) = open(fixture.data);

    assert_eq!(reader.plane_count(0).unwrap() as usize, planes.len());
    for (index, expected) in planes.iter().enumerate() {
        let decoded = reader.decode_plane(&source, 0, index as u32).unwrap();
        assert_eq!(&decoded[..], &expected[..], "plane {}", index);
    }
}

// =============================================================================
// Codecs
// =============================================================================

#[test]
fn test_uncompressed_round_trip() {
    assert_round_trip(SeriesSpec::new(10, 10, "uint8", 3));
    assert_round_trip(SeriesSpec::new(7, 5, "uint16", 2).big_endian(true));
    assert_round_trip(SeriesSpec::new(3, 3, "float", 4));
}

#[test]
fn test_zlib_round_trip() {
    assert_round_trip(SeriesSpec::new(16, 8, "uint16", 2).codec(Codec::Zlib));
    assert_round_trip(SeriesSpec::new(64, 64, "uint8", 3).codec(Codec::Zlib));
}

#[cfg(feature = "bzip2")]
#[test]
fn test_bzip2_round_trip() {
    assert_round_trip(SeriesSpec::new(32, 16, "uint16", 3).codec(Codec::Bzip2));
}

#[test]
fn test_compression_is_sniffed_per_series() {
    let (fixture, _) = two_series_fixture();
    let (_, reader) = open(fixture.data);

    assert_eq!(reader.series(0).unwrap().compression(), Compression::None);
    assert_eq!(reader.series(1).unwrap().compression(), Compression::Zlib);
}

#[test]
fn test_wrapped_payload_lines() {
    let spec = SeriesSpec::new(20, 20, "uint16", 2);
    let planes = spec.planes.clone();
    let fixture = OmeXmlBuilder::new().series(spec).line_width(76).build();
    let (source, reader) = open(fixture.data);

    for (index, expected) in planes.iter().enumerate() {
        let decoded = reader.decode_plane(&source, 0, index as u32).unwrap();
        assert_eq!(&decoded[..], &expected[..]);
    }
}

#[test]
fn test_unsupported_codec_is_scoped_to_series() {
    let (fixture, specs) = two_series_fixture();
    let options = ReaderOptions {
        window_size: DEFAULT_WINDOW_SIZE,
        codecs: CodecSupport {
            zlib: false,
            bzip2: false,
        },
    };
    let (source, reader) = open_with(fixture.data, &options);

    let plane = reader.decode_plane(&source, 0, 2).unwrap();
    assert_eq!(&plane[..], &specs[0].planes[2][..]);

    match reader.decode_plane(&source, 1, 0) {
        Err(OmeXmlError::Decode {
            series: 1,
            plane: 0,
            source: DecodeError::UnsupportedCompression(name),
        }) => assert_eq!(name, "zlib"),
        other => panic!("unexpected result: {:?}", other),
    }
}

// =============================================================================
// Index Validation
// =============================================================================

#[test]
fn test_invalid_plane_indices() {
    let (fixture, _) = two_series_fixture();
    let (source, reader) = open(fixture.data);

    for plane in [3, 4, 100, u32::MAX] {
        assert!(matches!(
            reader.decode_plane(&source, 0, plane),
            Err(OmeXmlError::InvalidPlaneIndex { series: 0, count: 3, .. })
        ));
    }
    assert!(matches!(
        reader.decode_plane(&source, 1, 2),
        Err(OmeXmlError::InvalidPlaneIndex { series: 1, count: 2, .. })
    ));
}

#[test]
fn test_invalid_series_index() {
    let (fixture, _) = two_series_fixture();
    let (source, reader) = open(fixture.data);

    assert!(matches!(
        reader.decode_plane(&source, 2, 0),
        Err(OmeXmlError::InvalidSeriesIndex { series: 2, count: 2 })
    ));
    assert!(matches!(
        reader.plane_count(5),
        Err(OmeXmlError::InvalidSeriesIndex { .. })
    ));
}

#[test]
fn test_corrupt_plane_does_not_affect_others() {
    let (fixture, specs) = two_series_fixture();
    let mut data = fixture.data;

    // Break the base64 payload of series 0, plane 1
    let start = fixture.offsets[0][1] as usize;
    let payload = start + data[start..].iter().position(|&b| b == b'>').unwrap() + 1;
    data[payload] = b'*';

    let (source, reader) = open(data);
    assert!(matches!(
        reader.decode_plane(&source, 0, 1),
        Err(OmeXmlError::Decode {
            source: DecodeError::Base64(_),
            ..
        })
    ));
    assert_eq!(
        &reader.decode_plane(&source, 0, 0).unwrap()[..],
        &specs[0].planes[0][..]
    );
    assert_eq!(
        &reader.decode_plane(&source, 0, 2).unwrap()[..],
        &specs[0].planes[2][..]
    );
}

#[test]
fn test_plane_size_mismatch() {
    // Declared 10x10, embedded planes hold 8x8 pixels
    let planes = SeriesSpec::new(8, 8, "uint8", 2).planes;
    let spec = SeriesSpec::new(10, 10, "uint8", 2).planes(planes);
    let fixture = OmeXmlBuilder::new().series(spec).build();
    let (source, reader) = open(fixture.data);

    assert!(matches!(
        reader.decode_plane(&source, 0, 0),
        Err(OmeXmlError::Decode {
            source: DecodeError::SizeMismatch {
                expected: 100,
                actual: 64
            },
            ..
        })
    ));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_decoding() {
    let (fixture, specs) = two_series_fixture();
    let (source, reader) = open(fixture.data);
    let source = Arc::new(source);
    let reader = Arc::new(reader);
    let specs = Arc::new(specs);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let source = Arc::clone(&source);
            let reader = Arc::clone(&reader);
            let specs = Arc::clone(&specs);
            thread::spawn(move || {
                let series = i % 2;
                let count = reader.plane_count(series).unwrap();
                for plane in 0..count {
                    let decoded =
                        PlaneReader::decode_plane(&*reader, &*source, series, plane).unwrap();
                    assert_eq!(&decoded[..], &specs[series].planes[plane as usize][..]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
