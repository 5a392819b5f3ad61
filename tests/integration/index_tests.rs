//! Series discovery and plane offset indexing.

use omexml_planes::error::OmeXmlError;
use omexml_planes::format::omexml::locate_series;
use omexml_planes::format::{IndexPass, OmeXmlReader, PixelsAttributeProvider, ReaderOptions};
use omexml_planes::io::{MemoryRangeReader, DEFAULT_WINDOW_SIZE};

use super::test_utils::{two_series_fixture, Codec, OmeXmlBuilder, SeriesSpec, TrackingReader};

fn open_with(
    data: Vec<u8>,
    window_size: usize,
) -> Result<(MemoryRangeReader, OmeXmlReader), OmeXmlError> {
    let source = MemoryRangeReader::new(data, "fixture.ome.xml");
    let options = ReaderOptions {
        window_size,
        ..ReaderOptions::default()
    };
    let metadata = PixelsAttributeProvider::scan(&source, window_size)?;
    let reader = OmeXmlReader::open(&source, &metadata, &options)?;
    Ok((source, reader))
}

fn open(data: Vec<u8>) -> (MemoryRangeReader, OmeXmlReader) {
    open_with(data, DEFAULT_WINDOW_SIZE).unwrap()
}

// =============================================================================
// Series Discovery
// =============================================================================

#[test]
fn test_two_series_scenario() {
    let (fixture, specs) = two_series_fixture();
    let (source, reader) = open(fixture.data.clone());

    assert_eq!(reader.series_count(), 2);
    assert_eq!(reader.plane_count(0).unwrap(), 3);
    assert_eq!(reader.plane_count(1).unwrap(), 2);
    assert!(reader.is_little_endian(0).unwrap());
    assert!(!reader.is_little_endian(1).unwrap());

    assert_eq!(reader.plane_offsets(0).unwrap().offsets(), &fixture.offsets[0][..]);
    assert_eq!(reader.plane_offsets(1).unwrap().offsets(), &fixture.offsets[1][..]);

    let plane = reader.decode_plane(&source, 1, 1).unwrap();
    assert_eq!(plane.len(), 256);
    assert_eq!(&plane[..], &specs[1].planes[1][..]);
}

#[test]
fn test_series_anchors_follow_declarations() {
    let (fixture, _) = two_series_fixture();
    let source = MemoryRangeReader::new(fixture.data.clone(), "fixture.ome.xml");

    let declarations = locate_series(&source, DEFAULT_WINDOW_SIZE).unwrap();
    let anchors: Vec<u64> = declarations.iter().map(|d| d.offset).collect();
    assert_eq!(anchors, fixture.anchors);

    let (_, reader) = open(fixture.data);
    for (index, series) in reader.all_series().enumerate() {
        assert_eq!(series.anchor(), fixture.anchors[index]);
        assert!(series.offsets().offsets()[0] > series.anchor());
    }
}

#[test]
fn test_offsets_strictly_increasing_within_regions() {
    let fixture = OmeXmlBuilder::new()
        .series(SeriesSpec::new(8, 8, "uint8", 5))
        .series(SeriesSpec::new(4, 4, "uint16", 7).codec(Codec::Zlib))
        .series(SeriesSpec::new(6, 2, "float", 3).big_endian(true))
        .build();
    let (_, reader) = open(fixture.data);

    assert_eq!(reader.series_count(), 3);
    let mut previous_region_end = 0;
    for series in reader.all_series() {
        let table = series.offsets();
        assert!(table.offsets().windows(2).all(|w| w[0] < w[1]));
        assert!(table.offsets()[0] >= previous_region_end);
        assert!(*table.offsets().last().unwrap() < table.region_end());
        previous_region_end = table.region_end();
    }
}

#[test]
fn test_no_declarations_is_malformed() {
    let data = b"<?xml version=\"1.0\"?>\n<OME>\n  <Image ID=\"Image:0\">\n  </Image>\n</OME>\n".to_vec();
    let source = MemoryRangeReader::new(data, "empty.ome.xml");

    let result = locate_series(&source, DEFAULT_WINDOW_SIZE);
    assert!(matches!(result, Err(OmeXmlError::MalformedContainer { .. })));
}

#[test]
fn test_series_without_data_element_is_malformed() {
    let fixture = OmeXmlBuilder::new()
        .series(SeriesSpec::new(4, 4, "uint8", 2))
        .series(SeriesSpec::new(4, 4, "uint8", 2).planes(Vec::new()).declared_z(2))
        .build();

    let result = open_with(fixture.data, DEFAULT_WINDOW_SIZE);
    assert!(matches!(result, Err(OmeXmlError::MalformedContainer { .. })));
}

#[test]
fn test_external_references_are_not_planes() {
    let fixture = OmeXmlBuilder::new()
        .series(SeriesSpec::new(10, 10, "uint8", 2))
        .external_reference()
        .build();
    let (source, reader) = open(fixture.data);

    assert_eq!(reader.plane_offsets(0).unwrap().offsets(), &fixture.offsets[0][..]);
    assert_eq!(reader.decode_plane(&source, 0, 0).unwrap().len(), 100);
}

// =============================================================================
// Window Boundaries
// =============================================================================

#[test]
fn test_data_element_straddling_window_boundary() {
    let base = OmeXmlBuilder::new()
        .series(SeriesSpec::new(10, 10, "uint8", 2))
        .build()
        .offsets[0][0];

    for target in (DEFAULT_WINDOW_SIZE as u64 - 3)..=(DEFAULT_WINDOW_SIZE as u64 + 3) {
        let padding = (target - base) as usize;
        let fixture = OmeXmlBuilder::new()
            .series(SeriesSpec::new(10, 10, "uint8", 2).padding(padding))
            .build();
        assert_eq!(fixture.offsets[0][0], target);

        let (source, reader) = open(fixture.data);
        assert_eq!(
            reader.plane_offsets(0).unwrap().offsets(),
            &fixture.offsets[0][..],
            "data element at {}",
            target
        );
        assert!(reader.decode_plane(&source, 0, 1).is_ok());
    }
}

#[test]
fn test_declaration_straddling_window_boundary() {
    let base = two_series_fixture().0.anchors[1];

    for target in (DEFAULT_WINDOW_SIZE as u64 - 5)..=(DEFAULT_WINDOW_SIZE as u64 + 2) {
        let padding = (target - base) as usize;
        let fixture = OmeXmlBuilder::new()
            .series(SeriesSpec::new(10, 10, "uint8", 3).padding(padding))
            .series(
                SeriesSpec::new(16, 8, "uint16", 2)
                    .big_endian(true)
                    .codec(Codec::Zlib),
            )
            .build();
        assert_eq!(fixture.anchors[1], target);

        let (_, reader) = open(fixture.data);
        assert_eq!(reader.series_count(), 2, "declaration at {}", target);
        assert!(!reader.is_little_endian(1).unwrap());
        assert_eq!(reader.plane_count(1).unwrap(), 2);
    }
}

#[test]
fn test_index_independent_of_window_size() {
    let (fixture, _) = two_series_fixture();

    for window_size in [64, 100, 333, 1024, DEFAULT_WINDOW_SIZE, 1 << 20] {
        let (_, reader) = open_with(fixture.data.clone(), window_size).unwrap();
        assert_eq!(reader.series_count(), 2, "window {}", window_size);
        assert_eq!(reader.plane_offsets(0).unwrap().offsets(), &fixture.offsets[0][..]);
        assert_eq!(reader.plane_offsets(1).unwrap().offsets(), &fixture.offsets[1][..]);
    }
}

// =============================================================================
// Heuristic Skip and Fallback
// =============================================================================

#[test]
fn test_uncompressed_series_uses_heuristic_pass() {
    let (fixture, _) = two_series_fixture();
    let (_, reader) = open(fixture.data);

    assert_eq!(reader.plane_offsets(0).unwrap().pass(), IndexPass::Heuristic);
}

#[test]
fn test_overshooting_skip_falls_back_to_exhaustive() {
    let constant = vec![vec![7u8; 128 * 128]; 4];
    let fixture = OmeXmlBuilder::new()
        .series(SeriesSpec::new(10, 10, "uint8", 3))
        .series(
            SeriesSpec::new(128, 128, "uint8", 4)
                .codec(Codec::Zlib)
                .planes(constant.clone()),
        )
        .series(SeriesSpec::new(10, 10, "uint8", 2))
        .build();
    let (source, reader) = open(fixture.data);

    let table = reader.plane_offsets(1).unwrap();
    assert_eq!(table.pass(), IndexPass::Exhaustive);
    assert_eq!(table.len(), 4);
    assert_eq!(table.offsets(), &fixture.offsets[1][..]);
    assert_eq!(table.shortfall(), 0);

    assert_eq!(reader.plane_offsets(0).unwrap().pass(), IndexPass::Heuristic);
    assert_eq!(reader.plane_offsets(2).unwrap().pass(), IndexPass::Heuristic);

    for plane in 0..4 {
        let decoded = reader.decode_plane(&source, 1, plane).unwrap();
        assert_eq!(&decoded[..], &constant[plane as usize][..]);
    }
}

#[test]
fn test_shortfall_is_accepted() {
    let fixture = OmeXmlBuilder::new()
        .series(SeriesSpec::new(10, 10, "uint8", 3).declared_z(5))
        .build();
    let (source, reader) = open(fixture.data);

    let table = reader.plane_offsets(0).unwrap();
    assert_eq!(reader.plane_count(0).unwrap(), 3);
    assert_eq!(table.declared(), 5);
    assert_eq!(table.shortfall(), 2);
    assert_eq!(table.pass(), IndexPass::Exhaustive);

    assert!(reader.decode_plane(&source, 0, 2).is_ok());
    assert!(matches!(
        reader.decode_plane(&source, 0, 3),
        Err(OmeXmlError::InvalidPlaneIndex { plane: 3, count: 3, .. })
    ));
}

#[test]
fn test_extra_data_elements_are_truncated() {
    let spec = SeriesSpec::new(10, 10, "uint8", 4).declared_z(2);
    let planes = spec.planes.clone();
    let fixture = OmeXmlBuilder::new().series(spec).build();
    let (source, reader) = open(fixture.data);

    assert_eq!(reader.plane_count(0).unwrap(), 2);
    assert_eq!(
        reader.plane_offsets(0).unwrap().offsets(),
        &fixture.offsets[0][..2]
    );
    assert_eq!(&reader.decode_plane(&source, 0, 1).unwrap()[..], &planes[1][..]);
}

// =============================================================================
// Read Patterns
// =============================================================================

#[test]
fn test_decode_reads_one_plane_slice() {
    let (fixture, _) = two_series_fixture();
    let source = TrackingReader::new(fixture.data.clone(), "tracked.ome.xml");
    let metadata = PixelsAttributeProvider::scan(&source, DEFAULT_WINDOW_SIZE).unwrap();
    let reader = OmeXmlReader::open(&source, &metadata, &ReaderOptions::default()).unwrap();
    assert!(source.request_count() > 0);

    source.reset_tracking();
    reader.decode_plane(&source, 0, 1).unwrap();

    let expected_len = (fixture.offsets[0][2] - fixture.offsets[0][1]) as usize;
    assert_eq!(source.request_count(), 1);
    assert_eq!(source.get_requests(), vec![(fixture.offsets[0][1], expected_len)]);
}

#[test]
fn test_last_plane_ends_at_next_series() {
    let (fixture, _) = two_series_fixture();
    let (source, reader) = open(fixture.data.clone());

    let table = reader.plane_offsets(0).unwrap();
    let (start, end) = table.slice_bounds(2).unwrap();
    assert_eq!(start, fixture.offsets[0][2]);

    let raw = reader.read_raw_plane(&source, 0, 2).unwrap();
    assert_eq!(raw.len() as u64, end - start);
    assert!(end < fixture.offsets[1][0]);
    assert!(fixture.data[end as usize..].starts_with(b"<Image "));
}
