//! Test domain file input/output
use approx::assert_relative_eq;
use ramses_octree::io::{
    AmrFileBuilder, AmrHeader, AttrType, AttrValue, HeaderAttr, HeaderError, HeaderValues,
    RamsesHeaderSchema, RecordError, RecordReader,
};
use ramses_octree::traits::HeaderSchema;
use std::io::Cursor;

fn write(amr: &AmrFileBuilder) -> (Vec<u8>, u64) {
    let mut bytes = vec![];
    let offset = amr.write(&mut bytes).unwrap();
    (bytes, offset)
}

#[test]
fn test_header_round_trip() {
    let mut amr = AmrFileBuilder::new(3, 4)
        .with_nx([2, 3, 4])
        .with_boxlen(100.0)
        .with_ordering("bisection");
    amr.add_grids(0, 0, &[[0.5; 3]]);
    amr.add_grids(2, 3, &[[0.1; 3], [0.2; 3], [0.3; 3]]);
    let (bytes, offset) = write(&amr);

    let mut reader = RecordReader::new(Cursor::new(bytes)).unwrap();
    let header = AmrHeader::read(&mut reader, &RamsesHeaderSchema).unwrap();
    assert_eq!(reader.position(), offset);
    assert_eq!(header.ncpu, 3);
    assert_eq!(header.nlevelmax, 4);
    assert_eq!(header.nboundary, 0);
    assert_eq!(header.nx, [2, 3, 4]);
    assert_relative_eq!(header.boxlen, 100.0);
    assert_eq!(header.ordering, "bisection");
    assert_eq!(header.free_mem, [0; 5]);
    assert!(header.ngridbound().is_empty());
    assert_eq!(header.numbl(0, 0), Some(1));
    assert_eq!(header.numbl(3, 2), Some(3));
    assert_eq!(header.local_oct_count(1), Some(1));
    assert_eq!(header.local_oct_count(2), Some(0));
    assert_eq!(header.local_oct_count(3), Some(3));
    assert_eq!(header.values.get("ndim"), Some(&AttrValue::Int(vec![3])));
    assert_eq!(header.values.ints("nout").unwrap(), &[1, 1, 1]);
    assert_eq!(header.values.count("ngrid_current").unwrap(), 4);
    assert_eq!(header.values.doubles("dtold").unwrap().len(), 4);
    assert_eq!(header.values.ints("numbl").unwrap().len(), 12);
}

#[test]
fn test_boundary_grid_counts() {
    // ncpu = 2, nboundary = 2, nlevelmax = 2: boundary owners 2 and 3 map to offsets
    // owner - ncpu + nboundary * level.
    let mut amr = AmrFileBuilder::new(2, 2).with_boundaries(2);
    amr.add_grids(1, 0, &[[0.5; 3]]);
    amr.add_grids(2, 0, &[[1.5; 3]]);
    amr.add_grids(3, 0, &[[2.5; 3]; 2]);
    amr.add_grids(2, 1, &[[1.5; 3]; 3]);
    amr.add_grids(3, 1, &[[2.5; 3]; 4]);
    let (bytes, offset) = write(&amr);

    let mut reader = RecordReader::new(Cursor::new(bytes)).unwrap();
    let header = AmrHeader::read(&mut reader, &RamsesHeaderSchema).unwrap();
    assert_eq!(reader.position(), offset);
    assert_eq!(header.ngridbound(), &[1, 2, 3, 4]);
    assert_eq!(header.grid_count(1, 0), Some(1));
    assert_eq!(header.grid_count(2, 0), Some(1));
    assert_eq!(header.grid_count(3, 0), Some(2));
    assert_eq!(header.grid_count(2, 1), Some(3));
    assert_eq!(header.grid_count(3, 1), Some(4));
    assert_eq!(header.local_oct_count(2), Some(1));
}

#[test]
fn test_out_of_range_lookups() {
    let mut amr = AmrFileBuilder::new(2, 2);
    amr.add_grids(1, 1, &[[0.5; 3]]);
    let (bytes, _) = write(&amr);

    let mut reader = RecordReader::new(Cursor::new(bytes)).unwrap();
    let header = AmrHeader::read(&mut reader, &RamsesHeaderSchema).unwrap();
    assert_eq!(header.nboundary, 0);
    assert_eq!(header.numbl(1, 1), Some(1));
    assert_eq!(header.numbl(2, 0), None);
    assert_eq!(header.numbl(0, 2), None);
    // No boundary domains: owner indices at or beyond ncpu address nothing.
    assert_eq!(header.grid_count(2, 0), None);
    assert_eq!(header.grid_count(1, 2), None);
    assert_eq!(header.local_oct_count(0), None);
    assert_eq!(header.local_oct_count(3), None);
    assert_eq!(header.local_oct_count(2), Some(1));
}

/// The RAMSES schema with a shorter `nx`
struct TwoDimensional;

impl HeaderSchema for TwoDimensional {
    fn group(
        &self,
        index: usize,
        parsed: &HeaderValues,
    ) -> Result<Option<Vec<HeaderAttr>>, HeaderError> {
        Ok(RamsesHeaderSchema.group(index, parsed)?.map(|group| {
            group
                .into_iter()
                .map(|attr| match attr.name {
                    "nx" => HeaderAttr::new("nx", 2, AttrType::Int),
                    _ => attr,
                })
                .collect()
        }))
    }
}

#[test]
fn test_schema_disagreeing_with_file() {
    let (bytes, _) = write(&AmrFileBuilder::new(1, 1));
    let mut reader = RecordReader::new(Cursor::new(bytes)).unwrap();
    assert!(matches!(
        AmrHeader::read(&mut reader, &TwoDimensional),
        Err(HeaderError::Record(RecordError::LengthMismatch {
            expected: 2,
            found: 3,
            ..
        }))
    ));
}

#[test]
fn test_truncated_header() {
    let (mut bytes, offset) = write(&AmrFileBuilder::new(1, 1));
    bytes.truncate(offset as usize - 1);
    let mut reader = RecordReader::new(Cursor::new(bytes)).unwrap();
    assert!(matches!(
        AmrHeader::read(&mut reader, &RamsesHeaderSchema),
        Err(HeaderError::Record(RecordError::UnexpectedEof { .. }))
    ));
}
