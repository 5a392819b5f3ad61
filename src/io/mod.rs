mod file_reader;
mod marker;
mod memory_reader;
mod range_reader;
mod scanner;

pub use file_reader::FileRangeReader;
pub use marker::{Candidate, MarkerPattern};
pub use memory_reader::MemoryRangeReader;
pub use range_reader::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, RangeReader};
pub use scanner::{ByteScanner, DEFAULT_WINDOW_SIZE};
