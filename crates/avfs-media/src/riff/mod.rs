//! RIFF primitives: four-character codes, chunk headers, AVI records and a
//! chunk tree reader.

mod fourcc;
mod reader;
mod records;

pub use fourcc::{align_up, ChunkHeader, FourCC};
pub use reader::{Chunk, RiffReader};
pub use records::*;
