pub mod chunker;
pub mod reader;
pub mod table;
pub mod writer;

pub use chunker::{ChunkRange, CsvChunker};
pub use reader::{string_record_to_vec, CsvStreamReader};
pub use table::{ColumnBinding, Table};
pub use writer::{table_to_csv_bytes, CsvStreamWriter};
