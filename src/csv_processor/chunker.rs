use serde::{Deserialize, Serialize};

/// Splits a row range into fixed-size contiguous slices.
pub struct CsvChunker {
    chunk_size: usize,
}

impl CsvChunker {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn calculate_chunks(&self, total_rows: usize) -> Vec<ChunkRange> {
        let mut chunks = Vec::new();
        let mut current_start = 0;
        let mut chunk_index = 0;

        while current_start < total_rows {
            let end_row = (current_start + self.chunk_size).min(total_rows);

            chunks.push(ChunkRange {
                index: chunk_index,
                start_row: current_start,
                end_row,
            });

            current_start = end_row;
            chunk_index += 1;
        }

        chunks
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRange {
    pub index: usize,
    pub start_row: usize,
    pub end_row: usize,
}

impl ChunkRange {
    pub fn row_count(&self) -> usize {
        self.end_row - self.start_row
    }

    pub fn rows(&self) -> std::ops::Range<usize> {
        self.start_row..self.end_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_every_row_once() {
        let chunks = CsvChunker::new(120).calculate_chunks(250);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].rows(), 0..120);
        assert_eq!(chunks[1].rows(), 120..240);
        assert_eq!(chunks[2].rows(), 240..250);
        assert_eq!(chunks.iter().map(ChunkRange::row_count).sum::<usize>(), 250);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_chunk() {
        let chunks = CsvChunker::new(2).calculate_chunks(4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].rows(), 2..4);
    }

    #[test]
    fn empty_table_has_no_chunks() {
        assert!(CsvChunker::new(10).calculate_chunks(0).is_empty());
    }
}
