//! Upload session engine.

pub mod engine;

pub use engine::{
    ChunkOutcome, CompletedUpload, InitiateUpload, InitiatedUpload, RemovedEntries, ResourceKind,
    UploadEngine, UploadStatusReport,
};

/// Plan the chunking of an upload: the number of chunks at the configured
/// target size, and the per-chunk size implied by distributing the total
/// evenly across them.
///
/// A 12,000,000 byte file at a 5 MiB target splits into 3 chunks of
/// 4,000,000 bytes.
pub fn plan_chunks(total_size: i64, target_chunk_size: i64) -> (i32, i64) {
    if total_size <= 0 {
        return (1, 0);
    }
    let target = target_chunk_size.max(1);
    let total_chunks = (total_size + target - 1) / target;
    let chunk_size = (total_size + total_chunks - 1) / total_chunks;
    (total_chunks as i32, chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_chunks_reference_scenario() {
        let (total_chunks, chunk_size) = plan_chunks(12_000_000, 5_242_880);
        assert_eq!(total_chunks, 3);
        assert_eq!(chunk_size, 4_000_000);
    }

    #[test]
    fn test_small_file_is_one_chunk() {
        let (total_chunks, chunk_size) = plan_chunks(100, 5_242_880);
        assert_eq!(total_chunks, 1);
        assert_eq!(chunk_size, 100);
    }

    #[test]
    fn test_empty_file_still_has_one_chunk() {
        let (total_chunks, chunk_size) = plan_chunks(0, 5_242_880);
        assert_eq!(total_chunks, 1);
        assert_eq!(chunk_size, 0);
    }

    #[test]
    fn test_chunks_cover_total_size() {
        for size in [1i64, 4_999_999, 5_242_880, 5_242_881, 33_554_432] {
            let (total_chunks, chunk_size) = plan_chunks(size, 5_242_880);
            assert!(i64::from(total_chunks) * chunk_size >= size);
            assert!(i64::from(total_chunks - 1) * chunk_size < size);
        }
    }
}
