//! IO for reference tables, sequences, count tables and reads.

pub mod reads;
pub mod sequences;
pub mod tables;

pub use reads::{ReadEmitter, ReadIdFormat};
pub use sequences::{InMemoryFasta, IndexedFasta, SequenceStore, open_sequence_store};
pub use tables::{ExpectedCounts, sampling_windows, write_count_matrix_npy, write_count_table};
