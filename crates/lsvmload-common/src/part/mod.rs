pub mod gpt;

pub use gpt::{Guid, GptPartitionEntry, GptPartitionTableHeader};
