pub mod bi_encoder;
pub mod encoder;
pub mod hashing;

pub use bi_encoder::{BiEncoderModel, Pooling};
pub use encoder::{Embedding, Encoder, EMBEDDING_DIM};
pub use hashing::HashingEncoder;
