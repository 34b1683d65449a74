pub mod frame;

pub use frame::{
    Decoded, Frame, HEADER_LEN, MAX_MESSAGE_SIZE, encode_frame, encode_or_enqueue,
    try_decode_front,
};
