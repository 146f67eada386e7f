pub mod decode;
pub mod tensor;
