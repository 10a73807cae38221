//! Response payload helpers - inline image encoding

pub mod base64;
