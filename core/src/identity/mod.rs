pub mod digest;

pub use digest::fingerprint;
