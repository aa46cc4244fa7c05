//! Email-marketing provider implementations.

pub mod drip;
