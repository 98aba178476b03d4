extern crate hex;
extern crate serde;

// Names and packets
pub mod name;
pub mod packet;

// Identity certificates and their text encodings
pub mod certificate;

// Signature verification primitives
pub mod crypto;

// INFO configuration reader
pub mod conf;

// Rule engine, trust anchors, certificate cache and validator
pub mod policy;

// Environment-driven settings
pub mod settings;

pub use certificate::IdentityCertificate;
pub use name::Name;
pub use packet::{Data, Interest};
pub use policy::{PolicyValidator, ValidationError, ValidationOutcome, ValidationRequest};
pub use settings::ValidatorSettings;
