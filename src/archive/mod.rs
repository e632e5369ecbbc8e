// Archive inspection: locates and parses the application descriptor inside an .ipa.

pub mod descriptor;
pub mod reader;

pub use descriptor::Descriptor;
pub use reader::{read_descriptor, DescriptorError};
