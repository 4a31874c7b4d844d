mod oci;

pub use oci::{OciArgs, cmd_oci};
