//! Runtime descriptors for the request types the stub targets.
//!
//! Generated prost types carry no reflection of their own. proto-gen derives
//! `ReflectMessage` for each of them against a `DescriptorPool` decoded from
//! the `FileDescriptorSet` protoc wrote alongside the generated code, which is
//! everything the mutator needs to edit a message field by field.

pub use prost_reflect::{MessageDescriptor, ReflectMessage};

/// A prost message type whose descriptor is known at runtime.
pub trait ProtoSchema: ReflectMessage + Default {
    /// Descriptor of `Self`, without needing an instance
    fn message_descriptor() -> MessageDescriptor {
        Self::default().descriptor()
    }
}

impl<T: ReflectMessage + Default> ProtoSchema for T {}
