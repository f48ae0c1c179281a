// @generated by stub-gen from proto/helloworld.proto. Do not edit.

use crate::mutator::StructuralMutator;
use crate::table::RpcTable;
use std::ffi::CStr;
/// RPC methods of `helloworld.proto`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `/helloworld.Greeter/SayHello`, request `helloworld.HelloRequest`
    SayHello,
}
impl Method {
    /// Every method, in table order
    pub const ALL: &'static [Self] = &[Self::SayHello];
    /// Method path
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::SayHello => "/helloworld.Greeter/SayHello",
        }
    }
    /// Method path as a NUL-terminated string
    #[must_use]
    pub const fn c_path(self) -> &'static CStr {
        match self {
            Self::SayHello => c"/helloworld.Greeter/SayHello",
        }
    }
    /// Mutate `data` as this method's request type
    pub fn mutate<S: StructuralMutator>(
        self,
        mutator: &S,
        data: &mut [u8],
        size: usize,
        max_size: usize,
        seed: u32,
    ) -> usize {
        match self {
            Self::SayHello => {
                let mut message = proto_gen::helloworld::HelloRequest::default();
                mutator.mutate(&mut message, true, data, size, max_size, seed)
            }
        }
    }
}
/// Method table of `helloworld.proto`
#[derive(Debug, Clone, Copy, Default)]
pub struct Greeter;
impl RpcTable for Greeter {
    const METHODS: &'static [&'static CStr] = &[Method::SayHello.c_path()];
    fn dispatch<S: StructuralMutator>(
        slot: usize,
        mutator: &S,
        data: &mut [u8],
        size: usize,
        max_size: usize,
        seed: u32,
    ) -> Option<usize> {
        let method = Method::ALL.get(slot)?;
        Some(method.mutate(mutator, data, size, max_size, seed))
    }
}
