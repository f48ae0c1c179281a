//! Structure-aware mutation of protobuf messages.
//!
//! The stub does not mutate bytes itself. It hands a typed, empty message to a
//! `StructuralMutator`, which owns the decision of what the next input looks
//! like. `ProtoMutator` is the default: it decodes the input into a
//! `prost_reflect::DynamicMessage`, applies a handful of field-level edits,
//! and re-encodes through the generated prost type so the output is always a
//! canonical encoding of that type.

use crate::schema::ProtoSchema;
use crate::values::{self, key_order};
use crate::wire::field_spans;
use common::config::MutatorConfig;
use prost::Message;
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, ReflectMessage, Value,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Capability that rewrites a buffer into a mutated encoding of `M`.
///
/// Implementations must return the number of bytes written to the front of
/// `data`, never more than `max_size`, and must leave those bytes decodable as
/// `M`.
pub trait StructuralMutator {
    /// Mutate `data[..size]` in place.
    ///
    /// `message` is an empty instance of the target type and is used as scratch.
    /// `assume_valid` says whether `data[..size]` is expected to already be a
    /// valid encoding of `M`; when it is not, implementations may try to
    /// salvage what they can.
    fn mutate<M: ProtoSchema>(
        &self,
        message: &mut M,
        assume_valid: bool,
        data: &mut [u8],
        size: usize,
        max_size: usize,
        seed: u32,
    ) -> usize;
}

/// Kinds of structural edit, chosen per round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Add,
    Delete,
    Mutate,
    Duplicate,
}

/// Default descriptor-driven mutator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoMutator {
    config: MutatorConfig,
}

impl Default for ProtoMutator {
    fn default() -> Self {
        Self::new(MutatorConfig::DEFAULT)
    }
}

impl ProtoMutator {
    /// Create a mutator with the given tunables, clamped to `MutatorConfig::LIMITS`
    #[must_use]
    pub const fn new(config: MutatorConfig) -> Self {
        Self {
            config: config.clamped(),
        }
    }

    /// Tunables in effect
    #[must_use]
    pub const fn config(&self) -> &MutatorConfig {
        &self.config
    }

    /// Decode `input` into `message`, falling back as described on the trait.
    fn load<M: ProtoSchema>(&self, message: &mut M, assume_valid: bool, input: &[u8]) {
        let descriptor = message.descriptor();

        message.clear();
        match message.merge(input) {
            Ok(()) => return,
            Err(e) => {
                debug!(
                    message = descriptor.full_name(),
                    error = %e,
                    assume_valid,
                    "Input is not a valid encoding"
                );
            }
        }

        message.clear();
        if assume_valid {
            return;
        }

        let salvaged = salvage(descriptor.clone(), input);
        if let Err(e) = message.merge(salvaged.encode_to_vec().as_slice()) {
            trace!(message = descriptor.full_name(), error = %e, "Salvage rejected");
            message.clear();
        }
    }

    fn mutate_message(&self, message: &mut DynamicMessage, rng: &mut StdRng, depth: u32) {
        let descriptor = message.descriptor();
        let fields: Vec<FieldDescriptor> = descriptor.fields().collect();
        if fields.is_empty() {
            return;
        }
        let present: Vec<FieldDescriptor> =
            fields.iter().filter(|f| message.has_field(f)).cloned().collect();

        let mutation = if present.is_empty() {
            Mutation::Add
        } else {
            match rng.gen_range(0..100) {
                0..=24 => Mutation::Add,
                25..=39 => Mutation::Delete,
                40..=89 => Mutation::Mutate,
                _ => Mutation::Duplicate,
            }
        };
        trace!(message = descriptor.full_name(), ?mutation, depth, "Applying mutation");

        match mutation {
            Mutation::Add => {
                if let Some(field) = fields.choose(rng) {
                    self.add_field(message, field, rng, depth);
                }
            }
            Mutation::Delete => {
                if let Some(field) = present.choose(rng) {
                    delete_from(message, field, rng);
                }
            }
            Mutation::Mutate => {
                if let Some(field) = present.choose(rng) {
                    self.mutate_field(message, field, rng, depth);
                }
            }
            Mutation::Duplicate => self.duplicate_element(message, &present, rng, depth),
        }
    }

    fn add_field(
        &self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        rng: &mut StdRng,
        depth: u32,
    ) {
        let full = if field.is_list() || field.is_map() {
            element_count(message, field) >= self.config.max_repeated
        } else {
            message.has_field(field)
        };
        if full {
            self.mutate_field(message, field, rng, depth);
            return;
        }

        if field.is_map() {
            let Kind::Message(entry) = field.kind() else {
                return;
            };
            let growth = self.config.max_string_growth;
            let Some(key) = values::random_key(&entry.map_entry_key_field().kind(), growth, rng)
            else {
                return;
            };
            let Some(value) = self.random_value(&entry.map_entry_value_field().kind(), rng, depth)
            else {
                return;
            };
            if let Value::Map(map) = message.get_field_mut(field) {
                map.insert(key, value);
            }
        } else if field.is_list() {
            let Some(value) = self.random_value(&field.kind(), rng, depth) else {
                return;
            };
            if let Value::List(list) = message.get_field_mut(field) {
                let at = rng.gen_range(0..=list.len());
                list.insert(at, value);
            }
        } else {
            let Some(value) = self.random_value(&field.kind(), rng, depth) else {
                return;
            };
            // At most one member of a oneof may be set
            if let Some(oneof) = field.containing_oneof() {
                for member in oneof.fields() {
                    message.clear_field(&member);
                }
            }
            if let Err(e) = message.try_set_field(field, value) {
                trace!(field = field.full_name(), error = %e, "Generated value rejected");
            }
        }
    }

    fn mutate_field(
        &self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        rng: &mut StdRng,
        depth: u32,
    ) {
        let kind = field.kind();

        if field.is_map() {
            let Kind::Message(entry) = &kind else {
                return;
            };
            let value_kind = entry.map_entry_value_field().kind();
            if let Value::Map(map) = message.get_field_mut(field) {
                if let Some(key) = sorted_keys(map).choose(rng) {
                    if let Some(value) = map.get_mut(key) {
                        self.mutate_value(value, &value_kind, rng, depth);
                    }
                }
            }
        } else if field.is_list() {
            if let Value::List(list) = message.get_field_mut(field) {
                if list.is_empty() {
                    return;
                }
                let at = rng.gen_range(0..list.len());
                if let Some(value) = list.get_mut(at) {
                    self.mutate_value(value, &kind, rng, depth);
                }
            }
        } else {
            self.mutate_value(message.get_field_mut(field), &kind, rng, depth);
        }
    }

    fn duplicate_element(
        &self,
        message: &mut DynamicMessage,
        present: &[FieldDescriptor],
        rng: &mut StdRng,
        depth: u32,
    ) {
        let candidates: Vec<&FieldDescriptor> = present
            .iter()
            .filter(|f| f.is_list() && element_count(message, f) < self.config.max_repeated)
            .collect();

        let Some(field) = candidates.choose(rng) else {
            if let Some(field) = present.choose(rng) {
                self.mutate_field(message, field, rng, depth);
            }
            return;
        };

        if let Value::List(list) = message.get_field_mut(field) {
            if list.is_empty() {
                return;
            }
            let at = rng.gen_range(0..list.len());
            if let Some(copy) = list.get(at).cloned() {
                list.insert(at + 1, copy);
            }
        }
    }

    fn mutate_value(&self, value: &mut Value, kind: &Kind, rng: &mut StdRng, depth: u32) {
        match value {
            Value::Message(nested) => {
                if depth < self.config.max_depth {
                    self.mutate_message(nested, rng, depth + 1);
                } else {
                    *nested = DynamicMessage::new(nested.descriptor());
                }
            }
            other => values::mutate_value(other, kind, self.config.max_string_growth, rng),
        }
    }

    fn random_value(&self, kind: &Kind, rng: &mut StdRng, depth: u32) -> Option<Value> {
        match kind {
            Kind::Message(descriptor) => {
                if depth >= self.config.max_depth {
                    return None;
                }
                let mut nested = DynamicMessage::new(descriptor.clone());
                if rng.gen_bool(0.5) {
                    self.mutate_message(&mut nested, rng, depth + 1);
                }
                Some(Value::Message(nested))
            }
            scalar => values::random_value(scalar, self.config.max_string_growth, rng),
        }
    }
}

impl StructuralMutator for ProtoMutator {
    fn mutate<M: ProtoSchema>(
        &self,
        message: &mut M,
        assume_valid: bool,
        data: &mut [u8],
        size: usize,
        max_size: usize,
        seed: u32,
    ) -> usize {
        let descriptor = message.descriptor();
        let name = descriptor.full_name();
        let capacity = max_size.min(data.len());
        let input = data.get(..size.min(capacity)).unwrap_or_default();

        self.load(message, assume_valid, input);
        let original = message.encode_to_vec();
        let mut rng = StdRng::seed_from_u64(u64::from(seed));

        for attempt in 0..self.config.encode_attempts {
            let mut dynamic = match DynamicMessage::decode(descriptor.clone(), original.as_slice()) {
                Ok(dynamic) => dynamic,
                Err(e) => {
                    debug!(message = name, error = %e, "Descriptor does not match message type");
                    break;
                }
            };
            let rounds = rng.gen_range(1..=self.config.mutations_per_call);
            for _ in 0..rounds {
                self.mutate_message(&mut dynamic, &mut rng, 0);
            }

            message.clear();
            if let Err(e) = message.merge(dynamic.encode_to_vec().as_slice()) {
                debug!(message = name, attempt, error = %e, "Mutated encoding rejected");
                continue;
            }

            let encoded = message.encode_to_vec();
            if encoded.len() <= capacity {
                trace!(message = name, attempt, size = encoded.len(), "Mutation accepted");
                return write_output(data, &encoded);
            }
            trace!(
                message = name,
                attempt,
                size = encoded.len(),
                capacity,
                "Mutation exceeds capacity"
            );
        }

        message.clear();
        if original.len() <= capacity && message.merge(original.as_slice()).is_ok() {
            debug!(message = name, "Falling back to unmutated input");
            return write_output(data, &original);
        }

        debug!(message = name, capacity, "Falling back to empty message");
        message.clear();
        0
    }
}

/// Keep every top-level field of `input` that merges cleanly on its own.
fn salvage(descriptor: MessageDescriptor, input: &[u8]) -> DynamicMessage {
    let mut salvaged = DynamicMessage::new(descriptor);
    for span in field_spans(input) {
        let mut candidate = salvaged.clone();
        match candidate.merge(span) {
            Ok(()) => salvaged = candidate,
            Err(e) => trace!(error = %e, "Dropped field while salvaging"),
        }
    }
    salvaged
}

/// Remove one list element or map entry, or clear a singular field
fn delete_from(message: &mut DynamicMessage, field: &FieldDescriptor, rng: &mut StdRng) {
    let removed = match message.get_field_mut(field) {
        Value::List(list) if list.len() > 1 => {
            let at = rng.gen_range(0..list.len());
            list.remove(at);
            true
        }
        Value::Map(map) if map.len() > 1 => {
            if let Some(key) = sorted_keys(map).choose(rng) {
                map.remove(key);
            }
            true
        }
        _ => false,
    };
    if !removed {
        message.clear_field(field);
    }
}

fn element_count(message: &DynamicMessage, field: &FieldDescriptor) -> usize {
    match &*message.get_field(field) {
        Value::List(list) => list.len(),
        Value::Map(map) => map.len(),
        _ => 0,
    }
}

/// Map keys in a stable order, so entry choice depends only on the seed
fn sorted_keys(map: &HashMap<MapKey, Value>) -> Vec<MapKey> {
    let mut keys: Vec<MapKey> = map.keys().cloned().collect();
    keys.sort_by(key_order);
    keys
}

fn write_output(data: &mut [u8], encoded: &[u8]) -> usize {
    match data.get_mut(..encoded.len()) {
        Some(dst) => {
            dst.copy_from_slice(encoded);
            encoded.len()
        }
        None => 0,
    }
}
