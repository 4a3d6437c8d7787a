//! Decoding without compiled-in schemas
//!
//! [`DynamicMessageFactory`] owns a `prost_reflect::DescriptorPool` filled
//! from schema files, typically the closures stored in a [`BagIndex`], and
//! decodes payloads into `DynamicMessage`s by type URL.

use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use prost_types::FileDescriptorProto;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use tidebag_core::{
    canonical_entryname, message_name_from_type_url, BagError, BagIndex, BagResult, Entry,
};
use tracing::debug;

/// Registry of schema files plus entry name to type URL pins
#[derive(Debug, Clone, Default)]
pub struct DynamicMessageFactory {
    pool: DescriptorPool,
    pins: BTreeMap<String, String>,
}

impl DynamicMessageFactory {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every schema closure and pin of `index`
    pub fn from_index(index: &BagIndex) -> BagResult<Self> {
        let mut factory = Self::new();
        let files = index
            .schema_pool
            .type_url_to_schema
            .values()
            .flat_map(|set| set.file.iter().cloned());
        let added = factory.register_all(files)?;
        factory.pins = index.schema_pool.entryname_to_type_url.clone();
        debug!(
            files = added,
            pins = factory.pins.len(),
            "Built dynamic message factory from index"
        );
        Ok(factory)
    }

    /// The underlying descriptor pool
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Add one schema file; a file already registered under the same name is
    /// left alone
    ///
    /// Returns whether the file was added.
    pub fn register(&mut self, file: FileDescriptorProto) -> BagResult<bool> {
        if self.pool.get_file_by_name(file.name()).is_some() {
            return Ok(false);
        }
        let name = file.name().to_string();
        self.pool
            .add_file_descriptor_proto(file)
            .map_err(|e| BagError::decode(format!("schema {}", name), e))?;
        Ok(true)
    }

    /// Add many schema files, dependencies first regardless of input order
    ///
    /// Returns how many files were newly added.
    pub fn register_all<I>(&mut self, files: I) -> BagResult<usize>
    where
        I: IntoIterator<Item = FileDescriptorProto>,
    {
        let mut seen = HashSet::new();
        let mut pending: Vec<FileDescriptorProto> = files
            .into_iter()
            .filter(|f| seen.insert(f.name().to_string()))
            .filter(|f| self.pool.get_file_by_name(f.name()).is_none())
            .collect();

        let mut added = 0;
        while !pending.is_empty() {
            let waiting: HashSet<String> = pending.iter().map(|f| f.name().to_string()).collect();
            let (ready, blocked): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|f| f.dependency.iter().all(|d| !waiting.contains(d)));
            if ready.is_empty() {
                let mut names: Vec<_> = waiting.into_iter().collect();
                names.sort();
                return Err(BagError::decode(
                    "schema registry",
                    format!("import cycle among {}", names.join(", ")),
                ));
            }
            for file in ready {
                if self.register(file)? {
                    added += 1;
                }
            }
            pending = blocked;
        }
        Ok(added)
    }

    /// Descriptor of the message named by `type_url`
    pub fn message_descriptor(&self, type_url: &str) -> BagResult<MessageDescriptor> {
        let name = message_name_from_type_url(type_url);
        self.pool
            .get_message_by_name(name)
            .ok_or_else(|| BagError::decode(type_url, "unknown message type"))
    }

    /// Parse `bytes` as the message named by `type_url`
    pub fn decode(&self, type_url: &str, bytes: &[u8]) -> BagResult<DynamicMessage> {
        let descriptor = self.message_descriptor(type_url)?;
        DynamicMessage::decode(descriptor, bytes).map_err(|e| BagError::decode(type_url, e))
    }

    /// Decode an entry read from a bag
    ///
    /// Stamped entries are unwrapped first. The entry's own type URL wins;
    /// entries without one fall back to the pin recorded for their name.
    pub fn decode_entry(&self, entry: &Entry) -> BagResult<DynamicMessage> {
        let unpacked;
        let entry = if entry.is_stamped() {
            unpacked = entry.unpack_stamped()?;
            &unpacked
        } else {
            entry
        };

        let type_url = if entry.is_raw() {
            self.pins
                .get(&canonical_entryname(&entry.entryname))
                .map(String::as_str)
                .ok_or_else(|| BagError::decode(&entry.entryname, "entry has no known type"))?
        } else {
            entry.type_url()
        };
        self.decode(type_url, &entry.payload.value)
            .map_err(|e| match e {
                BagError::Decode { reason, .. } => {
                    BagError::decode(&entry.entryname, format!("{}: {}", type_url, reason))
                }
                other => other,
            })
    }

    /// Type URL pinned for `entryname` by the index, if any
    pub fn pinned_type(&self, entryname: &str) -> Option<&str> {
        self.pins
            .get(&canonical_entryname(entryname))
            .map(String::as_str)
    }

    /// Every known fully-qualified message name, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .pool
            .all_messages()
            .map(|m| m.full_name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Every registered schema file name, sorted
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pool.files().map(|f| f.name().to_string()).collect();
        names.sort();
        names
    }

    /// Human-readable listing of known types and files
    pub fn describe(&self) -> String {
        let mut out = String::from("types:\n");
        for name in self.type_names() {
            let _ = writeln!(out, "  {}", name);
        }
        out.push_str("files:\n");
        for name in self.file_names() {
            let _ = writeln!(out, "  {}", name);
        }
        out
    }
}
